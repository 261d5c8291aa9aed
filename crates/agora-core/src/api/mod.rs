//! Authenticated REST surface of the discussion-board backend.
//!
//! [`ApiClient`] owns dispatch and the refresh protocol; the sibling modules
//! add one typed endpoint group each.

mod client;
mod error;

pub mod auth;
pub mod boards;
pub mod comments;
pub mod members;
pub mod posts;

pub use client::{ApiClient, FilePart, Payload, RequestOptions, USER_AGENT};
pub use error::ApiError;
