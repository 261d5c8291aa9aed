//! Core agora library (config, session store, API client, router).

pub mod api;
pub mod config;
pub mod router;
pub mod session;
