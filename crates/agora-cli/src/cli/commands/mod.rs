//! CLI command handlers.

use std::sync::Arc;

use agora_core::api::ApiClient;
use agora_core::config::Config;
use agora_core::session::SessionStore;
use anyhow::{Context, Result};

pub mod auth;
pub mod boards;
pub mod browse;
pub mod comments;
pub mod config;
pub mod posts;
pub mod profile;

/// Builds an API client over the default session store.
pub(crate) fn build_client(config: &Config) -> Result<Arc<ApiClient>> {
    let session = Arc::new(SessionStore::open_default());
    let client = ApiClient::new(config, session).context("build API client")?;
    // Browse mode replaces this with a redirect to the login view.
    client.set_session_expired_hook(|| {
        eprintln!("Session expired; log in again with `agora login`.");
    });
    Ok(Arc::new(client))
}

/// Member id of the current session, for endpoints addressed by member.
pub(crate) fn current_member_id(client: &ApiClient) -> Result<i64> {
    client
        .session()
        .user()
        .map(|user| user.member_id)
        .context("Not logged in (or the stored token has no readable identity)")
}
