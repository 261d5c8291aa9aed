//! Login and token issuance.
//!
//! The refresh half of the auth protocol lives inside the client dispatch
//! path; this module is the explicit credential exchange.

use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::error::ApiError;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Both bearer tokens issued on login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl ApiClient {
    /// Exchanges credentials for a token pair.
    ///
    /// Does not touch the session store; callers decide whether to install
    /// the tokens (the CLI login command does).
    pub async fn login(&self, email: &str, password: &str) -> Result<Option<TokenPair>, ApiError> {
        self.post_json("/api/v1/auth/login", &LoginRequest { email, password })
            .await
    }
}
