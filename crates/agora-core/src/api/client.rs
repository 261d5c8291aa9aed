//! Request dispatch with credential attachment and transparent refresh.
//!
//! Every call goes through [`ApiClient::request`]: the bearer token is
//! attached when the session holds one, a 401 triggers a single coordinated
//! token refresh shared by all concurrent callers, and the original request
//! is retried exactly once with the refreshed token.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context as _;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;
use crate::config::Config;
use crate::session::SessionStore;

/// Standard User-Agent header for agora API requests.
pub const USER_AGENT: &str = concat!("agora/", env!("CARGO_PKG_VERSION"));

type RefreshOutcome = Result<String, Arc<ApiError>>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Owned multipart file payload.
///
/// Bodies must be rebuildable for the post-refresh retry, so the raw bytes
/// are held here instead of a single-use `reqwest::multipart::Form`.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Request body for [`ApiClient::request`].
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Multipart(FilePart),
}

/// Caller-supplied request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers; these win over the client's defaults.
    pub headers: Vec<(String, String)>,
    pub payload: Payload,
}

/// Authenticated HTTP client for the discussion-board backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
    /// At most one token refresh in flight, shared by concurrent 401 handlers.
    pending_refresh: Arc<Mutex<Option<SharedRefresh>>>,
    session_expired: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl ApiClient {
    /// Creates a client over the configured base URL and session store.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: &Config, session: Arc<SessionStore>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }

        Ok(Self {
            http: builder.build().context("Failed to build HTTP client")?,
            base_url: config.resolve_base_url()?,
            session,
            pending_refresh: Arc::new(Mutex::new(None)),
            session_expired: Mutex::new(None),
        })
    }

    /// The session store this client attaches credentials from.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Installs the callback fired when a refresh fails and the session is
    /// forcibly cleared. The front-end wires this to navigate to the login
    /// route.
    pub fn set_session_expired_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.session_expired.lock().expect("hook lock poisoned") = Some(Box::new(hook));
    }

    /// Dispatches a request against `path` (joined to the base URL).
    ///
    /// Resolves to `Ok(None)` for 204 responses and for the forced-logout
    /// path after a failed refresh; callers must tolerate an empty outcome.
    ///
    /// # Errors
    /// Non-success statuses map to [`ApiError::Request`]; see [`ApiError`]
    /// for the rest of the taxonomy.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Option<Value>, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let token = self.session.access_token();

        tracing::debug!(%method, %path, "dispatching request");
        let response = self
            .send_once(method.clone(), &url, &options, token.as_deref())
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            match self.join_refresh().await {
                Ok(new_token) => {
                    tracing::debug!(%path, "retrying once after token refresh");
                    let retry = self.send_once(method, &url, &options, Some(&new_token)).await?;
                    return handle_response(retry).await;
                }
                Err(err) => {
                    // Irrecoverable: clear the session and resolve empty.
                    tracing::warn!(%path, "token refresh failed, forcing logout: {err}");
                    if let Err(logout_err) = self.session.logout() {
                        tracing::warn!("failed to clear session: {logout_err:#}");
                    }
                    let hook = self.session_expired.lock().expect("hook lock poisoned");
                    if let Some(hook) = hook.as_ref() {
                        hook();
                    }
                    return Ok(None);
                }
            }
        }

        handle_response(response).await
    }

    /// Convenience wrapper deserializing the response body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        self.send_json(Method::GET, path, Payload::Empty).await
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.send_json(Method::POST, path, json_payload(body)?).await
    }

    pub async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.send_json(Method::PUT, path, json_payload(body)?).await
    }

    pub async fn patch_json<T, B>(&self, path: &str, body: &B) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        self.send_json(Method::PATCH, path, json_payload(body)?).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request(Method::DELETE, path, RequestOptions::default())
            .await?;
        Ok(())
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<Option<T>, ApiError> {
        let options = RequestOptions {
            payload,
            ..RequestOptions::default()
        };
        match self.request(method, path, options).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Builds and sends one attempt. Header assembly: bearer token when one
    /// is held, caller headers verbatim, and a JSON Content-Type default
    /// unless the caller set one or the body is multipart.
    async fn send_once(
        &self,
        method: Method,
        url: &str,
        options: &RequestOptions,
        token: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self.http.request(method, url);

        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let caller_content_type = options
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        // JSON is the default Content-Type even for bodyless requests;
        // multipart is excluded because reqwest sets the boundary type itself.
        if !caller_content_type && !matches!(options.payload, Payload::Multipart(_)) {
            request = request.header(CONTENT_TYPE, "application/json");
        }

        match &options.payload {
            Payload::Empty => {}
            Payload::Json(value) => {
                request = request.body(serde_json::to_vec(value)?);
            }
            Payload::Multipart(part) => {
                let form = reqwest::multipart::Form::new().part(
                    part.field.clone(),
                    reqwest::multipart::Part::bytes(part.bytes.clone())
                        .file_name(part.file_name.clone())
                        .mime_str(&part.mime)?,
                );
                request = request.multipart(form);
            }
        }

        Ok(request.send().await?)
    }

    /// Joins the pending refresh, starting one if none is in flight.
    ///
    /// The refresh task clears the pending slot itself, right after it
    /// settles and before any awaiter resumes, so a later 401 always starts
    /// a fresh refresh instead of observing stale state.
    fn join_refresh(&self) -> SharedRefresh {
        let mut slot = self.pending_refresh.lock().expect("refresh lock poisoned");
        if let Some(pending) = slot.as_ref() {
            return pending.clone();
        }

        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let session = Arc::clone(&self.session);
        let slot_handle = Arc::clone(&self.pending_refresh);
        let refresh = async move {
            let result = refresh_access_token(&http, &base_url, &session).await;
            *slot_handle.lock().expect("refresh lock poisoned") = None;
            result.map_err(Arc::new)
        }
        .boxed()
        .shared();

        *slot = Some(refresh.clone());
        refresh
    }
}

/// Refresh sub-protocol: posts the stored refresh token and installs the new
/// access token through the session store.
///
/// The refresh token is not rotated by the backend; the session keeps the
/// same one alongside the newly issued access token.
async fn refresh_access_token(
    http: &reqwest::Client,
    base_url: &str,
    session: &SessionStore,
) -> Result<String, ApiError> {
    let refresh_token = session.refresh_token().ok_or(ApiError::MissingRefreshToken)?;

    tracing::debug!("refreshing access token");
    let response = http
        .post(format!("{base_url}/api/v1/auth/refresh"))
        .json(&serde_json::json!({ "refreshToken": refresh_token }))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ApiError::RefreshFailed {
            status: response.status().as_u16(),
        });
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RefreshResponse {
        access_token: String,
    }

    let data: RefreshResponse = response.json().await?;
    session
        .login(&data.access_token, &refresh_token)
        .map_err(ApiError::Session)?;

    Ok(data.access_token)
}

/// Normalizes a response: 204 is empty, success bodies parse as JSON, and
/// failure bodies map to [`ApiError::Request`] carrying the body's `message`
/// and optional `errors` list.
async fn handle_response(response: reqwest::Response) -> Result<Option<Value>, ApiError> {
    if response.status() == StatusCode::NO_CONTENT {
        return Ok(None);
    }

    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        let value: Value = serde_json::from_str(&text)?;
        return Ok(Some(value));
    }

    let (message, errors) = match serde_json::from_str::<Value>(&text) {
        Ok(body) => (
            body.get("message")
                .and_then(Value::as_str)
                .unwrap_or("Request failed")
                .to_string(),
            body.get("errors")
                .and_then(Value::as_array)
                .map(|list| {
                    list.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        ),
        Err(_) => ("Request failed".to_string(), Vec::new()),
    };

    Err(ApiError::Request {
        status: status.as_u16(),
        message,
        errors,
    })
}

fn json_payload<B: serde::Serialize + ?Sized>(body: &B) -> Result<Payload, ApiError> {
    Ok(Payload::Json(serde_json::to_value(body)?))
}
