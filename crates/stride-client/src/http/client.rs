/*
[INPUT]:  HTTP configuration (base URL, timeouts, api key) and session state
[OUTPUT]: Configured gateway ready for API calls with auth retry
[POS]:    HTTP layer - core gateway implementation
[UPDATE]: When changing auth header handling or the 401 retry contract
*/

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use uuid::Uuid;

use crate::auth::SessionStore;
use crate::http::{Result, StrideError};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// The gateway's view of the session layer. Registered after
/// construction by the composition root; without it, every 401 is
/// terminal.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Obtain a fresh access token for a one-shot retry.
    async fn refresh_access_token(&self) -> Result<String>;
    /// The session is unrecoverable; the session layer must sign out.
    async fn handle_unauthorized(&self);
}

/// Single chokepoint for all task-backend calls.
///
/// Every request carries `Authorization: Bearer <token>` (the session
/// token when signed in, the anonymous api key otherwise) plus an
/// `apikey` header. A 401 with `TOKEN_EXPIRED` triggers exactly one
/// refresh-and-retry through the registered hooks; every other 401
/// class fires the unauthorized hook and surfaces `SessionExpired`.
pub struct ApiGateway {
    http: Client,
    base_url: Url,
    api_key: String,
    sessions: SessionStore,
    hooks: RwLock<Option<Arc<dyn SessionHooks>>>,
}

impl ApiGateway {
    pub fn new(base_url: &str, api_key: impl Into<String>, sessions: SessionStore) -> Result<Self> {
        Self::with_config(GatewayConfig::default(), base_url, api_key, sessions)
    }

    pub fn with_config(
        config: GatewayConfig,
        base_url: &str,
        api_key: impl Into<String>,
        sessions: SessionStore,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            api_key: api_key.into(),
            sessions,
            hooks: RwLock::new(None),
        })
    }

    /// Register the session layer. Called once by the composition root.
    pub fn set_session_hooks(&self, hooks: Arc<dyn SessionHooks>) {
        *self.hooks.write().unwrap() = Some(hooks);
    }

    fn hooks(&self) -> Option<Arc<dyn SessionHooks>> {
        self.hooks.read().unwrap().clone()
    }

    /// Session token when present, anonymous api key otherwise.
    fn bearer_token(&self) -> String {
        self.sessions
            .access_token()
            .unwrap_or_else(|| self.api_key.clone())
    }

    /// Core request path: send, classify, retry once after refresh.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let raw = self.send_raw(method, endpoint, body).await?;
        serde_json::from_str(&raw)
            .map_err(|err| StrideError::InvalidResponse(format!("{endpoint}: {err}")))
    }

    /// Variant for endpoints whose response body the caller discards.
    pub(crate) async fn send_unit(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<()> {
        self.send_raw(method, endpoint, body).await.map(|_| ())
    }

    async fn send_raw(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String> {
        let mut bearer = self.bearer_token();
        let mut refreshed = false;

        loop {
            let response = self.execute(method.clone(), endpoint, body, &bearer).await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.text().await?);
            }

            let failure = ApiFailure::read(response).await;

            if status == StatusCode::UNAUTHORIZED {
                let hooks = self.hooks();

                if is_retryable_unauthorized(failure.code.as_deref()) && !refreshed {
                    if let Some(hooks) = hooks {
                        match hooks.refresh_access_token().await {
                            Ok(token) => {
                                tracing::debug!(endpoint, "token expired; retrying after refresh");
                                bearer = token;
                                refreshed = true;
                                continue;
                            }
                            Err(err) => {
                                tracing::warn!(endpoint, error = %err, "refresh failed during retry");
                                hooks.handle_unauthorized().await;
                                return Err(StrideError::SessionExpired);
                            }
                        }
                    }
                    // No hooks registered: treat like any other 401.
                }

                tracing::warn!(
                    endpoint,
                    code = failure.code.as_deref().unwrap_or("unknown"),
                    retried = refreshed,
                    "unauthorized"
                );
                if let Some(hooks) = hooks {
                    hooks.handle_unauthorized().await;
                }
                return Err(StrideError::SessionExpired);
            }

            return Err(StrideError::Api {
                status: status.as_u16(),
                message: failure.message,
            });
        }
    }

    async fn execute(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
        bearer: &str,
    ) -> Result<reqwest::Response> {
        // Endpoints are written with a leading slash; joining them
        // relative to the slash-terminated base keeps any path prefix
        // the base URL carries.
        let url = self.base_url.join(endpoint.trim_start_matches('/'))?;
        // Fresh id per attempt so a retried request is distinguishable
        // in backend logs.
        let mut builder = self
            .http
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("x-request-id", Uuid::new_v4().to_string())
            .bearer_auth(bearer);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }
}

/// A base URL must end in '/' so joined endpoints extend its path
/// instead of replacing the final segment. `https://host/api/v1`
/// would otherwise resolve `get-tasks` to `https://host/api/get-tasks`.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

/// Only `TOKEN_EXPIRED` earns a refresh-and-retry; `TOKEN_INVALID`,
/// `TOKEN_MISSING`, `UNAUTHORIZED`, and unknown codes are terminal.
fn is_retryable_unauthorized(code: Option<&str>) -> bool {
    code == Some("TOKEN_EXPIRED")
}

/// Parsed non-2xx body. The backend usually returns
/// `{"error_code": ..., "message": ...}` but plain-text bodies must be
/// tolerated too.
#[derive(Debug)]
struct ApiFailure {
    code: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default, alias = "error")]
    message: Option<String>,
}

impl ApiFailure {
    async fn read(response: reqwest::Response) -> Self {
        let status = response.status();
        let raw = response.text().await.unwrap_or_default();

        match serde_json::from_str::<ErrorBody>(&raw) {
            Ok(body) => Self {
                code: body.error_code,
                message: body
                    .message
                    .unwrap_or_else(|| format!("request failed with status {status}")),
            },
            Err(_) => Self {
                code: None,
                message: if raw.trim().is_empty() {
                    format!("request failed with status {status}")
                } else {
                    raw
                },
            },
        }
    }
}
