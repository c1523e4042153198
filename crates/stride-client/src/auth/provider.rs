/*
[INPUT]:  Credentials and refresh tokens
[OUTPUT]: Token grants from the external identity provider
[POS]:    Auth layer - identity provider HTTP endpoints
[UPDATE]: When provider endpoints or grant shapes change
*/

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration as StdDuration;

use crate::http::client::parse_base_url;
use crate::http::{Result, StrideError};

use super::session::Session;

/// Token grant returned by the password and refresh flows.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub user: IdentityUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Sign-up outcome: either an immediate session grant or a
/// pending-confirmation state with no active session.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    Granted(TokenGrant),
    ConfirmationRequired,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<IdentityUser>,
    #[serde(default)]
    confirmation_sent_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default, alias = "error_description", alias = "msg")]
    message: Option<String>,
}

impl TokenGrant {
    /// Convert a grant into a session anchored at the current clock.
    pub fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
        }
    }
}

/// HTTP client for the identity provider (separate base URL from the
/// task API).
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(30))
            .connect_timeout(StdDuration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            api_key: api_key.into(),
        })
    }

    /// POST /token?grant_type=password
    pub async fn password_sign_in(&self, email: &str, password: &str) -> Result<TokenGrant> {
        let url = self.grant_url("password")?;
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;
        Self::parse_grant(response).await
    }

    /// POST /token?grant_type=refresh_token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant> {
        let url = self.grant_url("refresh_token")?;
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;
        Self::parse_grant(response).await
    }

    /// POST /signup
    ///
    /// The provider either returns a full grant (auto-confirm) or a
    /// confirmation-pending record without tokens.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let url = self.base_url.join("signup")?;
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let parsed: SignUpResponse = response
            .json()
            .await
            .map_err(|e| StrideError::InvalidResponse(format!("signup response: {e}")))?;

        match (parsed.access_token, parsed.expires_in, parsed.user) {
            (Some(access_token), Some(expires_in), Some(user)) => {
                Ok(SignUpOutcome::Granted(TokenGrant {
                    access_token,
                    refresh_token: parsed.refresh_token,
                    expires_in,
                    user,
                }))
            }
            _ if parsed.confirmation_sent_at.is_some() => Ok(SignUpOutcome::ConfirmationRequired),
            _ => Err(StrideError::InvalidResponse(
                "signup response carried neither a grant nor a confirmation".to_string(),
            )),
        }
    }

    /// GET /user
    ///
    /// Remote validation of a bearer token. An explicit 401/403 means
    /// the session is invalid; transport errors surface as `Http` so
    /// callers can treat them as transient.
    pub async fn validate(&self, access_token: &str) -> Result<IdentityUser> {
        let url = self.base_url.join("user")?;
        let response = self
            .http
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => response
                .json()
                .await
                .map_err(|e| StrideError::InvalidResponse(format!("user response: {e}"))),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StrideError::SessionExpired),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(StrideError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    fn grant_url(&self, grant_type: &str) -> Result<Url> {
        let mut url = self.base_url.join("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    async fn parse_grant(response: reqwest::Response) -> Result<TokenGrant> {
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| StrideError::InvalidResponse(format!("token grant response: {e}")))
    }

    /// Map a provider rejection to `Auth` with the provider's own
    /// message so the UI can show it verbatim.
    async fn rejection(response: reqwest::Response) -> StrideError {
        let status = response.status();
        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ProviderError>(&raw)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    format!("identity provider returned {status}")
                } else {
                    raw.clone()
                }
            });
        StrideError::Auth { message }
    }
}
