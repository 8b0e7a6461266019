//! e-Manifest REST client.
//!
//! Authenticates with the API id and key, caches the session token until it
//! expires, and saves manifests one at a time through the multipart `save`
//! endpoint.

use chrono::{DateTime, Utc};
use reqwest::{multipart, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;

use async_trait::async_trait;

use super::submit::{ManifestSubmitter, SaveResponse};
use crate::config::{ClientConfig, Environment};
use crate::error::{ConfigError, SubmitError, SubmitResult};
use crate::models::ManifestPayload;

const AUTH_PATH: &str = "/rest/api/v1/auth";
const SAVE_PATH: &str = "/rest/api/v1/emanifest/manifest/save";

/// Multipart field carrying the manifest JSON.
const MANIFEST_FIELD: &str = "manifest";

/// User-facing text for the error codes the auth endpoint returns.
pub fn auth_error_message(code: &str) -> Option<&'static str> {
    let message = match code {
        "E_MissingApiCredentials" => {
            "API ID or Key are not set for the environment. Please add under API Settings."
        }
        "E_SecurityApiIdLocked" => {
            "API ID is locked. You need to reset it in RCRAInfo by generating a new key."
        }
        "E_SecurityInvalidCredentials" | "E_SecurityApiInvalidCredentials" => {
            "Invalid API credentials. Confirm and set API ID and Key for the environment. You can manage your API credentials in RCRAInfo."
        }
        "E_SecurityApiInvalidStatus" => {
            "API ID is disabled. Account needs to be reactivated in RCRAInfo."
        }
        "E_AuthOther" => "Unknown authentication error - please check logs",
        _ => return None,
    };
    Some(message)
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    expiration: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Cached bearer token.
#[derive(Debug, Clone)]
struct Session {
    token: String,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Client for one RCRAInfo environment.
pub struct EManifestClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for EManifestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EManifestClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl EManifestClient {
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            http,
            config,
            session: Mutex::new(None),
        })
    }

    /// Build from `EMANIFEST_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// Forget the cached token, e.g. after credentials change.
    pub async fn clear_session(&self) {
        tracing::debug!("clearing cached e-Manifest token");
        *self.session.lock().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.environment.base_url(), path)
    }

    /// Current bearer token, authenticating when none is cached or it expired.
    async fn token(&self) -> SubmitResult<String> {
        let mut session = self.session.lock().await;
        if let Some(current) = session.as_ref().filter(|s| s.is_valid(Utc::now())) {
            return Ok(current.token.clone());
        }

        let fresh = self.authenticate().await?;
        let token = fresh.token.clone();
        *session = Some(fresh);
        Ok(token)
    }

    async fn authenticate(&self) -> SubmitResult<Session> {
        if !self.config.has_credentials() {
            return Err(SubmitError::MissingCredentials);
        }

        tracing::info!(environment = %self.config.environment, "authenticating with e-Manifest");
        let url = format!(
            "{}/{}/{}",
            self.url(AUTH_PATH),
            self.config.api_id,
            self.config.api_key
        );

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(network_error)?;

        if !status.is_success() {
            return Err(classify_auth_failure(status, &body));
        }

        parse_session(&body)
    }
}

fn parse_session(body: &str) -> SubmitResult<Session> {
    let auth: AuthResponse = serde_json::from_str(body)
        .map_err(|e| SubmitError::Authentication(format!("invalid auth response: {e}")))?;
    let expires_at = DateTime::parse_from_rfc3339(&auth.expiration)
        .map_err(|e| SubmitError::Authentication(format!("invalid token expiration: {e}")))?
        .with_timezone(&Utc);

    Ok(Session {
        token: auth.token,
        expires_at,
    })
}

/// Map a failed auth response to a user-facing error.
fn classify_auth_failure(status: StatusCode, body: &str) -> SubmitError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();

    if let Some(message) = parsed.code.as_deref().and_then(auth_error_message) {
        return SubmitError::Authentication(message.to_string());
    }
    match parsed.message {
        Some(message) => SubmitError::Authentication(format!(
            "Error authenticating with e-Manifest API - reason: {message}"
        )),
        None => SubmitError::Authentication(format!(
            "{} (HTTP {})",
            auth_error_message("E_AuthOther").unwrap_or_default(),
            status.as_u16()
        )),
    }
}

/// Map a save response to the saved report or the reason it failed.
///
/// A non-2xx body carrying `operationStatus` is the API's validation report
/// for this manifest; anything else is unexpected.
pub fn classify_save_response(status: StatusCode, body: &str) -> SubmitResult<SaveResponse> {
    if status.is_success() {
        return serde_json::from_str(body).map_err(|_| SubmitError::UnexpectedStatus {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    match serde_json::from_str::<Value>(body) {
        Ok(report) if report.get("operationStatus").is_some() => Err(SubmitError::Rejected(report)),
        _ => Err(SubmitError::UnexpectedStatus {
            status: status.as_u16(),
            body: body.to_string(),
        }),
    }
}

/// Transport failure, with the URL stripped since the auth path carries the
/// API key.
fn network_error(error: reqwest::Error) -> SubmitError {
    SubmitError::Network(error.without_url().to_string())
}

#[async_trait]
impl ManifestSubmitter for EManifestClient {
    async fn save(&self, manifest: &ManifestPayload) -> SubmitResult<SaveResponse> {
        let token = self.token().await?;
        let json = serde_json::to_string(&manifest.payload)
            .map_err(|e| SubmitError::Encoding(e.to_string()))?;
        let form = multipart::Form::new().text(MANIFEST_FIELD, json);

        let response = self
            .http
            .post(self.url(SAVE_PATH))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(network_error)?;

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            self.clear_session().await;
            return Err(classify_auth_failure(status, &body));
        }

        classify_save_response(status, &body)
    }
}
