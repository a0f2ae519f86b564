use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc, time::Duration};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::GuardError,
    models::Identity,
    repository::RepositoryState,
};

/// Header carrying a user id for the local development bypass.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of the HS256 session token issued by the auth backend.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the profile id.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Credentials
///
/// Whatever the request presented to prove who it is. Extraction never fails; an empty
/// `Credentials` simply resolves to "unauthenticated".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub bearer: Option<String>,
    pub dev_user_id: Option<Uuid>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            dev_user_id: None,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let dev_user_id = headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());

        Self {
            bearer,
            dev_user_id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bearer.is_none() && self.dev_user_id.is_none()
    }
}

impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// IdentityProvider
///
/// The external auth/session collaborator. `Ok(None)` means the credentials were checked
/// and do not belong to anyone; `Err` means the check itself could not be completed.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_identity(&self, credentials: &Credentials)
    -> Result<Option<Identity>, GuardError>;
}

/// IdentityState
///
/// The concrete type used to share the identity source across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;

/// JwtIdentityProvider
///
/// Validates session tokens locally and loads the account from the profile store.
///
/// The process:
/// 1. Local Bypass: in `Env::Local`, an `x-user-id` header naming an existing profile is
///    accepted without a token.
/// 2. Token Validation: HS256 signature and expiry.
/// 3. Profile Lookup: the account must still exist, and its role must be one we know.
pub struct JwtIdentityProvider {
    repo: RepositoryState,
    config: AppConfig,
}

impl JwtIdentityProvider {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self { repo, config }
    }

    async fn load(&self, id: Uuid) -> Result<Option<Identity>, GuardError> {
        Ok(self
            .repo
            .get_profile(id)
            .await?
            .and_then(|profile| profile.into_identity()))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn current_identity(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Identity>, GuardError> {
        if self.config.env == Env::Local {
            if let Some(user_id) = credentials.dev_user_id {
                if let Some(identity) = self.load(user_id).await? {
                    tracing::debug!(%user_id, "local bypass accepted");
                    return Ok(Some(identity));
                }
            }
        }

        let Some(token) = credentials.bearer.as_deref() else {
            return Ok(None);
        };

        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                    _ => tracing::debug!(error = %e, "session token rejected"),
                }
                return Ok(None);
            }
        };

        self.load(token_data.claims.sub).await
    }
}

/// RestIdentityProvider
///
/// Asks the REST backend who the bearer of a token is (`GET {base}/auth/me`).
///
/// Every lookup is bounded by the client's request timeout. A backend that accepts the
/// connection and never answers fails the check with `SessionCheckFailed`.
pub struct RestIdentityProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RestIdentityProvider {
    /// Builds the provider with its own HTTP client, bounding each lookup by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Uses a caller-supplied client. Its timeout policy applies as configured.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

fn lookup_failed(error: reqwest::Error) -> GuardError {
    if error.is_timeout() {
        GuardError::SessionCheckFailed(format!("identity backend timed out: {error}"))
    } else {
        GuardError::SessionCheckFailed(error.to_string())
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn current_identity(
        &self,
        credentials: &Credentials,
    ) -> Result<Option<Identity>, GuardError> {
        let Some(token) = credentials.bearer.as_deref() else {
            return Ok(None);
        };

        let response = self
            .client
            .get(format!("{}/auth/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(lookup_failed)?;

        match response.status() {
            StatusCode::OK => response.json::<Identity>().await.map(Some).map_err(|e| {
                if e.is_decode() {
                    GuardError::SessionCheckFailed(format!("malformed identity: {e}"))
                } else {
                    lookup_failed(e)
                }
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status => Err(GuardError::SessionCheckFailed(format!(
                "identity backend answered {status}"
            ))),
        }
    }
}

/// CurrentIdentity Extractor
///
/// Resolves the caller for the JSON API. Rejects with 401 when the caller is anonymous,
/// inactive, or the identity source failed: the API fails closed just like the pages.
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provider = IdentityState::from_ref(state);
        let credentials = Credentials::from_headers(&parts.headers);

        match provider.current_identity(&credentials).await {
            Ok(Some(identity)) if identity.is_active => Ok(CurrentIdentity(identity)),
            Ok(_) => Err(StatusCode::UNAUTHORIZED),
            Err(error) => {
                tracing::warn!(%error, "identity check failed; rejecting request");
                Err(StatusCode::UNAUTHORIZED)
            }
        }
    }
}
