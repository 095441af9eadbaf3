//! Anonymous session lifecycle
//!
//! A session is a bearer token with an embedded `exp` claim. At startup the
//! stored token is reused while it is unexpired; otherwise it is discarded and
//! a fresh one is requested from the backend. Failures never escape: the
//! caller gets an anonymous context and everything except chat keeps working.

pub mod store;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::gateway::Backend;

pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Malformed session token: {0}")]
    MalformedToken(String),
}

/// Claims read from the token payload
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiry, seconds since the epoch. May carry a fractional part.
    pub exp: f64,
    #[serde(default)]
    pub sub: Option<String>,
}

impl TokenClaims {
    #[inline]
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.exp * 1000.0 < now_millis as f64
    }
}

/// Decode the payload (second `.`-separated segment) of a token
#[inline]
pub fn decode_claims(token: &str) -> Result<TokenClaims, SessionError> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| SessionError::MalformedToken("missing payload segment".to_string()))?;

    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .or_else(|_| STANDARD_LENIENT.decode(payload))
        .map_err(|e| SessionError::MalformedToken(format!("payload is not base64: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| SessionError::MalformedToken(format!("payload is not valid claims: {}", e)))
}

/// `true` when the token is expired at `now_millis`
#[inline]
pub fn is_token_expired(token: &str, now_millis: i64) -> Result<bool, SessionError> {
    decode_claims(token).map(|claims| claims.is_expired(now_millis))
}

/// Credentials threaded into calls that need them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub access_token: Option<String>,
    pub user_id: Option<String>,
}

impl SessionContext {
    #[inline]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

/// Owns the token slot and establishes the session once per lifetime
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    context: OnceCell<SessionContext>,
}

impl SessionManager {
    #[inline]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            context: OnceCell::new(),
        }
    }

    /// Reuse the stored token or create a new session. Runs at most once;
    /// later and concurrent calls get the same context without side effects.
    #[inline]
    pub async fn ensure_session(&self, backend: &dyn Backend) -> &SessionContext {
        self.context.get_or_init(|| self.establish(backend)).await
    }

    /// The established context, anonymous until `ensure_session` completes
    #[inline]
    pub fn current(&self) -> SessionContext {
        self.context.get().cloned().unwrap_or_default()
    }

    #[inline]
    pub fn is_established(&self) -> bool {
        self.context.initialized()
    }

    async fn establish(&self, backend: &dyn Backend) -> SessionContext {
        if let Some(context) = self.stored_session(Utc::now().timestamp_millis()) {
            return context;
        }

        match self.create_session(backend).await {
            Ok(context) => context,
            Err(e) => {
                error!("Failed to create anonymous session: {}", e);
                SessionContext::default()
            }
        }
    }

    fn stored_session(&self, now_millis: i64) -> Option<SessionContext> {
        let token = match self.store.load() {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                warn!("Could not read stored session token: {:#}", e);
                return None;
            }
        };

        match decode_claims(&token) {
            Ok(claims) if !claims.is_expired(now_millis) => {
                info!("Reusing stored session token");
                Some(SessionContext {
                    access_token: Some(token),
                    user_id: claims.sub,
                })
            }
            Ok(_) => {
                info!("Stored session token has expired");
                self.discard();
                None
            }
            Err(e) => {
                warn!("Discarding stored session token: {}", e);
                self.discard();
                None
            }
        }
    }

    async fn create_session(&self, backend: &dyn Backend) -> crate::Result<SessionContext> {
        let response = backend.create_session().await?;
        info!("Created anonymous session for {}", response.user_id);

        // The token still authorizes this run even if it cannot be persisted
        if let Err(e) = self.store.save(&response.access_token) {
            warn!("Could not persist session token: {:#}", e);
        }

        Ok(SessionContext {
            access_token: Some(response.access_token),
            user_id: Some(response.user_id),
        })
    }

    fn discard(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Could not clear stored session token: {:#}", e);
        }
    }
}
