//! Gateway authentication
//!
//! Bearer tokens are opaque strings minted at login and resolved back to a
//! player id on every tournament request. A missing token and an unknown
//! token are distinct failures so clients can tell "log in first" apart from
//! "log in again".

use crate::error::{ErrorCode, Result, ServiceError};
use crate::types::PlayerId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

/// Trait for resolving a bearer token to the player it was issued for
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Resolve a bearer token, None when the token is unknown
    async fn verify(&self, token: &str) -> Result<Option<PlayerId>>;
}

/// Token issuer backed by an in-memory token table
pub struct InMemoryTokenIssuer {
    tokens: RwLock<HashMap<String, PlayerId>>,
}

impl InMemoryTokenIssuer {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Mint a fresh opaque token for a player
    pub async fn issue(&self, player_id: &str) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens
            .write()
            .await
            .insert(token.clone(), player_id.to_string());
        debug!(player_id, "issued bearer token");
        token
    }
}

impl Default for InMemoryTokenIssuer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenVerifier for InMemoryTokenIssuer {
    async fn verify(&self, token: &str) -> Result<Option<PlayerId>> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}

/// Resolve the player behind an `Authorization` header value.
///
/// `None` or a non-bearer value is [`ErrorCode::Unauthorized`]; a bearer
/// token the verifier does not recognize is [`ErrorCode::InvalidToken`].
pub async fn authenticate(
    verifier: &Arc<dyn TokenVerifier>,
    authorization: Option<&str>,
) -> std::result::Result<PlayerId, ServiceError> {
    let token = authorization
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            ServiceError::new(ErrorCode::Unauthorized, "Missing bearer token")
        })?;

    match verifier.verify(token).await {
        Ok(Some(player_id)) => Ok(player_id),
        Ok(None) => {
            warn!("rejected unknown bearer token");
            Err(ServiceError::new(
                ErrorCode::InvalidToken,
                "Bearer token is not valid",
            ))
        }
        Err(e) => {
            warn!("token verification error: {e:#}");
            Err(ServiceError::internal("Token verification failed"))
        }
    }
}
