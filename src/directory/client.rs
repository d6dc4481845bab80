//! Request/reply client for the player directory
//!
//! The directory hop carries no envelope and no structured error channel: the
//! reply is a JSON profile or `null`. Every failure classification therefore
//! happens on this side, from transport errors and payload shape alone.

use crate::error::{ServiceError, ServiceResult};
use crate::messaging::envelope::USERS_GET_BY_ID_CHANNEL;
use crate::messaging::transport::{RequestTransport, TransportError};
use crate::types::{UserLookupRequest, UserProfile};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Dependency name used in error details
pub const DIRECTORY_DEPENDENCY: &str = "directory-service";

/// Resolves player ids into directory profiles
pub struct DirectoryClient {
    transport: Arc<dyn RequestTransport>,
    timeout: Duration,
}

impl DirectoryClient {
    /// Create a client with its own lookup timeout, which must be configured
    /// smaller than the gateway-to-orchestrator timeout.
    pub fn new(transport: Arc<dyn RequestTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub async fn resolve_user(
        &self,
        correlation_id: &str,
        player_id: &str,
    ) -> ServiceResult<UserProfile> {
        let request = UserLookupRequest {
            correlation_id: correlation_id.to_string(),
            player_id: player_id.to_string(),
        };
        let payload = match serde_json::to_vec(&request) {
            Ok(payload) => payload,
            Err(e) => {
                return ServiceResult::err(ServiceError::internal(format!(
                    "failed to encode directory lookup: {e}"
                )))
            }
        };

        match self
            .transport
            .request(USERS_GET_BY_ID_CHANNEL, payload, self.timeout)
            .await
        {
            Ok(reply) => match serde_json::from_slice::<Option<UserProfile>>(&reply) {
                Ok(Some(profile)) => ServiceResult::ok(profile),
                Ok(None) => ServiceResult::err(ServiceError::user_not_found(player_id)),
                Err(e) => {
                    // An undecodable reply is a protocol fault, not absence.
                    error!(
                        correlation_id,
                        player_id, "malformed directory reply: {e}"
                    );
                    ServiceResult::err(resolve_failure())
                }
            },
            Err(TransportError::Timeout { timeout_ms, .. }) => {
                warn!(correlation_id, player_id, "directory lookup timed out");
                ServiceResult::err(ServiceError::dependency_timeout(
                    DIRECTORY_DEPENDENCY,
                    timeout_ms,
                ))
            }
            Err(e) => {
                error!(correlation_id, player_id, "directory lookup failed: {e}");
                ServiceResult::err(resolve_failure())
            }
        }
    }
}

fn resolve_failure() -> ServiceError {
    ServiceError::internal("Failed to resolve user via directory service")
        .with_details(serde_json::json!({ "dependency": DIRECTORY_DEPENDENCY }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::service::DirectoryService;
    use crate::error::ErrorCode;
    use crate::messaging::transport::{InProcessTransport, RequestHandler};
    use async_trait::async_trait;

    struct SlowDirectory;

    #[async_trait]
    impl RequestHandler for SlowDirectory {
        async fn handle(&self, _channel: &str, _payload: &[u8]) -> crate::error::Result<Vec<u8>> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(b"null".to_vec())
        }
    }

    struct GarbageDirectory;

    #[async_trait]
    impl RequestHandler for GarbageDirectory {
        async fn handle(&self, _channel: &str, _payload: &[u8]) -> crate::error::Result<Vec<u8>> {
            Ok(b"not json".to_vec())
        }
    }

    async fn client_with(handler: Arc<dyn RequestHandler>, timeout: Duration) -> DirectoryClient {
        let transport = Arc::new(InProcessTransport::new());
        transport.register(USERS_GET_BY_ID_CHANNEL, handler).await;
        DirectoryClient::new(transport, timeout)
    }

    #[tokio::test]
    async fn resolves_known_user() {
        let client = client_with(
            Arc::new(DirectoryService::seeded()),
            Duration::from_secs(1),
        )
        .await;

        let profile = client
            .resolve_user("corr-1", "user1")
            .await
            .into_result()
            .unwrap();
        assert_eq!(profile.username, "alice");
    }

    #[tokio::test]
    async fn absent_profile_maps_to_user_not_found() {
        let client = client_with(
            Arc::new(DirectoryService::seeded()),
            Duration::from_secs(1),
        )
        .await;

        let err = client
            .resolve_user("corr-2", "user999")
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UserNotFound);
    }

    #[tokio::test]
    async fn timeout_maps_to_dependency_timeout_with_details() {
        let client = client_with(Arc::new(SlowDirectory), Duration::from_millis(20)).await;

        let err = client
            .resolve_user("corr-3", "user1")
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DependencyTimeout);

        let details = err.details.unwrap();
        assert_eq!(details["dependency"], serde_json::json!(DIRECTORY_DEPENDENCY));
        assert_eq!(details["timeoutMs"], serde_json::json!(20));
    }

    #[tokio::test]
    async fn malformed_reply_maps_to_internal_error() {
        let client = client_with(Arc::new(GarbageDirectory), Duration::from_secs(1)).await;

        let err = client
            .resolve_user("corr-4", "user1")
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }

    #[tokio::test]
    async fn missing_channel_maps_to_internal_error() {
        let transport = Arc::new(InProcessTransport::new());
        let client = DirectoryClient::new(transport, Duration::from_secs(1));

        let err = client
            .resolve_user("corr-5", "user1")
            .await
            .into_result()
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
