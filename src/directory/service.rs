//! Player directory lookup service
//!
//! A hardcoded profile registry behind the `users.get-by-id` channel. The
//! reply is the bare profile or JSON `null`; this hop has no envelope and no
//! error channel of its own.

use crate::error::Result;
use crate::messaging::transport::RequestHandler;
use crate::types::{UserLookupRequest, UserProfile};
use anyhow::Context;
use async_trait::async_trait;
use tracing::info;

/// In-memory profile registry serving directory lookups
pub struct DirectoryService {
    users: Vec<UserProfile>,
}

impl DirectoryService {
    pub fn new(users: Vec<UserProfile>) -> Self {
        Self { users }
    }

    /// The demo roster every deployment ships with
    pub fn seeded() -> Self {
        let profile = |id: &str, username: &str, display_name: &str| UserProfile {
            id: id.to_string(),
            username: username.to_string(),
            display_name: display_name.to_string(),
        };

        Self::new(vec![
            profile("user1", "alice", "Alice"),
            profile("user2", "bob", "Bob"),
            profile("user3", "carol", "Carol"),
            profile("user4", "dan", "Dan"),
        ])
    }

    pub fn find_by_id(&self, player_id: &str) -> Option<&UserProfile> {
        self.users.iter().find(|user| user.id == player_id)
    }
}

#[async_trait]
impl RequestHandler for DirectoryService {
    async fn handle(&self, channel: &str, payload: &[u8]) -> Result<Vec<u8>> {
        let request: UserLookupRequest =
            serde_json::from_slice(payload).context("malformed user lookup request")?;

        let user = self.find_by_id(&request.player_id);
        info!(
            channel,
            correlation_id = %request.correlation_id,
            player_id = %request.player_id,
            found = user.is_some(),
            "directory lookup"
        );

        serde_json::to_vec(&user).context("failed to encode user lookup reply")
    }
}
