//! Shared fixtures for integration tests
//!
//! Builds the whole system (directory, orchestrator, gateway) on top of an
//! in-process transport, so tests exercise the real envelope protocol,
//! deadlines, and handlers without a broker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tourney_hall::directory::{DirectoryClient, DirectoryService};
use tourney_hall::gateway::{router, GatewayState, InMemoryTokenIssuer, TournamentsClient};
use tourney_hall::messaging::envelope::{
    GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL, JOIN_TOURNAMENT_COMMAND_CHANNEL, USERS_GET_BY_ID_CHANNEL,
};
use tourney_hall::messaging::transport::{InProcessTransport, RequestHandler};
use tourney_hall::orchestrator::{Orchestrator, OrchestratorHandler};
use tourney_hall::store::MemoryStore;
use tourney_hall::types::{JoinTournamentCommand, UserProfile};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(1);
pub const DIRECTORY_TIMEOUT: Duration = Duration::from_millis(500);

/// A complete wired system plus handles into its guts
pub struct TestSystem {
    pub client: Arc<TournamentsClient>,
    pub store: Arc<MemoryStore>,
    pub issuer: Arc<InMemoryTokenIssuer>,
    pub router: axum::Router,
}

/// Directory roster large enough to overflow a four-player tournament
pub fn wide_roster() -> DirectoryService {
    let users = (1..=8)
        .map(|n| UserProfile {
            id: format!("user{n}"),
            username: format!("player{n}"),
            display_name: format!("Player {n}"),
        })
        .collect();
    DirectoryService::new(users)
}

pub async fn create_test_system() -> TestSystem {
    create_test_system_with(Arc::new(wide_roster()), DIRECTORY_TIMEOUT).await
}

pub async fn create_test_system_with(
    directory: Arc<dyn RequestHandler>,
    directory_timeout: Duration,
) -> TestSystem {
    let transport = Arc::new(InProcessTransport::new());
    transport.register(USERS_GET_BY_ID_CHANNEL, directory).await;

    let store = Arc::new(MemoryStore::new());
    let handler: Arc<dyn RequestHandler> = Arc::new(OrchestratorHandler::new(Arc::new(
        Orchestrator::new(
            DirectoryClient::new(transport.clone(), directory_timeout),
            store.clone(),
        ),
    )));
    transport
        .register(JOIN_TOURNAMENT_COMMAND_CHANNEL, handler.clone())
        .await;
    transport
        .register(GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL, handler)
        .await;

    let client = Arc::new(TournamentsClient::new(transport, REQUEST_TIMEOUT));
    let issuer = Arc::new(InMemoryTokenIssuer::new());
    let router = router(GatewayState::new(issuer.clone(), client.clone()));

    TestSystem {
        client,
        store,
        issuer,
        router,
    }
}

pub fn join_command(player_id: &str, game_type: &str, entry_fee: i64) -> JoinTournamentCommand {
    JoinTournamentCommand {
        player_id: player_id.to_string(),
        game_type: game_type.to_string(),
        tournament_type: "solo".to_string(),
        entry_fee,
    }
}

/// A directory that never answers within any reasonable deadline
pub struct StalledDirectory;

#[async_trait]
impl RequestHandler for StalledDirectory {
    async fn handle(&self, _channel: &str, _payload: &[u8]) -> tourney_hall::Result<Vec<u8>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(b"null".to_vec())
    }
}
