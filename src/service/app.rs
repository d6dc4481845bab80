//! Role wiring and service lifecycle
//!
//! Each deployable role (gateway, orchestrator, directory) assembles its
//! components here, plus a standalone role that runs all three over an
//! in-process transport for local development.

use crate::config::AppConfig;
use crate::directory::{DirectoryClient, DirectoryService};
use crate::gateway::{GatewayState, InMemoryTokenIssuer, TournamentsClient};
use crate::messaging::connection::AmqpConnection;
use crate::messaging::envelope::{
    GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL, JOIN_TOURNAMENT_COMMAND_CHANNEL, USERS_GET_BY_ID_CHANNEL,
};
use crate::messaging::rpc::{serve_channel, AmqpRequestTransport};
use crate::messaging::transport::{InProcessTransport, RequestHandler};
use crate::orchestrator::{Orchestrator, OrchestratorHandler};
use crate::store::{MemoryStore, PostgresStore, TournamentStore};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// The deployable roles of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    /// HTTP gateway forwarding to the tournament channels over AMQP
    Gateway,
    /// Tournament orchestrator serving the command and query channels
    Orchestrator,
    /// Player directory serving the user lookup channel
    Directory,
    /// All three roles over an in-process transport, no broker required
    Standalone,
}

pub struct App {
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Run the given role until a shutdown signal arrives
    pub async fn run(&self, role: Role) -> Result<()> {
        match role {
            Role::Gateway => self.run_gateway().await,
            Role::Orchestrator => self.run_orchestrator().await,
            Role::Directory => self.run_directory().await,
            Role::Standalone => self.run_standalone().await,
        }
    }

    async fn run_gateway(&self) -> Result<()> {
        let connection = AmqpConnection::connect(&self.config.amqp).await?;
        let channel = connection.open_channel().await?;
        let transport = Arc::new(AmqpRequestTransport::new(channel).await?);

        let state = self.gateway_state(transport);
        self.serve_http(state).await?;

        connection.close().await
    }

    async fn run_orchestrator(&self) -> Result<()> {
        let connection = AmqpConnection::connect(&self.config.amqp).await?;

        // Outbound directory lookups and inbound command traffic get their
        // own channels; amqprs channels are not meant to be shared across
        // consumer and publisher roles.
        let lookup_channel = connection.open_channel().await?;
        let directory = DirectoryClient::new(
            Arc::new(AmqpRequestTransport::new(lookup_channel).await?),
            self.config.directory_timeout(),
        );

        let store = self.build_store().await?;
        let handler: Arc<dyn RequestHandler> = Arc::new(OrchestratorHandler::new(Arc::new(
            Orchestrator::new(directory, store),
        )));

        let serve = connection.open_channel().await?;
        serve_channel(&serve, JOIN_TOURNAMENT_COMMAND_CHANNEL, handler.clone()).await?;
        serve_channel(&serve, GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL, handler).await?;

        info!("orchestrator running");
        wait_for_shutdown_signal().await;
        connection.close().await
    }

    async fn run_directory(&self) -> Result<()> {
        let connection = AmqpConnection::connect(&self.config.amqp).await?;
        let serve = connection.open_channel().await?;
        serve_channel(
            &serve,
            USERS_GET_BY_ID_CHANNEL,
            Arc::new(DirectoryService::seeded()),
        )
        .await?;

        info!("directory running");
        wait_for_shutdown_signal().await;
        connection.close().await
    }

    async fn run_standalone(&self) -> Result<()> {
        let transport = Arc::new(InProcessTransport::new());
        transport
            .register(USERS_GET_BY_ID_CHANNEL, Arc::new(DirectoryService::seeded()))
            .await;

        let directory = DirectoryClient::new(transport.clone(), self.config.directory_timeout());
        let store = self.build_store().await?;
        let handler: Arc<dyn RequestHandler> = Arc::new(OrchestratorHandler::new(Arc::new(
            Orchestrator::new(directory, store),
        )));
        transport
            .register(JOIN_TOURNAMENT_COMMAND_CHANNEL, handler.clone())
            .await;
        transport
            .register(GET_PLAYER_TOURNAMENTS_QUERY_CHANNEL, handler)
            .await;

        let state = self.gateway_state(transport);
        self.serve_http(state).await
    }

    fn gateway_state(
        &self,
        transport: Arc<dyn crate::messaging::transport::RequestTransport>,
    ) -> GatewayState {
        GatewayState::new(
            Arc::new(InMemoryTokenIssuer::new()),
            Arc::new(TournamentsClient::new(
                transport,
                self.config.request_timeout(),
            )),
        )
    }

    /// Pick the tournament store: Postgres when a database URL is
    /// configured, in-memory otherwise
    async fn build_store(&self) -> Result<Arc<dyn TournamentStore>> {
        let storage = &self.config.storage;
        if storage.database_url.is_empty() {
            info!(
                max_players = storage.max_players,
                "using in-memory tournament store"
            );
            Ok(Arc::new(MemoryStore::with_max_players(storage.max_players)))
        } else {
            info!(
                max_players = storage.max_players,
                "using Postgres tournament store"
            );
            let store = PostgresStore::connect(
                &storage.database_url,
                storage.max_connections,
                storage.max_players,
            )
            .await?;
            Ok(Arc::new(store))
        }
    }

    async fn serve_http(&self, state: GatewayState) -> Result<()> {
        let router = crate::gateway::router(state);
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.service.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        info!(%addr, "gateway listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(wait_for_shutdown_signal())
            .await
            .context("HTTP server error")
    }
}

/// Wait for SIGINT or SIGTERM
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT"),
        _ = terminate => info!("received SIGTERM"),
    }
}
