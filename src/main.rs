//! Main entry point for the Tourney Hall tournament matchmaking service
//!
//! Parses the CLI, loads and validates configuration, initializes logging,
//! and runs the selected role until shutdown.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tourney_hall::config::AppConfig;
use tourney_hall::service::{App, Role};
use tracing::info;

/// Tourney Hall - tournament matchmaking over request/reply messaging
#[derive(Parser)]
#[command(
    name = "tourney-hall",
    version,
    about = "Tournament matchmaking service: gateway, orchestrator, and player directory",
    long_about = "Tourney Hall matches players into open tournaments by game type, tournament \
                 type, and entry fee. It runs as three roles over AMQP request/reply (HTTP \
                 gateway, tournament orchestrator, player directory) or as a single standalone \
                 process for local development."
)]
struct Args {
    /// Role to run
    #[arg(value_enum, default_value_t = Role::Standalone)]
    role: Role,

    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// HTTP port override
    #[arg(long, value_name = "PORT", help = "Override gateway HTTP port")]
    http_port: Option<u16>,

    /// AMQP host override
    #[arg(long, value_name = "HOST", help = "Override AMQP broker host")]
    amqp_host: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without starting")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load configuration and apply CLI overrides
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if let Some(http_port) = args.http_port {
        config.service.http_port = http_port;
    }
    if let Some(amqp_host) = &args.amqp_host {
        config.amqp.host = amqp_host.clone();
    }

    tourney_hall::config::validate_config(&config)?;
    Ok(config)
}

fn display_startup_banner(config: &AppConfig, role: Role) {
    info!("Tourney Hall Tournament Matchmaking Service");
    info!("   Version: {}", tourney_hall::VERSION);
    info!("   Role: {:?}", role);
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   HTTP port: {}", config.service.http_port);
    info!("   AMQP: {}:{}", config.amqp.host, config.amqp.port);
    info!(
        "   Timeouts: request {}ms, directory {}ms",
        config.messaging.request_timeout_ms, config.messaging.directory_timeout_ms
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    init_logging(&config.service.log_level)?;
    display_startup_banner(&config, args.role);

    if args.dry_run {
        info!("Configuration is valid, exiting (dry run)");
        return Ok(());
    }

    App::new(config).run(args.role).await?;

    info!("Shutdown complete");
    Ok(())
}
