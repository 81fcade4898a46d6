//! ---
//! kabuki_section: "01-core-functionality"
//! kabuki_subsection: "binary"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Binary entrypoint for the robot daemon."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kabuki_common::config::{AppConfig, LinkRole};
use kabuki_common::logging::init_tracing;
use kabuki_link::{FramedLink, FramedListener};
use kabuki_metrics::{new_registry, spawn_http_server, DispatchMetrics};
use kabuki_robot::{CommandDispatcher, ConsoleMotion};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Kabuki-Link robot daemon", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the link peer address")]
    peer: Option<SocketAddr>,

    #[arg(long, help = "Listen for the sensor peer instead of dialing")]
    listen: bool,

    #[arg(long, help = "Disable [kabuki] acknowledgement replies")]
    no_ack: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/robotd.toml"));
    candidates.push(PathBuf::from("configs/example.robot.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(peer) = cli.peer {
        config.link.peer = peer;
    }
    if cli.listen {
        config.link.role = LinkRole::Listen;
    }
    if cli.no_ack {
        config.robot.ack = false;
    }
    config.validate()?;
    init_tracing("kabuki-robotd", &config.logging)?;
    info!(config_path = %loaded.source.display(), "configuration loaded");

    let mut dispatcher = CommandDispatcher::new(ConsoleMotion).with_ack(config.robot.ack);
    let mut metrics_server = None;
    if config.metrics.enabled {
        let registry = new_registry();
        dispatcher = dispatcher.with_metrics(DispatchMetrics::new(registry.clone())?);
        match spawn_http_server(registry, config.metrics.listen) {
            Ok(server) => {
                info!(address = %server.addr(), "metrics exporter enabled");
                metrics_server = Some(server);
            }
            Err(err) => warn!(error = %err, "failed to start metrics exporter"),
        }
    } else {
        info!("metrics exporter disabled by configuration");
    }

    let link = match config.link.role {
        LinkRole::Connect => {
            info!(peer = %config.link.peer, "dialing sensor relay");
            FramedLink::connect(config.link.peer, dispatcher).await?
        }
        LinkRole::Listen => {
            let listener = FramedListener::bind(config.link.peer).await?;
            info!(address = %listener.local_addr()?, "waiting for sensor peer");
            listener.accept(dispatcher).await?
        }
    };
    info!(peer = %link.peer_addr(), "link established; interlock idle until arm button");

    tokio::select! {
        _ = signal::ctrl_c() => info!("ctrl-c received; shutting down"),
        _ = link.closed() => info!("link closed; shutting down"),
    }
    link.close();
    link.join().await;

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}
