//! ---
//! kabuki_section: "01-core-functionality"
//! kabuki_subsection: "binary"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Binary entrypoint for the sensor console."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kabuki_common::config::AppConfig;
use kabuki_common::logging::init_tracing;
use kabuki_link::{FrameHandler, FramedLink, LinkHandle};
use kabuki_proto::{Frame, KABUKI_TAG, KINECT_TAG};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Kabuki-Link sensor console", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the link peer address")]
    peer: Option<SocketAddr>,
}

/// Logs the robot's acknowledgement traffic, mirroring the sensor rig's
/// console feedback.
struct AckLogger;

impl FrameHandler for AckLogger {
    fn on_frame(&mut self, frame: Frame, _link: &LinkHandle) {
        match frame.body_text() {
            Ok(body) if body.starts_with(KABUKI_TAG) => {
                info!(body = body, "robot acknowledgement received");
            }
            Ok(body) if body.starts_with(KINECT_TAG) => {
                info!(body = body, "sensor command echoed");
            }
            Ok(body) => warn!(body = body, "frame without recognized tag discarded"),
            Err(err) => warn!(error = %err, "non-text frame discarded"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/sensorctl.toml"));
    candidates.push(PathBuf::from("configs/example.sensor.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(peer) = cli.peer {
        config.link.peer = peer;
    }
    config.validate()?;
    init_tracing("kabuki-sensorctl", &config.logging)?;
    info!(config_path = %loaded.source.display(), "configuration loaded");

    info!(peer = %config.link.peer, "connecting to robot");
    let link = FramedLink::connect(config.link.peer, AckLogger).await?;
    info!(peer = %link.peer_addr(), "link established");
    println!("commands: forward, left, right, stop, button; ctrl-d quits");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("ctrl-c received; closing link");
                break;
            }
            _ = link.closed() => {
                warn!("link closed by peer or transport error");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    // Pre-tagged input passes through untouched so raw
                    // protocol frames can be exercised from the console.
                    let body = if line.starts_with('[') {
                        line.to_owned()
                    } else {
                        format!("{KINECT_TAG} {line}")
                    };
                    match Frame::from_text(&body) {
                        Ok(frame) => link.write(frame),
                        Err(err) => warn!(error = %err, "command not sent"),
                    }
                }
                Ok(None) => {
                    info!("stdin closed; closing link");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "stdin read failed");
                    break;
                }
            }
        }
    }

    link.close();
    link.join().await;
    Ok(())
}
