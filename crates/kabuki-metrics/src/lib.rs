//! ---
//! kabuki_section: "03-observability"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Metrics collection and export utilities."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across both binaries.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %addr, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

/// Prometheus scrape endpoint.
async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_str(encoder.format_type())
                    .expect("encoder format type is a valid header value"),
            )],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("metrics encoding error"),
            )
                .into_response()
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Return the bound address for convenience.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Counters recorded by the robot-side frame dispatcher.
#[derive(Clone, Debug)]
pub struct DispatchMetrics {
    frames_received: IntCounterVec,
    commands_accepted: IntCounter,
    commands_rejected: IntCounterVec,
}

impl DispatchMetrics {
    /// Register the dispatcher counters against a shared registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let frames_received = IntCounterVec::new(
            Opts::new(
                "kabuki_frames_received_total",
                "Frames delivered to the dispatcher, by leading tag",
            ),
            &["tag"],
        )?;
        registry.register(Box::new(frames_received.clone()))?;

        let commands_accepted = IntCounter::with_opts(Opts::new(
            "kabuki_commands_accepted_total",
            "Drive commands forwarded to the motion sink",
        ))?;
        registry.register(Box::new(commands_accepted.clone()))?;

        let commands_rejected = IntCounterVec::new(
            Opts::new(
                "kabuki_commands_rejected_total",
                "Commands dropped before reaching the motion sink, by reason",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(commands_rejected.clone()))?;

        Ok(Self {
            frames_received,
            commands_accepted,
            commands_rejected,
        })
    }

    /// Count one inbound frame by its tag classification.
    pub fn frame_received(&self, tag: &str) {
        self.frames_received.with_label_values(&[tag]).inc();
    }

    /// Count one drive command forwarded to the motion sink.
    pub fn command_accepted(&self) {
        self.commands_accepted.inc();
    }

    /// Count one dropped command by rejection reason.
    pub fn command_rejected(&self, reason: &str) {
        self.commands_rejected.with_label_values(&[reason]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_counters_register_once_and_increment() {
        let registry = new_registry();
        let metrics = DispatchMetrics::new(registry.clone()).expect("fresh registry");

        metrics.frame_received("kinect");
        metrics.frame_received("kinect");
        metrics.command_accepted();
        metrics.command_rejected("not_armed");

        let families = registry.gather();
        let frames = families
            .iter()
            .find(|family| family.get_name() == "kabuki_frames_received_total")
            .expect("frames family present");
        assert_eq!(frames.get_metric()[0].get_counter().get_value(), 2.0);

        // A second registration against the same registry collides.
        assert!(DispatchMetrics::new(registry).is_err());
    }
}
