//! ---
//! kabuki_section: "01-core-functionality"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Shared configuration and logging primitives."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_peer() -> SocketAddr {
    // The original rig's fixed endpoint, kept as the out-of-the-box value.
    "127.0.0.1:8888".parse().expect("valid default peer address")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_listen() -> SocketAddr {
    "0.0.0.0:9898"
        .parse()
        .expect("valid default metrics address")
}

fn default_ack() -> bool {
    true
}

/// Primary configuration object for the Kabuki-Link binaries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Framed link endpoint and role.
    #[serde(default)]
    pub link: LinkConfig,
    /// Robot-side dispatcher behavior; ignored by the sensor console.
    #[serde(default)]
    pub robot: RobotConfig,
    /// Tracing output settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prometheus exporter settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    /// The parsed and validated configuration.
    pub config: AppConfig,
    /// Path the configuration was read from.
    pub source: PathBuf,
}

impl AppConfig {
    /// Environment variable overriding the configuration search path.
    pub const ENV_CONFIG_PATH: &str = "KABUKI_CONFIG";

    /// Load configuration from disk, respecting the `KABUKI_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(path.clone())?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: PathBuf) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.link.role == LinkRole::Connect && self.link.peer.port() == 0 {
            return Err(anyhow!(
                "link.peer must carry a concrete port when link.role is connect"
            ));
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Endpoint and role of the framed link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Peer address to dial, or local address to bind when listening.
    #[serde(default = "default_peer")]
    pub peer: SocketAddr,
    /// Whether this process dials the peer or waits for it.
    #[serde(default)]
    pub role: LinkRole,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            peer: default_peer(),
            role: LinkRole::default(),
        }
    }
}

/// Connection role for one end of the link.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkRole {
    /// Dial the peer address. The original rig's behavior on both ends.
    #[default]
    Connect,
    /// Bind the address and accept a single peer, removing the need for
    /// an external relay between the two processes.
    Listen,
}

/// Robot-side dispatcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Reply with a `[kabuki]` acknowledgement after each sensor command.
    #[serde(default = "default_ack")]
    pub ack: bool,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self { ack: default_ack() }
    }
}

/// Tracing output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory receiving the rolling log files.
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    /// Stdout format.
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    /// Log file name prefix; the service name is used when unset.
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve the `/metrics` endpoint.
    #[serde(default)]
    pub enabled: bool,
    /// Exporter listen address.
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_rig() {
        let config = AppConfig::default();
        assert_eq!(config.link.peer, "127.0.0.1:8888".parse().unwrap());
        assert_eq!(config.link.role, LinkRole::Connect);
        assert!(config.robot.ack);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn toml_sections_override_defaults() {
        let config: AppConfig = r#"
            [link]
            peer = "10.0.0.10:8888"
            role = "listen"

            [robot]
            ack = false

            [metrics]
            enabled = true
            listen = "127.0.0.1:9100"
        "#
        .parse()
        .expect("valid config");
        assert_eq!(config.link.peer, "10.0.0.10:8888".parse().unwrap());
        assert_eq!(config.link.role, LinkRole::Listen);
        assert!(!config.robot.ack);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn connect_role_rejects_port_zero() {
        let result = r#"
            [link]
            peer = "127.0.0.1:0"
            role = "connect"
        "#
        .parse::<AppConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn listen_role_allows_ephemeral_port() {
        let config: AppConfig = r#"
            [link]
            peer = "127.0.0.1:0"
            role = "listen"
        "#
        .parse()
        .expect("ephemeral listen port is legal");
        assert_eq!(config.link.role, LinkRole::Listen);
    }

    #[test]
    fn load_reports_missing_candidates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        let err = AppConfig::load(&[missing]).expect_err("nothing to load");
        assert!(err.to_string().contains("no configuration files found"));
    }

    #[test]
    fn load_parses_the_first_existing_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("robotd.toml");
        fs::write(&path, "[link]\npeer = \"127.0.0.1:9000\"\n").expect("write config");
        let loaded =
            AppConfig::load_with_source(&[dir.path().join("absent.toml"), path.clone()])
                .expect("config loads");
        assert_eq!(loaded.source, path);
        assert_eq!(loaded.config.link.peer, "127.0.0.1:9000".parse().unwrap());
    }
}
