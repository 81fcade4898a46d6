//! ---
//! kabuki_section: "01-core-functionality"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Shared configuration and logging primitives."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
//! Shared primitives for the Kabuki-Link binaries.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by both the robot daemon and the sensor console.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, LinkConfig, LinkRole, LoadedAppConfig, LoggingConfig, MetricsConfig, RobotConfig,
};
pub use logging::{init_tracing, LogFormat};
