//! ---
//! kabuki_section: "04-robot-control"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Robot-side command dispatch and safety interlock."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
use std::sync::{Arc, Mutex};

use anyhow::Result;
use kabuki_proto::Twist;
use tracing::info;

/// Boundary to the robot-actuation subsystem.
///
/// Implementations publish a velocity command and report success or
/// failure; the dispatcher treats a failure as a rejected command and
/// leaves the interlock unchanged.
pub trait MotionSink: Send {
    /// Publish one velocity command.
    fn publish(&mut self, twist: Twist) -> Result<()>;
}

/// Production sink that traces each velocity command.
///
/// Stands in for the robot base's `cmd_vel` publisher, which lives
/// outside this repository.
#[derive(Debug, Default)]
pub struct ConsoleMotion;

impl MotionSink for ConsoleMotion {
    fn publish(&mut self, twist: Twist) -> Result<()> {
        info!(linear = twist.linear, angular = twist.angular, "cmd_vel published");
        Ok(())
    }
}

/// Test sink recording every published command.
#[derive(Debug, Clone, Default)]
pub struct RecordingMotion {
    published: Arc<Mutex<Vec<Twist>>>,
}

impl RecordingMotion {
    /// Fresh recorder with an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the published commands so far.
    pub fn published(&self) -> Vec<Twist> {
        self.published.lock().expect("motion history poisoned").clone()
    }
}

impl MotionSink for RecordingMotion {
    fn publish(&mut self, twist: Twist) -> Result<()> {
        self.published
            .lock()
            .expect("motion history poisoned")
            .push(twist);
        Ok(())
    }
}
