//! ---
//! kabuki_section: "04-robot-control"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Robot-side command dispatch and safety interlock."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
//! Robot-side command interpretation for Kabuki-Link.
//!
//! Inbound frames are demultiplexed by tag, gated through the arm/active
//! interlock, and forwarded to a [`MotionSink`] as velocity commands. The
//! interlock is instance state on the dispatcher so the whole pipeline is
//! testable without a socket.

pub mod dispatch;
pub mod interlock;
pub mod motion;

pub use dispatch::{CommandDispatcher, ACK_BODY};
pub use interlock::{ButtonOutcome, DriveInterlock, InterlockState};
pub use motion::{ConsoleMotion, MotionSink, RecordingMotion};
