//! ---
//! kabuki_section: "02-messaging-transport"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Frame codec and command vocabulary."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---
//! Wire protocol primitives for the Kabuki-Link workspace.
//!
//! Both peers exchange length-prefixed frames whose bodies carry textual
//! commands tagged with the originating side (`[kinect]` or `[kabuki]`).
//! This crate owns the byte-level codec and the command vocabulary; it has
//! no I/O of its own.
#![warn(missing_docs)]

pub mod command;
pub mod frame;

/// Shared result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Body exceeds [`frame::MAX_BODY_LEN`]. Oversized bodies are rejected
    /// rather than truncated; callers must shorten the payload themselves.
    #[error("frame body of {length} bytes exceeds the {max} byte maximum", max = frame::MAX_BODY_LEN)]
    BodyTooLarge {
        /// Offending body length in bytes.
        length: usize,
    },
    /// Header bytes did not parse as a decimal body length.
    #[error("frame header {header:?} is not a decimal length")]
    MalformedHeader {
        /// Raw header bytes as received.
        header: [u8; frame::HEADER_LEN],
    },
    /// Header parsed but declares a body larger than [`frame::MAX_BODY_LEN`].
    #[error("frame header declares {length} bytes, above the {max} byte maximum", max = frame::MAX_BODY_LEN)]
    HeaderOutOfRange {
        /// Declared body length.
        length: usize,
    },
    /// Body is not valid UTF-8; command bodies are textual by convention.
    #[error("frame body is not valid utf-8: {0}")]
    BodyNotText(#[from] std::str::Utf8Error),
}

pub use command::{
    classify, DriveVerb, Inbound, Twist, DRIVE_LINEAR, KABUKI_TAG, KINECT_TAG, TURN_RATE,
};
pub use frame::{decode_header, encode_header, Frame, HEADER_LEN, MAX_BODY_LEN};
