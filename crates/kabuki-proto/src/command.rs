//! ---
//! kabuki_section: "02-messaging-transport"
//! kabuki_subsection: "module"
//! kabuki_type: "source"
//! kabuki_scope: "code"
//! kabuki_description: "Frame codec and command vocabulary."
//! kabuki_version: "v0.0.0-prealpha"
//! kabuki_owner: "tbd"
//! ---

/// Tag prefixed to commands originating from the sensor rig.
pub const KINECT_TAG: &str = "[kinect]";

/// Tag prefixed to robot-side acknowledgements and echoes.
pub const KABUKI_TAG: &str = "[kabuki]";

/// Linear velocity applied by every moving drive verb, in m/s.
pub const DRIVE_LINEAR: f64 = 0.25;

/// Angular velocity applied while turning, in rad/s.
pub const TURN_RATE: f64 = 0.75;

/// Velocity command published to the robot base.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Twist {
    /// Forward velocity along the base X axis.
    pub linear: f64,
    /// Rotation around the base Z axis; positive turns left.
    pub angular: f64,
}

/// Drive verbs understood by the robot-side dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveVerb {
    /// Drive straight ahead.
    Forward,
    /// Turn left while moving.
    Left,
    /// Turn right while moving.
    Right,
    /// Halt the base.
    Stop,
}

impl DriveVerb {
    /// Match a payload against the verb table.
    ///
    /// Prefix match, case-sensitive, checked in table order.
    pub fn parse(payload: &str) -> Option<Self> {
        if payload.starts_with("forward") {
            Some(Self::Forward)
        } else if payload.starts_with("left") {
            Some(Self::Left)
        } else if payload.starts_with("right") {
            Some(Self::Right)
        } else if payload.starts_with("stop") {
            Some(Self::Stop)
        } else {
            None
        }
    }

    /// Velocity command for this verb.
    pub fn twist(self) -> Twist {
        match self {
            Self::Forward => Twist {
                linear: DRIVE_LINEAR,
                angular: 0.0,
            },
            Self::Left => Twist {
                linear: DRIVE_LINEAR,
                angular: TURN_RATE,
            },
            Self::Right => Twist {
                linear: DRIVE_LINEAR,
                angular: -TURN_RATE,
            },
            Self::Stop => Twist::default(),
        }
    }

    /// Verb name for log lines.
    pub fn name(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Stop => "stop",
        }
    }
}

/// Classification of an inbound frame body by its leading tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// `[kinect]` command; carries the payload after the tag.
    Sensor(&'a str),
    /// `[kabuki]` acknowledgement or echo; carries the payload.
    Echo(&'a str),
    /// Unrecognized tag; carries the full body for logging.
    Unknown(&'a str),
}

/// Demultiplex a frame body by its bracketed tag prefix.
///
/// The payload is the remainder after the tag, with a single separating
/// space stripped when present. A bare tag with no payload classifies as
/// an empty payload rather than as malformed.
pub fn classify(body: &str) -> Inbound<'_> {
    if let Some(rest) = body.strip_prefix(KINECT_TAG) {
        Inbound::Sensor(strip_separator(rest))
    } else if let Some(rest) = body.strip_prefix(KABUKI_TAG) {
        Inbound::Echo(strip_separator(rest))
    } else {
        Inbound::Unknown(body)
    }
}

fn strip_separator(rest: &str) -> &str {
    rest.strip_prefix(' ').unwrap_or(rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verb_table_matches_by_prefix_in_order() {
        assert_eq!(DriveVerb::parse("forward"), Some(DriveVerb::Forward));
        assert_eq!(DriveVerb::parse("forward now"), Some(DriveVerb::Forward));
        assert_eq!(DriveVerb::parse("leftovers"), Some(DriveVerb::Left));
        assert_eq!(DriveVerb::parse("right"), Some(DriveVerb::Right));
        assert_eq!(DriveVerb::parse("stop"), Some(DriveVerb::Stop));
    }

    #[test]
    fn verb_table_is_case_sensitive_and_rejects_unknowns() {
        assert_eq!(DriveVerb::parse("Forward"), None);
        assert_eq!(DriveVerb::parse("jump"), None);
        assert_eq!(DriveVerb::parse(""), None);
    }

    #[test]
    fn twists_match_the_drive_table() {
        assert_eq!(
            DriveVerb::Forward.twist(),
            Twist {
                linear: 0.25,
                angular: 0.0
            }
        );
        assert_eq!(
            DriveVerb::Left.twist(),
            Twist {
                linear: 0.25,
                angular: 0.75
            }
        );
        assert_eq!(
            DriveVerb::Right.twist(),
            Twist {
                linear: 0.25,
                angular: -0.75
            }
        );
        assert_eq!(DriveVerb::Stop.twist(), Twist::default());
    }

    #[test]
    fn classify_demuxes_by_tag() {
        assert_eq!(classify("[kinect] left"), Inbound::Sensor("left"));
        assert_eq!(
            classify("[kabuki] kinect message received"),
            Inbound::Echo("kinect message received")
        );
        assert_eq!(classify("jump"), Inbound::Unknown("jump"));
        assert_eq!(classify("[other] left"), Inbound::Unknown("[other] left"));
    }

    #[test]
    fn bare_tag_yields_empty_payload() {
        assert_eq!(classify("[kinect]"), Inbound::Sensor(""));
        assert_eq!(classify("[kinect] "), Inbound::Sensor(""));
    }
}
