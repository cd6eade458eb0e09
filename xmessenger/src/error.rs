//! Error type shared across the crate.

use core::fmt;

/// Errors reported by the codec, the link boundary and the messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The serialization buffer is too small for a full frame.
    BufferTooSmall,

    /// Inbound bytes do not have the exact wire size of one frame.
    InvalidLength,

    /// Unknown frame kind discriminator.
    InvalidKind,

    /// Origin name exceeds the wire cap.
    OriginTooLong,

    /// Payload text exceeds the wire cap.
    PayloadTooLong,

    /// Text field is not valid UTF-8.
    InvalidUtf8,

    /// The peer is not registered with the link.
    UnknownPeer,

    /// The link rejected or failed the transmit attempt.
    LinkFailure,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => write!(f, "buffer too small for frame"),
            Self::InvalidLength => write!(f, "frame length mismatch"),
            Self::InvalidKind => write!(f, "unknown frame kind"),
            Self::OriginTooLong => write!(f, "origin name too long"),
            Self::PayloadTooLong => write!(f, "payload too long"),
            Self::InvalidUtf8 => write!(f, "text field is not valid UTF-8"),
            Self::UnknownPeer => write!(f, "peer not registered with the link"),
            Self::LinkFailure => write!(f, "link transmit failure"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, Error>;
