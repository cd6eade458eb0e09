//! Frame definition and serialization for the messenger protocol.
//!
//! A frame is the unit exchanged over the link: either an application
//! message or the acknowledgment echoing a message's sequence number.
//! Both directions use the same fixed-size record so that one inbound
//! datagram always carries exactly one frame.
//!
//! # Wire Format
//!
//! ```text
//! 0               1               2               3
//! +---------------+---------------+---------------+---------------+
//! |     Kind      |  Origin Len   |         Payload Length        |
//! +---------------+---------------+---------------+---------------+
//! |                        Sequence Number                        |
//! +---------------+---------------+---------------+---------------+
//! |                 Origin (19 bytes, zero padded)                |
//! +---------------------------------------------------------------+
//! |                Payload (199 bytes, zero padded)               |
//! +---------------------------------------------------------------+
//! ```
//!
//! All integers are big-endian. The record is always
//! [`FRAME_WIRE_SIZE`] bytes long; the decoder rejects anything else
//! before interpreting a single field.

use heapless::String;

use crate::error::{Error, Result};
use crate::{MAX_ORIGIN_LEN, MAX_PAYLOAD_LEN};

/// Frame header size in bytes (kind, length fields, sequence).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Exact serialized frame size in bytes.
pub const FRAME_WIRE_SIZE: usize = FRAME_HEADER_SIZE + MAX_ORIGIN_LEN + MAX_PAYLOAD_LEN;

/// Advisory text carried by acknowledgment frames.
const ACK_NOTE: &str = "message received";

/// Frame kind indicating the purpose of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// Application message awaiting an acknowledgment.
    Message = 0x01,

    /// Acknowledgment echoing a message sequence.
    Ack = 0x02,
}

impl FrameKind {
    /// Converts a wire discriminator to a FrameKind.
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Message),
            0x02 => Some(Self::Ack),
            _ => None,
        }
    }
}

/// A frame in the messenger protocol.
///
/// Text fields are bounded: the origin name is display-only and capped
/// at [`MAX_ORIGIN_LEN`] bytes, the payload at [`MAX_PAYLOAD_LEN`]
/// bytes. On acknowledgments both fields are advisory; classification
/// uses only `kind` and `sequence`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame kind.
    pub kind: FrameKind,

    /// Sequence number: assigned by the sender on messages, echoed
    /// back on acknowledgments.
    pub sequence: u32,

    /// Display name of the sending station.
    pub origin: String<MAX_ORIGIN_LEN>,

    /// Application content.
    pub payload: String<MAX_PAYLOAD_LEN>,
}

impl Frame {
    /// Creates an application message frame.
    pub fn message(origin: &str, text: &str, sequence: u32) -> Result<Self> {
        Ok(Self {
            kind: FrameKind::Message,
            sequence,
            origin: bounded(origin).ok_or(Error::OriginTooLong)?,
            payload: bounded(text).ok_or(Error::PayloadTooLong)?,
        })
    }

    /// Creates an acknowledgment for the given message sequence.
    pub fn ack(origin: &str, sequence: u32) -> Result<Self> {
        Ok(Self {
            kind: FrameKind::Ack,
            sequence,
            origin: bounded(origin).ok_or(Error::OriginTooLong)?,
            payload: bounded(ACK_NOTE).ok_or(Error::PayloadTooLong)?,
        })
    }

    /// Returns true if this frame is an acknowledgment.
    pub fn is_ack(&self) -> bool {
        self.kind == FrameKind::Ack
    }

    /// Serializes the frame into the provided buffer.
    ///
    /// Returns the number of bytes written, always [`FRAME_WIRE_SIZE`].
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < FRAME_WIRE_SIZE {
            return Err(Error::BufferTooSmall);
        }

        let origin = self.origin.as_bytes();
        let payload = self.payload.as_bytes();

        buf[0] = self.kind as u8;
        buf[1] = origin.len() as u8;
        buf[2..4].copy_from_slice(&(payload.len() as u16).to_be_bytes());
        buf[4..8].copy_from_slice(&self.sequence.to_be_bytes());

        let payload_at = FRAME_HEADER_SIZE + MAX_ORIGIN_LEN;
        buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + origin.len()].copy_from_slice(origin);
        buf[FRAME_HEADER_SIZE + origin.len()..payload_at].fill(0);
        buf[payload_at..payload_at + payload.len()].copy_from_slice(payload);
        buf[payload_at + payload.len()..FRAME_WIRE_SIZE].fill(0);

        Ok(FRAME_WIRE_SIZE)
    }

    /// Deserializes a frame from the provided buffer.
    ///
    /// The input must be exactly one frame's worth of bytes; length is
    /// validated before any field is interpreted.
    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        if buf.len() != FRAME_WIRE_SIZE {
            return Err(Error::InvalidLength);
        }

        let kind = FrameKind::from_u8(buf[0]).ok_or(Error::InvalidKind)?;
        let origin_len = buf[1] as usize;
        if origin_len > MAX_ORIGIN_LEN {
            return Err(Error::OriginTooLong);
        }
        let payload_len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLong);
        }
        let sequence = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);

        let payload_at = FRAME_HEADER_SIZE + MAX_ORIGIN_LEN;
        let origin = core::str::from_utf8(&buf[FRAME_HEADER_SIZE..FRAME_HEADER_SIZE + origin_len])
            .map_err(|_| Error::InvalidUtf8)?;
        let payload = core::str::from_utf8(&buf[payload_at..payload_at + payload_len])
            .map_err(|_| Error::InvalidUtf8)?;

        Ok(Self {
            kind,
            sequence,
            origin: bounded(origin).ok_or(Error::OriginTooLong)?,
            payload: bounded(payload).ok_or(Error::PayloadTooLong)?,
        })
    }
}

fn bounded<const N: usize>(text: &str) -> Option<String<N>> {
    let mut out = String::new();
    out.push_str(text).ok()?;
    Some(out)
}
