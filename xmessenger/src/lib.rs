//! # XMessenger - Reliable Messaging Over Unreliable Links
//!
//! XMessenger is a `no_std` compatible request/acknowledgment messaging
//! primitive for connectionless, best-effort links. It provides:
//!
//! - **Confirmed delivery signaling**: every message waits for its
//!   acknowledgment with a bounded timeout
//! - **Single in-flight message**: one outstanding send per peer, no
//!   sliding window
//! - **Automatic acking**: every inbound message is acknowledged back
//!   to its originating station
//! - **Explicit wire format**: fixed-size, big-endian frame encoding
//!   with length validation at the receive boundary
//! - **Custom link support**: works over anything implementing the
//!   [`Link`] trait
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Application Layer                     │
//! │        send loop            delivery channel            │
//! ├─────────────────────────────────────────────────────────┤
//! │                   Messenger Layer                       │
//! │  ┌─────────────┐ ┌──────────────┐ ┌─────────────────┐  │
//! │  │ Sequencing  │ │  Ack Waiting │ │  Auto Acking    │  │
//! │  └─────────────┘ └──────────────┘ └─────────────────┘  │
//! ├─────────────────────────────────────────────────────────┤
//! │                    Frame Layer                          │
//! │        fixed-size encoding + length validation          │
//! ├─────────────────────────────────────────────────────────┤
//! │                     Link Layer                          │
//! │        Custom Link (UDP, radio, in-memory, ...)         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use xmessenger::{Config, Messenger, PeerAddress, UdpLink};
//!
//! let link = UdpLink::bind("127.0.0.1:0")?;
//! link.add_peer(partner, partner_socket_addr);
//!
//! let (messenger, deliveries) = Messenger::new(link, partner, "node-a", Config::default())?;
//!
//! // Send and wait for the acknowledgment
//! let outcome = messenger.send_message("Hello!")?;
//!
//! // Inbound messages arrive on the delivery channel
//! for delivery in deliveries {
//!     println!("{}: {}", delivery.origin, delivery.text);
//! }
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod error;
pub mod frame;
pub mod link;
#[cfg(feature = "std")]
pub mod messenger;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use frame::{Frame, FrameKind, FRAME_HEADER_SIZE, FRAME_WIRE_SIZE};
pub use link::{FailingLink, Link, PeerAddress};
#[cfg(feature = "std")]
pub use link::{MemoryLink, UdpLink};
#[cfg(feature = "std")]
pub use messenger::{Delivery, Messenger, SendOutcome};

/// Maximum origin (station name) length in bytes.
pub const MAX_ORIGIN_LEN: usize = 19;

/// Maximum message payload length in bytes.
pub const MAX_PAYLOAD_LEN: usize = 199;

/// Default acknowledgment timeout in milliseconds.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 5000;

/// Default pre-acknowledgment turnaround delay in milliseconds.
pub const DEFAULT_ACK_DELAY_MS: u64 = 100;
