//! Link layer abstraction.
//!
//! The messenger depends on exactly this surface: a best-effort,
//! connectionless `send` toward a station address, plus someone feeding
//! inbound frames into [`Messenger::on_frame_received`]. Nothing here
//! guarantees delivery; that is the messenger's job.
//!
//! # Implementations
//!
//! - [`UdpLink`]: datagram link over a UDP socket with an explicit peer
//!   table (requires the `std` feature)
//! - [`MemoryLink`]: records transmitted frames for inspection (requires
//!   the `std` feature)
//! - [`FailingLink`]: rejects every transmit
//!
//! [`Messenger::on_frame_received`]: crate::messenger::Messenger::on_frame_received

use core::fmt;

use crate::error::{Error, Result};

/// A 6-byte link-layer station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress([u8; 6]);

impl PeerAddress {
    /// Creates a station address from its raw octets.
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Returns the raw octets.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Best-effort frame transmission toward a known station.
///
/// A link is shared between the send loop and the receive path, so
/// implementations synchronize internally and `send` takes `&self`.
pub trait Link: Send + Sync {
    /// Attempts one unacknowledged, connectionless transmission.
    ///
    /// `Ok(())` means the link accepted the frame, not that the peer
    /// received it.
    fn send(&self, peer: &PeerAddress, frame: &[u8]) -> Result<()>;
}

/// A link that rejects every transmit.
///
/// Useful for exercising the send-failure path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingLink;

impl FailingLink {
    /// Creates a new failing link.
    pub const fn new() -> Self {
        Self
    }
}

impl Link for FailingLink {
    fn send(&self, _peer: &PeerAddress, _frame: &[u8]) -> Result<()> {
        Err(Error::LinkFailure)
    }
}

/// A link that records every transmitted frame.
///
/// Frames are captured instead of delivered anywhere; tests pop them
/// with [`MemoryLink::take_sent`]. Clones share the same capture queue.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct MemoryLink {
    sent: std::sync::Arc<std::sync::Mutex<std::vec::Vec<(PeerAddress, std::vec::Vec<u8>)>>>,
}

#[cfg(feature = "std")]
impl MemoryLink {
    /// Creates a new recording link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of frames transmitted so far.
    pub fn sent_count(&self) -> usize {
        self.queue().len()
    }

    /// Drains and returns the captured frames in transmit order.
    pub fn take_sent(&self) -> std::vec::Vec<(PeerAddress, std::vec::Vec<u8>)> {
        core::mem::take(&mut *self.queue())
    }

    fn queue(
        &self,
    ) -> std::sync::MutexGuard<'_, std::vec::Vec<(PeerAddress, std::vec::Vec<u8>)>> {
        self.sent
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(feature = "std")]
impl Link for MemoryLink {
    fn send(&self, peer: &PeerAddress, frame: &[u8]) -> Result<()> {
        self.queue().push((*peer, frame.to_vec()));
        Ok(())
    }
}

/// A datagram link over a UDP socket.
///
/// Stations are registered up front with [`UdpLink::add_peer`], mapping
/// a [`PeerAddress`] to the socket address it lives behind; inbound
/// datagrams are attributed by reverse lookup and datagrams from
/// unregistered sources are dropped. One datagram carries one frame.
///
/// The link is cheaply cloneable: one handle goes to the messenger for
/// transmitting, another drives the receive pump.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct UdpLink {
    inner: std::sync::Arc<UdpLinkInner>,
}

#[cfg(feature = "std")]
#[derive(Debug)]
struct UdpLinkInner {
    socket: std::net::UdpSocket,
    peers: std::sync::Mutex<PeerTable>,
}

#[cfg(feature = "std")]
#[derive(Debug, Default)]
struct PeerTable {
    by_station: std::collections::HashMap<PeerAddress, std::net::SocketAddr>,
    by_socket: std::collections::HashMap<std::net::SocketAddr, PeerAddress>,
}

#[cfg(feature = "std")]
impl UdpLink {
    /// Binds a UDP socket for the link.
    pub fn bind<A: std::net::ToSocketAddrs>(addr: A) -> std::io::Result<Self> {
        let socket = std::net::UdpSocket::bind(addr)?;
        Ok(Self {
            inner: std::sync::Arc::new(UdpLinkInner {
                socket,
                peers: std::sync::Mutex::new(PeerTable::default()),
            }),
        })
    }

    /// Returns the local socket address the link is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.inner.socket.local_addr()
    }

    /// Registers a station and the socket address it lives behind.
    pub fn add_peer(&self, station: PeerAddress, addr: std::net::SocketAddr) {
        let mut table = self.peers();
        table.by_station.insert(station, addr);
        table.by_socket.insert(addr, station);
    }

    /// Blocks until one frame arrives from a registered station.
    ///
    /// Datagrams from unregistered sources are logged and skipped.
    pub fn recv_frame(&self) -> std::io::Result<(PeerAddress, std::vec::Vec<u8>)> {
        let mut buf = [0u8; 512];
        loop {
            let (len, source) = self.inner.socket.recv_from(&mut buf)?;
            let station = self.peers().by_socket.get(&source).copied();
            match station {
                Some(station) => return Ok((station, buf[..len].to_vec())),
                None => log::warn!("dropping datagram from unregistered source {source}"),
            }
        }
    }

    fn peers(&self) -> std::sync::MutexGuard<'_, PeerTable> {
        self.inner
            .peers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(feature = "std")]
impl Link for UdpLink {
    fn send(&self, peer: &PeerAddress, frame: &[u8]) -> Result<()> {
        let target = self
            .peers()
            .by_station
            .get(peer)
            .copied()
            .ok_or(Error::UnknownPeer)?;

        match self.inner.socket.send_to(frame, target) {
            Ok(sent) if sent == frame.len() => Ok(()),
            Ok(_) => Err(Error::LinkFailure),
            Err(err) => {
                log::warn!("udp transmit to {peer} failed: {err}");
                Err(Error::LinkFailure)
            }
        }
    }
}
