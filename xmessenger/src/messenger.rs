//! The reliable messenger state machine.
//!
//! A [`Messenger`] owns one peer relationship: it assigns sequence
//! numbers to outbound messages, waits for the matching acknowledgment
//! with a bounded timeout, and acknowledges every inbound message. The
//! design keeps at most one message in flight; a send cycle must
//! resolve before the next one starts.
//!
//! The send loop and the receive path run on different threads. Session
//! state lives behind a mutex and the ack handshake is a single-slot
//! signal on a condvar: the receive path fills the slot, the waiting
//! sender drains it. The slot is not a queue, so acknowledgments
//! arriving while nobody waits are discarded.

use std::sync::{mpsc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use heapless::String;
use log::{debug, trace, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{Frame, FRAME_WIRE_SIZE};
use crate::link::{Link, PeerAddress};
use crate::{MAX_ORIGIN_LEN, MAX_PAYLOAD_LEN};

/// Outcome of one send cycle.
///
/// All three outcomes are recoverable; the caller decides whether to
/// compose a resend or move on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The peer acknowledged the message within the timeout window.
    Acknowledged,

    /// No matching acknowledgment arrived within the timeout window.
    ///
    /// This is a normal outcome, not a transport failure: it only says
    /// delivery was never confirmed.
    TimedOut,

    /// The link rejected the transmit attempt; no wait was started.
    SendFailed,
}

/// An inbound application message handed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Station address the frame arrived from.
    pub peer: PeerAddress,

    /// Display name of the sending station.
    pub origin: String<MAX_ORIGIN_LEN>,

    /// Message text.
    pub text: String<MAX_PAYLOAD_LEN>,

    /// Sequence number assigned by the sender.
    pub sequence: u32,
}

/// Session state shared between the send loop and the receive path.
struct Session {
    /// Next sequence number to assign to an outgoing message.
    next_sequence: u32,

    /// Sequence currently awaiting acknowledgment, if any.
    pending_ack: Option<u32>,

    /// Single-slot ack signal; set by the receive path, drained by the
    /// waiting sender.
    ack_ready: bool,
}

/// Reliable request/acknowledgment messenger over an unreliable link.
///
/// # Example
///
/// ```rust,ignore
/// use xmessenger::{Config, Messenger, PeerAddress, SendOutcome, UdpLink};
///
/// let link = UdpLink::bind("127.0.0.1:0")?;
/// let (messenger, deliveries) = Messenger::new(link, partner, "node-a", Config::default())?;
///
/// match messenger.send_message("hello")? {
///     SendOutcome::Acknowledged => println!("delivered"),
///     SendOutcome::TimedOut => println!("no confirmation"),
///     SendOutcome::SendFailed => println!("link rejected the frame"),
/// }
/// ```
pub struct Messenger<L: Link> {
    /// Transmit side of the underlying link.
    link: L,

    /// The fixed peer this messenger talks to.
    peer: PeerAddress,

    /// Local station name stamped on outgoing frames.
    origin: String<MAX_ORIGIN_LEN>,

    /// Timing configuration.
    config: Config,

    /// Shared session state.
    session: Mutex<Session>,

    /// Wakes the sender on a matching ack, and idle waiters on cycle end.
    ack_signal: Condvar,

    /// Application-delivery channel for inbound messages.
    deliveries: mpsc::Sender<Delivery>,
}

impl<L: Link> Messenger<L> {
    /// Creates a messenger for one peer relationship.
    ///
    /// Returns the messenger together with the receiving end of the
    /// delivery channel; inbound application messages show up there.
    pub fn new(
        link: L,
        peer: PeerAddress,
        origin: &str,
        config: Config,
    ) -> Result<(Self, mpsc::Receiver<Delivery>)> {
        let mut name = String::new();
        name.push_str(origin).map_err(|_| Error::OriginTooLong)?;

        let (tx, rx) = mpsc::channel();
        let messenger = Self {
            link,
            peer,
            origin: name,
            config,
            session: Mutex::new(Session {
                next_sequence: 1,
                pending_ack: None,
                ack_ready: false,
            }),
            ack_signal: Condvar::new(),
            deliveries: tx,
        };
        Ok((messenger, rx))
    }

    /// Returns the peer this messenger talks to.
    pub fn peer(&self) -> PeerAddress {
        self.peer
    }

    /// Returns the local station name.
    pub fn origin(&self) -> &str {
        self.origin.as_str()
    }

    /// Returns the timing configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends one application message and waits for its acknowledgment.
    ///
    /// Blocks while a previous send is still unresolved, then assigns
    /// the next sequence number and transmits. If the link rejects the
    /// frame the outcome is [`SendOutcome::SendFailed`] and no timer is
    /// started. Otherwise the call suspends until the matching ack
    /// arrives ([`SendOutcome::Acknowledged`]) or the timeout window
    /// closes ([`SendOutcome::TimedOut`]).
    ///
    /// A timeout does not resend; whether to retry is the caller's
    /// decision, and a retry gets a fresh sequence number.
    ///
    /// Errors are reserved for invalid input: text over
    /// [`MAX_PAYLOAD_LEN`] bytes.
    pub fn send_message(&self, text: &str) -> Result<SendOutcome> {
        let mut session = self.lock_session();
        while session.pending_ack.is_some() || session.ack_ready {
            session = self
                .ack_signal
                .wait(session)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let sequence = session.next_sequence;
        let frame = Frame::message(self.origin.as_str(), text, sequence)?;
        let mut buf = [0u8; FRAME_WIRE_SIZE];
        let size = frame.serialize(&mut buf)?;

        session.next_sequence = sequence.wrapping_add(1);

        trace!("transmitting message #{sequence} ({size} bytes)");
        if self.link.send(&self.peer, &buf[..size]).is_err() {
            debug!("link rejected message #{sequence}");
            return Ok(SendOutcome::SendFailed);
        }

        session.pending_ack = Some(sequence);
        session.ack_ready = false;

        let deadline = Instant::now() + self.config.ack_timeout;
        let outcome = loop {
            if session.ack_ready {
                session.ack_ready = false;
                break SendOutcome::Acknowledged;
            }
            let now = Instant::now();
            if now >= deadline {
                break SendOutcome::TimedOut;
            }
            let (guard, _) = self
                .ack_signal
                .wait_timeout(session, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            session = guard;
        };

        session.pending_ack = None;
        drop(session);
        // wake senders blocked on the idle precondition
        self.ack_signal.notify_all();

        debug!("message #{sequence} resolved: {outcome:?}");
        Ok(outcome)
    }

    /// Entry point for inbound frames.
    ///
    /// This is the deserialization boundary: input that is not exactly
    /// one well-formed frame is dropped here with a warning and never
    /// touches the session. Acknowledgments matching the pending
    /// sequence wake the sender; stray, late or duplicate acks are
    /// discarded silently. Application messages are delivered and then
    /// acknowledged back to the originating station, independent of any
    /// locally pending send.
    pub fn on_frame_received(&self, from: PeerAddress, bytes: &[u8]) {
        let frame = match Frame::deserialize(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("dropping malformed frame from {from}: {err}");
                return;
            }
        };

        if frame.is_ack() {
            self.handle_ack(&frame);
        } else {
            self.handle_message(from, frame);
        }
    }

    fn handle_ack(&self, frame: &Frame) {
        let mut session = self.lock_session();
        match session.pending_ack {
            Some(awaited) if awaited == frame.sequence => {
                session.pending_ack = None;
                session.ack_ready = true;
                drop(session);
                self.ack_signal.notify_all();
                trace!("ack #{} matched the pending send", frame.sequence);
            }
            _ => {
                trace!("discarding unmatched ack #{}", frame.sequence);
            }
        }
    }

    fn handle_message(&self, from: PeerAddress, frame: Frame) {
        debug!("message #{} from {} ({})", frame.sequence, frame.origin, from);

        // no dedup: a duplicate is delivered and acked again
        let delivery = Delivery {
            peer: from,
            origin: frame.origin,
            text: frame.payload,
            sequence: frame.sequence,
        };
        let sequence = delivery.sequence;
        if self.deliveries.send(delivery).is_err() {
            trace!("delivery receiver dropped, message #{sequence} unconsumed");
        }

        // half-duplex turnaround guard before the ack goes out
        thread::sleep(self.config.ack_delay);

        // origin was validated in new(), ack construction cannot fail
        let Ok(ack) = Frame::ack(self.origin.as_str(), sequence) else {
            return;
        };
        let mut buf = [0u8; FRAME_WIRE_SIZE];
        match ack.serialize(&mut buf) {
            Ok(size) => {
                if let Err(err) = self.link.send(&from, &buf[..size]) {
                    warn!("ack #{sequence} not transmitted: {err}");
                }
            }
            Err(err) => warn!("ack #{sequence} not encoded: {err}"),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{FailingLink, MemoryLink};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use std::vec::Vec;

    const PARTNER: PeerAddress = PeerAddress::new([0x94, 0xB5, 0x55, 0xF8, 0x4B, 0xD8]);

    fn fast_config() -> Config {
        Config::new()
            .with_ack_timeout(Duration::from_millis(150))
            .with_ack_delay(Duration::from_millis(1))
    }

    fn encode(frame: &Frame) -> Vec<u8> {
        let mut buf = [0u8; FRAME_WIRE_SIZE];
        let size = frame.serialize(&mut buf).unwrap();
        buf[..size].to_vec()
    }

    #[test]
    fn test_sequences_advance_across_timeouts() {
        let link = MemoryLink::new();
        let (messenger, _rx) =
            Messenger::new(link.clone(), PARTNER, "unit", fast_config()).unwrap();

        assert_eq!(messenger.send_message("first").unwrap(), SendOutcome::TimedOut);
        assert_eq!(messenger.send_message("second").unwrap(), SendOutcome::TimedOut);

        let sent = link.take_sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(Frame::deserialize(&sent[0].1).unwrap().sequence, 1);
        assert_eq!(Frame::deserialize(&sent[1].1).unwrap().sequence, 2);
    }

    #[test]
    fn test_matching_ack_completes_the_wait() {
        let config = Config::new()
            .with_ack_timeout(Duration::from_secs(5))
            .with_ack_delay(Duration::from_millis(1));
        let (messenger, _rx) =
            Messenger::new(MemoryLink::new(), PARTNER, "unit", config).unwrap();
        let messenger = Arc::new(messenger);

        let acker = Arc::clone(&messenger);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            acker.on_frame_received(PARTNER, &encode(&Frame::ack("partner", 1).unwrap()));
        });

        let started = Instant::now();
        assert_eq!(
            messenger.send_message("hello").unwrap(),
            SendOutcome::Acknowledged
        );
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_mismatched_ack_does_not_complete_the_wait() {
        let (messenger, _rx) =
            Messenger::new(MemoryLink::new(), PARTNER, "unit", fast_config()).unwrap();
        let messenger = Arc::new(messenger);

        let acker = Arc::clone(&messenger);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            acker.on_frame_received(PARTNER, &encode(&Frame::ack("partner", 42).unwrap()));
        });

        assert_eq!(messenger.send_message("hello").unwrap(), SendOutcome::TimedOut);
        handle.join().unwrap();
    }

    #[test]
    fn test_stray_ack_while_idle_is_discarded() {
        let link = MemoryLink::new();
        let (messenger, _rx) =
            Messenger::new(link.clone(), PARTNER, "unit", fast_config()).unwrap();

        messenger.on_frame_received(PARTNER, &encode(&Frame::ack("partner", 9).unwrap()));

        // the stray ack must not satisfy the next send
        assert_eq!(messenger.send_message("next").unwrap(), SendOutcome::TimedOut);
        assert_eq!(Frame::deserialize(&link.take_sent()[0].1).unwrap().sequence, 1);
    }

    #[test]
    fn test_inbound_message_is_delivered_and_acked() {
        let link = MemoryLink::new();
        let (messenger, rx) =
            Messenger::new(link.clone(), PARTNER, "unit", fast_config()).unwrap();

        let inbound = Frame::message("remote", "ping", 3).unwrap();
        messenger.on_frame_received(PARTNER, &encode(&inbound));

        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.peer, PARTNER);
        assert_eq!(delivery.origin.as_str(), "remote");
        assert_eq!(delivery.text.as_str(), "ping");
        assert_eq!(delivery.sequence, 3);

        let sent = link.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, PARTNER);
        let ack = Frame::deserialize(&sent[0].1).unwrap();
        assert!(ack.is_ack());
        assert_eq!(ack.sequence, 3);
        assert_eq!(ack.origin.as_str(), "unit");
    }

    #[test]
    fn test_duplicate_inbound_message_is_delivered_and_acked_twice() {
        let link = MemoryLink::new();
        let (messenger, rx) =
            Messenger::new(link.clone(), PARTNER, "unit", fast_config()).unwrap();

        let inbound = encode(&Frame::message("remote", "again", 3).unwrap());
        messenger.on_frame_received(PARTNER, &inbound);
        messenger.on_frame_received(PARTNER, &inbound);

        assert_eq!(rx.try_recv().unwrap().sequence, 3);
        assert_eq!(rx.try_recv().unwrap().sequence, 3);

        let sent = link.take_sent();
        assert_eq!(sent.len(), 2);
        for (_, bytes) in &sent {
            assert_eq!(Frame::deserialize(bytes).unwrap().sequence, 3);
        }
    }

    #[test]
    fn test_inbound_message_is_acked_while_awaiting_ack() {
        let link = MemoryLink::new();
        let (messenger, rx) =
            Messenger::new(link.clone(), PARTNER, "unit", fast_config()).unwrap();
        let messenger = Arc::new(messenger);

        // deliver an application message while the sender is mid-wait
        let receiver = Arc::clone(&messenger);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            receiver.on_frame_received(PARTNER, &encode(&Frame::message("remote", "hi", 8).unwrap()));
        });

        assert_eq!(messenger.send_message("out").unwrap(), SendOutcome::TimedOut);
        handle.join().unwrap();

        assert_eq!(rx.try_recv().unwrap().sequence, 8);
        let sent = link.take_sent();
        assert_eq!(sent.len(), 2);
        let ack = Frame::deserialize(&sent[1].1).unwrap();
        assert!(ack.is_ack());
        assert_eq!(ack.sequence, 8);
    }

    #[test]
    fn test_rejected_transmit_reports_send_failed_immediately() {
        let config = Config::new().with_ack_timeout(Duration::from_secs(5));
        let (messenger, _rx) = Messenger::new(FailingLink::new(), PARTNER, "unit", config).unwrap();

        let started = Instant::now();
        assert_eq!(
            messenger.send_message("hello").unwrap(),
            SendOutcome::SendFailed
        );
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn test_send_failure_still_consumes_a_sequence() {
        struct FailOnce {
            tripped: AtomicBool,
            rest: MemoryLink,
        }

        impl Link for FailOnce {
            fn send(&self, peer: &PeerAddress, frame: &[u8]) -> Result<()> {
                if !self.tripped.swap(true, Ordering::SeqCst) {
                    return Err(Error::LinkFailure);
                }
                self.rest.send(peer, frame)
            }
        }

        let rest = MemoryLink::new();
        let link = FailOnce {
            tripped: AtomicBool::new(false),
            rest: rest.clone(),
        };
        let (messenger, _rx) = Messenger::new(link, PARTNER, "unit", fast_config()).unwrap();

        assert_eq!(messenger.send_message("a").unwrap(), SendOutcome::SendFailed);
        assert_eq!(messenger.send_message("b").unwrap(), SendOutcome::TimedOut);

        // the lost frame consumed sequence 1
        let sent = rest.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(Frame::deserialize(&sent[0].1).unwrap().sequence, 2);
    }

    #[test]
    fn test_malformed_frames_never_reach_the_session() {
        let link = MemoryLink::new();
        let (messenger, rx) =
            Messenger::new(link.clone(), PARTNER, "unit", fast_config()).unwrap();

        messenger.on_frame_received(PARTNER, &[0u8; 3]);
        messenger.on_frame_received(PARTNER, &[0xFFu8; FRAME_WIRE_SIZE]);

        assert!(rx.try_recv().is_err());
        assert_eq!(link.sent_count(), 0);
    }

    #[test]
    fn test_oversized_origin_name_is_rejected() {
        let origin_bytes = [b'x'; MAX_ORIGIN_LEN + 1];
        let origin = core::str::from_utf8(&origin_bytes).unwrap();
        let result = Messenger::new(MemoryLink::new(), PARTNER, origin, Config::default());
        assert!(matches!(result, Err(Error::OriginTooLong)));
    }

    #[test]
    fn test_oversized_payload_is_an_error_not_an_outcome() {
        let link = MemoryLink::new();
        let (messenger, _rx) =
            Messenger::new(link.clone(), PARTNER, "unit", fast_config()).unwrap();

        let payload_bytes = [b'y'; MAX_PAYLOAD_LEN + 1];
        let payload = core::str::from_utf8(&payload_bytes).unwrap();
        assert_eq!(messenger.send_message(payload), Err(Error::PayloadTooLong));

        // nothing was transmitted and the sequence was not consumed
        assert_eq!(link.sent_count(), 0);
        assert_eq!(messenger.send_message("ok").unwrap(), SendOutcome::TimedOut);
        assert_eq!(Frame::deserialize(&link.take_sent()[0].1).unwrap().sequence, 1);
    }
}
