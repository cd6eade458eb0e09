//! Messenger configuration.

use core::time::Duration;

use crate::{DEFAULT_ACK_DELAY_MS, DEFAULT_ACK_TIMEOUT_MS};

/// Tuning knobs for a messenger instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// How long a send waits for the matching acknowledgment.
    pub ack_timeout: Duration,

    /// Turnaround pause before an inbound message is acknowledged.
    ///
    /// Gives a half-duplex radio time to switch back to receiving;
    /// lowering it below what the fleet expects breaks interop.
    pub ack_delay: Duration,
}

impl Config {
    /// Creates a configuration with the protocol defaults.
    pub const fn new() -> Self {
        Self {
            ack_timeout: Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS),
            ack_delay: Duration::from_millis(DEFAULT_ACK_DELAY_MS),
        }
    }

    /// Sets the acknowledgment timeout.
    pub const fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Sets the pre-acknowledgment turnaround delay.
    pub const fn with_ack_delay(mut self, delay: Duration) -> Self {
        self.ack_delay = delay;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
