//! Waiting-time extension.
//!
//! While an applet handler runs longer than the frame-wait time advertised
//! in the ATS, the reader's timer must be pushed back by S(WTX) exchanges.
//! The request is always the two bytes `F2 01` (S(WTX) without CID,
//! multiplier 1) and the reader acknowledges by echoing them.
//!
//! The controller is driven from a periodic time context via
//! [`tick`](Wtx::tick); each period it first sends a request, then on the
//! following tick collects the acknowledgement. [`stop`](Wtx::stop) collects
//! a still-outstanding acknowledgement before reporting whether the whole
//! exchange sequence stayed clean.

use crate::traits::nfc::{self, Transceiver};
use crate::traits::Clock;

/// Default tick cadence.
pub const WTX_PERIOD_MS: u32 = 300;

/// Receive budget when collecting an acknowledgement from the tick context.
const TICK_READ_TIMEOUT_MS: u32 = 10;
/// Receive budget for the final collection in [`Wtx::stop`].
const STOP_READ_TIMEOUT_MS: u32 = 100;

/// S(WTX), frame without CID, WTXM = 1.
pub const WTX_REQUEST: [u8; 2] = [0xf2, 0x01];

pub struct Wtx {
    /// A request is outstanding and unacknowledged.
    sent: bool,
    /// A prior exchange failed; sticky until [`clear`](Wtx::clear) or
    /// [`start`](Wtx::start). No further requests are sent while set.
    fail: bool,
    armed_at: Option<u32>,
    period_ms: u32,
}

impl Wtx {
    pub fn new() -> Self {
        Wtx {
            sent: false,
            fail: false,
            armed_at: None,
            period_ms: WTX_PERIOD_MS,
        }
    }

    pub fn clear(&mut self) {
        self.sent = false;
        self.fail = false;
        self.armed_at = None;
    }

    /// Arm the controller; call immediately before a potentially slow
    /// handler.
    pub fn start<C: Clock>(&mut self, clock: &C, period_ms: u32) {
        self.clear();
        self.period_ms = period_ms;
        self.armed_at = Some(clock.millis());
    }

    /// Disarm. Collects an outstanding acknowledgement first; returns
    /// `false` if that or any earlier exchange failed, in which case the
    /// caller must abandon the in-flight response.
    pub fn stop<T: Transceiver>(&mut self, device: &mut T) -> bool {
        self.armed_at = None;

        if self.sent {
            if !self.process(device, STOP_READ_TIMEOUT_MS) {
                info!("wtx stop: could not collect last ack");
                return false;
            }
        }

        if self.fail {
            info!("wtx stop: failed");
            return false;
        }

        self.clear();
        true
    }

    /// Periodic driver; a no-op unless armed and a full period has elapsed.
    pub fn tick<T: Transceiver, C: Clock>(&mut self, device: &mut T, clock: &C) {
        let armed_at = match self.armed_at {
            Some(t) => t,
            None => return,
        };
        let now = clock.millis();
        if now.wrapping_sub(armed_at) < self.period_ms {
            return;
        }

        self.process(device, TICK_READ_TIMEOUT_MS);
        self.armed_at = Some(now);
    }

    pub fn failed(&self) -> bool {
        self.fail
    }

    pub fn outstanding(&self) -> bool {
        self.sent
    }

    /// One half of an exchange: send the request, or verify the echo.
    fn process<T: Transceiver>(&mut self, device: &mut T, read_timeout_ms: u32) -> bool {
        if self.fail {
            return false;
        }

        if !self.sent {
            device.send(&WTX_REQUEST).ok();
            self.sent = true;
            return true;
        }

        let mut frame = [0u8; 32];
        let len = match device.receive(read_timeout_ms, &mut frame) {
            Ok(nfc::Rx::Frame(len)) => len,
            _ => {
                self.fail = true;
                return false;
            }
        };

        if len != 2 || frame[..2] != WTX_REQUEST {
            info!("bad wtx ack");
            self.fail = true;
            return false;
        }

        self.sent = false;
        true
    }
}

impl Default for Wtx {
    fn default() -> Self {
        Self::new()
    }
}
