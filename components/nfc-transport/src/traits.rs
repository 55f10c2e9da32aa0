use crate::ResponseData;

pub mod nfc {
    /// What a successful read delivered.
    #[derive(Copy, Clone, Debug, PartialEq)]
    pub enum Rx {
        /// The field was (re)entered since the last read; session state is stale.
        NewSession(usize),
        Frame(usize),
    }

    #[derive(Copy, Clone, Debug, PartialEq)]
    pub enum Error {
        NoActivity,
        NewSession,
        /// Data does not fit the chip's frame buffer.
        Overrun,
    }

    /// One contactless frame in, one out. Implemented by the radio-chip
    /// driver; frames are at most 32 bytes on this hardware.
    pub trait Transceiver {
        fn send(&mut self, frame: &[u8]) -> Result<(), Error>;

        /// Poll for a frame for up to `timeout_ms`, copying it into `frame`.
        fn receive(&mut self, timeout_ms: u32, frame: &mut [u8]) -> Result<Rx, Error>;

        /// Block until the last queued frame left the antenna, or `timeout_ms`
        /// elapsed. Returns whether transmission completed.
        fn wait_for_tx(&mut self, timeout_ms: u32) -> bool;

        /// Put the chip into its low-power halt state.
        fn sleep(&mut self);
    }
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn millis(&self) -> u32;
}

/// The opaque U2F/CTAP command processor.
///
/// Both calls may take longer than the reader's frame-wait time; the engine
/// brackets them with waiting-time extensions.
pub trait Processor {
    /// Process a raw U2F APDU (register/authenticate). `reply` receives the
    /// complete response, trailing status word included.
    fn u2f_request(&mut self, apdu: &[u8], reply: &mut ResponseData);

    /// Process an NFCCTAP_MSG payload. Returns the CTAP status byte;
    /// `reply` receives at most [`COMMAND_CAPACITY`](crate::COMMAND_CAPACITY)
    /// bytes of CBOR on success.
    fn ctap_request(&mut self, request: &[u8], reply: &mut ResponseData) -> u8;
}
