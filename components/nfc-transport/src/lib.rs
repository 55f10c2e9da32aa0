#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate delog;
generate_macros!();

pub mod block;
pub mod dispatch;
pub mod ndef;
pub mod state;
pub mod traits;
pub mod transport;
pub mod wtx;

pub use dispatch::Applet;
pub use transport::Transport;

/// Largest APDU accepted after chained reassembly.
pub const COMMAND_CAPACITY: usize = 1024;

/// Room for a CTAP status byte, a full payload, and the trailing status word.
pub const RESPONSE_CAPACITY: usize = COMMAND_CAPACITY + 3;

pub type CommandData = heapless::Vec<u8, COMMAND_CAPACITY>;
pub type ResponseData = heapless::Vec<u8, RESPONSE_CAPACITY>;
