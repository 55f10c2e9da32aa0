use crate::dispatch::Applet;
use crate::CommandData;

/// Negotiated link parameters for one contactless session.
///
/// Reset on deselect and on field loss; RATS re-derives the frame size and
/// channel id but keeps the selected applet (activation alone does not
/// deselect).
#[derive(Clone, Debug, PartialEq)]
pub struct LinkState {
    /// 16, 24 or 32, from the RATS frame-size indicator.
    pub max_frame_size: u8,
    /// Logical channel id echoed from RATS; stored, otherwise unused.
    pub cid: u8,
    /// PICC block number; initialized to 1 at activation (14443-4 rule C).
    pub block_num: bool,
    pub selected: Applet,
}

impl LinkState {
    pub fn new() -> Self {
        LinkState {
            max_frame_size: 32,
            cid: 0,
            block_num: true,
            selected: Applet::None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

/// Would-overflow marker from [`ReassemblyBuffer::append`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Overflow;

/// Accumulates chained I-block payloads into one logical APDU.
///
/// An append either applies completely or not at all; a rejected append
/// also clears the buffer, since the chain it belonged to is unrecoverable.
#[derive(Default)]
pub struct ReassemblyBuffer {
    data: CommandData,
}

impl ReassemblyBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn append(&mut self, payload: &[u8]) -> Result<(), Overflow> {
        if self.data.extend_from_slice(payload).is_err() {
            self.clear();
            return Err(Overflow);
        }
        Ok(())
    }

    /// Hand out the accumulated APDU, leaving the buffer empty.
    pub fn take(&mut self) -> CommandData {
        core::mem::take(&mut self.data)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}
