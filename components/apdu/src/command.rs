use crate::instruction::Instruction;
use crate::status::Status;

/// Borrowed view of a short (one-byte-length) command APDU.
///
/// The contactless readers this device talks to encode commands with a
/// 4-byte header, an optional length byte and the payload:
///
/// ```text
/// CLA INS P1 P2 [Lc] [payload ...]
/// ```
///
/// `lc` doubles as the requested read length for READ BINARY, which is how
/// the reader-facing firmware has always treated it. Extended (three-byte)
/// length encoding is not used on this link.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Apdu<'a> {
    pub cla: u8,
    pub ins: Instruction,
    pub p1: u8,
    pub p2: u8,
    lc: u8,
    raw: &'a [u8],
}

impl<'a> Apdu<'a> {
    pub fn parse(raw: &'a [u8]) -> Result<Apdu<'a>, Status> {
        if raw.len() < 4 {
            return Err(Status::UnspecifiedCheckingError);
        }

        let lc = if raw.len() > 4 { raw[4] } else { 0 };

        Ok(Apdu {
            cla: raw[0],
            ins: Instruction::from(raw[1]),
            p1: raw[2],
            p2: raw[3],
            lc,
            raw,
        })
    }

    /// Declared payload length (Lc), which the payload on the wire may
    /// fall short of; see [`data`](Self::data).
    pub fn lc(&self) -> usize {
        self.lc as usize
    }

    /// Payload bytes, clamped to the declared length and to what actually
    /// arrived.
    pub fn data(&self) -> &'a [u8] {
        if self.raw.len() <= 5 {
            return &[];
        }
        let available = self.raw.len() - 5;
        let take = core::cmp::min(self.lc as usize, available);
        &self.raw[5..5 + take]
    }

    /// Number of payload bytes actually present after the header.
    pub fn data_available(&self) -> usize {
        self.raw.len().saturating_sub(5)
    }

    /// The complete APDU as received, for handing to an opaque processor.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}
