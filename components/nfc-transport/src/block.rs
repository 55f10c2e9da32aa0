//! ISO 14443-4 block classification.
//!
//! Only the PCB patterns this device produces or accepts are modeled:
//! frames arrive without CID or NAD (the chip is configured for a single
//! logical channel), so the control byte is always frame position 0.

/// ISO 14443-3 short commands recognized at frame position 0.
pub const REQA: u8 = 0x26;
pub const WUPA: u8 = 0x52;
pub const HLTA: u8 = 0x50;
pub const RATS: u8 = 0xe0;

/// I-block PCB base; OR in the block number bit.
pub const IBLOCK: u8 = 0x02;
/// R(ACK) PCB base; OR in the block number bit.
pub const RBLOCK_ACK: u8 = 0xa2;
/// Chaining bit of an I-block PCB.
pub const CHAINING: u8 = 0x10;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Block {
    /// Protocol parameter negotiation; not required by this device profile.
    Ppss,
    I { chaining: bool, num: bool },
    R { nak: bool, num: bool },
    S { deselect: bool },
    Unknown,
}

impl Block {
    pub fn classify(pcb: u8) -> Block {
        if pcb & 0xf0 == 0xd0 {
            Block::Ppss
        } else if pcb & 0xc2 == 0x02 {
            Block::I {
                chaining: pcb & CHAINING != 0,
                num: pcb & 0x01 != 0,
            }
        } else if pcb & 0xe2 == 0xa2 {
            Block::R {
                nak: pcb & 0x10 != 0,
                num: pcb & 0x01 != 0,
            }
        } else if pcb & 0xc2 == 0xc2 {
            Block::S {
                // S(DESELECT) has bits 5..4 clear, S(WTX) has them set
                deselect: pcb & 0x30 == 0,
            }
        } else {
            Block::Unknown
        }
    }
}
