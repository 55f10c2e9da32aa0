//! The ISO 14443-4 block protocol engine.
//!
//! One [`Transport`] instance owns all session state (spec'd in
//! [`LinkState`], [`ReassemblyBuffer`], [`Wtx`]) plus the transceiver,
//! clock and command processor it talks through. The embedding firmware
//! calls [`poll`](Transport::poll) from its main loop and
//! [`wtx_tick`](Transport::wtx_tick) from a periodic time context; the two
//! must be serialized against each other (deferring ticks to between loop
//! iterations is sufficient).

use apdu::Status;

use crate::block::{self, Block};
use crate::state::{LinkState, ReassemblyBuffer};
use crate::traits::nfc::{self, Transceiver};
use crate::traits::{Clock, Processor};
use crate::wtx::Wtx;

/// Physical frame ceiling; the chip buffer is 32 bytes regardless of the
/// FSDI the reader announces.
pub const MAX_FRAME: usize = 32;

/// Payload per chained I-block: one of the 32 bytes is the PCB.
pub(crate) const CHAIN_SEGMENT: usize = MAX_FRAME - 1;

/// How long the reader gets to acknowledge a chained I-block.
pub(crate) const ACK_TIMEOUT_MS: u32 = 100;

/// Transmit-completion waits after the ATS and after READ BINARY replies.
pub(crate) const TX_COMPLETE_TIMEOUT_MS: u32 = 10;
/// Shorter wait before sleeping on deselect; the echo is a single byte.
const DESELECT_TX_TIMEOUT_MS: u32 = 2;

/// ATS historical bytes.
const ATS_HISTORICAL: &[u8] = b"ferrokey.io";

pub struct Transport<DEV, CLK, P>
where
    DEV: Transceiver,
    CLK: Clock,
    P: Processor,
{
    pub(crate) device: DEV,
    pub(crate) clock: CLK,
    pub(crate) processor: P,
    pub(crate) state: LinkState,
    pub(crate) rx: ReassemblyBuffer,
    pub(crate) wtx: Wtx,
}

impl<DEV, CLK, P> Transport<DEV, CLK, P>
where
    DEV: Transceiver,
    CLK: Clock,
    P: Processor,
{
    pub fn new(device: DEV, clock: CLK, processor: P) -> Self {
        Transport {
            device,
            clock,
            processor,
            state: LinkState::new(),
            rx: ReassemblyBuffer::new(),
            wtx: Wtx::new(),
        }
    }

    /// Negotiated link parameters, for introspection.
    pub fn link(&self) -> &LinkState {
        &self.state
    }

    /// Access the transceiver, e.g. for reconfiguration.
    pub fn borrow<F: FnOnce(&mut DEV)>(&mut self, func: F) {
        func(&mut self.device);
    }

    /// Classify and handle at most one frame. Returns the number of frame
    /// bytes consumed; 0 means no activity.
    pub fn poll(&mut self) -> usize {
        let mut frame = [0u8; MAX_FRAME];

        let len = match self.device.receive(0, &mut frame) {
            Ok(nfc::Rx::NewSession(len)) => {
                info!("new session");
                self.reset_session();
                len
            }
            Ok(nfc::Rx::Frame(len)) => len,
            Err(nfc::Error::NewSession) => {
                info!("field reset");
                self.reset_session();
                return 0;
            }
            Err(_) => return 0,
        };

        if len == 0 {
            return 0;
        }

        // ISO 14443-3 first, -4 blocks otherwise
        match frame[0] {
            block::REQA => {
                info!("REQA");
            }
            block::WUPA => {
                info!("WUPA");
            }
            block::HLTA => {
                info!("HLTA");
            }
            block::RATS => {
                if len >= 2 {
                    self.answer_rats(frame[1]);
                    // activation starts a fresh logical session
                    self.state.block_num = true;
                    self.rx.clear();
                    self.wtx.clear();
                } else {
                    info!("RATS without parameter");
                }
            }
            _ => self.process_block(&frame[..len]),
        }

        len
    }

    /// Periodic entry point for the waiting-time-extension controller.
    pub fn wtx_tick(&mut self) {
        self.wtx.tick(&mut self.device, &self.clock);
    }

    fn reset_session(&mut self) {
        self.state.reset();
        self.rx.clear();
        self.wtx.clear();
    }

    /// Answer To Select: record the reader's frame-size indicator and
    /// channel id, advertise our own parameters.
    fn answer_rats(&mut self, parameter: u8) {
        let fsdi = parameter >> 4;
        let cid = parameter & 0x0f;

        self.state.cid = cid;
        self.state.max_frame_size = match fsdi {
            0 => 16,
            1 => 24,
            _ => 32,
        };

        let mut ats: heapless::Vec<u8, MAX_FRAME> = heapless::Vec::new();
        ats.push((3 + ATS_HISTORICAL.len()) as u8).ok();
        // T0: FSCI 2 (32-byte frames), TB present
        ats.push(0x02 | (1 << 5)).ok();
        // TB: FWI 12 gives a frame-wait of ~1.2 s, room for slow signing
        // before any WTX is needed; SFGI 0
        ats.push(12 << 4).ok();
        ats.extend_from_slice(ATS_HISTORICAL).ok();

        self.write_frame(&ats).ok();
        self.device.wait_for_tx(TX_COMPLETE_TIMEOUT_MS);
    }

    /// ISO 14443-4 block dispatch.
    fn process_block(&mut self, frame: &[u8]) {
        let pcb = frame[0];

        match Block::classify(pcb) {
            Block::Ppss => {
                info!("PPSS, ignored");
            }

            Block::I { chaining: true, .. } => {
                debug!("chained i-block, buffered {}", self.rx.len());
                if self.rx.append(&frame[1..]).is_err() {
                    info!("reassembly overflow, chain dropped");
                    self.write_response(pcb, Status::UnspecifiedCheckingError)
                        .ok();
                    return;
                }
                let ack = [block::RBLOCK_ACK | (pcb & 0x03)];
                self.write_frame(&ack).ok();
            }

            Block::I { chaining: false, .. } => {
                if self.rx.is_empty() {
                    self.process_apdu(pcb, &frame[1..]);
                } else {
                    if self.rx.append(&frame[1..]).is_err() {
                        info!("reassembly overflow on final block");
                        self.write_response(pcb, Status::UnspecifiedCheckingError)
                            .ok();
                        return;
                    }
                    debug!("chain complete, {} bytes", self.rx.len());
                    let apdu = self.rx.take();
                    self.process_apdu(pcb, &apdu);
                }
            }

            Block::R { .. } => {
                // the reader is pacing our chained transmission
                self.state.block_num = !self.state.block_num;
                let ack = [block::RBLOCK_ACK | self.state.block_num as u8];
                self.write_frame(&ack).ok();
            }

            Block::S { deselect: true } => {
                info!("deselected");
                self.write_frame(&frame[..1]).ok();
                self.device.wait_for_tx(DESELECT_TX_TIMEOUT_MS);
                self.device.sleep();
                self.reset_session();
            }

            Block::S { deselect: false } => {
                info!("s-block {:02x}, ignored", pcb);
            }

            Block::Unknown => {
                info!("unknown block {:02x}", pcb);
            }
        }
    }

    pub(crate) fn write_frame(&mut self, frame: &[u8]) -> Result<(), nfc::Error> {
        let frame = &frame[..core::cmp::min(frame.len(), MAX_FRAME)];
        debug!("<< {}", hex_str!(frame));
        self.device.send(frame)
    }

    /// Single I-block response: `data` plus the status word, echoing the
    /// request's block number. `data` must leave room for PCB and status
    /// word within one frame.
    pub(crate) fn write_response_ex(
        &mut self,
        req_pcb: u8,
        data: &[u8],
        status: Status,
    ) -> Result<(), nfc::Error> {
        if data.len() > MAX_FRAME - 3 {
            return Err(nfc::Error::Overrun);
        }

        let mut frame: heapless::Vec<u8, MAX_FRAME> = heapless::Vec::new();
        frame.push(block::IBLOCK | (req_pcb & 0x03)).ok();
        frame.extend_from_slice(data).ok();
        let sw: [u8; 2] = status.into();
        frame.extend_from_slice(&sw).ok();

        self.write_frame(&frame)
    }

    pub(crate) fn write_response(&mut self, req_pcb: u8, status: Status) -> Result<(), nfc::Error> {
        self.write_response_ex(req_pcb, &[], status)
    }

    /// Transmit an arbitrary-length response as one or more I-blocks.
    ///
    /// Non-final segments carry the chaining bit and must each be
    /// acknowledged by an R(ACK) with toggled block number before the next
    /// goes out; a timeout, a multi-byte acknowledgement, or a
    /// parity/format mismatch abandons the rest of the chain (the reader
    /// recovers through its own retry or deselect). The final segment is
    /// not acknowledged.
    pub(crate) fn write_response_chaining(&mut self, req_pcb: u8, data: &[u8]) {
        let mut pcb = block::IBLOCK | (req_pcb & 0x03);

        if data.len() <= CHAIN_SEGMENT {
            let mut frame: heapless::Vec<u8, MAX_FRAME> = heapless::Vec::new();
            frame.push(pcb).ok();
            frame.extend_from_slice(data).ok();
            self.write_frame(&frame).ok();
            return;
        }

        let mut sent = 0;
        while sent < data.len() {
            let take = core::cmp::min(CHAIN_SEGMENT, data.len() - sent);
            let last = sent + take == data.len();

            let mut frame: heapless::Vec<u8, MAX_FRAME> = heapless::Vec::new();
            frame
                .push(if last { pcb } else { pcb | block::CHAINING })
                .ok();
            frame.extend_from_slice(&data[sent..sent + take]).ok();
            self.write_frame(&frame).ok();
            sent += take;

            if !last {
                let mut ack = [0u8; MAX_FRAME];
                let len = match self.device.receive(ACK_TIMEOUT_MS, &mut ack) {
                    Ok(nfc::Rx::Frame(len)) => len,
                    _ => {
                        info!("ack timeout, {}/{} sent", sent, data.len());
                        return;
                    }
                };
                if len != 1 {
                    info!("ack length error: {}", len);
                    return;
                }
                if (ack[0] & 0xf6) != block::RBLOCK_ACK || (ack[0] & 0x01) == (frame[0] & 0x01) {
                    info!("ack mismatch: sent {:02x} got {:02x}", frame[0], ack[0]);
                    return;
                }
            }

            pcb ^= 0x01;
        }
    }
}
