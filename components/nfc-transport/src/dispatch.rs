//! Applet routing for reassembled APDUs.
//!
//! One physical channel multiplexes several logical applets; a SELECT
//! picks one and every other instruction is validated against the current
//! selection before it runs. Dispatch is a single match over
//! (instruction, selected applet).

use apdu::{Apdu, Instruction, Status};

use crate::ndef;
use crate::traits::nfc::Transceiver;
use crate::traits::{Clock, Processor};
use crate::transport::{Transport, TX_COMPLETE_TIMEOUT_MS};
use crate::wtx::WTX_PERIOD_MS;
use crate::ResponseData;

pub const CTAP1_ERR_SUCCESS: u8 = 0x00;

pub const VERSION_U2F_V2: &[u8] = b"U2F_V2";

pub const AID_FIDO: [u8; 8] = [0xa0, 0x00, 0x00, 0x06, 0x47, 0x2f, 0x00, 0x01];
pub const AID_NDEF_TYPE_4: [u8; 7] = [0xd2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01];
pub const AID_CAPABILITY_CONTAINER: [u8; 2] = [0xe1, 0x03];
pub const AID_NDEF_TAG: [u8; 2] = [0xe1, 0x04];

/// The logical command targets reachable over this link.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Applet {
    None,
    Fido,
    NdefType4,
    CapabilityContainer,
    NdefTag,
}

impl Default for Applet {
    fn default() -> Self {
        Applet::None
    }
}

/// Match a SELECT payload against the known application identifiers.
/// Prefix matching: the payload may carry trailing bytes.
fn match_aid(payload: &[u8]) -> Applet {
    if payload.starts_with(&AID_FIDO) {
        Applet::Fido
    } else if payload.starts_with(&AID_NDEF_TYPE_4) {
        Applet::NdefType4
    } else if payload.starts_with(&AID_CAPABILITY_CONTAINER) {
        Applet::CapabilityContainer
    } else if payload.starts_with(&AID_NDEF_TAG) {
        Applet::NdefTag
    } else {
        Applet::None
    }
}

impl<DEV, CLK, P> Transport<DEV, CLK, P>
where
    DEV: Transceiver,
    CLK: Clock,
    P: Processor,
{
    /// Route one complete APDU. `req_pcb` is the control byte of the
    /// (final) I-block that carried it, echoed into every response.
    pub(crate) fn process_apdu(&mut self, req_pcb: u8, raw: &[u8]) {
        debug!(">> {}", hex_str!(raw));

        let apdu = match Apdu::parse(raw) {
            Ok(apdu) => apdu,
            Err(status) => {
                info!("unparseable apdu, {} bytes", raw.len());
                self.write_response(req_pcb, status).ok();
                return;
            }
        };

        match (apdu.ins, self.state.selected) {
            (Instruction::Select, _) => self.select(req_pcb, &apdu),

            (Instruction::U2fVersion, Applet::Fido) => {
                info!("u2f version");
                self.write_response_ex(req_pcb, VERSION_U2F_V2, Status::Success)
                    .ok();
            }
            (Instruction::U2fRegister, Applet::Fido) => self.u2f_register(req_pcb, &apdu),
            (Instruction::U2fAuthenticate, Applet::Fido) => self.u2f_authenticate(req_pcb, &apdu),
            (Instruction::CtapMessage, Applet::Fido) => self.ctap_message(req_pcb, &apdu),

            (Instruction::U2fVersion, _)
            | (Instruction::U2fRegister, _)
            | (Instruction::U2fAuthenticate, _)
            | (Instruction::CtapMessage, _) => {
                self.write_response(req_pcb, Status::InstructionNotSupportedOrInvalid)
                    .ok();
            }

            (Instruction::ReadBinary, Applet::CapabilityContainer) => {
                info!("read capability container");
                self.read_binary(req_pcb, &ndef::CAPABILITY_CONTAINER, apdu.lc());
            }
            (Instruction::ReadBinary, Applet::NdefTag) => {
                info!("read ndef");
                self.read_binary(req_pcb, &ndef::NDEF_MESSAGE, apdu.lc());
            }
            (Instruction::ReadBinary, _) => {
                info!("read binary without binary applet");
                self.write_response(req_pcb, Status::InstructionNotSupportedOrInvalid)
                    .ok();
            }

            (Instruction::Unknown(ins), _) => {
                info!("unknown ins {:02x}", ins);
                self.write_response(req_pcb, Status::InstructionNotSupportedOrInvalid)
                    .ok();
            }
        }
    }

    fn select(&mut self, req_pcb: u8, apdu: &Apdu) {
        if apdu.lc() > apdu.data_available() {
            info!("truncating select payload, lc {}", apdu.lc());
        }

        match match_aid(apdu.data()) {
            Applet::None => {
                info!("aid not found: {}", hex_str!(apdu.data()));
                self.write_response(req_pcb, Status::NotFound).ok();
            }
            Applet::Fido => {
                self.state.selected = Applet::Fido;
                self.write_response_ex(req_pcb, VERSION_U2F_V2, Status::Success)
                    .ok();
                info!("fido applet selected");
            }
            applet => {
                self.state.selected = applet;
                self.write_response(req_pcb, Status::Success).ok();
                info!("selected {:?}", applet);
            }
        }
    }

    fn u2f_register(&mut self, req_pcb: u8, apdu: &Apdu) {
        // 32-byte challenge plus 32-byte application parameter
        if apdu.lc() != 64 {
            info!("register length error: {}", apdu.lc());
            self.write_response(req_pcb, Status::WrongLength).ok();
            return;
        }

        info!("u2f register");
        self.u2f_call(req_pcb, apdu);
    }

    fn u2f_authenticate(&mut self, req_pcb: u8, apdu: &Apdu) {
        // challenge + application, key handle length byte, key handle
        let expected = apdu.data().get(64).map(|&kh| 64 + 1 + kh as usize);
        if expected != Some(apdu.lc()) {
            info!("authenticate length error: {}", apdu.lc());
            self.write_response(req_pcb, Status::WrongLength).ok();
            return;
        }

        info!("u2f authenticate");
        self.u2f_call(req_pcb, apdu);
    }

    /// Run the opaque U2F processor under waiting-time extension and chain
    /// its response out. The processor's reply already carries its status
    /// word.
    fn u2f_call(&mut self, req_pcb: u8, apdu: &Apdu) {
        let mut reply = ResponseData::new();

        self.wtx.start(&self.clock, WTX_PERIOD_MS);
        self.processor.u2f_request(apdu.as_bytes(), &mut reply);
        if !self.wtx.stop(&mut self.device) {
            info!("wtx failed, dropping u2f response");
            return;
        }

        self.write_response_chaining(req_pcb, &reply);
    }

    /// NFCCTAP_MSG: the CTAP status byte and payload travel inside the
    /// APDU body; the transport status word is Success once dispatch
    /// happened, whatever the applet-level outcome.
    fn ctap_message(&mut self, req_pcb: u8, apdu: &Apdu) {
        let mut reply = ResponseData::new();

        self.wtx.start(&self.clock, WTX_PERIOD_MS);
        let status = self.processor.ctap_request(apdu.data(), &mut reply);
        if !self.wtx.stop(&mut self.device) {
            info!("wtx failed, dropping ctap response");
            return;
        }

        info!("ctap status {:02x}, {} bytes", status, reply.len());

        let mut framed = ResponseData::new();
        framed.push(status).ok();
        if status == CTAP1_ERR_SUCCESS {
            if framed.extend_from_slice(&reply).is_err() {
                info!("ctap reply too large");
                self.write_response(req_pcb, Status::UnspecifiedCheckingError)
                    .ok();
                return;
            }
        }
        let sw: [u8; 2] = Status::Success.into();
        framed.extend_from_slice(&sw).ok();

        self.write_response_chaining(req_pcb, &framed);
    }

    /// READ BINARY from a constant blob, clamped to its size.
    fn read_binary(&mut self, req_pcb: u8, blob: &[u8], requested: usize) {
        let take = core::cmp::min(requested, blob.len());
        if requested > blob.len() {
            info!("truncating read of {} to {}", requested, blob.len());
        }

        self.write_response_ex(req_pcb, &blob[..take], Status::Success)
            .ok();
        self.device.wait_for_tx(TX_COMPLETE_TIMEOUT_MS);
    }
}
