//! Static NFC Forum Type 4 tag data.
//!
//! Diagnostic output never touches these blobs; `delog` is the debug
//! channel.

/// Capability container: CCLEN 15, mapping version 2.0, MLe/MLc 0x7F,
/// one NDEF file control TLV for file E1 04 (max size 0x7F, open read,
/// no write).
pub const CAPABILITY_CONTAINER: [u8; 15] = [
    0x00, 0x0f, /* CCLEN */
    0x20, /* version */
    0x00, 0x7f, /* MLe */
    0x00, 0x7f, /* MLc */
    /* NDEF file control TLV */
    0x04, 0x06,
    0xe1, 0x04,
    0x00, 0x7f,
    0x00, 0x00,
];

/// NLEN-prefixed NDEF message: one short URI record, https://ferrokey.io/
pub const NDEF_MESSAGE: [u8; 19] = [
    0x00, 0x11, /* two-byte NLEN */
    0xd1, /* MB | ME | SR, TNF well-known */
    0x01, /* type length */
    0x0d, /* payload length */
    0x55, /* type: U = URI */
    0x04, /* https:// */
    0x66, 0x65, 0x72, 0x72, 0x6f, 0x6b, 0x65, 0x79, 0x2e, 0x69, 0x6f, 0x2f, /* ferrokey.io/ */
];
