// SPDX-License-Identifier: PMPL-1.0-or-later
//
// comlog - Record framing
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turns a payload into the bytes that land on disk. Metadata and payload
// are written as two contiguous blocks, never interleaved, so the header
// is built on the stack and the payload is borrowed as-is.
//
// On-disk record format (integers big-endian):
//   [2 bytes: frame key 0x30FC]   -- KeyAndLength only
//   [2 bytes: payload length u16] -- KeyAndLength and LengthOnly
//   [N bytes: payload]

use crate::config::MetadataLayout;

/// Key written at the start of every record in the `KeyAndLength` layout.
pub const FRAME_START_KEY: u16 = 0x30FC;

/// Largest payload a record can carry; the length field is a `u16`.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Largest metadata block of any layout.
pub const MAX_METADATA_SIZE: usize = 4;

/// The metadata block of one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    bytes: [u8; MAX_METADATA_SIZE],
    len: usize,
}

impl FrameHeader {
    /// Build the header for a payload of `payload_len` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `payload_len` exceeds [`MAX_PAYLOAD_SIZE`].
    pub fn new(layout: MetadataLayout, payload_len: usize) -> Self {
        assert!(
            payload_len <= MAX_PAYLOAD_SIZE,
            "payload of {payload_len} bytes exceeds the {MAX_PAYLOAD_SIZE}-byte record limit"
        );
        let mut bytes = [0u8; MAX_METADATA_SIZE];
        let mut len = 0;

        if layout.has_key() {
            bytes[len..len + 2].copy_from_slice(&FRAME_START_KEY.to_be_bytes());
            len += 2;
        }
        if layout.has_length() {
            bytes[len..len + 2].copy_from_slice(&(payload_len as u16).to_be_bytes());
            len += 2;
        }

        Self { bytes, len }
    }

    /// The header bytes; empty for the `Raw` layout.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Header size in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for the `Raw` layout.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Total bytes one record of `payload_len` bytes occupies on disk.
pub fn record_size(layout: MetadataLayout, payload_len: usize) -> u64 {
    layout.size() + payload_len as u64
}

/// Encode a complete record into one buffer.
///
/// The writer never needs this (it writes header and payload separately);
/// it exists for tools and tests that build expected file images.
pub fn encode_record(layout: MetadataLayout, payload: &[u8]) -> Vec<u8> {
    let header = FrameHeader::new(layout, payload.len());
    let mut buffer = Vec::with_capacity(header.len() + payload.len());
    buffer.extend_from_slice(header.as_bytes());
    buffer.extend_from_slice(payload);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_and_length_header() {
        let header = FrameHeader::new(MetadataLayout::KeyAndLength, 4);
        assert_eq!(header.as_bytes(), &[0x30, 0xFC, 0x00, 0x04]);
        assert_eq!(header.len(), 4);
    }

    #[test]
    fn test_length_only_header() {
        let header = FrameHeader::new(MetadataLayout::LengthOnly, 0x0102);
        assert_eq!(header.as_bytes(), &[0x01, 0x02]);
    }

    #[test]
    fn test_raw_header_is_empty() {
        let header = FrameHeader::new(MetadataLayout::Raw, 10);
        assert!(header.is_empty());
        assert_eq!(encode_record(MetadataLayout::Raw, b"abc"), b"abc".to_vec());
    }

    #[test]
    fn test_max_payload_length_fits() {
        let header = FrameHeader::new(MetadataLayout::LengthOnly, MAX_PAYLOAD_SIZE);
        assert_eq!(header.as_bytes(), &[0xFF, 0xFF]);
    }

    #[test]
    #[should_panic(expected = "exceeds")]
    fn test_oversized_payload_panics() {
        FrameHeader::new(MetadataLayout::KeyAndLength, MAX_PAYLOAD_SIZE + 1);
    }

    #[test]
    fn test_encode_record_is_exact_size() {
        let payload = [0xde, 0xad, 0xbe, 0xef];
        let record = encode_record(MetadataLayout::KeyAndLength, &payload);
        assert_eq!(record.len() as u64, record_size(MetadataLayout::KeyAndLength, 4));
        assert_eq!(record, vec![0x30, 0xFC, 0x00, 0x04, 0xde, 0xad, 0xbe, 0xef]);
    }
}
