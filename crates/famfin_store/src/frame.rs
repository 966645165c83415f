//! Journal frame format.
//!
//! Each frame has the following format:
//! ```text
//! | magic (4) | version (2) | kind (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The payload is CBOR. The CRC covers everything before it.

use crate::error::{StoreError, StoreResult};
use crate::op::{Snapshot, StoreOp};

/// Magic bytes at the start of every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"FFJR";

/// Current frame format version.
pub const FRAME_VERSION: u16 = 1;

/// magic (4) + version (2) + kind (1) + length (4) = 11 bytes
pub const HEADER_SIZE: usize = 11;

/// CRC size.
pub const CRC_SIZE: usize = 4;

/// Kind byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// A batch of ops applied atomically.
    Ops = 1,
    /// A full store image; replay restarts from it.
    Snapshot = 2,
}

impl FrameKind {
    /// Converts from byte representation.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::Ops),
            2 => Some(Self::Snapshot),
            _ => None,
        }
    }

    /// Returns byte representation.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A decoded journal frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Batch of ops.
    Ops(Vec<StoreOp>),
    /// Full image.
    Snapshot(Snapshot),
}

impl Frame {
    /// Returns the frame kind.
    #[must_use]
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Ops(_) => FrameKind::Ops,
            Frame::Snapshot(_) => FrameKind::Snapshot,
        }
    }

    /// Encodes the frame with its envelope and checksum.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        match self {
            Frame::Ops(ops) => ciborium::ser::into_writer(ops, &mut payload),
            Frame::Snapshot(snapshot) => ciborium::ser::into_writer(snapshot, &mut payload),
        }
        .map_err(|e| StoreError::encode(e.to_string()))?;

        let len = u32::try_from(payload.len())
            .map_err(|_| StoreError::encode("journal frame payload too large"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&FRAME_MAGIC);
        data.extend_from_slice(&FRAME_VERSION.to_le_bytes());
        data.push(self.kind().as_byte());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Decodes a payload of the given kind.
    pub fn decode_payload(kind: FrameKind, payload: &[u8], offset: u64) -> StoreResult<Self> {
        match kind {
            FrameKind::Ops => ciborium::de::from_reader(payload)
                .map(Frame::Ops)
                .map_err(|e| StoreError::corruption(offset, e.to_string())),
            FrameKind::Snapshot => ciborium::de::from_reader(payload)
                .map(Frame::Snapshot)
                .map_err(|e| StoreError::corruption(offset, e.to_string())),
        }
    }
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    /// Frame kind.
    pub kind: FrameKind,
    /// Payload length.
    pub len: usize,
}

impl FrameHeader {
    /// Parses and validates a header.
    pub fn parse(bytes: &[u8], offset: u64) -> StoreResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(StoreError::corruption(offset, "short frame header"));
        }
        if bytes[0..4] != FRAME_MAGIC {
            return Err(StoreError::corruption(offset, "bad frame magic"));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FRAME_VERSION {
            return Err(StoreError::corruption(
                offset,
                format!("unsupported frame version {version}"),
            ));
        }
        let kind = FrameKind::from_byte(bytes[6])
            .ok_or_else(|| StoreError::corruption(offset, format!("unknown frame kind {}", bytes[6])))?;
        let len = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]) as usize;
        Ok(Self { kind, len })
    }

    /// Total on-disk size of the frame.
    #[must_use]
    pub fn frame_len(&self) -> usize {
        HEADER_SIZE + self.len + CRC_SIZE
    }
}

/// Computes the CRC32 (IEEE) checksum of `data`.
#[must_use]
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use famfin_protocol::EntityKind;

    #[test]
    fn frame_kind_bytes() {
        for kind in [FrameKind::Ops, FrameKind::Snapshot] {
            assert_eq!(FrameKind::from_byte(kind.as_byte()), Some(kind));
        }
        assert_eq!(FrameKind::from_byte(0), None);
    }

    #[test]
    fn encoded_frame_layout() {
        let frame = Frame::Ops(vec![StoreOp::Delete {
            kind: EntityKind::Account,
            id: "A1".into(),
        }]);
        let bytes = frame.encode().unwrap();

        assert_eq!(&bytes[0..4], b"FFJR");
        let header = FrameHeader::parse(&bytes, 0).unwrap();
        assert_eq!(header.kind, FrameKind::Ops);
        assert_eq!(header.frame_len(), bytes.len());

        let body_end = bytes.len() - CRC_SIZE;
        let stored = u32::from_le_bytes(bytes[body_end..].try_into().unwrap());
        assert_eq!(stored, compute_crc32(&bytes[..body_end]));

        let decoded =
            Frame::decode_payload(header.kind, &bytes[HEADER_SIZE..body_end], 0).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut bytes = Frame::Ops(vec![StoreOp::ClearAll]).encode().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            FrameHeader::parse(&bytes, 7),
            Err(StoreError::Corruption { offset: 7, .. })
        ));
    }

    #[test]
    fn header_rejects_unknown_kind() {
        let mut bytes = Frame::Ops(vec![StoreOp::ClearAll]).encode().unwrap();
        bytes[6] = 9;
        assert!(FrameHeader::parse(&bytes, 0).is_err());
    }

    #[test]
    fn crc32_known_value() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0);
    }
}
