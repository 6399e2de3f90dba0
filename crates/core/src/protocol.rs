//! GVSP wire parsing (GigE Vision Streaming Protocol).
//!
//! Every GVSP packet begins with a fixed 8-byte header:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |            Status             |           Block ID            |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |E| res |  fmt  |                   Packet ID                   |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! - **Status** (u16 BE): non-zero means the device flags an error on this
//!   packet.
//! - **Block ID** (u16 BE): shared by all packets of one frame; zero is
//!   invalid.
//! - **E**: extended-ID flag. Extended IDs are not supported.
//! - **fmt**: packet format nibble — 1 leader, 2 trailer, 3 data payload.
//! - **Packet ID** (u24 BE): 1-based index of a data packet within its frame;
//!   unused for leader and trailer.
//!
//! The leader payload for an uncompressed image is 36 bytes:
//!
//! ```text
//! offset 0      interlace field id (must be 0 — interlacing unsupported)
//! offset 2..4   payload type (u16 BE, 0x0001 = uncompressed image)
//! offset 12..16 pixel format code (u32 BE)
//! offset 16..20 width / size_x (u32 BE)
//! offset 20..24 height / spectral lines, size_s (u32 BE)
//! ```
//!
//! ROI offset and padding fields are present on the wire but not extracted.
//!
//! Parsing here is pure — functions return typed rejections and callers
//! decide whether to log them.

/// Size of the fixed GVSP header preceding every payload.
pub const GVSP_HEADER_SIZE: usize = 8;

/// Combined IP + UDP + GVSP header overhead per data packet. The negotiated
/// packet size includes this; the per-packet image payload does not.
pub const TOTAL_HEADER_SIZE: usize = 36;

/// Scratch buffer size for one inbound datagram.
pub const DATAGRAM_SIZE: usize = 2048;

/// Length of the leader payload for an uncompressed image.
const IMAGE_LEADER_LEN: usize = 36;

/// GVSP payload type for an uncompressed image.
const PAYLOAD_TYPE_IMAGE: u16 = 0x0001;

/// The three framing roles within a GVSP burst delivering one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// Start of frame: carries geometry and pixel format.
    Leader,
    /// End of frame: triggers decode and delivery.
    Trailer,
    /// Data payload: one slice of the frame's pixel bytes.
    Data,
}

impl PacketKind {
    /// Classify the packet format nibble (low nibble of header byte 4).
    /// Unknown formats return `None` and are ignored by the receive loop.
    pub fn from_format(format: u8) -> Option<Self> {
        match format {
            1 => Some(Self::Leader),
            2 => Some(Self::Trailer),
            3 => Some(Self::Data),
            _ => None,
        }
    }
}

/// Reason a packet header failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRejection {
    /// The device signalled an error condition on this packet.
    ErrorStatus(u16),
    /// All-zero block ID marks an invalid packet.
    ZeroBlockId,
    /// Extended packet IDs are not supported.
    ExtendedId,
}

/// Parsed fixed 8-byte GVSP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Device status word; zero means OK.
    pub status: u16,
    /// Frame identifier shared by all packets of one frame.
    pub block_id: u16,
    /// Extended-ID flag (header byte 4, high bit).
    pub extended_id: bool,
    /// Raw packet format nibble.
    pub format: u8,
    /// 24-bit packet ID; 1-based for data packets.
    pub packet_id: u32,
}

impl PacketHeader {
    /// Parse the fixed header. Returns `None` when the datagram is shorter
    /// than [`GVSP_HEADER_SIZE`].
    pub fn parse(datagram: &[u8]) -> Option<Self> {
        if datagram.len() < GVSP_HEADER_SIZE {
            return None;
        }
        Some(Self {
            status: u16::from_be_bytes([datagram[0], datagram[1]]),
            block_id: u16::from_be_bytes([datagram[2], datagram[3]]),
            extended_id: datagram[4] & 0x80 != 0,
            format: datagram[4] & 0x0f,
            packet_id: u32::from(datagram[5]) << 16
                | u32::from(datagram[6]) << 8
                | u32::from(datagram[7]),
        })
    }

    /// The framing role this header declares, if recognized.
    pub fn kind(&self) -> Option<PacketKind> {
        PacketKind::from_format(self.format)
    }

    /// Header-level validity: status zero, non-zero block ID, no extended ID.
    pub fn validate(&self) -> Result<(), HeaderRejection> {
        if self.status != 0 {
            return Err(HeaderRejection::ErrorStatus(self.status));
        }
        if self.block_id == 0 {
            return Err(HeaderRejection::ZeroBlockId);
        }
        if self.extended_id {
            return Err(HeaderRejection::ExtendedId);
        }
        Ok(())
    }
}

/// Reason an image leader payload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LeaderRejection {
    /// Datagram too short to carry the payload type field.
    #[error("leader packet truncated")]
    Truncated,
    /// Only uncompressed images are supported.
    #[error("payload type {0:#06x} is not an uncompressed image")]
    UnsupportedPayloadType(u16),
    /// An uncompressed image leader carries exactly 36 payload bytes.
    #[error("uncompressed image leader must carry 36 payload bytes, got {0}")]
    BadLength(usize),
    /// Interlaced payloads are not supported.
    #[error("interlaced payloads are not supported")]
    Interlaced,
}

/// Geometry and pixel format announced by an image leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLeader {
    /// GVSP pixel format code.
    pub pixel_format: u32,
    /// Frame width in pixels (columns).
    pub size_x: u32,
    /// Frame height: rows, or spectral lines on a line-scan camera.
    pub size_s: u32,
}

impl ImageLeader {
    /// Parse the leader payload of `datagram` (which still includes the
    /// 8-byte GVSP header). The header itself must have been validated by
    /// the caller.
    pub fn parse(datagram: &[u8]) -> Result<Self, LeaderRejection> {
        if datagram.len() < GVSP_HEADER_SIZE + 4 {
            return Err(LeaderRejection::Truncated);
        }
        let payload = &datagram[GVSP_HEADER_SIZE..];
        let payload_type = u16::from_be_bytes([payload[2], payload[3]]);
        if payload_type != PAYLOAD_TYPE_IMAGE {
            return Err(LeaderRejection::UnsupportedPayloadType(payload_type));
        }
        if payload.len() != IMAGE_LEADER_LEN {
            return Err(LeaderRejection::BadLength(payload.len()));
        }
        if payload[0] != 0 {
            return Err(LeaderRejection::Interlaced);
        }
        Ok(Self {
            pixel_format: u32::from_be_bytes([payload[12], payload[13], payload[14], payload[15]]),
            size_x: u32::from_be_bytes([payload[16], payload[17], payload[18], payload[19]]),
            size_s: u32::from_be_bytes([payload[20], payload[21], payload[22], payload[23]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::PacketGenerator;

    fn make_header(bytes: [u8; 8]) -> PacketHeader {
        PacketHeader::parse(&bytes).unwrap()
    }

    #[test]
    fn parse_fields() {
        let h = make_header([0x00, 0x00, 0x12, 0x34, 0x03, 0xAB, 0xCD, 0xEF]);
        assert_eq!(h.status, 0);
        assert_eq!(h.block_id, 0x1234);
        assert!(!h.extended_id);
        assert_eq!(h.format, 3);
        assert_eq!(h.packet_id, 0xABCDEF);
        assert_eq!(h.kind(), Some(PacketKind::Data));
    }

    #[test]
    fn parse_too_short() {
        assert!(PacketHeader::parse(&[0u8; 7]).is_none());
        assert!(PacketHeader::parse(&[]).is_none());
    }

    #[test]
    fn reject_error_status() {
        let h = make_header([0x80, 0x01, 0x00, 0x01, 0x01, 0, 0, 0]);
        assert_eq!(h.validate(), Err(HeaderRejection::ErrorStatus(0x8001)));
    }

    #[test]
    fn reject_zero_block_id() {
        let h = make_header([0, 0, 0, 0, 0x01, 0, 0, 0]);
        assert_eq!(h.validate(), Err(HeaderRejection::ZeroBlockId));
    }

    #[test]
    fn reject_extended_id() {
        let h = make_header([0, 0, 0, 1, 0x81, 0, 0, 0]);
        assert!(h.extended_id);
        assert_eq!(h.validate(), Err(HeaderRejection::ExtendedId));
    }

    #[test]
    fn valid_header_passes() {
        let h = make_header([0, 0, 0, 1, 0x02, 0, 0, 0]);
        assert_eq!(h.validate(), Ok(()));
        assert_eq!(h.kind(), Some(PacketKind::Trailer));
    }

    #[test]
    fn unknown_format_nibble() {
        assert_eq!(PacketKind::from_format(0), None);
        assert_eq!(PacketKind::from_format(4), None);
        assert_eq!(PacketKind::from_format(0x0f), None);
    }

    #[test]
    fn leader_round_trip() {
        let generator = PacketGenerator::new();
        let datagram = generator.leader(0x0108_0001, 640, 480);
        let leader = ImageLeader::parse(&datagram).unwrap();
        assert_eq!(leader.pixel_format, 0x0108_0001);
        assert_eq!(leader.size_x, 640);
        assert_eq!(leader.size_s, 480);
    }

    #[test]
    fn leader_truncated() {
        assert_eq!(
            ImageLeader::parse(&[0u8; 11]),
            Err(LeaderRejection::Truncated)
        );
    }

    #[test]
    fn leader_wrong_payload_type() {
        let generator = PacketGenerator::new();
        let mut datagram = generator.leader(0x0108_0001, 4, 2);
        // Payload type 0x0002 = raw data block
        datagram[GVSP_HEADER_SIZE + 3] = 0x02;
        assert_eq!(
            ImageLeader::parse(&datagram),
            Err(LeaderRejection::UnsupportedPayloadType(0x0002))
        );
    }

    #[test]
    fn leader_wrong_length() {
        let generator = PacketGenerator::new();
        let mut datagram = generator.leader(0x0108_0001, 4, 2);
        datagram.push(0);
        assert_eq!(
            ImageLeader::parse(&datagram),
            Err(LeaderRejection::BadLength(37))
        );
    }

    #[test]
    fn leader_interlaced() {
        let generator = PacketGenerator::new();
        let mut datagram = generator.leader(0x0108_0001, 4, 2);
        datagram[GVSP_HEADER_SIZE] = 1;
        assert_eq!(ImageLeader::parse(&datagram), Err(LeaderRejection::Interlaced));
    }
}
