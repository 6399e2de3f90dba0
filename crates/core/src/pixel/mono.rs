//! Bit-exact decoders for the six monochrome wire packings.
//!
//! Unpacked 10/12/16-bit formats are little-endian byte pairs; the packed
//! formats interleave two pixels' low bits into the middle byte of each
//! three-byte group:
//!
//! ```text
//! Mono10Packed   b0: p0 bits 9..2   b1: xx p1[1:0] xx p0[1:0]   b2: p1 bits 9..2
//! Mono12Packed   b0: p0 bits 11..4  b1: p1[3:0] p0[3:0]         b2: p1 bits 11..4
//! ```
//!
//! Callers guarantee input length is an exact multiple of the group size.

/// Mono8: one byte per pixel, direct copy.
pub fn mono8(input: &[u8]) -> Vec<u8> {
    input.to_vec()
}

/// Mono10: little-endian pair, upper 6 bits of the second byte ignored.
pub fn mono10(input: &[u8]) -> Vec<u16> {
    input
        .chunks_exact(2)
        .map(|b| (u16::from(b[1] & 0x03) << 8) | u16::from(b[0]))
        .collect()
}

/// Mono10Packed: three bytes carry two 10-bit pixels.
pub fn mono10_packed(input: &[u8]) -> Vec<u16> {
    let mut pixels = Vec::with_capacity(input.len() / 3 * 2);
    for b in input.chunks_exact(3) {
        pixels.push((u16::from(b[0]) << 2) | u16::from(b[1] & 0x03));
        pixels.push((u16::from(b[2]) << 2) | u16::from((b[1] & 0x30) >> 4));
    }
    pixels
}

/// Mono12: little-endian pair, upper nibble of the second byte ignored.
pub fn mono12(input: &[u8]) -> Vec<u16> {
    input
        .chunks_exact(2)
        .map(|b| (u16::from(b[1] & 0x0f) << 8) | u16::from(b[0]))
        .collect()
}

/// Mono12Packed: three bytes carry two 12-bit pixels.
pub fn mono12_packed(input: &[u8]) -> Vec<u16> {
    let mut pixels = Vec::with_capacity(input.len() / 3 * 2);
    for b in input.chunks_exact(3) {
        pixels.push((u16::from(b[0]) << 4) | u16::from(b[1] & 0x0f));
        pixels.push((u16::from(b[2]) << 4) | u16::from((b[1] & 0xf0) >> 4));
    }
    pixels
}

/// Mono16: little-endian pair.
pub fn mono16(input: &[u8]) -> Vec<u16> {
    input
        .chunks_exact(2)
        .map(|b| (u16::from(b[1]) << 8) | u16::from(b[0]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn mono8_direct_copy() {
        assert_eq!(mono8(&[0x00, 0x7f, 0xff]), vec![0x00, 0x7f, 0xff]);
    }

    #[test]
    fn mono10_masks_upper_bits() {
        // Second byte carries only bits 9..8; the rest must be ignored.
        assert_eq!(mono10(&[0xFF, 0xFF]), vec![0x03FF]);
        assert_eq!(mono10(&[0x21, 0x0A]), vec![0x0221]);
    }

    #[test]
    fn mono10_packed_literal() {
        // AB CD EF -> (0xAB<<2)|(0xCD&0x03), (0xEF<<2)|((0xCD&0x30)>>4)
        assert_eq!(mono10_packed(&[0xAB, 0xCD, 0xEF]), vec![0x02AD, 0x03BC]);
    }

    #[test]
    fn mono12_masks_upper_nibble() {
        assert_eq!(mono12(&[0x21, 0x0A, 0x87, 0x0B]), vec![0x0A21, 0x0B87]);
        assert_eq!(mono12(&[0xFF, 0xFF]), vec![0x0FFF]);
    }

    #[test]
    fn mono12_packed_literal() {
        // AB CD EF -> (0xAB<<4)|(0xCD&0x0f), (0xEF<<4)|((0xCD&0xf0)>>4)
        assert_eq!(mono12_packed(&[0xAB, 0xCD, 0xEF]), vec![0x0ABD, 0x0EFC]);
    }

    #[test]
    fn mono16_little_endian() {
        assert_eq!(mono16(&[0x34, 0x12, 0xFF, 0xFF]), vec![0x1234, 0xFFFF]);
    }

    #[test]
    fn mono8_all_values_round_trip() {
        let values: Vec<u8> = (0..=255).collect();
        assert_eq!(mono8(&test_utils::encode_mono8(&values)), values);
    }

    #[test]
    fn mono10_all_values_round_trip() {
        let values: Vec<u16> = (0..1 << 10).collect();
        assert_eq!(mono10(&test_utils::encode_mono10(&values)), values);
    }

    #[test]
    fn mono10_packed_all_values_round_trip() {
        let values: Vec<u16> = (0..1 << 10).collect();
        assert_eq!(mono10_packed(&test_utils::encode_mono10_packed(&values)), values);
    }

    #[test]
    fn mono12_all_values_round_trip() {
        let values: Vec<u16> = (0..1 << 12).collect();
        assert_eq!(mono12(&test_utils::encode_mono12(&values)), values);
    }

    #[test]
    fn mono12_packed_all_values_round_trip() {
        let values: Vec<u16> = (0..1 << 12).collect();
        assert_eq!(mono12_packed(&test_utils::encode_mono12_packed(&values)), values);
    }

    #[test]
    fn mono16_all_values_round_trip() {
        let values: Vec<u16> = (0..=u16::MAX).collect();
        assert_eq!(mono16(&test_utils::encode_mono16(&values)), values);
    }
}
