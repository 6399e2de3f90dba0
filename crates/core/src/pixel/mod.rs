//! Pixel formats and frame decoding.
//!
//! The receiver supports six monochrome GVSP pixel formats (a subset of the
//! GigE Vision pixel format naming convention). Compressed and color formats
//! are rejected.
//!
//! | Code | Format | Packed | Output | Bit depth |
//! |------|--------|--------|--------|-----------|
//! | `0x01080001` | Mono8 | no | u8 | 8 |
//! | `0x01100003` | Mono10 | no | u16 | 10 |
//! | `0x010C0004` | Mono10Packed | yes | u16 | 10 |
//! | `0x01100005` | Mono12 | no | u16 | 12 |
//! | `0x010C0006` | Mono12Packed | yes | u16 | 12 |
//! | `0x01100007` | Mono16 | no | u16 | 16 |
//!
//! Packed formats carry two pixels in three bytes; they require an even
//! pixel count per frame.

pub mod mono;

/// Supported monochrome pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Mono8,
    Mono10,
    Mono10Packed,
    Mono12,
    Mono12Packed,
    Mono16,
}

impl PixelFormat {
    /// Map a GVSP pixel format code to a supported format.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x0108_0001 => Some(Self::Mono8),
            0x0110_0003 => Some(Self::Mono10),
            0x010C_0004 => Some(Self::Mono10Packed),
            0x0110_0005 => Some(Self::Mono12),
            0x010C_0006 => Some(Self::Mono12Packed),
            0x0110_0007 => Some(Self::Mono16),
            _ => None,
        }
    }

    /// The GVSP wire code for this format.
    pub fn code(self) -> u32 {
        match self {
            Self::Mono8 => 0x0108_0001,
            Self::Mono10 => 0x0110_0003,
            Self::Mono10Packed => 0x010C_0004,
            Self::Mono12 => 0x0110_0005,
            Self::Mono12Packed => 0x010C_0006,
            Self::Mono16 => 0x0110_0007,
        }
    }

    /// Significant bits per pixel.
    pub fn bit_depth(self) -> u8 {
        match self {
            Self::Mono8 => 8,
            Self::Mono10 | Self::Mono10Packed => 10,
            Self::Mono12 | Self::Mono12Packed => 12,
            Self::Mono16 => 16,
        }
    }

    /// Whether two pixels share three wire bytes.
    pub fn is_packed(self) -> bool {
        matches!(self, Self::Mono10Packed | Self::Mono12Packed)
    }

    /// Wire payload bytes required for `pixels` pixels.
    pub fn payload_len(self, pixels: usize) -> usize {
        match self {
            Self::Mono8 => pixels,
            Self::Mono10Packed | Self::Mono12Packed => (pixels / 2).saturating_mul(3),
            _ => pixels.saturating_mul(2),
        }
    }
}

/// Decoded pixel values, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelData {
    /// One byte per pixel (Mono8).
    Mono8(Vec<u8>),
    /// One u16 per pixel (all 10/12/16-bit formats).
    Mono16(Vec<u16>),
}

impl PixelData {
    /// Number of pixels.
    pub fn len(&self) -> usize {
        match self {
            Self::Mono8(v) => v.len(),
            Self::Mono16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow as u8 pixels, if Mono8.
    pub fn as_mono8(&self) -> Option<&[u8]> {
        match self {
            Self::Mono8(v) => Some(v),
            Self::Mono16(_) => None,
        }
    }

    /// Borrow as u16 pixels, if a 10/12/16-bit format.
    pub fn as_mono16(&self) -> Option<&[u16]> {
        match self {
            Self::Mono8(_) => None,
            Self::Mono16(v) => Some(v),
        }
    }
}

/// A decoded frame, delivered to the frame callback.
///
/// `pixels` holds `height * width` values in row-major order. Ownership
/// transfers to the callback; the receiver keeps no reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Columns (size_x).
    pub width: u32,
    /// Rows, or spectral lines on a line-scan camera (size_s).
    pub height: u32,
    /// Significant bits per pixel: 8, 10, 12 or 16.
    pub bit_depth: u8,
    /// Row-major pixel matrix.
    pub pixels: PixelData,
}

impl Frame {
    /// Borrow one row of u16 pixels. Panics if out of range or Mono8.
    pub fn row16(&self, row: usize) -> &[u16] {
        let width = self.width as usize;
        &self.pixels.as_mono16().expect("u16 frame")[row * width..(row + 1) * width]
    }

    /// Borrow one row of u8 pixels. Panics if out of range or not Mono8.
    pub fn row8(&self, row: usize) -> &[u8] {
        let width = self.width as usize;
        &self.pixels.as_mono8().expect("u8 frame")[row * width..(row + 1) * width]
    }
}

/// Reason a reassembled frame could not be decoded. Always soft: the frame
/// is dropped with a warning and the stream continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The pixel format code is not one of the six supported monochrome
    /// formats.
    #[error("pixel format {0:#010x} is not supported")]
    UnsupportedFormat(u32),
    /// The reassembly buffer is shorter than the decode input the announced
    /// geometry requires.
    #[error("reassembly buffer holds {have} bytes, decode needs {needed}")]
    ShortInput { needed: usize, have: usize },
    /// Packed formats pair pixels; an odd pixel count cannot be decoded.
    #[error("packed formats require an even pixel count, got {0}")]
    OddPixelCount(usize),
}

/// Decode a reassembled wire payload into a `(height, width)` pixel matrix.
///
/// `buf` may be longer than the decode input (frame padding); the excess is
/// ignored.
pub fn decode(code: u32, buf: &[u8], width: u32, height: u32) -> Result<Frame, DecodeError> {
    let format = PixelFormat::from_code(code).ok_or(DecodeError::UnsupportedFormat(code))?;
    let pixels = (width as usize).saturating_mul(height as usize);
    if format.is_packed() && pixels % 2 != 0 {
        return Err(DecodeError::OddPixelCount(pixels));
    }
    let needed = format.payload_len(pixels);
    let input = buf.get(..needed).ok_or(DecodeError::ShortInput {
        needed,
        have: buf.len(),
    })?;

    let pixels = match format {
        PixelFormat::Mono8 => PixelData::Mono8(mono::mono8(input)),
        PixelFormat::Mono10 => PixelData::Mono16(mono::mono10(input)),
        PixelFormat::Mono10Packed => PixelData::Mono16(mono::mono10_packed(input)),
        PixelFormat::Mono12 => PixelData::Mono16(mono::mono12(input)),
        PixelFormat::Mono12Packed => PixelData::Mono16(mono::mono12_packed(input)),
        PixelFormat::Mono16 => PixelData::Mono16(mono::mono16(input)),
    };

    Ok(Frame {
        width,
        height,
        bit_depth: format.bit_depth(),
        pixels,
    })
}
