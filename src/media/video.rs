//! Video frame marshaling
//!
//! Converts a raw 4-byte-per-pixel buffer into the descriptor the publishing
//! engine sends on the wire:
//!
//! ```text
//! +--------+--------+-----------+--------+------------+--------+--------+----------+
//! | xres   | yres   | rate N/D  | FourCC | line stride| format | aspect | timecode |
//! | pixels | pixels | rational  | RGBX   | width * 4  | prog.  | w / h  | 100ns    |
//! +--------+--------+-----------+--------+------------+--------+--------+----------+
//! ```
//!
//! The capture layer hands over RGBA straight from its canvas. Pixels are never
//! swizzled; alpha is declared opaque (RGBX) unless the policy preserves it.

use bytes::Bytes;

use crate::error::FrameError;

use super::clock::Timecode;

/// Bytes per pixel for every packed format the bridge emits
pub const BYTES_PER_PIXEL: u32 = 4;

const fn fourcc(a: u8, b: u8, c: u8, d: u8) -> u32 {
    (a as u32) | ((b as u32) << 8) | ((c as u32) << 16) | ((d as u32) << 24)
}

/// Pixel/sample layout tags, encoded as little-endian FourCC codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FourCc {
    /// 4:2:2 packed YUV
    Uyvy,
    /// Blue-green-red with alpha
    Bgra,
    /// Blue-green-red, alpha ignored
    Bgrx,
    /// Red-green-blue with alpha
    Rgba,
    /// Red-green-blue, alpha ignored
    Rgbx,
    /// 32-bit float planar audio
    Fltp,
}

impl FourCc {
    /// Wire value
    pub const fn code(self) -> u32 {
        match self {
            FourCc::Uyvy => fourcc(b'U', b'Y', b'V', b'Y'),
            FourCc::Bgra => fourcc(b'B', b'G', b'R', b'A'),
            FourCc::Bgrx => fourcc(b'B', b'G', b'R', b'X'),
            FourCc::Rgba => fourcc(b'R', b'G', b'B', b'A'),
            FourCc::Rgbx => fourcc(b'R', b'G', b'B', b'X'),
            FourCc::Fltp => fourcc(b'F', b'L', b'T', b'p'),
        }
    }

    /// Parse a wire value
    pub fn from_code(code: u32) -> Option<Self> {
        [
            FourCc::Uyvy,
            FourCc::Bgra,
            FourCc::Bgrx,
            FourCc::Rgba,
            FourCc::Rgbx,
            FourCc::Fltp,
        ]
        .into_iter()
        .find(|f| f.code() == code)
    }
}

/// How the alpha byte of incoming pixels is declared to receivers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AlphaPolicy {
    /// Declare every pixel fully opaque (RGBX)
    #[default]
    Opaque,
    /// Carry the alpha channel through (RGBA)
    Preserve,
}

impl AlphaPolicy {
    pub fn fourcc(self) -> FourCc {
        match self {
            AlphaPolicy::Opaque => FourCc::Rgbx,
            AlphaPolicy::Preserve => FourCc::Rgba,
        }
    }
}

/// Nominal frame rate as a rational pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Frames per second
    pub fn as_f64(self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            self.numerator as f64 / self.denominator as f64
        }
    }

    /// Duration of one frame
    pub fn frame_duration(self) -> std::time::Duration {
        if self.numerator == 0 {
            return std::time::Duration::ZERO;
        }
        let nanos = self.denominator as u64 * 1_000_000_000 / self.numerator as u64;
        std::time::Duration::from_nanos(nanos)
    }
}

impl Default for FrameRate {
    /// 25 fps, matching the call's source rate
    fn default() -> Self {
        Self::new(25_000, 1_000)
    }
}

/// Scan type of a video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Interleaved = 0,
    Progressive = 1,
    Field0 = 2,
    Field1 = 3,
}

/// Owned pixel bytes handed over by the capture layer
///
/// This is the only place where input representations are accepted; the
/// marshaler itself only ever sees one contiguous `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer(Bytes);

impl PixelBuffer {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for PixelBuffer {
    fn from(data: Bytes) -> Self {
        PixelBuffer(data)
    }
}

impl From<Vec<u8>> for PixelBuffer {
    fn from(data: Vec<u8>) -> Self {
        PixelBuffer(Bytes::from(data))
    }
}

impl From<&[u8]> for PixelBuffer {
    fn from(data: &[u8]) -> Self {
        PixelBuffer(Bytes::copy_from_slice(data))
    }
}

/// A validated raw frame, ready to be stamped
#[derive(Debug, Clone)]
pub struct RawVideo {
    width: u32,
    height: u32,
    data: Bytes,
}

impl RawVideo {
    /// Validate dimensions against the buffer
    ///
    /// Zero dimensions are rejected here so the aspect ratio computed later is
    /// always finite.
    pub fn new(width: u32, height: u32, buffer: PixelBuffer) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroDimension { width, height });
        }

        let expected = width as usize * height as usize * BYTES_PER_PIXEL as usize;
        if buffer.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: buffer.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data: buffer.into_bytes(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Build the wire descriptor
    pub fn into_frame(
        self,
        frame_rate: FrameRate,
        alpha: AlphaPolicy,
        timecode: Timecode,
    ) -> VideoFrame {
        VideoFrame {
            width: self.width,
            height: self.height,
            frame_rate,
            fourcc: alpha.fourcc(),
            line_stride: self.width * BYTES_PER_PIXEL,
            format: FrameFormat::Progressive,
            aspect_ratio: self.width as f32 / self.height as f32,
            timecode,
            data: self.data,
        }
    }
}

/// Video frame descriptor as sent on the wire
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Declared rate, not measured
    pub frame_rate: FrameRate,
    pub fourcc: FourCc,
    /// Bytes per row
    pub line_stride: u32,
    pub format: FrameFormat,
    /// Picture aspect ratio (width / height)
    pub aspect_ratio: f32,
    pub timecode: Timecode,
    /// Pixel data (zero-copy via reference counting)
    pub data: Bytes,
}

impl VideoFrame {
    /// Resolution of this frame
    pub fn resolution(&self) -> crate::stats::Resolution {
        crate::stats::Resolution::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32) -> Result<VideoFrame, FrameError> {
        let buffer = vec![0u8; (width * height * 4) as usize];
        RawVideo::new(width, height, buffer.into())
            .map(|raw| raw.into_frame(FrameRate::default(), AlphaPolicy::Opaque, Timecode(42)))
    }

    #[test]
    fn test_fourcc_codes() {
        assert_eq!(FourCc::Rgbx.code(), 1_480_738_642);
        assert_eq!(FourCc::Rgba.code(), 0x4142_4752);
        assert_eq!(FourCc::Bgra.code(), 0x4152_4742);
        assert_eq!(FourCc::Uyvy.code(), 0x5956_5955);
        assert_eq!(FourCc::Fltp.code(), 0x7054_4C46);
        assert_eq!(FourCc::from_code(FourCc::Rgbx.code()), Some(FourCc::Rgbx));
        assert_eq!(FourCc::from_code(0), None);
    }

    #[test]
    fn test_descriptor_640x360() {
        let frame = frame(640, 360).unwrap();

        assert_eq!(frame.line_stride, 2560);
        assert!((frame.aspect_ratio - 1.778).abs() < 0.001);
        assert_eq!(frame.format, FrameFormat::Progressive);
        assert_eq!(frame.fourcc, FourCc::Rgbx);
        assert_eq!(frame.frame_rate, FrameRate::new(25_000, 1_000));
        assert_eq!(frame.timecode, Timecode(42));
        assert_eq!(frame.data.len(), 640 * 360 * 4);
    }

    #[test]
    fn test_zero_height_rejected() {
        let err = RawVideo::new(640, 0, Vec::<u8>::new().into()).unwrap_err();
        assert_eq!(err, FrameError::ZeroDimension { width: 640, height: 0 });
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(matches!(
            RawVideo::new(0, 360, Vec::<u8>::new().into()),
            Err(FrameError::ZeroDimension { .. })
        ));
    }

    #[test]
    fn test_wrong_buffer_size_rejected() {
        // RGB (3 bytes per pixel) is not accepted
        let err = RawVideo::new(4, 2, vec![0u8; 4 * 2 * 3].into()).unwrap_err();
        assert_eq!(
            err,
            FrameError::BufferSize {
                expected: 32,
                actual: 24
            }
        );
    }

    #[test]
    fn test_preserve_alpha_uses_rgba() {
        let raw = RawVideo::new(2, 2, vec![0u8; 16].into()).unwrap();
        let frame = raw.into_frame(FrameRate::default(), AlphaPolicy::Preserve, Timecode::ZERO);
        assert_eq!(frame.fourcc, FourCc::Rgba);
    }

    #[test]
    fn test_pixel_buffer_from_slice_copies() {
        let src = [1u8, 2, 3, 4];
        let buffer = PixelBuffer::from(&src[..]);
        assert_eq!(buffer.into_bytes().as_ref(), &src);
    }

    #[test]
    fn test_frame_rate() {
        let rate = FrameRate::default();
        assert_eq!(rate.as_f64(), 25.0);
        assert_eq!(rate.frame_duration(), std::time::Duration::from_millis(40));
        assert_eq!(FrameRate::new(30, 0).as_f64(), 0.0);
    }
}
