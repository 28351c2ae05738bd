use {crate::*, digit_base::Vec2};

// fourcc codes
pub(crate) const FOURCC_UYVY: u32 = u32::from_le_bytes(*b"UYVY");
pub(crate) const FOURCC_YUYV: u32 = u32::from_le_bytes(*b"YUYV");
pub(crate) const FOURCC_GREY: u32 = u32::from_le_bytes(*b"GREY");

/// Convert a fourcc code to a readable 4-character string.
pub fn fourcc_to_string(fourcc: u32) -> String {
    String::from_utf8_lossy(&fourcc.to_le_bytes()).into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// Packed 4:2:2, `[U0, Y0, V0, Y1]`.
    #[default]
    Uyvy,
    /// Packed 4:2:2, `[Y0, U0, Y1, V0]`.
    Yuyv,
    Gray8,
}

impl PixelFormat {
    pub fn from_fourcc(fourcc: u32) -> Option<Self> {
        match fourcc {
            FOURCC_UYVY => Some(PixelFormat::Uyvy),
            FOURCC_YUYV => Some(PixelFormat::Yuyv),
            FOURCC_GREY => Some(PixelFormat::Gray8),
            _ => None,
        }
    }

    pub fn as_fourcc(&self) -> u32 {
        match self {
            PixelFormat::Uyvy => FOURCC_UYVY,
            PixelFormat::Yuyv => FOURCC_YUYV,
            PixelFormat::Gray8 => FOURCC_GREY,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Uyvy | PixelFormat::Yuyv => 2,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Bytes needed for one tightly packed frame of `size`.
    pub fn frame_len(&self, size: Vec2<usize>) -> usize {
        size.area() * self.bytes_per_pixel()
    }

    pub fn ensure_frame(&self, size: Vec2<usize>, data: &[u8]) -> Result<(), ImageError> {
        let expected = self.frame_len(size);
        if data.len() < expected {
            return Err(ImageError::Size {
                expected,
                got: data.len(),
            });
        }
        Ok(())
    }
}
