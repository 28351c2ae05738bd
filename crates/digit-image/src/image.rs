use {crate::*, digit_base::Vec2};

/// An owned frame in one of the supported pixel formats.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub size: Vec2<usize>,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

impl Image {
    pub fn new(size: Vec2<usize>, data: Vec<u8>, format: PixelFormat) -> Self {
        Self { size, data, format }
    }

    /// Like `new`, but rejects data shorter than one packed frame.
    pub fn checked(size: Vec2<usize>, data: Vec<u8>, format: PixelFormat) -> Result<Self, ImageError> {
        format.ensure_frame(size, &data)?;
        Ok(Self::new(size, data, format))
    }

    pub fn width(&self) -> usize {
        self.size.x
    }

    pub fn height(&self) -> usize {
        self.size.y
    }
}
