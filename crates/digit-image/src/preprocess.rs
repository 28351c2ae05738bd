use {
    crate::*,
    digit_base::{Rect, Tensor, Vec2},
};

/// Capture size the default crop is laid out for (QVGA).
pub const DEFAULT_SOURCE_SIZE: Vec2<usize> = Vec2::new(320, 240);

/// Central strip of the QVGA frame holding the digit.
pub const DEFAULT_CROP: Rect<usize> = Rect::new(Vec2::new(104, 0), Vec2::new(112, 224));

/// LeNet-5 input grid.
pub const DEFAULT_OUTPUT_SIZE: Vec2<usize> = Vec2::new(28, 28);

/// Scale 8-bit intensities linearly into `[0, 1]`.
pub fn normalize(gray: &[u8]) -> Vec<f32> {
    gray.iter().map(|&v| v as f32 / 255.0).collect()
}

/// Frame to network input: luma, crop, area resize, normalize.
#[derive(Debug, Clone, PartialEq)]
pub struct Preprocessor {
    crop: Rect<usize>,
    output_size: Vec2<usize>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            crop: DEFAULT_CROP,
            output_size: DEFAULT_OUTPUT_SIZE,
        }
    }
}

impl Preprocessor {
    pub fn with_crop(mut self, crop: Rect<usize>) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_output_size(mut self, output_size: Vec2<usize>) -> Self {
        self.output_size = output_size;
        self
    }

    pub fn crop(&self) -> Rect<usize> {
        self.crop
    }

    pub fn output_size(&self) -> Vec2<usize> {
        self.output_size
    }

    /// The resized gray grid, before normalization.
    pub fn gray_grid(&self, image: &Image) -> Result<Vec<u8>, ImageError> {
        let gray = to_gray(image.size, &image.data, image.format)?;
        crop_resize(image.size, &gray, self.crop, self.output_size)
    }

    /// Produce a `[1, 1, H, W]` tensor with every element in `[0, 1]`.
    pub fn run(&self, image: &Image) -> Result<Tensor<f32>, ImageError> {
        let grid = self.gray_grid(image)?;
        let shape = vec![1, 1, self.output_size.y, self.output_size.x];
        Ok(Tensor::new(shape, normalize(&grid))?)
    }
}
