//! Frame preprocessing for the digit recognizer.
//!
//! Raw camera frames (packed YUV 4:2:2 or 8-bit gray) are reduced to luma,
//! cropped to a region of interest, area-resized to the network grid and
//! normalized to `[0, 1]`. Every step is a pure function of its input bytes.

pub mod encode;
pub mod error;
pub mod gray;
pub mod image;
pub mod pixelformat;
pub mod preprocess;
pub mod resize;

pub use encode::encode_gray_png;
pub use error::ImageError;
pub use gray::to_gray;
pub use image::Image;
pub use pixelformat::{PixelFormat, fourcc_to_string};
pub use preprocess::{
    DEFAULT_CROP, DEFAULT_OUTPUT_SIZE, DEFAULT_SOURCE_SIZE, Preprocessor, normalize,
};
pub use resize::crop_resize;
