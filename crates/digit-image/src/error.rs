use std::fmt;

#[derive(Debug)]
pub enum ImageError {
    Size { expected: usize, got: usize },
    Region(String),
    Encode(String),
    Tensor(digit_base::TensorError),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::Size { expected, got } => {
                write!(f, "size error: expected {expected} bytes, got {got}")
            }
            ImageError::Region(msg) => write!(f, "region error: {msg}"),
            ImageError::Encode(msg) => write!(f, "encode error: {msg}"),
            ImageError::Tensor(err) => write!(f, "tensor error: {err}"),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<digit_base::TensorError> for ImageError {
    fn from(err: digit_base::TensorError) -> Self {
        ImageError::Tensor(err)
    }
}

impl From<crates_image::ImageError> for ImageError {
    fn from(err: crates_image::ImageError) -> Self {
        ImageError::Encode(err.to_string())
    }
}
