use {digit_image::Image, std::time::Instant};

/// What `CaptureSession::capture_into` copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub index: u32,
    pub bytes_used: usize,
    pub sequence: u32,
}

/// An owned copy of one captured buffer.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Image,
    pub sequence: u32,
    pub timestamp: Instant,
}
