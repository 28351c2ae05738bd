use {
    crate::*,
    digit_base::Vec2,
    digit_image::PixelFormat,
    std::{collections::VecDeque, time::Duration},
};

const MAX_BUFFERS: u32 = 8;

// luma levels of the rendered pattern (video range)
const BACKGROUND: u8 = 16;
const FOREGROUND: u8 = 235;
const CHROMA: u8 = 128;

/// Software capture driver that renders a fixed pattern into queued buffers.
///
/// The pattern is a bright vertical stroke on a dark background, roughly a
/// handwritten "1" in the middle of the frame. Like a kernel driver it writes
/// through the user pointers it was given, so the caller must keep each
/// queued buffer alive until it is dequeued or the buffers are released.
pub struct TestPatternDriver {
    format: Option<Format>,
    pattern: Vec<u8>,
    granted: u32,
    queue: VecDeque<BufferDescriptor>,
    streaming: bool,
    open: bool,
    sequence: u32,
    frame_interval: Duration,
}

impl Default for TestPatternDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPatternDriver {
    pub fn new() -> Self {
        Self {
            format: None,
            pattern: Vec::new(),
            granted: 0,
            queue: VecDeque::new(),
            streaming: false,
            open: true,
            sequence: 0,
            frame_interval: Duration::from_millis(33),
        }
    }

    /// Set the simulated time between frames.
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// The bytes every dequeued buffer is filled with.
    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    fn error(op: DriverOp, errno: i32) -> CameraError {
        CameraError::Driver { op, errno }
    }
}

fn pattern_luma(size: Vec2<usize>, x: usize, y: usize) -> u8 {
    let half_width = (size.x / 32).max(1);
    let stroke_x = x + half_width >= size.x / 2 && x < size.x / 2 + half_width;
    let stroke_y = y >= size.y / 8 && y < size.y - size.y / 8;
    if stroke_x && stroke_y { FOREGROUND } else { BACKGROUND }
}

fn render_pattern(size: Vec2<usize>, format: PixelFormat) -> Vec<u8> {
    let mut data = Vec::with_capacity(format.frame_len(size));
    for y in 0..size.y {
        for x in 0..size.x {
            let luma = pattern_luma(size, x, y);
            match format {
                PixelFormat::Uyvy => data.extend_from_slice(&[CHROMA, luma]),
                PixelFormat::Yuyv => data.extend_from_slice(&[luma, CHROMA]),
                PixelFormat::Gray8 => data.push(luma),
            }
        }
    }
    data
}

impl CaptureDriver for TestPatternDriver {
    fn set_format(&mut self, request: &FormatRequest) -> Result<Format, CameraError> {
        if !self.open {
            return Err(Self::error(DriverOp::SetFormat, libc::EBADF));
        }
        if self.streaming || self.granted > 0 {
            return Err(Self::error(DriverOp::SetFormat, libc::EBUSY));
        }
        if request.size.x == 0 || request.size.y == 0 || request.size.x % 2 != 0 {
            return Err(Self::error(DriverOp::SetFormat, libc::EINVAL));
        }
        let format = Format {
            size: request.size,
            format: request.format,
            bytes_per_line: request.size.x * request.format.bytes_per_pixel(),
            size_image: request.format.frame_len(request.size),
        };
        self.pattern = render_pattern(format.size, format.format);
        self.format = Some(format);
        Ok(format)
    }

    fn request_buffers(&mut self, count: u32, mode: BufferMode) -> Result<u32, CameraError> {
        if !self.open {
            return Err(Self::error(DriverOp::RequestBuffers, libc::EBADF));
        }
        if self.streaming {
            return Err(Self::error(DriverOp::RequestBuffers, libc::EBUSY));
        }
        self.queue.clear();
        self.granted = count.min(MAX_BUFFERS);
        log::debug!("test pattern: {} buffers granted ({:?})", self.granted, mode);
        Ok(self.granted)
    }

    fn queue(&mut self, buffer: &BufferDescriptor) -> Result<(), CameraError> {
        let Some(format) = self.format else {
            return Err(Self::error(DriverOp::Queue, libc::EINVAL));
        };
        if !self.open {
            return Err(Self::error(DriverOp::Queue, libc::EBADF));
        }
        if buffer.index >= self.granted || buffer.addr == 0 || buffer.length < format.size_image {
            return Err(Self::error(DriverOp::Queue, libc::EINVAL));
        }
        if self.queue.iter().any(|queued| queued.index == buffer.index) {
            return Err(Self::error(DriverOp::Queue, libc::EINVAL));
        }
        self.queue.push_back(*buffer);
        Ok(())
    }

    fn dequeue(&mut self) -> Result<BufferDescriptor, CameraError> {
        if !self.streaming {
            return Err(Self::error(DriverOp::Dequeue, libc::EINVAL));
        }
        let Some(mut buffer) = self.queue.pop_front() else {
            return Err(Self::error(DriverOp::Dequeue, libc::EAGAIN));
        };
        if !self.frame_interval.is_zero() {
            std::thread::sleep(self.frame_interval);
        }

        // SAFETY: queue() checked the length, and the caller keeps queued
        // buffers alive until they are dequeued or released
        unsafe {
            std::ptr::copy_nonoverlapping(
                self.pattern.as_ptr(),
                buffer.addr as *mut u8,
                self.pattern.len(),
            );
        }
        buffer.bytes_used = self.pattern.len();
        buffer.sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(buffer)
    }

    fn stream_on(&mut self) -> Result<(), CameraError> {
        if !self.open || self.format.is_none() || self.queue.is_empty() {
            return Err(Self::error(DriverOp::StreamOn, libc::EINVAL));
        }
        self.streaming = true;
        Ok(())
    }

    fn stream_off(&mut self) -> Result<(), CameraError> {
        // returns every queued buffer to the application
        self.streaming = false;
        self.queue.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.streaming = false;
        self.queue.clear();
        self.granted = 0;
        self.open = false;
    }
}
