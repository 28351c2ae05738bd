use {
    crate::*,
    digit_base::Vec2,
    digit_image::PixelFormat,
    std::fmt,
};

/// The driver call a `CameraError::Driver` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOp {
    Open,
    SetFormat,
    RequestBuffers,
    Queue,
    Dequeue,
    StreamOn,
    StreamOff,
}

impl fmt::Display for DriverOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverOp::Open => "open",
            DriverOp::SetFormat => "set format",
            DriverOp::RequestBuffers => "request buffers",
            DriverOp::Queue => "queue buffer",
            DriverOp::Dequeue => "dequeue buffer",
            DriverOp::StreamOn => "stream on",
            DriverOp::StreamOff => "stream off",
        };
        write!(f, "{name}")
    }
}

/// How the driver cycles registered buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferMode {
    /// Overwrite the oldest filled buffer when the application falls behind.
    #[default]
    Ring,
    /// Stop filling when every buffer is waiting for the application.
    Fifo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRequest {
    pub size: Vec2<usize>,
    pub format: PixelFormat,
}

/// Format the driver actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format {
    pub size: Vec2<usize>,
    pub format: PixelFormat,
    pub bytes_per_line: usize,
    /// Bytes the driver needs per buffer; a lower bound for user buffers.
    pub size_image: usize,
}

/// A user-pointer buffer as exchanged with the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub index: u32,
    pub addr: usize,
    pub length: usize,
    pub bytes_used: usize,
    pub sequence: u32,
}

/// Streaming capture driver in user-pointer mode.
///
/// Every call maps to one ioctl on the device handle. The driver writes into
/// queued buffers but never owns them: the caller keeps each buffer alive
/// from `queue` until it comes back from `dequeue` or the buffers are
/// released with `request_buffers(0, ..)`.
pub trait CaptureDriver: Send {
    /// Negotiate the capture format. The driver may adjust size and stride.
    fn set_format(&mut self, request: &FormatRequest) -> Result<Format, CameraError>;

    /// Register `count` user buffers and return how many the driver granted.
    /// A count of 0 releases the registered buffers.
    fn request_buffers(&mut self, count: u32, mode: BufferMode) -> Result<u32, CameraError>;

    /// Hand a buffer to the driver for filling.
    fn queue(&mut self, buffer: &BufferDescriptor) -> Result<(), CameraError>;

    /// Block until the driver returns a filled buffer.
    fn dequeue(&mut self) -> Result<BufferDescriptor, CameraError>;

    fn stream_on(&mut self) -> Result<(), CameraError>;

    fn stream_off(&mut self) -> Result<(), CameraError>;

    /// Close the device handle, if open.
    fn close(&mut self);
}

impl<D: CaptureDriver + ?Sized> CaptureDriver for Box<D> {
    fn set_format(&mut self, request: &FormatRequest) -> Result<Format, CameraError> {
        (**self).set_format(request)
    }

    fn request_buffers(&mut self, count: u32, mode: BufferMode) -> Result<u32, CameraError> {
        (**self).request_buffers(count, mode)
    }

    fn queue(&mut self, buffer: &BufferDescriptor) -> Result<(), CameraError> {
        (**self).queue(buffer)
    }

    fn dequeue(&mut self) -> Result<BufferDescriptor, CameraError> {
        (**self).dequeue()
    }

    fn stream_on(&mut self) -> Result<(), CameraError> {
        (**self).stream_on()
    }

    fn stream_off(&mut self) -> Result<(), CameraError> {
        (**self).stream_off()
    }

    fn close(&mut self) {
        (**self).close()
    }
}
