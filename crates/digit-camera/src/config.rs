use {
    crate::BufferMode,
    digit_base::Vec2,
    digit_image::PixelFormat,
    std::time::Duration,
};

/// Configuration for a capture session and its worker.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    device: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    buffer_count: u32,
    buffer_mode: BufferMode,
    retry_limit: u32,
    retry_delay: Duration,
    reconnect_limit: u32,
    reconnect_delay: Duration,
    stall_timeout: Duration,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 320,
            height: 240,
            format: PixelFormat::Uyvy,
            buffer_count: 3,
            buffer_mode: BufferMode::Ring,
            retry_limit: 3,
            retry_delay: Duration::from_millis(10),
            reconnect_limit: 3,
            reconnect_delay: Duration::from_millis(100),
            stall_timeout: Duration::from_secs(5),
        }
    }
}

impl CameraConfig {
    /// Set the device path (e.g., "/dev/video0").
    pub fn with_device(mut self, device: String) -> Self {
        self.device = device;
        self
    }

    /// Set the capture width in pixels.
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the capture height in pixels.
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the number of user buffers registered with the driver.
    pub fn with_buffer_count(mut self, buffer_count: u32) -> Self {
        self.buffer_count = buffer_count;
        self
    }

    pub fn with_buffer_mode(mut self, buffer_mode: BufferMode) -> Self {
        self.buffer_mode = buffer_mode;
        self
    }

    /// Set how many times a transient dequeue failure is retried.
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set how many times the worker reopens a dead session before giving up.
    pub fn with_reconnect_limit(mut self, reconnect_limit: u32) -> Self {
        self.reconnect_limit = reconnect_limit;
        self
    }

    pub fn with_reconnect_delay(mut self, reconnect_delay: Duration) -> Self {
        self.reconnect_delay = reconnect_delay;
        self
    }

    /// Set how long `VideoIn::capture` waits for a frame before reporting a stall.
    pub fn with_stall_timeout(mut self, stall_timeout: Duration) -> Self {
        self.stall_timeout = stall_timeout;
        self
    }

    // Getters
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> Vec2<usize> {
        Vec2::new(self.width as usize, self.height as usize)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn buffer_count(&self) -> u32 {
        self.buffer_count
    }

    pub fn buffer_mode(&self) -> BufferMode {
        self.buffer_mode
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn reconnect_limit(&self) -> u32 {
        self.reconnect_limit
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    pub fn stall_timeout(&self) -> Duration {
        self.stall_timeout
    }
}
