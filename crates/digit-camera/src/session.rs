use {
    crate::*,
    digit_image::Image,
    std::{
        sync::Arc,
        time::{Duration, Instant},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Streaming,
    Stopped,
    Failed,
}

/// Who holds a pool buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Queued,
    Dequeued,
}

/// One open capture device with its registered buffers.
///
/// Setup runs format, buffer request, allocation, queueing and stream-on in
/// that order; a failure at any step unwinds the steps before it. Teardown
/// stops the stream, releases the driver's buffers, closes the device and
/// then frees the memory. It runs at most once per step, so calling `stop`
/// repeatedly (or dropping a stopped session) is harmless.
pub struct CaptureSession<D: CaptureDriver> {
    driver: D,
    pool: BufferPool,
    slots: Vec<SlotState>,
    format: Format,
    mode: BufferMode,
    retry_limit: u32,
    retry_delay: Duration,
    state: SessionState,
    streaming: bool,
    buffers_requested: bool,
    closed: bool,
}

impl<D: CaptureDriver> CaptureSession<D> {
    /// Configure `driver` and start streaming into a fresh pool.
    pub fn open(
        driver: D,
        config: &CameraConfig,
        allocator: Arc<dyn FrameAllocator>,
    ) -> Result<Self, CameraError> {
        let mut session = Self {
            driver,
            pool: BufferPool::empty(),
            slots: Vec::new(),
            format: Format {
                size: config.size(),
                format: config.format(),
                bytes_per_line: 0,
                size_image: 0,
            },
            mode: config.buffer_mode(),
            retry_limit: config.retry_limit(),
            retry_delay: config.retry_delay(),
            state: SessionState::Idle,
            streaming: false,
            buffers_requested: false,
            closed: false,
        };

        if let Err(error) = session.start(config, allocator) {
            log::error!("capture session setup failed: {}", error);
            session.teardown();
            session.state = SessionState::Failed;
            return Err(error);
        }
        Ok(session)
    }

    fn start(&mut self, config: &CameraConfig, allocator: Arc<dyn FrameAllocator>) -> Result<(), CameraError> {
        if config.buffer_count() == 0 {
            return Err(CameraError::Config("buffer count must be at least 1".to_string()));
        }

        let request = FormatRequest {
            size: config.size(),
            format: config.format(),
        };
        self.format = self.driver.set_format(&request)?;
        if self.format.format != request.format {
            return Err(CameraError::Config(format!(
                "driver substituted {:?} for {:?}",
                self.format.format, request.format
            )));
        }

        let granted = self.driver.request_buffers(config.buffer_count(), self.mode)?;
        self.buffers_requested = true;
        if granted == 0 {
            return Err(CameraError::Config("driver granted no buffers".to_string()));
        }

        let size = self
            .format
            .size_image
            .max(self.format.format.frame_len(self.format.size));
        self.pool = BufferPool::allocate(granted as usize, size, BUFFER_ALIGN, allocator)?;
        self.slots = vec![SlotState::Free; self.pool.len()];

        for index in 0..self.pool.len() {
            let Some(desc) = self.pool.descriptor(index) else {
                break;
            };
            self.driver.queue(&desc)?;
            self.slots[index] = SlotState::Queued;
        }

        self.driver.stream_on()?;
        self.streaming = true;
        self.state = SessionState::Streaming;
        log::info!(
            "streaming {}x{} {:?}, {} buffers of {} bytes ({:?})",
            self.format.size.x,
            self.format.size.y,
            self.format.format,
            self.pool.len(),
            size,
            self.mode
        );
        Ok(())
    }

    fn teardown(&mut self) {
        if self.streaming {
            if let Err(error) = self.driver.stream_off() {
                log::warn!("stream off failed: {}", error);
            }
            self.streaming = false;
        }
        if self.buffers_requested {
            if let Err(error) = self.driver.request_buffers(0, self.mode) {
                log::warn!("releasing driver buffers failed: {}", error);
            }
            self.buffers_requested = false;
        }
        if !self.closed {
            self.driver.close();
            self.closed = true;
        }
        self.pool.release();
        self.slots.iter_mut().for_each(|slot| *slot = SlotState::Free);
    }

    /// Stop streaming and release everything. A failed session stays `Failed`.
    pub fn stop(&mut self) {
        self.teardown();
        if self.state != SessionState::Failed {
            self.state = SessionState::Stopped;
        }
    }

    fn dequeue_with_retry(&mut self) -> Result<BufferDescriptor, CameraError> {
        let mut attempt = 0;
        loop {
            match self.driver.dequeue() {
                Ok(desc) => return Ok(desc),
                Err(error) if error.is_transient() && attempt < self.retry_limit => {
                    attempt += 1;
                    log::warn!(
                        "dequeue failed: {}, retry {}/{}",
                        error,
                        attempt,
                        self.retry_limit
                    );
                    std::thread::sleep(self.retry_delay);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn requeue(&mut self, index: usize) -> Result<(), CameraError> {
        let Some(desc) = self.pool.descriptor(index) else {
            return Ok(());
        };
        let mut attempt = 0;
        loop {
            match self.driver.queue(&desc) {
                Ok(()) => {
                    self.slots[index] = SlotState::Queued;
                    return Ok(());
                }
                Err(error) if error.is_transient() && attempt < self.retry_limit => {
                    attempt += 1;
                    log::warn!(
                        "requeue of buffer {} failed: {}, retry {}/{}",
                        index,
                        error,
                        attempt,
                        self.retry_limit
                    );
                    std::thread::sleep(self.retry_delay);
                }
                Err(error) => {
                    log::error!("requeue of buffer {} failed: {}, tearing down", index, error);
                    self.teardown();
                    self.state = SessionState::Failed;
                    return Err(error);
                }
            }
        }
    }

    // the driver handed back a buffer no queued slot accounts for
    fn lose_buffer(&mut self, desc: &BufferDescriptor, check: IntegrityCheck) -> CameraError {
        log::error!(
            "buffer {} at {:#x} matches no queued slot ({}), tearing down",
            desc.index,
            desc.addr,
            check
        );
        self.teardown();
        self.state = SessionState::Failed;
        CameraError::Integrity(check)
    }

    /// Dequeue one filled buffer, copy its payload into `dst` and requeue it.
    ///
    /// A descriptor that fails validation is rejected with
    /// `CameraError::Integrity` and `dst` is left untouched. The buffer still
    /// goes back to the driver whenever it matches a queued slot. When it
    /// matches none, its owner is unknown and the session fails.
    pub fn capture_into(&mut self, dst: &mut [u8]) -> Result<FrameInfo, CameraError> {
        if self.state != SessionState::Streaming {
            return Err(CameraError::NotStreaming(self.state));
        }

        let desc = self.dequeue_with_retry()?;
        let verdict = self.pool.validate(&desc, dst.len());

        let matched = if (desc.index as usize) < self.pool.len() {
            Some(desc.index as usize)
        } else {
            self.pool.index_of(desc.addr)
        };
        let slot = match matched {
            Some(index) if self.slots[index] == SlotState::Queued => index,
            Some(index) => {
                return Err(self.lose_buffer(&desc, IntegrityCheck::NotQueued { index: index as u32 }));
            }
            None => {
                let check = match verdict {
                    Err(check) => check,
                    Ok(_) => IntegrityCheck::IndexOutOfRange {
                        index: desc.index,
                        count: self.pool.len(),
                    },
                };
                return Err(self.lose_buffer(&desc, check));
            }
        };
        self.slots[slot] = SlotState::Dequeued;

        let result = match verdict {
            Ok(index) => match self.pool.slot(index) {
                Some(buffer) => {
                    dst[..desc.bytes_used].copy_from_slice(&buffer.as_slice()[..desc.bytes_used]);
                    Ok(FrameInfo {
                        index: desc.index,
                        bytes_used: desc.bytes_used,
                        sequence: desc.sequence,
                    })
                }
                None => Err(CameraError::Integrity(IntegrityCheck::IndexOutOfRange {
                    index: desc.index,
                    count: self.pool.len(),
                })),
            },
            Err(check) => {
                log::warn!("rejecting buffer {}: {}", desc.index, check);
                Err(CameraError::Integrity(check))
            }
        };

        self.requeue(slot)?;
        result
    }

    /// Capture into a freshly allocated `Frame`.
    pub fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        let mut data = vec![0u8; self.pool.buffer_len()];
        let info = self.capture_into(&mut data)?;
        data.truncate(info.bytes_used);
        Ok(Frame {
            image: Image::new(self.format.size, data, self.format.format),
            sequence: info.sequence,
            timestamp: Instant::now(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Format the driver applied.
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    pub fn slot_states(&self) -> &[SlotState] {
        &self.slots
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}

impl<D: CaptureDriver> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
