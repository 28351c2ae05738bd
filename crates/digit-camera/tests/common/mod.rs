#![allow(dead_code)]

use digit_camera::{
    AlignedAllocator, BufferDescriptor, BufferMode, CameraConfig, CameraError, CaptureDriver,
    DriverOp, Format, FormatRequest, FrameAllocator, TestPatternDriver,
};
use std::{
    alloc::Layout,
    collections::VecDeque,
    ptr::NonNull,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SetFormat,
    RequestBuffers(u32),
    Queue(u32),
    Dequeue,
    StreamOn,
    StreamOff,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Format,
    RequestBuffers,
    Queue,
    StreamOn,
}

/// What the next dequeue reports instead of the real descriptor.
#[derive(Debug, Clone, Copy)]
pub enum DequeueFault {
    Error(i32),
    Index(u32),
    Addr(usize),
    BytesUsed(usize),
    Lost,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Test pattern driver with call recording and fault injection.
pub struct MockDriver {
    inner: TestPatternDriver,
    log: CallLog,
    fail_at: Option<Stage>,
    dequeue_faults: VecDeque<DequeueFault>,
    requeues_before_failure: Option<usize>,
    requeue_faults: usize,
    streaming: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            inner: TestPatternDriver::new().with_frame_interval(Duration::ZERO),
            log: Arc::new(Mutex::new(Vec::new())),
            fail_at: None,
            dequeue_faults: VecDeque::new(),
            requeues_before_failure: None,
            requeue_faults: 0,
            streaming: false,
        }
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.inner = TestPatternDriver::new().with_frame_interval(frame_interval);
        self
    }

    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_at = Some(stage);
        self
    }

    pub fn with_dequeue_faults(mut self, faults: impl IntoIterator<Item = DequeueFault>) -> Self {
        self.dequeue_faults.extend(faults);
        self
    }

    /// Let `count` requeues succeed once streaming, then fail every one after.
    pub fn failing_requeue_after(mut self, count: usize) -> Self {
        self.requeues_before_failure = Some(count);
        self
    }

    /// Fail the next `count` requeues with `EAGAIN`, then recover.
    pub fn with_requeue_faults(mut self, count: usize) -> Self {
        self.requeue_faults = count;
        self
    }

    pub fn log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    pub fn pattern(&self) -> &[u8] {
        self.inner.pattern()
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }

    fn fail(&self, stage: Stage, op: DriverOp) -> Result<(), CameraError> {
        if self.fail_at == Some(stage) {
            return Err(CameraError::Driver {
                op,
                errno: libc::EIO,
            });
        }
        Ok(())
    }
}

impl CaptureDriver for MockDriver {
    fn set_format(&mut self, request: &FormatRequest) -> Result<Format, CameraError> {
        self.record(Call::SetFormat);
        self.fail(Stage::Format, DriverOp::SetFormat)?;
        self.inner.set_format(request)
    }

    fn request_buffers(&mut self, count: u32, mode: BufferMode) -> Result<u32, CameraError> {
        self.record(Call::RequestBuffers(count));
        if count > 0 {
            self.fail(Stage::RequestBuffers, DriverOp::RequestBuffers)?;
        }
        self.inner.request_buffers(count, mode)
    }

    fn queue(&mut self, buffer: &BufferDescriptor) -> Result<(), CameraError> {
        self.record(Call::Queue(buffer.index));
        if self.streaming && self.requeue_faults > 0 {
            self.requeue_faults -= 1;
            return Err(CameraError::Driver {
                op: DriverOp::Queue,
                errno: libc::EAGAIN,
            });
        }
        if self.streaming {
            if let Some(remaining) = self.requeues_before_failure.as_mut() {
                if *remaining == 0 {
                    return Err(CameraError::Driver {
                        op: DriverOp::Queue,
                        errno: libc::EIO,
                    });
                }
                *remaining -= 1;
            }
        } else {
            self.fail(Stage::Queue, DriverOp::Queue)?;
        }
        self.inner.queue(buffer)
    }

    fn dequeue(&mut self) -> Result<BufferDescriptor, CameraError> {
        self.record(Call::Dequeue);
        let fault = self.dequeue_faults.pop_front();
        if let Some(DequeueFault::Error(errno)) = fault {
            return Err(CameraError::Driver {
                op: DriverOp::Dequeue,
                errno,
            });
        }
        let mut desc = self.inner.dequeue()?;
        match fault {
            Some(DequeueFault::Index(index)) => desc.index = index,
            Some(DequeueFault::Addr(addr)) => desc.addr = addr,
            Some(DequeueFault::BytesUsed(bytes_used)) => desc.bytes_used = bytes_used,
            Some(DequeueFault::Lost) => {
                desc.index = 99;
                desc.addr = 0x10;
            }
            Some(DequeueFault::Error(_)) | None => {}
        }
        Ok(desc)
    }

    fn stream_on(&mut self) -> Result<(), CameraError> {
        self.record(Call::StreamOn);
        self.fail(Stage::StreamOn, DriverOp::StreamOn)?;
        self.inner.stream_on()?;
        self.streaming = true;
        Ok(())
    }

    fn stream_off(&mut self) -> Result<(), CameraError> {
        self.record(Call::StreamOff);
        self.streaming = false;
        self.inner.stream_off()
    }

    fn close(&mut self) {
        self.record(Call::Close);
        self.inner.close();
    }
}

/// Allocator that counts live blocks and can fail the n-th allocation.
#[derive(Default)]
pub struct CountingAllocator {
    live: AtomicUsize,
    total: AtomicUsize,
    fail_at: Option<usize>,
}

impl CountingAllocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the allocation with zero-based number `index`.
    pub fn failing_at(index: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_at: Some(index),
            ..Self::default()
        })
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

impl FrameAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let n = self.total.fetch_add(1, Ordering::SeqCst);
        if self.fail_at == Some(n) {
            return None;
        }
        let ptr = AlignedAllocator.allocate(layout)?;
        self.live.fetch_add(1, Ordering::SeqCst);
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        unsafe { AlignedAllocator.deallocate(ptr, layout) };
    }
}

pub fn test_config() -> CameraConfig {
    CameraConfig::default()
        .with_retry_delay(Duration::from_millis(1))
        .with_reconnect_delay(Duration::from_millis(1))
}

pub fn calls(log: &CallLog) -> Vec<Call> {
    log.lock().unwrap().clone()
}
