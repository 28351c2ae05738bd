use {
    crate::*,
    digit_base::Vec2,
    digit_image::PixelFormat,
    std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread::JoinHandle,
        time::Duration,
    },
    tokio::sync::{oneshot, watch},
};

/// Opens a fresh driver for every (re)connect of the capture worker.
pub trait DriverFactory: Send + 'static {
    type Driver: CaptureDriver;

    fn open(&mut self, config: &CameraConfig) -> Result<Self::Driver, CameraError>;
}

impl<F, D> DriverFactory for F
where
    F: FnMut(&CameraConfig) -> Result<D, CameraError> + Send + 'static,
    D: CaptureDriver,
{
    type Driver = D;

    fn open(&mut self, config: &CameraConfig) -> Result<D, CameraError> {
        self(config)
    }
}

/// Frames from a capture session running on its own thread.
///
/// The worker keeps dequeuing at the driver's rate and overwrites a single
/// slot, so `capture` always returns the newest frame. Frames nobody asked
/// for are dropped.
pub struct VideoIn {
    receiver: watch::Receiver<Option<Frame>>,
    cancel: Arc<AtomicBool>,
    format: Format,
    stall_timeout: Duration,
    join_handle: Option<JoinHandle<()>>,
}

fn open_session<F: DriverFactory>(
    factory: &mut F,
    config: &CameraConfig,
    allocator: &Arc<dyn FrameAllocator>,
) -> Result<CaptureSession<F::Driver>, CameraError> {
    let driver = factory.open(config)?;
    CaptureSession::open(driver, config, Arc::clone(allocator))
}

struct Worker<F: DriverFactory> {
    config: CameraConfig,
    factory: F,
    allocator: Arc<dyn FrameAllocator>,
    sender: watch::Sender<Option<Frame>>,
    cancel: Arc<AtomicBool>,
}

impl<F: DriverFactory> Worker<F> {
    fn run(mut self, init_tx: oneshot::Sender<Result<Format, CameraError>>) {
        let mut session = match open_session(&mut self.factory, &self.config, &self.allocator) {
            Ok(session) => {
                let _ = init_tx.send(Ok(session.format()));
                session
            }
            Err(error) => {
                let _ = init_tx.send(Err(error));
                return;
            }
        };

        log::info!("capture worker: starting capture loop");
        let mut reconnects = 0;
        while !self.cancel.load(Ordering::Relaxed) {
            match session.capture_frame() {
                Ok(frame) => {
                    reconnects = 0;
                    if self.sender.is_closed() {
                        log::debug!("capture worker: receiver closed");
                        break;
                    }
                    self.sender.send_replace(Some(frame));
                }
                Err(error) if error.is_transient() && session.state() == SessionState::Streaming => {
                    log::warn!("capture worker: frame dropped: {}", error);
                }
                Err(error) => {
                    log::error!("capture worker: session lost: {}", error);
                    session.stop();
                    match self.reconnect(&mut reconnects) {
                        Some(new_session) => session = new_session,
                        None => return,
                    }
                }
            }
        }
        session.stop();
        log::info!("capture worker: stopped");
    }

    // close, wait, and reopen; gives up after reconnect_limit attempts
    fn reconnect(&mut self, reconnects: &mut u32) -> Option<CaptureSession<F::Driver>> {
        loop {
            if self.cancel.load(Ordering::Relaxed) {
                return None;
            }
            if *reconnects >= self.config.reconnect_limit() {
                log::error!(
                    "capture worker: giving up after {} reconnect attempts",
                    reconnects
                );
                return None;
            }
            *reconnects += 1;
            log::info!(
                "capture worker: reconnecting ({}/{})",
                reconnects,
                self.config.reconnect_limit()
            );
            std::thread::sleep(self.config.reconnect_delay());
            match open_session(&mut self.factory, &self.config, &self.allocator) {
                Ok(session) => return Some(session),
                Err(error) => log::warn!("capture worker: reopen failed: {}", error),
            }
        }
    }
}

impl VideoIn {
    /// Start a capture worker with the default aligned allocator.
    pub async fn open<F: DriverFactory>(config: CameraConfig, factory: F) -> Result<Self, CameraError> {
        Self::open_with_allocator(config, factory, Arc::new(AlignedAllocator)).await
    }

    /// Start a capture worker and wait until its first session is streaming.
    pub async fn open_with_allocator<F: DriverFactory>(
        config: CameraConfig,
        factory: F,
        allocator: Arc<dyn FrameAllocator>,
    ) -> Result<Self, CameraError> {
        let (sender, receiver) = watch::channel::<Option<Frame>>(None);

        // external cancelation flag
        let cancel = Arc::new(AtomicBool::new(false));

        // the session is opened on the worker thread and reports back here
        let (init_tx, init_rx) = oneshot::channel::<Result<Format, CameraError>>();

        let stall_timeout = config.stall_timeout();
        let worker = Worker {
            config,
            factory,
            allocator,
            sender,
            cancel: Arc::clone(&cancel),
        };
        let join_handle = std::thread::Builder::new()
            .name("capture-worker".to_string())
            .spawn(move || worker.run(init_tx))
            .map_err(|e| CameraError::Channel(format!("failed to spawn capture worker: {e}")))?;

        let format = match init_rx.await {
            Ok(Ok(format)) => format,
            Ok(Err(error)) => {
                let _ = join_handle.join();
                return Err(error);
            }
            Err(_) => {
                let _ = join_handle.join();
                return Err(CameraError::Channel(
                    "capture worker died during init".to_string(),
                ));
            }
        };

        Ok(Self {
            receiver,
            cancel,
            format,
            stall_timeout,
            join_handle: Some(join_handle),
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn size(&self) -> Vec2<usize> {
        self.format.size
    }

    pub fn pixel_format(&self) -> PixelFormat {
        self.format.format
    }

    /// Wait for a frame newer than the last one returned.
    ///
    /// Returns `CameraError::Stalled` when nothing arrives within the stall
    /// timeout and `CameraError::Channel` once the worker has given up.
    pub async fn capture(&mut self) -> Result<Frame, CameraError> {
        match tokio::time::timeout(self.stall_timeout, self.receiver.changed()).await {
            Ok(Ok(())) => self
                .receiver
                .borrow_and_update()
                .clone()
                .ok_or_else(|| CameraError::Channel("capture worker sent no frame".to_string())),
            Ok(Err(_)) => Err(CameraError::Channel("capture worker stopped".to_string())),
            Err(_) => Err(CameraError::Stalled),
        }
    }
}

impl Drop for VideoIn {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);

        if let Some(handle) = self.join_handle.take() {
            if handle.join().is_err() {
                log::error!("capture worker panicked");
            }
        }
    }
}
