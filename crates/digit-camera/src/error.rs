use {crate::DriverOp, std::fmt};

/// The first check a dequeued descriptor failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityCheck {
    IndexOutOfRange { index: u32, count: usize },
    AddressMismatch { index: u32, addr: usize },
    Oversize { bytes_used: usize, limit: usize },
    /// The buffer matched a slot the driver was not holding.
    NotQueued { index: u32 },
}

impl fmt::Display for IntegrityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityCheck::IndexOutOfRange { index, count } => {
                write!(f, "buffer index {index} outside pool of {count}")
            }
            IntegrityCheck::AddressMismatch { index, addr } => {
                write!(f, "buffer {index} returned unregistered address {addr:#x}")
            }
            IntegrityCheck::Oversize { bytes_used, limit } => {
                write!(f, "payload of {bytes_used} bytes exceeds limit of {limit}")
            }
            IntegrityCheck::NotQueued { index } => {
                write!(f, "buffer {index} returned while not queued")
            }
        }
    }
}

#[derive(Debug)]
pub enum CameraError {
    Config(String),
    Alloc { index: usize, size: usize },
    Driver { op: DriverOp, errno: i32 },
    Integrity(IntegrityCheck),
    NotStreaming(crate::SessionState),
    Stalled,
    Channel(String),
}

impl CameraError {
    /// Whether the capture loop may continue with the next cycle.
    pub fn is_transient(&self) -> bool {
        match self {
            CameraError::Driver { op, .. } => matches!(op, DriverOp::Dequeue | DriverOp::Queue),
            CameraError::Integrity(_) => true,
            _ => false,
        }
    }

    /// Build a driver error from an OS error.
    pub fn driver(op: DriverOp, err: &std::io::Error) -> Self {
        CameraError::Driver {
            op,
            errno: err.raw_os_error().unwrap_or(0),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::Config(msg) => write!(f, "config error: {msg}"),
            CameraError::Alloc { index, size } => {
                write!(f, "allocation error: buffer {index} of {size} bytes")
            }
            CameraError::Driver { op, errno } => write!(
                f,
                "driver error: {op} failed: {} (errno {errno})",
                std::io::Error::from_raw_os_error(*errno)
            ),
            CameraError::Integrity(check) => write!(f, "integrity error: {check}"),
            CameraError::NotStreaming(state) => {
                write!(f, "session is not streaming (state {state:?})")
            }
            CameraError::Stalled => write!(f, "capture stalled: no frame within timeout"),
            CameraError::Channel(msg) => write!(f, "channel error: {msg}"),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<IntegrityCheck> for CameraError {
    fn from(check: IntegrityCheck) -> Self {
        CameraError::Integrity(check)
    }
}
