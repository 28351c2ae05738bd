//! USERPTR camera capture for the digit recognizer.
//!
//! A `CaptureSession` owns an aligned `BufferPool` and drives a
//! `CaptureDriver` through the V4L2 streaming sequence. `VideoIn` runs a
//! session on a worker thread and hands owned frames to async code through a
//! single slot that always holds the newest frame.

pub mod config;
pub mod driver;
pub mod error;
pub mod frame;
pub mod pool;
pub mod session;
pub mod testpattern;
pub mod videoin;

#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use config::CameraConfig;
pub use driver::{BufferDescriptor, BufferMode, CaptureDriver, DriverOp, Format, FormatRequest};
pub use error::{CameraError, IntegrityCheck};
pub use frame::{Frame, FrameInfo};
pub use pool::{AlignedAllocator, BufferPool, FrameAllocator, FrameBuffer, BUFFER_ALIGN};
pub use session::{CaptureSession, SessionState, SlotState};
pub use testpattern::TestPatternDriver;
pub use videoin::{DriverFactory, VideoIn};

#[cfg(feature = "v4l2")]
pub use v4l2::V4l2Driver;
