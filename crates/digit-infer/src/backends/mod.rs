pub mod candle;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use candle::{CandleBackend, CandleSession, LeNet5};

#[cfg(feature = "onnx")]
pub use onnx::{OnnxBackend, OnnxSession};
