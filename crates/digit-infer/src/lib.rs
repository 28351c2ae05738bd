//! Digit classification on top of pluggable inference backends.
//!
//! A `Backend` turns a `ModelSource` into a `Session`; the `Classifier`
//! runs one forward pass per frame and applies the acceptance threshold.

pub mod backend;
pub mod backendregistry;
pub mod backends;
pub mod classifier;
pub mod device;
pub mod error;
pub mod modelsource;
pub mod session;

pub use backend::Backend;
pub use backendregistry::{BackendRegistry, create_registry};
pub use backends::{CandleBackend, CandleSession, LeNet5};
pub use classifier::{Classifier, ClassifierConfig, Prediction, argmax, softmax};
pub use device::Device;
pub use error::InferError;
pub use modelsource::ModelSource;
pub use session::Session;

#[cfg(feature = "onnx")]
pub use backends::OnnxBackend;
