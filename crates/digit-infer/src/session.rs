use crate::InferError;
use digit_base::Tensor;

/// A loaded network. Dropping the session releases the runtime context.
pub trait Session: Send {
    /// Run one forward pass and return the output scores.
    fn forward(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, InferError>;

    /// Shape `forward` expects, e.g. `[1, 1, 28, 28]`.
    fn input_shape(&self) -> &[usize];
}
