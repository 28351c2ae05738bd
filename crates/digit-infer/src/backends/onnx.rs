use crate::{Backend, Device, InferError, ModelSource, Session};
use digit_base::Tensor;
use ndarray::ArrayD;
use ort::{inputs, session::Session as OrtSession, value::TensorRef};

pub struct OnnxBackend;

impl Backend for OnnxBackend {
    fn name(&self) -> &str {
        "onnx"
    }

    fn load_model(&self, model: ModelSource, device: Device) -> Result<Box<dyn Session>, InferError> {
        let mut builder = OrtSession::builder()
            .map_err(|e| InferError::Runtime(format!("failed to create session builder: {}", e)))?;

        // Map Device to ort execution providers
        builder = match &device {
            Device::Cpu => builder,
            #[cfg(feature = "cuda")]
            Device::Cuda { device_id } => {
                use ort::execution_providers::CUDAExecutionProvider;
                let ep = CUDAExecutionProvider::default().with_device_id(*device_id);
                builder
                    .with_execution_providers([ep.build()])
                    .map_err(|_| InferError::UnsupportedDevice(device.clone()))?
            }
            #[cfg(not(feature = "cuda"))]
            Device::Cuda { .. } => {
                return Err(InferError::UnsupportedDevice(device.clone()));
            }
        };

        let description = model.describe();
        let session = match model {
            ModelSource::File(path) => builder.commit_from_file(path),
            ModelSource::Memory(bytes) => builder.commit_from_memory(&bytes),
        }
        .map_err(|e| InferError::ModelLoad(format!("failed to load {}: {}", description, e)))?;

        let input_name = session
            .inputs()
            .first()
            .map(|input| input.name().to_string())
            .ok_or_else(|| InferError::ModelLoad("model has no inputs".to_string()))?;
        let output_name = session
            .outputs()
            .first()
            .map(|output| output.name().to_string())
            .ok_or_else(|| InferError::ModelLoad("model has no outputs".to_string()))?;

        log::info!("loaded ONNX model {} on {}", description, device);
        Ok(Box::new(OnnxSession {
            session,
            input_name,
            output_name,
            input_shape: vec![1, 1, 28, 28],
        }))
    }
}

pub struct OnnxSession {
    session: OrtSession,
    input_name: String,
    output_name: String,
    input_shape: Vec<usize>,
}

impl Session for OnnxSession {
    fn forward(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, InferError> {
        if input.shape != self.input_shape {
            return Err(InferError::Shape(format!(
                "expected {:?} input, got {:?}",
                self.input_shape, input.shape
            )));
        }

        let array = tensor_to_ndarray(input.clone())?;
        let tensor_ref = TensorRef::from_array_view(array.view())
            .map_err(|e| InferError::Runtime(format!("failed to create tensor ref: {}", e)))?;
        let outputs = self
            .session
            .run(inputs![self.input_name.as_str() => tensor_ref])
            .map_err(|e| InferError::Runtime(format!("inference failed: {}", e)))?;

        let array = outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()
            .map_err(|e| InferError::Shape(format!("output '{}' is not f32: {}", self.output_name, e)))?;
        ndarray_to_tensor(array)
    }

    fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }
}

pub fn tensor_to_ndarray(tensor: Tensor<f32>) -> Result<ArrayD<f32>, InferError> {
    ArrayD::from_shape_vec(tensor.shape, tensor.data)
        .map_err(|e| InferError::Shape(format!("failed to create ndarray from tensor: {}", e)))
}

pub fn ndarray_to_tensor(array: ndarray::ArrayView<'_, f32, ndarray::IxDyn>) -> Result<Tensor<f32>, InferError> {
    let shape = array.shape().to_vec();
    let data = array.iter().copied().collect();
    Ok(Tensor::new(shape, data)?)
}
