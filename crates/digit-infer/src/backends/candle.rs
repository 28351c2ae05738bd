use {
    crate::{Backend, Device, InferError, ModelSource, Session},
    candle_core::{D, DType, Tensor as CanTensor},
    candle_nn::{Conv2d, Conv2dConfig, Linear, Module, VarBuilder, conv2d, linear},
    digit_base::Tensor,
};

/// Input grid of the network.
pub const INPUT_SHAPE: [usize; 4] = [1, 1, 28, 28];

/// Number of digit classes.
pub const CLASSES: usize = 10;

/// LeNet-5 for 28x28 single-channel digits, ending in softmax.
///
/// Weights are read from `conv1`, `conv2`, `fc1`, `fc2` and `fc3`, each with
/// a `weight` and `bias` tensor in PyTorch layout.
#[derive(Debug)]
pub struct LeNet5 {
    conv1: Conv2d,
    conv2: Conv2d,
    fc1: Linear,
    fc2: Linear,
    fc3: Linear,
}

impl LeNet5 {
    pub fn load(vb: VarBuilder) -> candle_core::Result<Self> {
        let conv1 = conv2d(
            1,
            6,
            5,
            Conv2dConfig {
                padding: 2,
                ..Default::default()
            },
            vb.pp("conv1"),
        )?;
        let conv2 = conv2d(6, 16, 5, Conv2dConfig::default(), vb.pp("conv2"))?;
        let fc1 = linear(16 * 5 * 5, 120, vb.pp("fc1"))?;
        let fc2 = linear(120, 84, vb.pp("fc2"))?;
        let fc3 = linear(84, CLASSES, vb.pp("fc3"))?;
        Ok(Self {
            conv1,
            conv2,
            fc1,
            fc2,
            fc3,
        })
    }
}

impl Module for LeNet5 {
    fn forward(&self, xs: &CanTensor) -> candle_core::Result<CanTensor> {
        // [b, 1, 28, 28] -> [b, 6, 14, 14]
        let xs = xs.apply(&self.conv1)?.relu()?.max_pool2d(2)?;
        // -> [b, 16, 5, 5]
        let xs = xs.apply(&self.conv2)?.relu()?.max_pool2d(2)?;
        let xs = xs
            .flatten_from(1)?
            .apply(&self.fc1)?
            .relu()?
            .apply(&self.fc2)?
            .relu()?
            .apply(&self.fc3)?;
        candle_nn::ops::softmax(&xs, D::Minus1)
    }
}

fn candle_device(device: &Device) -> Result<candle_core::Device, InferError> {
    match device {
        Device::Cpu => Ok(candle_core::Device::Cpu),
        #[cfg(feature = "cuda")]
        Device::Cuda { device_id } => Ok(candle_core::Device::new_cuda(*device_id as usize)?),
        #[cfg(not(feature = "cuda"))]
        Device::Cuda { .. } => Err(InferError::UnsupportedDevice(device.clone())),
    }
}

pub struct CandleBackend;

impl Backend for CandleBackend {
    fn name(&self) -> &str {
        "candle"
    }

    fn load_model(&self, model: ModelSource, device: Device) -> Result<Box<dyn Session>, InferError> {
        let description = model.describe();
        let candle_device = candle_device(&device)?;
        let weights = match model {
            ModelSource::File(path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &candle_device)
            },
            ModelSource::Memory(bytes) => {
                VarBuilder::from_buffered_safetensors(bytes, DType::F32, &candle_device)
            }
        }
        .map_err(|e| InferError::ModelLoad(format!("failed to read {description}: {e}")))?;

        let session = CandleSession::new(weights, candle_device)
            .map_err(|e| InferError::ModelLoad(format!("failed to build LeNet-5 from {description}: {e}")))?;
        log::info!("loaded LeNet-5 from {} on {}", description, device);
        Ok(Box::new(session))
    }
}

#[derive(Debug)]
pub struct CandleSession {
    model: LeNet5,
    device: candle_core::Device,
}

impl CandleSession {
    /// Build the network from any variable source, e.g. `VarBuilder::zeros`.
    pub fn new(weights: VarBuilder, device: candle_core::Device) -> Result<Self, InferError> {
        let model = LeNet5::load(weights)?;
        Ok(Self { model, device })
    }
}

impl Session for CandleSession {
    fn forward(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, InferError> {
        if input.shape.len() != 4 || input.shape[1..] != INPUT_SHAPE[1..] || input.shape[0] == 0 {
            return Err(InferError::Shape(format!(
                "expected [N, 1, 28, 28] input, got {:?}",
                input.shape
            )));
        }

        let xs = CanTensor::from_slice(&input.data, input.shape.as_slice(), &self.device)?;
        let output = self.model.forward(&xs)?;
        let shape = output.dims().to_vec();
        let data = output.flatten_all()?.to_vec1::<f32>()?;
        Ok(Tensor::new(shape, data)?)
    }

    fn input_shape(&self) -> &[usize] {
        &INPUT_SHAPE
    }
}
