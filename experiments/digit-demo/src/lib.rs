//! Capture → preprocess → classify, one frame per cycle.

use {
    digit_base::{Tensor, TensorError, Vec2, init_file_logger, init_stdout_logger},
    digit_camera::{CameraConfig, CameraError, CaptureDriver, DriverFactory, Frame, TestPatternDriver},
    digit_image::{ImageError, Preprocessor, encode_gray_png, normalize},
    digit_infer::{Classifier, Device, InferError, Prediction},
    std::{
        fmt,
        path::{Path, PathBuf},
        time::Duration,
    },
};

pub const MODEL_PATH_ENV: &str = "DIGIT_MODEL_PATH";
pub const DEVICE_ENV: &str = "DIGIT_DEVICE";
pub const DUMP_DIR_ENV: &str = "DIGIT_DUMP_DIR";
pub const LOG_DIR_ENV: &str = "DIGIT_LOG_DIR";
pub const INFER_DEVICE_ENV: &str = "DIGIT_INFER_DEVICE";

pub const DEFAULT_MODEL_PATH: &str = "models/lenet-5.safetensors";
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum DemoError {
    Camera(CameraError),
    Image(ImageError),
    Infer(InferError),
    Io(String),
    Usage(String),
}

impl fmt::Display for DemoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoError::Camera(err) => write!(f, "camera: {err}"),
            DemoError::Image(err) => write!(f, "preprocess: {err}"),
            DemoError::Infer(err) => write!(f, "inference: {err}"),
            DemoError::Io(msg) => write!(f, "io error: {msg}"),
            DemoError::Usage(msg) => write!(f, "usage: {msg}"),
        }
    }
}

impl std::error::Error for DemoError {}

impl From<CameraError> for DemoError {
    fn from(err: CameraError) -> Self {
        DemoError::Camera(err)
    }
}

impl From<ImageError> for DemoError {
    fn from(err: ImageError) -> Self {
        DemoError::Image(err)
    }
}

impl From<InferError> for DemoError {
    fn from(err: InferError) -> Self {
        DemoError::Infer(err)
    }
}

impl From<TensorError> for DemoError {
    fn from(err: TensorError) -> Self {
        DemoError::Image(ImageError::Tensor(err))
    }
}

impl From<std::io::Error> for DemoError {
    fn from(err: std::io::Error) -> Self {
        DemoError::Io(err.to_string())
    }
}

/// Everything the demo reads from its environment and command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub camera_device: Option<String>,
    pub infer_device: Device,
    pub dump_dir: Option<PathBuf>,
    /// Daily log files go here instead of stdout.
    pub log_dir: Option<PathBuf>,
    pub test_pattern: bool,
    pub interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            camera_device: None,
            infer_device: Device::Cpu,
            dump_dir: None,
            log_dir: None,
            test_pattern: false,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Parse `cpu`, `cuda` or `cuda:<id>`.
pub fn parse_infer_device(value: &str) -> Option<Device> {
    match value.trim().to_ascii_lowercase().as_str() {
        "cpu" => Some(Device::Cpu),
        "cuda" => Some(Device::Cuda { device_id: 0 }),
        other => other
            .strip_prefix("cuda:")
            .and_then(|id| id.parse().ok())
            .map(|device_id| Device::Cuda { device_id }),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, DemoError> {
        Self::parse(std::env::args().skip(1), |name| std::env::var(name).ok())
    }

    /// Build settings from arguments (without the program name) and a
    /// variable lookup.
    pub fn parse<I, L>(args: I, lookup: L) -> Result<Self, DemoError>
    where
        I: IntoIterator<Item = String>,
        L: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(path) = lookup(MODEL_PATH_ENV).filter(|v| !v.is_empty()) {
            settings.model_path = PathBuf::from(path);
        }
        settings.camera_device = lookup(DEVICE_ENV).filter(|v| !v.is_empty());
        settings.dump_dir = lookup(DUMP_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
        settings.log_dir = lookup(LOG_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from);
        if let Some(value) = lookup(INFER_DEVICE_ENV) {
            settings.infer_device = parse_infer_device(&value)
                .ok_or_else(|| DemoError::Usage(format!("unknown {INFER_DEVICE_ENV} '{value}'")))?;
        }

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--test-pattern" => settings.test_pattern = true,
                "--interval-ms" => {
                    let value = args
                        .next()
                        .ok_or_else(|| DemoError::Usage("--interval-ms needs a value".to_string()))?;
                    let millis: u64 = value
                        .parse()
                        .map_err(|_| DemoError::Usage(format!("bad --interval-ms '{value}'")))?;
                    if millis == 0 {
                        return Err(DemoError::Usage("--interval-ms must be positive".to_string()));
                    }
                    settings.interval = Duration::from_millis(millis);
                }
                other => return Err(DemoError::Usage(format!("unknown argument '{other}'"))),
            }
        }

        Ok(settings)
    }

    pub fn camera_config(&self) -> CameraConfig {
        let config = CameraConfig::default();
        match &self.camera_device {
            Some(device) => config.with_device(device.clone()),
            None => config,
        }
    }
}

/// Opens the software test pattern or the real camera for the capture worker.
pub struct DemoDrivers {
    test_pattern: bool,
}

impl DemoDrivers {
    pub fn new(test_pattern: bool) -> Self {
        Self { test_pattern }
    }
}

impl DriverFactory for DemoDrivers {
    type Driver = Box<dyn CaptureDriver>;

    fn open(&mut self, config: &CameraConfig) -> Result<Box<dyn CaptureDriver>, CameraError> {
        if self.test_pattern {
            return Ok(Box::new(TestPatternDriver::new()));
        }
        open_camera(config)
    }
}

#[cfg(feature = "v4l2")]
fn open_camera(config: &CameraConfig) -> Result<Box<dyn CaptureDriver>, CameraError> {
    Ok(Box::new(digit_camera::V4l2Driver::open(config.device())?))
}

#[cfg(not(feature = "v4l2"))]
fn open_camera(config: &CameraConfig) -> Result<Box<dyn CaptureDriver>, CameraError> {
    Err(CameraError::Config(format!(
        "cannot open {}: built without the v4l2 feature, run with --test-pattern",
        config.device()
    )))
}

/// Preprocessing and classification for one frame at a time.
pub struct Pipeline {
    preprocessor: Preprocessor,
    classifier: Classifier,
    dump_dir: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(preprocessor: Preprocessor, classifier: Classifier) -> Self {
        Self {
            preprocessor,
            classifier,
            dump_dir: None,
        }
    }

    /// Write every network input as `<dir>/frame-<sequence>.png`.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    pub fn process(&mut self, frame: &Frame) -> Result<Prediction, DemoError> {
        let grid = self.preprocessor.gray_grid(&frame.image)?;
        let size = self.preprocessor.output_size();

        if let Some(dir) = &self.dump_dir {
            dump_grid(dir, frame.sequence, size, &grid)?;
        }

        let input = Tensor::new(vec![1, 1, size.y, size.x], normalize(&grid))?;
        Ok(self.classifier.classify(&input)?)
    }
}

fn dump_grid(dir: &Path, sequence: u32, size: Vec2<usize>, grid: &[u8]) -> Result<(), DemoError> {
    std::fs::create_dir_all(dir)?;
    let png = encode_gray_png(size, grid)?;
    let path = dir.join(format!("frame-{sequence:06}.png"));
    std::fs::write(&path, png)?;
    log::debug!("dumped network input to {}", path.display());
    Ok(())
}

/// One-line summary of a cycle's result.
pub fn describe(prediction: &Prediction) -> String {
    let millis = prediction.elapsed.as_secs_f64() * 1000.0;
    match prediction.label {
        Some(label) => format!("digit {} (score {:.3}, {:.1} ms)", label, prediction.score, millis),
        None => format!(
            "no prediction (best {} at {:.3}, {:.1} ms)",
            prediction.best, prediction.score, millis
        ),
    }
}

/// Install the file logger when a log directory is set, stdout otherwise.
pub fn init_logging(settings: &Settings) -> Result<(), DemoError> {
    match &settings.log_dir {
        Some(dir) => init_file_logger(dir)?,
        None => init_stdout_logger(),
    }
    Ok(())
}

/// Whether the capture has to be reopened before the next cycle.
pub fn needs_restart(err: &CameraError) -> bool {
    matches!(err, CameraError::Stalled | CameraError::Channel(_))
}
