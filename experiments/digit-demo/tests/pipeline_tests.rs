use digit_base::Tensor;
use digit_camera::{CameraConfig, CameraError, VideoIn};
use digit_demo::*;
use digit_image::Preprocessor;
use digit_infer::{Classifier, ClassifierConfig, Device, InferError, Prediction, Session};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records the network input and votes for one digit.
struct RecordingSession {
    inputs: Arc<Mutex<Vec<Tensor<f32>>>>,
    vote: usize,
}

impl Session for RecordingSession {
    fn forward(&mut self, input: &Tensor<f32>) -> Result<Tensor<f32>, InferError> {
        self.inputs.lock().unwrap().push(input.clone());
        let mut scores = vec![0.0; 10];
        scores[self.vote] = 0.95;
        Ok(Tensor::new(vec![1, 10], scores)?)
    }

    fn input_shape(&self) -> &[usize] {
        &[1, 1, 28, 28]
    }
}

fn recording_pipeline(vote: usize) -> (Pipeline, Arc<Mutex<Vec<Tensor<f32>>>>) {
    let inputs = Arc::new(Mutex::new(Vec::new()));
    let session = RecordingSession {
        inputs: inputs.clone(),
        vote,
    };
    let classifier = Classifier::new(Box::new(session), ClassifierConfig::default());
    (Pipeline::new(Preprocessor::default(), classifier), inputs)
}

fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
    move |name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_settings_defaults() {
    let settings = Settings::parse(Vec::new(), lookup(&[])).unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.model_path.to_str(), Some(DEFAULT_MODEL_PATH));
    assert_eq!(settings.interval, Duration::from_secs(1));
    assert_eq!(settings.camera_config().device(), "/dev/video0");
}

#[test]
fn test_settings_from_environment() {
    let vars = [
        (MODEL_PATH_ENV, "/opt/models/lenet.onnx"),
        (DEVICE_ENV, "/dev/video2"),
        (DUMP_DIR_ENV, "/tmp/digits"),
        (INFER_DEVICE_ENV, "cuda:1"),
        (LOG_DIR_ENV, "/var/log/digit"),
    ];
    let settings = Settings::parse(args(&["--test-pattern"]), lookup(&vars)).unwrap();

    assert_eq!(settings.model_path.to_str(), Some("/opt/models/lenet.onnx"));
    assert_eq!(settings.camera_config().device(), "/dev/video2");
    assert_eq!(settings.dump_dir.as_deref().and_then(|p| p.to_str()), Some("/tmp/digits"));
    assert_eq!(settings.infer_device, Device::Cuda { device_id: 1 });
    assert_eq!(settings.log_dir.as_deref().and_then(|p| p.to_str()), Some("/var/log/digit"));
    assert!(settings.test_pattern);
}

#[test]
fn test_settings_rejects_bad_input() {
    assert!(matches!(
        Settings::parse(args(&["--fast"]), lookup(&[])),
        Err(DemoError::Usage(_))
    ));
    assert!(matches!(
        Settings::parse(args(&["--interval-ms"]), lookup(&[])),
        Err(DemoError::Usage(_))
    ));
    assert!(matches!(
        Settings::parse(args(&["--interval-ms", "0"]), lookup(&[])),
        Err(DemoError::Usage(_))
    ));
    assert!(matches!(
        Settings::parse(Vec::new(), lookup(&[(INFER_DEVICE_ENV, "tpu")])),
        Err(DemoError::Usage(_))
    ));

    let settings = Settings::parse(args(&["--interval-ms", "250"]), lookup(&[])).unwrap();
    assert_eq!(settings.interval, Duration::from_millis(250));
}

#[test]
fn test_file_logging_setup() {
    let dir = std::env::temp_dir().join(format!("digit-demo-log-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let settings = Settings {
        log_dir: Some(dir.clone()),
        ..Settings::default()
    };

    init_logging(&settings).unwrap();
    log::info!("file logging ready");
    log::logger().flush();

    let files: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert_eq!(files.len(), 1);
    let content = std::fs::read_to_string(files[0].as_ref().unwrap().path()).unwrap();
    assert!(content.contains("file logging ready"));

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_parse_infer_device() {
    assert_eq!(parse_infer_device("CPU"), Some(Device::Cpu));
    assert_eq!(parse_infer_device("cuda"), Some(Device::Cuda { device_id: 0 }));
    assert_eq!(parse_infer_device("cuda:3"), Some(Device::Cuda { device_id: 3 }));
    assert_eq!(parse_infer_device("cuda:x"), None);
}

#[test]
fn test_describe() {
    let mut prediction = Prediction {
        scores: vec![0.0; 10],
        best: 3,
        score: 0.93,
        label: Some(3),
        elapsed: Duration::from_micros(2100),
    };
    assert_eq!(describe(&prediction), "digit 3 (score 0.930, 2.1 ms)");

    prediction.label = None;
    prediction.score = 0.41;
    assert_eq!(describe(&prediction), "no prediction (best 3 at 0.410, 2.1 ms)");
}

#[test]
fn test_restart_classification() {
    assert!(needs_restart(&CameraError::Stalled));
    assert!(needs_restart(&CameraError::Channel("closed".to_string())));
    assert!(!needs_restart(&CameraError::Config("bad".to_string())));
}

#[cfg(not(feature = "v4l2"))]
#[test]
fn test_camera_requires_feature() {
    use digit_camera::DriverFactory;

    let mut drivers = DemoDrivers::new(false);
    assert!(matches!(
        drivers.open(&CameraConfig::default()),
        Err(CameraError::Config(_))
    ));
}

#[tokio::test]
async fn test_test_pattern_end_to_end() {
    let config = CameraConfig::default().with_stall_timeout(Duration::from_secs(2));
    let mut video = VideoIn::open(config, DemoDrivers::new(true)).await.unwrap();
    let (mut pipeline, inputs) = recording_pipeline(7);

    let frame = video.capture().await.unwrap();
    let prediction = pipeline.process(&frame).unwrap();

    assert_eq!(prediction.label, Some(7));
    let inputs = inputs.lock().unwrap();
    assert_eq!(inputs.len(), 1);
    let input = &inputs[0];
    assert_eq!(input.shape, vec![1, 1, 28, 28]);
    assert!(input.data.iter().all(|&v| (0.0..=1.0).contains(&v)));

    // the stroke sits in the middle of the crop and the corners stay dark
    let centre = input.data[14 * 28 + 14];
    let corner = input.data[0];
    assert!(centre > 0.5, "centre {centre}");
    assert!(corner < 0.2, "corner {corner}");
}

#[tokio::test]
async fn test_dump_dir_receives_png() {
    let dir = std::env::temp_dir().join(format!("digit-demo-dump-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let mut video = VideoIn::open(CameraConfig::default(), DemoDrivers::new(true))
        .await
        .unwrap();
    let (pipeline, _) = recording_pipeline(0);
    let mut pipeline = pipeline.with_dump_dir(&dir);

    let frame = video.capture().await.unwrap();
    pipeline.process(&frame).unwrap();

    let dumped: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
    assert_eq!(dumped.len(), 1);
    let path = dumped[0].as_ref().unwrap().path();
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));

    std::fs::remove_dir_all(&dir).ok();
}
