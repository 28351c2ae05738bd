mod common;

use common::{Call, MockDriver, calls, test_config};
use digit_base::Vec2;
use digit_camera::{CameraConfig, CameraError, DriverOp, TestPatternDriver, VideoIn};
use digit_image::PixelFormat;
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

fn test_pattern(_: &CameraConfig) -> Result<TestPatternDriver, CameraError> {
    Ok(TestPatternDriver::new().with_frame_interval(Duration::ZERO))
}

fn paced_test_pattern(_: &CameraConfig) -> Result<TestPatternDriver, CameraError> {
    Ok(TestPatternDriver::new().with_frame_interval(Duration::from_millis(10)))
}

fn slow_test_pattern(_: &CameraConfig) -> Result<TestPatternDriver, CameraError> {
    Ok(TestPatternDriver::new().with_frame_interval(Duration::from_millis(300)))
}

fn missing_device(_: &CameraConfig) -> Result<TestPatternDriver, CameraError> {
    Err(CameraError::Driver {
        op: DriverOp::Open,
        errno: libc::ENOENT,
    })
}

#[tokio::test]
async fn test_capture_frames_from_worker() {
    let mut video = VideoIn::open(test_config(), test_pattern).await.unwrap();

    assert_eq!(video.size(), Vec2::new(320, 240));
    assert_eq!(video.pixel_format(), PixelFormat::Uyvy);

    let mut last = None;
    for _ in 0..5 {
        let frame = video.capture().await.unwrap();
        assert_eq!(frame.image.size, Vec2::new(320, 240));
        assert_eq!(frame.image.data.len(), 320 * 240 * 2);
        if let Some(previous) = last {
            assert!(frame.sequence > previous);
        }
        last = Some(frame.sequence);
    }
}

#[tokio::test]
async fn test_capture_after_pause_returns_newest_frame() {
    let mut video = VideoIn::open(test_config(), paced_test_pattern).await.unwrap();
    let first = video.capture().await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = video.capture().await.unwrap();

    // frames captured during the pause were replaced, not queued up
    assert!(second.sequence > first.sequence + 10, "{} -> {}", first.sequence, second.sequence);
    assert!(second.timestamp.elapsed() < Duration::from_millis(200));
}

#[tokio::test]
async fn test_open_failure_is_reported() {
    let result = VideoIn::open(test_config(), missing_device).await;

    assert!(matches!(
        result,
        Err(CameraError::Driver {
            op: DriverOp::Open,
            ..
        })
    ));
}

#[tokio::test]
async fn test_setup_failure_is_reported() {
    let result = VideoIn::open(test_config().with_buffer_count(0), test_pattern).await;
    assert!(matches!(result, Err(CameraError::Config(_))));
}

#[tokio::test]
async fn test_stalled_capture() {
    let config = test_config().with_stall_timeout(Duration::from_millis(20));
    let mut video = VideoIn::open(config, slow_test_pattern).await.unwrap();

    assert!(matches!(video.capture().await, Err(CameraError::Stalled)));
}

#[tokio::test]
async fn test_worker_reconnects_after_session_loss() {
    let opens = Arc::new(AtomicUsize::new(0));
    let factory = {
        let opens = Arc::clone(&opens);
        move |_: &CameraConfig| -> Result<MockDriver, CameraError> {
            // the first session dies on its second requeue
            let driver = match opens.fetch_add(1, Ordering::SeqCst) {
                0 => MockDriver::new().failing_requeue_after(1),
                _ => MockDriver::new(),
            };
            Ok(driver)
        }
    };
    let mut video = VideoIn::open(test_config(), factory).await.unwrap();

    for _ in 0..6 {
        video.capture().await.unwrap();
    }
    assert_eq!(opens.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_worker_gives_up_after_reconnect_limit() {
    let opens = Arc::new(AtomicUsize::new(0));
    let factory = {
        let opens = Arc::clone(&opens);
        move |_: &CameraConfig| -> Result<MockDriver, CameraError> {
            match opens.fetch_add(1, Ordering::SeqCst) {
                0 => Ok(MockDriver::new().failing_requeue_after(0)),
                _ => Err(CameraError::Driver {
                    op: DriverOp::Open,
                    errno: libc::ENODEV,
                }),
            }
        }
    };
    let config = test_config().with_reconnect_limit(2);
    let mut video = VideoIn::open(config, factory).await.unwrap();

    assert!(matches!(video.capture().await, Err(CameraError::Channel(_))));
    assert_eq!(opens.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_drop_stops_worker_and_closes_device() {
    let log = Arc::new(Mutex::new(None));
    let factory = {
        let log = Arc::clone(&log);
        move |_: &CameraConfig| -> Result<MockDriver, CameraError> {
            let driver = MockDriver::new();
            *log.lock().unwrap() = Some(driver.log());
            Ok(driver)
        }
    };
    let mut video = VideoIn::open(test_config(), factory).await.unwrap();
    video.capture().await.unwrap();

    drop(video);

    let log = log.lock().unwrap().clone().unwrap();
    let recorded = calls(&log);
    assert_eq!(
        recorded[recorded.len() - 3..],
        [Call::StreamOff, Call::RequestBuffers(0), Call::Close]
    );
}
