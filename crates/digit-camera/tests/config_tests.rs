use digit_camera::{BufferMode, CameraConfig};
use digit_image::PixelFormat;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = CameraConfig::default();
    assert_eq!(config.device(), "/dev/video0");
    assert_eq!(config.width(), 320);
    assert_eq!(config.height(), 240);
    assert_eq!(config.format(), PixelFormat::Uyvy);
    assert_eq!(config.buffer_count(), 3);
    assert_eq!(config.buffer_mode(), BufferMode::Ring);
    assert_eq!(config.retry_limit(), 3);
    assert_eq!(config.retry_delay(), Duration::from_millis(10));
    assert_eq!(config.reconnect_limit(), 3);
    assert_eq!(config.reconnect_delay(), Duration::from_millis(100));
    assert_eq!(config.stall_timeout(), Duration::from_secs(5));
}

#[test]
fn test_builder_pattern() {
    let config = CameraConfig::default()
        .with_device("/dev/video2".to_string())
        .with_width(640)
        .with_height(480)
        .with_format(PixelFormat::Yuyv)
        .with_buffer_count(5)
        .with_buffer_mode(BufferMode::Fifo)
        .with_retry_limit(1)
        .with_stall_timeout(Duration::from_secs(1));

    assert_eq!(config.device(), "/dev/video2");
    assert_eq!(config.size().x, 640);
    assert_eq!(config.size().y, 480);
    assert_eq!(config.format(), PixelFormat::Yuyv);
    assert_eq!(config.buffer_count(), 5);
    assert_eq!(config.buffer_mode(), BufferMode::Fifo);
    assert_eq!(config.retry_limit(), 1);
    assert_eq!(config.stall_timeout(), Duration::from_secs(1));
}
