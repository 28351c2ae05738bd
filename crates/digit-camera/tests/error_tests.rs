use digit_camera::{CameraError, DriverOp, IntegrityCheck, SessionState};

#[test]
fn test_transient_classification() {
    let dequeue = CameraError::Driver {
        op: DriverOp::Dequeue,
        errno: libc::EAGAIN,
    };
    let queue = CameraError::Driver {
        op: DriverOp::Queue,
        errno: libc::EIO,
    };
    let integrity = CameraError::Integrity(IntegrityCheck::Oversize {
        bytes_used: 10,
        limit: 5,
    });
    assert!(dequeue.is_transient());
    assert!(queue.is_transient());
    assert!(integrity.is_transient());

    let fatal = [
        CameraError::Config("bad".to_string()),
        CameraError::Alloc { index: 0, size: 1 },
        CameraError::Driver {
            op: DriverOp::SetFormat,
            errno: libc::EINVAL,
        },
        CameraError::Driver {
            op: DriverOp::StreamOn,
            errno: libc::EIO,
        },
        CameraError::NotStreaming(SessionState::Failed),
        CameraError::Stalled,
        CameraError::Channel("closed".to_string()),
    ];
    assert!(fatal.iter().all(|e| !e.is_transient()));
}

#[test]
fn test_from_io_error_keeps_errno() {
    let io_err = std::io::Error::from_raw_os_error(libc::EBUSY);
    match CameraError::driver(DriverOp::RequestBuffers, &io_err) {
        CameraError::Driver { op, errno } => {
            assert_eq!(op, DriverOp::RequestBuffers);
            assert_eq!(errno, libc::EBUSY);
        }
        other => panic!("Expected CameraError::Driver, got {other:?}"),
    }
}

#[test]
fn test_error_display() {
    let err = CameraError::Driver {
        op: DriverOp::StreamOn,
        errno: libc::EIO,
    };
    let text = err.to_string();
    assert!(text.contains("stream on"));
    assert!(text.contains(&format!("errno {}", libc::EIO)));

    let err = CameraError::Alloc { index: 2, size: 153600 };
    assert!(err.to_string().contains("buffer 2 of 153600 bytes"));

    let err: CameraError = IntegrityCheck::AddressMismatch {
        index: 1,
        addr: 0xbeef,
    }
    .into();
    assert!(err.to_string().contains("0xbeef"));

    assert!(CameraError::Stalled.to_string().contains("stalled"));
}
