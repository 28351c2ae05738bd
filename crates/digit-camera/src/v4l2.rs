use {
    crate::*,
    digit_base::Vec2,
    digit_image::PixelFormat,
    std::os::raw::{c_int, c_ulong, c_void},
    v4l::{
        Device, FourCC,
        buffer::Type,
        memory::Memory,
        v4l_sys::{v4l2_buffer, v4l2_buffer__bindgen_ty_1, v4l2_requestbuffers},
        v4l2::{self, vidioc},
        video::Capture,
    },
};

// one poll slice while waiting for a filled buffer
const DEQUEUE_POLL_MS: c_int = 1000;

/// V4L2 capture device streaming into user-pointer buffers.
pub struct V4l2Driver {
    device: Option<Device>,
    path: String,
}

impl std::fmt::Debug for V4l2Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("V4l2Driver")
            .field("path", &self.path)
            .field("open", &self.device.is_some())
            .finish()
    }
}

impl V4l2Driver {
    pub fn open(path: &str) -> Result<Self, CameraError> {
        let device = Device::with_path(path).map_err(|e| CameraError::driver(DriverOp::Open, &e))?;
        log::info!("opened {}", path);
        Ok(Self {
            device: Some(device),
            path: path.to_string(),
        })
    }

    fn fd(&self, op: DriverOp) -> Result<c_int, CameraError> {
        self.device
            .as_ref()
            .map(|device| device.handle().fd())
            .ok_or(CameraError::Driver {
                op,
                errno: libc::EBADF,
            })
    }

    fn ioctl<T>(&self, op: DriverOp, request: vidioc::_IOC_TYPE, arg: &mut T) -> Result<(), CameraError> {
        let fd = self.fd(op)?;
        // SAFETY: arg is the struct this request expects and outlives the call
        unsafe { v4l2::ioctl(fd, request, arg as *mut T as *mut c_void) }
            .map_err(|e| CameraError::driver(op, &e))
    }

    fn buffer_desc() -> v4l2_buffer {
        v4l2_buffer {
            type_: Type::VideoCapture as u32,
            memory: Memory::UserPtr as u32,
            // SAFETY: all-zero is a valid v4l2_buffer
            ..unsafe { std::mem::zeroed() }
        }
    }

    fn wait_readable(&self) -> Result<(), CameraError> {
        let fd = self.fd(DriverOp::Dequeue)?;
        let mut pollfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        loop {
            // SAFETY: pollfd is a valid array of one entry
            let ready = unsafe { libc::poll(&mut pollfd, 1, DEQUEUE_POLL_MS) };
            match ready {
                0 => {
                    return Err(CameraError::Driver {
                        op: DriverOp::Dequeue,
                        errno: libc::ETIMEDOUT,
                    });
                }
                n if n > 0 => return Ok(()),
                _ => {
                    let error = std::io::Error::last_os_error();
                    if error.raw_os_error() != Some(libc::EINTR) {
                        return Err(CameraError::driver(DriverOp::Dequeue, &error));
                    }
                }
            }
        }
    }
}

impl CaptureDriver for V4l2Driver {
    fn set_format(&mut self, request: &FormatRequest) -> Result<Format, CameraError> {
        let device = self.device.as_ref().ok_or(CameraError::Driver {
            op: DriverOp::SetFormat,
            errno: libc::EBADF,
        })?;
        let fourcc = FourCC::new(&request.format.as_fourcc().to_le_bytes());
        let desired = v4l::Format::new(request.size.x as u32, request.size.y as u32, fourcc);
        let actual = Capture::set_format(device, &desired)
            .map_err(|e| CameraError::driver(DriverOp::SetFormat, &e))?;

        let format = PixelFormat::from_fourcc(u32::from_le_bytes(actual.fourcc.repr)).ok_or_else(|| {
            CameraError::Config(format!("unsupported pixel format: {}", actual.fourcc))
        })?;
        log::debug!(
            "{}: format {}x{} {} stride {} sizeimage {}",
            self.path,
            actual.width,
            actual.height,
            actual.fourcc,
            actual.stride,
            actual.size
        );
        Ok(Format {
            size: Vec2::new(actual.width as usize, actual.height as usize),
            format,
            bytes_per_line: actual.stride as usize,
            size_image: actual.size as usize,
        })
    }

    fn request_buffers(&mut self, count: u32, mode: BufferMode) -> Result<u32, CameraError> {
        // buffer cycling is driver-managed on mainline V4L2
        log::debug!("{}: requesting {} buffers ({:?})", self.path, count, mode);
        let mut request = v4l2_requestbuffers {
            count,
            type_: Type::VideoCapture as u32,
            memory: Memory::UserPtr as u32,
            // SAFETY: all-zero is a valid v4l2_requestbuffers
            ..unsafe { std::mem::zeroed() }
        };
        self.ioctl(DriverOp::RequestBuffers, vidioc::VIDIOC_REQBUFS, &mut request)?;
        Ok(request.count)
    }

    fn queue(&mut self, buffer: &BufferDescriptor) -> Result<(), CameraError> {
        let mut desc = v4l2_buffer {
            index: buffer.index,
            m: v4l2_buffer__bindgen_ty_1 {
                userptr: buffer.addr as c_ulong,
            },
            length: buffer.length as u32,
            ..Self::buffer_desc()
        };
        self.ioctl(DriverOp::Queue, vidioc::VIDIOC_QBUF, &mut desc)
    }

    fn dequeue(&mut self) -> Result<BufferDescriptor, CameraError> {
        self.wait_readable()?;
        let mut desc = Self::buffer_desc();
        self.ioctl(DriverOp::Dequeue, vidioc::VIDIOC_DQBUF, &mut desc)?;
        Ok(BufferDescriptor {
            index: desc.index,
            // SAFETY: USERPTR buffers report through the userptr member
            addr: unsafe { desc.m.userptr } as usize,
            length: desc.length as usize,
            bytes_used: desc.bytesused as usize,
            sequence: desc.sequence,
        })
    }

    fn stream_on(&mut self) -> Result<(), CameraError> {
        let mut buffer_type = Type::VideoCapture as c_int;
        self.ioctl(DriverOp::StreamOn, vidioc::VIDIOC_STREAMON, &mut buffer_type)
    }

    fn stream_off(&mut self) -> Result<(), CameraError> {
        let mut buffer_type = Type::VideoCapture as c_int;
        self.ioctl(DriverOp::StreamOff, vidioc::VIDIOC_STREAMOFF, &mut buffer_type)
    }

    fn close(&mut self) {
        if self.device.take().is_some() {
            log::info!("closed {}", self.path);
        }
    }
}
