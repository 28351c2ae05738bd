use {
    crate::*,
    std::{alloc::Layout, ptr::NonNull, sync::Arc},
};

/// Alignment of every capture buffer.
pub const BUFFER_ALIGN: usize = 32;

/// Source of raw capture memory.
pub trait FrameAllocator: Send + Sync {
    /// Allocate a block for `layout`, or `None` when memory is exhausted.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must have come from `allocate` on this allocator with the same
    /// `layout`, and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Heap allocator honoring the requested alignment.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlignedAllocator;

impl FrameAllocator for AlignedAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded from the caller
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// One aligned capture buffer, freed on drop.
pub struct FrameBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
    allocator: Arc<dyn FrameAllocator>,
}

// SAFETY: the buffer exclusively owns its allocation
unsafe impl Send for FrameBuffer {}
unsafe impl Sync for FrameBuffer {}

impl FrameBuffer {
    fn allocate(layout: Layout, allocator: &Arc<dyn FrameAllocator>) -> Option<Self> {
        let ptr = allocator.allocate(layout)?;
        // SAFETY: ptr is valid for layout.size() bytes
        unsafe { ptr.as_ptr().write_bytes(0, layout.size()) };
        Some(Self {
            ptr,
            layout,
            allocator: Arc::clone(allocator),
        })
    }

    /// Address registered with the driver.
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: allocated and zero-initialized for len() bytes
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusive access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("addr", &format_args!("{:#x}", self.addr()))
            .field("len", &self.layout.size())
            .finish()
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr came from this allocator with this layout
        unsafe { self.allocator.deallocate(self.ptr, self.layout) };
    }
}

/// Fixed set of equally sized capture buffers, allocated all at once.
///
/// The pool is also the registry the capture loop checks dequeued
/// descriptors against.
#[derive(Debug, Default)]
pub struct BufferPool {
    buffers: Vec<FrameBuffer>,
    buffer_len: usize,
}

impl BufferPool {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Allocate `count` buffers of `size` bytes aligned to `align`.
    ///
    /// Either every buffer is allocated or none is: on failure the buffers
    /// allocated so far are freed before the error is returned.
    pub fn allocate(
        count: usize,
        size: usize,
        align: usize,
        allocator: Arc<dyn FrameAllocator>,
    ) -> Result<Self, CameraError> {
        if count == 0 {
            return Err(CameraError::Config("buffer count must be at least 1".to_string()));
        }
        if size == 0 {
            return Err(CameraError::Config("buffer size must be non-zero".to_string()));
        }
        let layout = Layout::from_size_align(size, align).map_err(|e| {
            CameraError::Config(format!("invalid buffer layout ({size} bytes, align {align}): {e}"))
        })?;

        let mut buffers = Vec::with_capacity(count);
        for index in 0..count {
            match FrameBuffer::allocate(layout, &allocator) {
                Some(buffer) => buffers.push(buffer),
                None => {
                    log::error!(
                        "allocating buffer {} of {} failed, releasing {} buffers",
                        index,
                        count,
                        buffers.len()
                    );
                    return Err(CameraError::Alloc { index, size });
                }
            }
        }
        log::debug!("allocated {} buffers of {} bytes", count, size);

        Ok(Self {
            buffers,
            buffer_len: size,
        })
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Length of every buffer in the pool.
    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    pub fn slot(&self, index: usize) -> Option<&FrameBuffer> {
        self.buffers.get(index)
    }

    /// Index of the buffer registered at `addr`.
    pub fn index_of(&self, addr: usize) -> Option<usize> {
        self.buffers.iter().position(|buffer| buffer.addr() == addr)
    }

    /// The descriptor to queue for slot `index`.
    pub fn descriptor(&self, index: usize) -> Option<BufferDescriptor> {
        self.slot(index).map(|buffer| BufferDescriptor {
            index: index as u32,
            addr: buffer.addr(),
            length: buffer.len(),
            bytes_used: 0,
            sequence: 0,
        })
    }

    /// Check a dequeued descriptor against the registry.
    ///
    /// The index, address and size checks all run before the verdict; the
    /// first failing one is reported. `capacity` is the destination size.
    pub fn validate(&self, desc: &BufferDescriptor, capacity: usize) -> Result<usize, IntegrityCheck> {
        let index = desc.index as usize;
        let slot = self.slot(index);

        let index_check = match slot {
            Some(_) => None,
            None => Some(IntegrityCheck::IndexOutOfRange {
                index: desc.index,
                count: self.len(),
            }),
        };

        let address_ok = match slot {
            Some(buffer) => buffer.addr() == desc.addr,
            None => self.index_of(desc.addr).is_some(),
        };
        let address_check = (!address_ok).then_some(IntegrityCheck::AddressMismatch {
            index: desc.index,
            addr: desc.addr,
        });

        let limit = slot.map_or(self.buffer_len, FrameBuffer::len).min(capacity);
        let size_check = (desc.bytes_used > limit).then_some(IntegrityCheck::Oversize {
            bytes_used: desc.bytes_used,
            limit,
        });

        match [index_check, address_check, size_check].into_iter().flatten().next() {
            Some(check) => Err(check),
            None => Ok(index),
        }
    }

    /// Free every buffer. Safe to call on an empty pool.
    pub fn release(&mut self) {
        if !self.buffers.is_empty() {
            log::debug!("freeing {} buffers", self.buffers.len());
        }
        self.buffers.clear();
    }
}
