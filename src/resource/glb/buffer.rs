use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{LoadError, LoadResult};

/// Ledger for the binary chunk buffers of one or more GLB documents.
///
/// Cloning the store shares the ledger, so a caller can hand a clone to the parser and still observe
/// how many buffers are alive after the document has been dropped.
#[derive(Clone, Default, Debug)]
pub struct NativeBufferStore {
    ledger: Arc<BufferLedger>,
}

#[derive(Default, Debug)]
struct BufferLedger {
    live_buffers: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl NativeBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies `data` into a new buffer owned by the caller.
    pub fn allocate(&self, data: &[u8]) -> NativeBuffer {
        self.ledger.live_buffers.fetch_add(1, Ordering::AcqRel);
        self.ledger.live_bytes.fetch_add(data.len(), Ordering::AcqRel);

        NativeBuffer {
            data: data.to_vec().into_boxed_slice(),
            ledger: self.ledger.clone(),
        }
    }

    pub fn live_buffers(&self) -> usize {
        self.ledger.live_buffers.load(Ordering::Acquire)
    }

    pub fn live_bytes(&self) -> usize {
        self.ledger.live_bytes.load(Ordering::Acquire)
    }
}

/// A read-only block of bytes backing one BIN chunk.
pub struct NativeBuffer {
    data: Box<[u8]>,
    ledger: Arc<BufferLedger>,
}

impl NativeBuffer {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn slice(&self, offset: usize, length: usize) -> LoadResult<&[u8]> {
        let end = offset.checked_add(length).ok_or_else(|| {
            LoadError::InvalidGlb(format!(
                "Buffer range overflows: offset {offset}, length {length}"
            ))
        })?;

        self.data.get(offset..end).ok_or_else(|| {
            LoadError::InvalidGlb(format!(
                "Buffer range {offset}..{end} exceeds the buffer length of {}",
                self.data.len()
            ))
        })
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        self.ledger.live_buffers.fetch_sub(1, Ordering::AcqRel);
        self.ledger
            .live_bytes
            .fetch_sub(self.data.len(), Ordering::AcqRel);
    }
}

impl std::fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("len", &self.data.len())
            .finish()
    }
}
