//! Owned handles to mapped GPU resources.

use std::fmt;

use crate::NativeTexture;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// An exclusively owned mapping of a native GPU resource.
///
/// Backends push one release action per acquisition step (map, interop
/// registration, allocation). Dropping the handle runs them in strict
/// reverse-acquisition order, so teardown is always unmap → unregister
/// → free. Handles are move-only; a mapping is never shared.
pub struct BufferHandle {
    native: NativeTexture,
    releasers: Vec<ReleaseFn>,
}

impl BufferHandle {
    /// Create a handle over a mapped native resource.
    pub fn new(native: NativeTexture) -> Self {
        Self {
            native,
            releasers: Vec::new(),
        }
    }

    /// Register a release action. Actions run in reverse registration
    /// order when the handle is dropped.
    pub fn push_release(&mut self, release: impl FnOnce() + Send + 'static) {
        self.releasers.push(Box::new(release));
    }

    /// The mapped native resource reference.
    pub fn native(&self) -> NativeTexture {
        self.native
    }
}

impl Drop for BufferHandle {
    fn drop(&mut self) {
        while let Some(release) = self.releasers.pop() {
            release();
        }
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferHandle")
            .field("native", &self.native)
            .field("releasers", &self.releasers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_release_runs_in_reverse_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut handle = BufferHandle::new(NativeTexture::from_raw(0x10));

        for step in 0..3 {
            let order = Arc::clone(&order);
            handle.push_release(move || order.lock().push(step));
        }

        drop(handle);
        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }

    #[test]
    fn test_release_runs_exactly_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut handle = BufferHandle::new(NativeTexture::from_raw(0));
        let c = Arc::clone(&count);
        handle.push_release(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        drop(handle);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
