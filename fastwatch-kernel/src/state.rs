use arc_swap::ArcSwap;
use std::sync::Arc;

/// Atomically replaceable value shared between the refresh cycle and readers.
///
/// Readers take a full `Arc` and keep a consistent view for as long as they
/// hold it; the writer swaps the whole value in one step. Neither side waits
/// on the other.
pub struct Published<T> {
    inner: ArcSwap<T>,
}

impl<T> Published<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ArcSwap::from_pointee(value),
        }
    }

    pub fn load(&self) -> Arc<T> {
        self.inner.load_full()
    }

    pub fn store(&self, value: T) {
        self.inner.store(Arc::new(value));
    }
}

impl<T: Default> Default for Published<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
