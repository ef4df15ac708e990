use parking_lot::RwLock;
use std::sync::Arc;

/// Read-only handle onto the latest value published by a single writer.
///
/// Every `StateView` consumer (the operator HTTP surface, the risk engine's exposure
/// reads) sees the same snapshot semantics: a clone is cheap, and a read always observes a
/// complete, internally-consistent `T` rather than a partially-updated one.
#[derive(Debug)]
pub struct Snapshot<T> {
    inner: Arc<RwLock<Arc<T>>>,
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T> Snapshot<T> {
    pub fn new(initial: T) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(initial))) }
    }

    pub fn get(&self) -> Arc<T> {
        Arc::clone(&self.inner.read())
    }

    pub fn set(&self, value: T) {
        *self.inner.write() = Arc::new(value);
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let mut guard = self.inner.write();
        let new_value = f(&guard);
        *guard = Arc::new(new_value);
    }
}

/// Marker trait for the single-writer side of a [`Snapshot`], so that projection code can be
/// written generically over "a thing that owns and periodically republishes state" without
/// exposing `set`/`update` to read-only consumers.
pub trait StateView<T> {
    fn view(&self) -> Snapshot<T>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_observe_updates_from_the_writer() {
        let snapshot = Snapshot::new(0u32);
        let reader = snapshot.clone();

        snapshot.set(5);
        assert_eq!(*reader.get(), 5);

        snapshot.update(|v| v + 1);
        assert_eq!(*reader.get(), 6);
    }
}
