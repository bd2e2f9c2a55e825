use async_trait::async_trait;
use ferry_wire::FileName;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Decides when a file operation may touch the store.
///
/// `acquire` waits until the caller may work on `filename` and returns a
/// guard; the right lasts until the guard is dropped.
#[async_trait]
pub trait LockPolicy: Send + Sync + Debug {
    async fn acquire(&self, filename: &FileName) -> StoreGuard;
}

/// Held for the whole of one file operation. Dropping it releases the store.
pub struct StoreGuard {
    _held: Box<dyn Send>,
}

impl StoreGuard {
    pub fn new<G: Send + 'static>(held: G) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl Debug for StoreGuard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("StoreGuard")
    }
}

/// One exclusive lock for the entire store: at most one operation runs at a
/// time, whatever file it names.
#[derive(Debug, Clone, Default)]
pub struct GlobalLock {
    inner: Arc<Mutex<()>>,
}

impl GlobalLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LockPolicy for GlobalLock {
    async fn acquire(&self, _filename: &FileName) -> StoreGuard {
        StoreGuard::new(self.inner.clone().lock_owned().await)
    }
}
