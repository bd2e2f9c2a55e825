use crate::global_var::LOGGER;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// A scratch directory that is removed, with its contents, on drop.
#[derive(Debug)]
pub struct TmpDirGuard(pub PathBuf);

impl TmpDirGuard {
    /// Create a fresh directory under the system temp dir.
    ///
    /// Panics if the directory cannot be created; meant for tests and tooling.
    pub fn new(prefix: &str) -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "{}_{}_{}_{}",
            prefix,
            std::process::id(),
            nanos,
            seq
        ));
        if let Err(e) = std::fs::create_dir_all(&path) {
            panic!("failed to create scratch dir {}: {}", path.display(), e);
        }
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TmpDirGuard {
    fn drop(&mut self) {
        LOGGER.trace(format!(
            "TmpDirGuard dropping, removing temporary directory: {:?}",
            &self.0
        ));
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

impl From<PathBuf> for TmpDirGuard {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl AsRef<Path> for TmpDirGuard {
    fn as_ref(&self) -> &Path {
        self.0.as_path()
    }
}

impl Deref for TmpDirGuard {
    type Target = PathBuf;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
