use ferry_wire::{FileMeta, FileName};
use std::io;
use std::path::{Path, PathBuf};

/// The flat directory of served files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &FileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Size and mtime of a stored file; `None` when absent or not a regular file.
    pub async fn stat(&self, name: &FileName) -> io::Result<Option<FileMeta>> {
        match tokio::fs::metadata(self.path_of(name)).await {
            Ok(md) if md.is_file() => FileMeta::from_metadata(&md).map(Some),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::temp_dir::TmpDirGuard;

    #[tokio::test]
    async fn stat_reports_regular_files_only() {
        let tmp = TmpDirGuard::new("store_stat");
        let store = FileStore::new(tmp.path());
        let name = FileName::new("a.txt").unwrap();

        assert_eq!(store.stat(&name).await.unwrap(), None);

        std::fs::write(store.path_of(&name), b"hello").unwrap();
        let meta = store.stat(&name).await.unwrap().expect("stored file");
        assert_eq!(meta.size, 5);
        assert!(meta.mtime > 0);

        let dir = FileName::new("sub").unwrap();
        std::fs::create_dir(store.path_of(&dir)).unwrap();
        assert_eq!(store.stat(&dir).await.unwrap(), None);
    }

    #[test]
    fn paths_stay_under_the_root() {
        let store = FileStore::new("/srv/files");
        let name = FileName::new("report.pdf").unwrap();
        assert_eq!(store.path_of(&name), PathBuf::from("/srv/files/report.pdf"));
        assert_eq!(store.root(), Path::new("/srv/files"));
    }
}
