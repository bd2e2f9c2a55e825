use crate::error::ClientError;
use ferry_wire::{FileMeta, FileName};
use filetime::{FileTime, set_file_mtime};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const PART_SUFFIX: &str = ".part";
const CREATE_ATTEMPTS: u32 = 16;

static DOWNLOAD_SEQ: AtomicU64 = AtomicU64::new(0);

/// The client's flat mirror of server files. A cached file's mtime is the
/// server mtime it was downloaded at.
#[derive(Debug, Clone)]
pub struct LocalCache {
    root: PathBuf,
}

fn local_error(msg: String, e: io::Error) -> ClientError {
    ClientError::LocalFileError(msg, e.to_string())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

impl LocalCache {
    /// Use `root` as the cache, creating it (mode 0700) if absent.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let root = root.into();
        if !root.is_dir() {
            create_private_dir(&root)
                .map_err(|e| local_error(format!("cannot create {}", root.display()), e))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, name: &FileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Size and mtime of the local copy; `None` when there is no regular file.
    pub fn meta(&self, name: &FileName) -> Result<Option<FileMeta>, ClientError> {
        let path = self.path_of(name);
        match fs::metadata(&path) {
            Ok(md) if md.is_file() => FileMeta::from_metadata(&md)
                .map(Some)
                .map_err(|e| local_error(format!("cannot stat {}", path.display()), e)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(local_error(format!("cannot stat {}", path.display()), e)),
        }
    }

    /// The timestamp to send with GET: the local mtime, or 0 when there is
    /// no usable copy.
    pub fn cached_mtime(&self, name: &FileName) -> Result<i64, ClientError> {
        Ok(self
            .meta(name)?
            .map(|m| m.mtime)
            .filter(|mtime| *mtime > 0)
            .unwrap_or(0))
    }

    /// Start receiving `name` into a temporary file beside the cache entry.
    /// The temporary name has a fixed length so any valid filename fits.
    pub fn begin_download(&self, name: &FileName) -> Result<Download, ClientError> {
        let mut attempt = 0;
        loop {
            let tmp = self.root.join(format!(
                ".ferry-{}-{}{}",
                std::process::id(),
                DOWNLOAD_SEQ.fetch_add(1, Ordering::Relaxed),
                PART_SUFFIX
            ));
            match File::create_new(&tmp) {
                Ok(file) => {
                    return Ok(Download {
                        file: Some(BufWriter::new(file)),
                        tmp,
                        target: self.path_of(name),
                        committed: false,
                    });
                }
                Err(e)
                    if e.kind() == io::ErrorKind::AlreadyExists && attempt < CREATE_ATTEMPTS =>
                {
                    attempt += 1;
                }
                Err(e) => {
                    return Err(local_error(format!("cannot create {}", tmp.display()), e));
                }
            }
        }
    }
}

/// A download in progress. Dropped without [`Download::commit`], it removes
/// its temporary file and leaves the previous cache entry alone.
pub struct Download {
    file: Option<BufWriter<File>>,
    tmp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl Download {
    pub fn write(&mut self, chunk: &[u8]) -> Result<(), ClientError> {
        let Some(file) = self.file.as_mut() else {
            return Err(ClientError::LocalFileError(
                format!("{} is already closed", self.tmp.display()),
                String::new(),
            ));
        };
        file.write_all(chunk)
            .map_err(|e| local_error(format!("cannot write {}", self.tmp.display()), e))
    }

    /// Stamp the server mtime and move the file into place.
    pub fn commit(mut self, mtime: i64) -> Result<PathBuf, ClientError> {
        if let Some(file) = self.file.take() {
            file.into_inner()
                .map_err(|e| {
                    local_error(format!("cannot flush {}", self.tmp.display()), e.into_error())
                })?
                .sync_all()
                .map_err(|e| local_error(format!("cannot sync {}", self.tmp.display()), e))?;
        }
        set_file_mtime(&self.tmp, FileTime::from_unix_time(mtime, 0))
            .map_err(|e| local_error(format!("cannot set mtime on {}", self.tmp.display()), e))?;
        fs::rename(&self.tmp, &self.target)
            .map_err(|e| local_error(format!("cannot replace {}", self.target.display()), e))?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for Download {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = fs::remove_file(&self.tmp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::test_support::{ScratchDir, part_files};

    fn name(s: &str) -> FileName {
        FileName::new(s).unwrap()
    }

    #[test]
    fn open_creates_the_root() {
        let tmp = ScratchDir::new("cache_open");
        let root = tmp.path().join("client_files");
        let cache = LocalCache::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(cache.root(), root.as_path());
    }

    #[test]
    fn absent_file_means_timestamp_zero() {
        let tmp = ScratchDir::new("cache_absent");
        let cache = LocalCache::open(tmp.path()).unwrap();
        assert_eq!(cache.cached_mtime(&name("a.txt")).unwrap(), 0);
        assert_eq!(cache.meta(&name("a.txt")).unwrap(), None);
    }

    #[test]
    fn committed_download_carries_server_mtime() {
        let tmp = ScratchDir::new("cache_commit");
        let cache = LocalCache::open(tmp.path()).unwrap();

        let mut download = cache.begin_download(&name("a.txt")).unwrap();
        download.write(b"hel").unwrap();
        download.write(b"lo").unwrap();
        let path = download.commit(1_600_000_000).unwrap();

        assert_eq!(path, cache.path_of(&name("a.txt")));
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert_eq!(cache.cached_mtime(&name("a.txt")).unwrap(), 1_600_000_000);
        assert!(part_files(tmp.path()).is_empty());
    }

    #[test]
    fn abandoned_download_keeps_previous_entry() {
        let tmp = ScratchDir::new("cache_abandon");
        let cache = LocalCache::open(tmp.path()).unwrap();
        fs::write(cache.path_of(&name("a.txt")), b"old").unwrap();

        let mut download = cache.begin_download(&name("a.txt")).unwrap();
        download.write(b"partial").unwrap();
        drop(download);

        assert_eq!(fs::read(cache.path_of(&name("a.txt"))).unwrap(), b"old");
        assert!(part_files(tmp.path()).is_empty());
    }

    #[test]
    fn longest_valid_name_downloads() {
        let tmp = ScratchDir::new("cache_long_name");
        let cache = LocalCache::open(tmp.path()).unwrap();
        let long = name(&"x".repeat(255));

        let mut download = cache.begin_download(&long).unwrap();
        download.write(b"hello").unwrap();
        let path = download.commit(1_600_000_000).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert!(part_files(tmp.path()).is_empty());
    }

    #[test]
    fn downloads_use_distinct_temporary_files() {
        let tmp = ScratchDir::new("cache_clash");
        let cache = LocalCache::open(tmp.path()).unwrap();
        let first = cache.begin_download(&name("a.txt")).unwrap();
        let second = cache.begin_download(&name("a.txt")).unwrap();
        assert_ne!(first.tmp, second.tmp);
    }

    #[test]
    fn pre_epoch_mtime_is_not_sent() {
        let tmp = ScratchDir::new("cache_epoch");
        let cache = LocalCache::open(tmp.path()).unwrap();
        let path = cache.path_of(&name("old.txt"));
        fs::write(&path, b"x").unwrap();
        set_file_mtime(&path, FileTime::from_unix_time(0, 0)).unwrap();
        assert_eq!(cache.cached_mtime(&name("old.txt")).unwrap(), 0);
    }
}
