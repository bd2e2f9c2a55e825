//! Storage root bootstrap.
//!
//! Permissions are checked by attempting real operations rather than reading
//! mode bits:
//!   - read: list entries (`read_dir`)
//!   - write: create and remove a scratch file
//!   - execute: traverse, approximated by `canonicalize`

use crate::err::Result;
use crate::ferry_error;
use crate::global_var::LOGGER;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Result of probing directory permissions for the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirPermissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool,
}

impl DirPermissions {
    pub const fn none() -> Self {
        Self {
            read: false,
            write: false,
            execute: false,
        }
    }

    pub fn all_granted(&self) -> bool {
        self.read && self.write && self.execute
    }
}

pub fn check_dir_permissions<P: AsRef<Path>>(dir: P) -> DirPermissions {
    let dir = dir.as_ref();
    match fs::metadata(dir) {
        Ok(md) if md.is_dir() => {}
        _ => return DirPermissions::none(),
    }
    DirPermissions {
        read: fs::read_dir(dir).is_ok(),
        write: try_create_ephemeral_file(dir).unwrap_or(false),
        execute: fs::canonicalize(dir).is_ok(),
    }
}

fn try_create_ephemeral_file(dir: &Path) -> io::Result<bool> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let path: PathBuf = dir.join(format!(".perm_check_{}_{}.tmp", std::process::id(), nanos));

    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => {
            drop(file);
            let _ = fs::remove_file(&path);
            Ok(true)
        }
        Err(_) => Ok(false),
    }
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

/// Make sure the storage root exists and is usable, creating it owner-only
/// (0700) if absent.
pub fn ensure_storage_root<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    match fs::metadata(dir) {
        Ok(md) if md.is_dir() => {}
        Ok(_) => {
            return Err(ferry_error!("storage root {} is not a directory", dir.display()).into());
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            create_private_dir(dir)?;
            LOGGER.info(format!("Created storage root {}", dir.display()));
        }
        Err(e) => return Err(e.into()),
    }

    let perms = check_dir_permissions(dir);
    if !perms.all_granted() {
        return Err(ferry_error!(
            "Insufficient permissions for storage root '{}': read={}, write={}, execute={}",
            dir.display(),
            perms.read,
            perms.write,
            perms.execute
        )
        .into());
    }
    Ok(())
}
