mod fs_lock;
mod fs_op;
mod store;
mod util;

pub use fs_lock::{GlobalLock, LockPolicy, StoreGuard};
pub use fs_op::{FileExecutor, FileOpError, OpReport};
pub use store::FileStore;
pub use util::{DirPermissions, check_dir_permissions, ensure_storage_root};
