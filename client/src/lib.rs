pub mod action;
pub mod cli;
pub mod error;
pub mod format;

pub use action::cache::LocalCache;
pub use action::delete_file::delete_file;
pub use action::get_file::{Fetched, GetOutcome, get_file};
pub use action::put_file::{Uploaded, put_file};
pub use error::ClientError;

pub const DEFAULT_CLIENT_ROOT: &str = "./client_files";
