pub mod config;
pub mod constants;
pub mod core;
pub mod err;
pub mod fs;
pub mod global_var;
pub mod network;
pub mod utilities;

pub use crate::core::{RunningServer, start};
