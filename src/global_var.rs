use crate::utilities::AsyncLogger;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

pub static LOGGER_CELL: OnceLock<AsyncLogger> = OnceLock::new();
pub(crate) static LOGGER: crate::utilities::logger::Logger = crate::utilities::logger::Logger;

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(on: bool) {
    DEBUG_MODE.store(on, Ordering::Relaxed);
}

pub fn debug_mode() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}
