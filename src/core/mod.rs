mod connection;
mod server;

pub use connection::{ConnectionHandler, HandlerLimits, Served};
pub use server::{RunningServer, start};
