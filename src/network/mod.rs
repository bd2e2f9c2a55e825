mod tcp_conn;
mod tcp_listener;

pub use tcp_conn::{TcpConn, TcpConnConfig};
pub use tcp_listener::{ListenerHandle, TcpListener};
