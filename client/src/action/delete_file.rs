use crate::action::conn::Connection;
use crate::error::ClientError;
use ferry_wire::{Command, FileName, Request, ResponseHeader};
use std::net::SocketAddr;

pub fn delete_file(server: SocketAddr, name: &FileName) -> Result<ResponseHeader, ClientError> {
    let mut conn = Connection::open(server, None)?;
    conn.send_request(&Request::Delete {
        filename: name.clone(),
    })?;
    let (header, _) = conn.read_response(Command::Delete)?;
    Ok(header)
}
