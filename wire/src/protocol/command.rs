use crate::err::ProtocolError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Get,
    Put,
    Delete,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Get => "GET",
            Command::Put => "PUT",
            Command::Delete => "DELETE",
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Commands are case-sensitive.
impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Command::Get),
            "PUT" => Ok(Command::Put),
            "DELETE" => Ok(Command::Delete),
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}
