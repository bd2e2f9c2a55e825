use crate::constants::MAX_FILENAME_BYTES;
use crate::err::ProtocolError;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// A flat file name: one path component, at most 255 bytes, no separators
/// and no whitespace (whitespace delimits the request line's fields).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    pub fn new(name: impl Into<String>) -> Result<Self, ProtocolError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= MAX_FILENAME_BYTES
            && name != "."
            && name != ".."
            && !name
                .bytes()
                .any(|b| b == b'/' || b == b'\\' || b == 0 || b.is_ascii_whitespace());
        if valid {
            Ok(Self(name))
        } else {
            Err(ProtocolError::InvalidFileName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for FileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FileName {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for FileName {
    type Error = ProtocolError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<str> for FileName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<Path> for FileName {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}
