use std::fmt::{Debug, Display, Formatter};

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// An error message stamped with the source location that raised it.
pub struct FerryError {
    err: String,
    file: &'static str,
    line: u32,
    source: Option<Error>,
}

impl FerryError {
    pub fn new(
        err: impl Into<String>,
        file: &'static str,
        line: u32,
        source: Option<Error>,
    ) -> Self {
        Self {
            err: err.into(),
            file,
            line,
            source,
        }
    }
}

#[macro_export]
macro_rules! ferry_error {
    ($fmt:expr $(, $($args:tt)*)?) => {
        $crate::err::FerryError::new(
            format!($fmt $(,$($args)*)?),
            file!(), line!(), None)
    };
}

#[macro_export]
macro_rules! ferry_error_with_source {
    ($source:expr, $fmt:expr $(, $($args:tt)*)?) => {
        $crate::err::FerryError::new(
            format!($fmt $(,$($args)*)?),
            file!(), line!(), Some(Box::new($source) as $crate::err::Error))
    }
}

impl Debug for FerryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]:{} {}", self.file, self.line, self.err)
    }
}

impl Display for FerryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.err, source),
            None => write!(f, "{}", self.err),
        }
    }
}

impl std::error::Error for FerryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    #[test]
    fn debug_carries_location_and_display_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = crate::ferry_error_with_source!(io, "cannot open {}", "a.txt");
        assert_eq!(err.to_string(), "cannot open a.txt: gone");
        assert!(format!("{:?}", err).contains("src/err/mod.rs"));
        assert!(err.source().is_some());

        let plain = crate::ferry_error!("no source");
        assert_eq!(plain.to_string(), "no source");
        assert!(plain.source().is_none());
    }
}
