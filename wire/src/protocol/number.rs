//! Decimal fields of the header lines.

use lexical_core::{FromLexical, ToLexical};

/// Parse an ASCII decimal field. Surrounding spaces are ignored.
pub(crate) fn parse_decimal<T: FromLexical>(field: &[u8]) -> Option<T> {
    let field = field.trim_ascii();
    if field.is_empty() {
        return None;
    }
    lexical_core::parse::<T>(field).ok()
}

pub(crate) fn push_decimal<T: ToLexical>(out: &mut Vec<u8>, value: T) {
    let mut buf = [0u8; lexical_core::BUFFER_SIZE];
    let digits = lexical_core::write(value, &mut buf);
    out.extend_from_slice(digits);
}
