/// Accounting for a body framed by a declared size.
///
/// Every chunk that reaches the body (the leftover behind the header, then
/// each read from the connection) goes through [`BodyCursor::accept`], which
/// clips it to the bytes still owed. Reads sized with
/// [`BodyCursor::read_len`] never pull bytes past the end of the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyCursor {
    declared: u64,
    received: u64,
}

impl BodyCursor {
    pub fn new(declared: u64) -> Self {
        Self {
            declared,
            received: 0,
        }
    }

    pub fn declared(&self) -> u64 {
        self.declared
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn remaining(&self) -> u64 {
        self.declared - self.received
    }

    pub fn is_complete(&self) -> bool {
        self.received == self.declared
    }

    /// Record `chunk` as received, returning the part that belongs to the body.
    pub fn accept<'a>(&mut self, chunk: &'a [u8]) -> &'a [u8] {
        let take = self.read_len(chunk.len());
        self.received += take as u64;
        &chunk[..take]
    }

    pub fn read_len(&self, capacity: usize) -> usize {
        self.remaining().min(capacity as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_until_declared_size() {
        let mut body = BodyCursor::new(5);
        assert_eq!(body.accept(b"he"), b"he");
        assert_eq!(body.remaining(), 3);
        assert!(!body.is_complete());
        assert_eq!(body.accept(b"llo"), b"llo");
        assert!(body.is_complete());
        assert_eq!(body.accept(b"more"), b"");
        assert_eq!(body.received(), 5);
    }

    #[test]
    fn clips_surplus_in_one_chunk() {
        let mut body = BodyCursor::new(3);
        assert_eq!(body.accept(b"abcdef"), b"abc");
        assert!(body.is_complete());
    }

    #[test]
    fn read_len_never_overshoots() {
        let mut body = BodyCursor::new(10_000);
        assert_eq!(body.read_len(4096), 4096);
        body.accept(&[0u8; 8000]);
        assert_eq!(body.read_len(4096), 2000);
        body.accept(&[0u8; 2000]);
        assert_eq!(body.read_len(4096), 0);
    }

    #[test]
    fn empty_body_is_complete_immediately() {
        let body = BodyCursor::new(0);
        assert!(body.is_complete());
        assert_eq!(body.read_len(4096), 0);
    }
}
