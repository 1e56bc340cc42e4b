/// A cursor for byte-by-byte HTML scanning with position tracking.
///
/// Only ever stops on ASCII delimiters, so every position it reports
/// is a valid `str` boundary for slicing.
#[derive(Clone)]
pub struct Cursor<'a> {
    /// The string being scanned.
    pub s: &'a str,
    /// Current byte index into `s`.
    pub i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn pos(&self) -> usize {
        self.i
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    /// Peeks at the current byte without advancing.
    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    /// Peeks `n` bytes ahead of the current position.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.s.as_bytes().get(self.i + n).copied()
    }

    pub fn starts_with(&self, pat: &[u8]) -> bool {
        self.s.as_bytes()[self.i.min(self.s.len())..].starts_with(pat)
    }

    /// Advances by one byte, returning the consumed byte.
    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.i += 1;
        Some(b)
    }

    /// Advances by `n` bytes, clamped to the end of input.
    pub fn bump_n(&mut self, n: usize) {
        self.i = (self.i + n).min(self.s.len());
    }

    /// Consumes bytes while `pred` holds and returns the consumed slice.
    ///
    /// `pred` must reject every byte of a multi-byte char or none of them,
    /// which holds for predicates over ASCII classes.
    pub fn bump_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.i;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.i += 1;
        }
        &self.s[start..self.i]
    }

    pub fn skip_whitespace(&mut self) {
        self.bump_while(|b| b.is_ascii_whitespace());
    }

    /// Moves past the next occurrence of `pat`, or to end of input.
    pub fn skip_past(&mut self, pat: &str) {
        match self.s[self.i.min(self.s.len())..].find(pat) {
            Some(offset) => self.i += offset + pat.len(),
            None => self.i = self.s.len(),
        }
    }
}
