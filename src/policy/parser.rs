//! Parser for the line-oriented allowlist text format.
//!
//! A record is three whitespace-separated unsigned integers: register
//! address, write mask, read mask. `#` starts a comment running to end of
//! line; comments and blank lines may appear between records. Parsing is
//! a single pure pass over an immutable input and never touches the
//! committed table, so a rejected submission has no side effects.

use super::entry::Entry;
use super::error::{PolicyError, PolicyResult};

/// Parses allowlist text into candidate entries. Every record must be
/// syntactically valid for any entry to be produced; the first error
/// aborts the whole pass.
pub fn parse_policy(text: &str) -> PolicyResult<Vec<Entry>> {
    let mut cursor = Cursor::new(text);
    let mut staged: Vec<Entry> = Vec::new();
    while let Some([register, write_mask, read_mask]) = cursor.next_record()? {
        staged
            .try_reserve(1)
            .map_err(|_| PolicyError::AllocationFailure)?;
        staged.push(Entry::new(register, write_mask, read_mask));
    }
    Ok(staged)
}

struct Cursor<'src> {
    rest: &'src str,
}

impl<'src> Cursor<'src> {
    fn new(src: &'src str) -> Self {
        Self { rest: src }
    }

    /// Produces the next `[register, write_mask, read_mask]` record, or
    /// `None` once only whitespace and comments remain.
    fn next_record(&mut self) -> PolicyResult<Option<[u64; 3]>> {
        self.skip_filler();
        if self.rest.is_empty() {
            return Ok(None);
        }
        let mut fields = [0u64; 3];
        for slot in &mut fields {
            let token = self
                .next_token()
                .ok_or(PolicyError::PrematureEndOfInput)?;
            *slot = parse_c_literal(token)?;
        }
        Ok(Some(fields))
    }

    /// Consumes whitespace and full-line comments up to the start of the
    /// next record. Comments are only recognized on record boundaries; a
    /// `#` between the tokens of a record is a malformed token.
    fn skip_filler(&mut self) {
        loop {
            self.rest = self.rest.trim_start();
            match self.rest.strip_prefix('#') {
                Some(comment) => {
                    self.rest = match comment.find('\n') {
                        Some(eol) => &comment[eol + 1..],
                        None => "",
                    };
                }
                None => return,
            }
        }
    }

    /// Consumes the next whitespace-delimited token, or `None` at end of
    /// input. Records may span lines; any whitespace separates tokens.
    fn next_token(&mut self) -> Option<&'src str> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }
}

/// Parses an unsigned 64-bit integer in C numeric-literal form: `0x`/`0X`
/// selects hex, a leading `0` selects octal, anything else is decimal.
fn parse_c_literal(token: &str) -> PolicyResult<u64> {
    let malformed = || PolicyError::MalformedNumber {
        text: token.to_string(),
    };
    let (radix, digits) = if let Some(stripped) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        (16, stripped)
    } else if token.len() > 1 && token.starts_with('0') {
        (8, &token[1..])
    } else {
        (10, token)
    };
    if digits.is_empty() {
        return Err(malformed());
    }
    u64::from_str_radix(digits, radix).map_err(|_| malformed())
}
