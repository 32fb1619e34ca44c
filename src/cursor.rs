// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command Input Cursor
//!
//! The single source of truth for position within the raw input during
//! parsing. A [`CommandInputCursor`] is thread-confined to a single
//! [`crate::dispatcher::Coordinator`] invocation and is mutable, but every
//! `read_*` method leaves it untouched on failure so that callers (notably
//! [`crate::parser::first_of`]) can retry with a different parser.
//!
//! Quote handling is grounded in the same state machine the teacher's
//! tokenizer used for double/single quotes and backslash escapes, adapted
//! from "tokenize the whole string up front" to "read one token at a time
//! from a live position", since [`checkpoint`]/[`restore`] need a cursor
//! that can rewind mid-parse, not just re-iterate a pre-built token vector.
//!
//! [`checkpoint`]: CommandInputCursor::checkpoint
//! [`restore`]: CommandInputCursor::restore

use crate::error::CursorError;
use crate::flag::FlagGroup;

/// A saved position that [`CommandInputCursor::restore`] can rewind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    position: usize,
}

/// The quoted-string mode a string argument reads under.
///
/// See spec §4.1/§4.2: single, quoted, greedy and greedy-flag-yielding are
/// the only four string-consumption shapes this crate defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringMode {
    /// One whitespace-delimited token (or one quoted segment).
    Single,
    /// A `"..."` or `'...'` segment with backslash escapes; fails if the
    /// next token isn't quoted.
    Quoted,
    /// The entire remaining input, verbatim.
    Greedy,
    /// Greedy, but stops one token before a token that looks like a flag
    /// registered in the active flag group.
    GreedyFlagYielding,
}

/// Mutable position and view over a single raw command-line input.
pub struct CommandInputCursor<'input> {
    input: &'input str,
    position: usize,
}

impl<'input> CommandInputCursor<'input> {
    /// Wrap `input` in a cursor. A single leading `/` is stripped, per the
    /// crate's grammar of a raw command string.
    #[must_use]
    pub fn new(input: &'input str) -> Self {
        let input = input.strip_prefix('/').unwrap_or(input);
        CommandInputCursor { input, position: 0 }
    }

    /// The byte offset of the cursor within the original input.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.position
    }

    /// Everything from the cursor's current position to the end of input.
    #[must_use]
    pub fn remaining_input(&self) -> &'input str {
        &self.input[self.position..]
    }

    /// True once every byte of the input has been consumed (whitespace included).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining_input().trim_start().is_empty()
    }

    /// Advance past any leading whitespace without consuming a token.
    pub fn skip_whitespace(&mut self) {
        let trimmed = self.remaining_input().trim_start();
        self.position = self.input.len() - trimmed.len();
    }

    /// Save the current position for later [`restore`](Self::restore).
    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            position: self.position,
        }
    }

    /// Rewind to a previously taken [`Checkpoint`].
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.position = checkpoint.position;
    }

    /// The next whitespace-delimited token, without advancing.
    ///
    /// A token that begins with `"` is reported up to (and including) the
    /// matching unescaped `"`, mirroring [`read_quoted_string`](Self::read_quoted_string).
    #[must_use]
    pub fn peek_string(&self) -> Option<&'input str> {
        let mut probe = CommandInputCursor {
            input: self.input,
            position: self.position,
        };
        probe.read_single_string().ok()
    }

    fn raw_next_word_end(&self, start: usize) -> usize {
        self.input[start..]
            .find(char::is_whitespace)
            .map_or(self.input.len(), |offset| start + offset)
    }

    /// Read one whitespace-delimited token; if it begins with a quote,
    /// read the quoted segment instead. Does not advance on failure.
    pub fn read_string(&mut self) -> Result<&'input str, CursorError> {
        self.skip_whitespace();
        if self.is_empty() {
            return Err(CursorError::Exhausted);
        }
        let first = self.remaining_input().as_bytes()[0];
        match first {
            b'"' => self.read_quoted_string(),
            b'\'' => self.read_quoted_string(),
            _ => self.read_single_string(),
        }
    }

    /// Read one whitespace-delimited token, verbatim (no quote handling).
    pub fn read_single_string(&mut self) -> Result<&'input str, CursorError> {
        self.skip_whitespace();
        if self.is_empty() {
            return Err(CursorError::Exhausted);
        }
        let start = self.position;
        let end = self.raw_next_word_end(start);
        let token = &self.input[start..end];
        self.position = end;
        Ok(token)
    }

    /// Read a `"..."` or `'...'` segment, honoring `\`-escapes of the
    /// delimiter. The returned slice excludes the surrounding quotes and
    /// has escapes of the delimiter resolved; other backslashes pass
    /// through unchanged, since this crate doesn't own a general escaping
    /// grammar beyond "you can escape the quote character".
    pub fn read_quoted_string(&mut self) -> Result<&'input str, CursorError> {
        self.skip_whitespace();
        let start = self.position;
        let bytes = self.input.as_bytes();
        if start >= bytes.len() {
            return Err(CursorError::Exhausted);
        }
        let quote = bytes[start];
        if quote != b'"' && quote != b'\'' {
            return self.read_single_string();
        }
        let mut i = start + 1;
        let mut escaped = false;
        loop {
            if i >= bytes.len() {
                return Err(if quote == b'"' {
                    CursorError::UnclosedDoubleQuote(start)
                } else {
                    CursorError::UnclosedSingleQuote(start)
                });
            }
            let c = bytes[i];
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == quote {
                let content = &self.input[start + 1..i];
                self.position = i + 1;
                return Ok(content);
            }
            i += 1;
        }
    }

    /// Read the remainder of the input verbatim, leaving the cursor empty.
    pub fn read_greedy_string(&mut self) -> Result<&'input str, CursorError> {
        self.skip_whitespace();
        if self.is_empty() {
            return Err(CursorError::Exhausted);
        }
        let start = self.position;
        self.position = self.input.len();
        Ok(self.input[start..].trim_end())
    }

    /// Read greedily, but stop one token before a token that looks like a
    /// flag registered in `flags` (spec §4.1: "greedy-flag-yielding").
    pub fn read_greedy_flag_yielding_string<S>(
        &mut self,
        flags: &FlagGroup<S>,
    ) -> Result<&'input str, CursorError> {
        self.skip_whitespace();
        if self.is_empty() {
            return Err(CursorError::Exhausted);
        }
        let start = self.position;
        let mut scan_pos = start;
        let mut last_non_flag_end = start;
        loop {
            let word_start = {
                let rest = &self.input[scan_pos..];
                let trimmed = rest.trim_start();
                scan_pos + (rest.len() - trimmed.len())
            };
            if word_start >= self.input.len() {
                last_non_flag_end = self.input.len();
                break;
            }
            let word_end = self.raw_next_word_end(word_start);
            let word = &self.input[word_start..word_end];
            if flags.looks_like_known_flag(word) {
                break;
            }
            last_non_flag_end = word_end;
            scan_pos = word_end;
        }
        self.position = last_non_flag_end;
        Ok(self.input[start..last_non_flag_end].trim_end())
    }

    /// Parse an integer within `min..=max`, advancing only on success.
    pub fn read_integer(&mut self, min: i64, max: i64) -> Result<i64, CursorError> {
        let checkpoint = self.checkpoint();
        let token = self.read_single_string()?;
        match token.parse::<i64>() {
            Ok(value) if value >= min && value <= max => Ok(value),
            _ => {
                self.restore(checkpoint);
                Err(CursorError::Exhausted)
            }
        }
    }

    /// Parse an `f32` within `min..=max`, advancing only on success.
    pub fn read_float(&mut self, min: f32, max: f32) -> Result<f32, CursorError> {
        let checkpoint = self.checkpoint();
        let token = self.read_single_string()?;
        match token.parse::<f32>() {
            Ok(value) if value >= min && value <= max => Ok(value),
            _ => {
                self.restore(checkpoint);
                Err(CursorError::Exhausted)
            }
        }
    }

    /// Parse an `f64` within `min..=max`, advancing only on success.
    pub fn read_double(&mut self, min: f64, max: f64) -> Result<f64, CursorError> {
        let checkpoint = self.checkpoint();
        let token = self.read_single_string()?;
        match token.parse::<f64>() {
            Ok(value) if value >= min && value <= max => Ok(value),
            _ => {
                self.restore(checkpoint);
                Err(CursorError::Exhausted)
            }
        }
    }

    /// Parse `true`/`false` (case-insensitive), advancing only on success.
    pub fn read_boolean(&mut self) -> Result<bool, CursorError> {
        let checkpoint = self.checkpoint();
        let token = self.read_single_string()?;
        match token.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => {
                self.restore(checkpoint);
                Err(CursorError::Exhausted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::FlagGroup;

    #[test]
    fn strips_leading_slash() {
        let cursor = CommandInputCursor::new("/test int 42");
        assert_eq!(cursor.remaining_input(), "test int 42");
    }

    #[test]
    fn reads_single_tokens() {
        let mut cursor = CommandInputCursor::new("show interface");
        assert_eq!(cursor.read_string().unwrap(), "show");
        assert_eq!(cursor.read_string().unwrap(), "interface");
        assert!(cursor.is_empty());
    }

    #[test]
    fn reads_double_quoted_with_escape() {
        let mut cursor = CommandInputCursor::new(r#"echo "a \"b\" c" next"#);
        assert_eq!(cursor.read_string().unwrap(), "echo");
        assert_eq!(cursor.read_string().unwrap(), r#"a \"b\" c"#);
        assert_eq!(cursor.read_string().unwrap(), "next");
    }

    #[test]
    fn unclosed_quote_fails_without_consuming() {
        let mut cursor = CommandInputCursor::new(r#"echo "unterminated"#);
        let checkpoint = cursor.checkpoint();
        assert_eq!(cursor.read_string().unwrap(), "echo");
        let before = cursor.checkpoint();
        assert!(cursor.read_string().is_err());
        assert_eq!(cursor.checkpoint(), before);
        cursor.restore(checkpoint);
        assert_eq!(cursor.cursor(), 0);
    }

    #[test]
    fn greedy_reads_to_end() {
        let mut cursor = CommandInputCursor::new("whatever words here");
        assert_eq!(cursor.read_greedy_string().unwrap(), "whatever words here");
        assert!(cursor.is_empty());
    }

    #[test]
    fn greedy_flag_yielding_stops_before_flag() {
        let mut group = FlagGroup::new();
        group.add(crate::flag::Flag::presence("f", &['f']));
        let mut cursor = CommandInputCursor::new("a b -f");
        assert_eq!(
            cursor.read_greedy_flag_yielding_string(&group).unwrap(),
            "a b"
        );
        assert_eq!(cursor.read_string().unwrap(), "-f");
    }

    #[test]
    fn number_parsers_do_not_consume_on_failure() {
        let mut cursor = CommandInputCursor::new("999 rest");
        let before = cursor.checkpoint();
        assert!(cursor.read_integer(0, 100).is_err());
        assert_eq!(cursor.checkpoint(), before);
        assert_eq!(cursor.read_string().unwrap(), "999");
    }
}
