//! Parser for `.lang` localization source files.
//!
//! The parser is a hand-written recursive-descent machine over a
//! position-tracked character cursor; every error it (or the evaluator)
//! reports traces back to the cursor's line/column bookkeeping.

pub mod ast;
pub mod error;

mod cursor;
mod file;
mod template;

pub use ast::*;
pub use error::ParseError;
pub use file::parse;

use std::sync::Arc;

use cursor::SourceCursor;

/// Shared state threaded through the file parser and the template
/// sub-parser: the container identifier and source text for error
/// rendering, plus the cursor itself.
pub(crate) struct ParseSession {
    container: String,
    source: Arc<str>,
    cursor: SourceCursor,
}

impl ParseSession {
    fn new(container: &str, source: Arc<str>) -> Self {
        let cursor = SourceCursor::new(&source);
        Self {
            container: container.to_string(),
            source,
            cursor,
        }
    }

    /// A parse error at the cursor's current position.
    fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(message, self.cursor.line, self.cursor.column)
    }

    /// A parse error at an explicit position.
    fn error_at(&self, message: impl Into<String>, line: usize, column: usize) -> ParseError {
        ParseError::new(message, &self.container, &self.source, line, column)
    }
}

/// Whether `c` is a word character (`[a-zA-Z0-9_]`).
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Whether `s` is a valid identifier: a letter or underscore followed by
/// word characters, or a single letter.
pub(crate) fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(is_word_char),
        _ => false,
    }
}

/// Render a peeked character for an error message.
pub(crate) fn token_display(c: Option<char>) -> String {
    match c {
        Some(c) => c.to_string(),
        None => "end of input".to_string(),
    }
}
