//! Parse error type for `.lang` source text.

use thiserror::Error;

/// A syntax error raised while parsing `.lang` source text.
///
/// Carries the container identifier (usually the file path), the 1-based
/// source position, and a rendered snippet of the offending line.
#[derive(Debug, Clone, Error)]
#[error("{}", self.render())]
pub struct ParseError {
    /// Human-readable description of the grammar violation.
    pub message: String,

    /// Identifier of the source unit, used for error attribution.
    pub container: String,

    /// 1-based line of the offending token.
    pub line: usize,

    /// 1-based column of the offending token.
    pub column: usize,

    snippet: Option<String>,
}

impl ParseError {
    pub(crate) fn new(
        message: impl Into<String>,
        container: &str,
        source: &str,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            message: message.into(),
            container: container.to_string(),
            line,
            column,
            snippet: render_snippet(source, line, column),
        }
    }

    fn render(&self) -> String {
        let mut out = format!(
            "{} at {}:{}:{}",
            self.message, self.container, self.line, self.column
        );
        if let Some(snippet) = &self.snippet {
            out.push('\n');
            out.push_str(snippet);
        }
        out
    }
}

/// Render the offending source line with a caret under the given column.
///
/// Tabs are flattened to single spaces so the caret lines up.
pub(crate) fn render_snippet(source: &str, line: usize, column: usize) -> Option<String> {
    let text = source.split('\n').nth(line.checked_sub(1)?)?.replace('\t', " ");
    let text = text.trim_end_matches('\r');
    let gutter = line.to_string();
    let arrow_indent = " ".repeat(gutter.len() + column + 3);
    Some(format!(" {gutter} | {text}\n{arrow_indent}^"))
}
