//! Error types for resource building and file loading.

use std::panic::Location;
use std::path::PathBuf;

use thiserror::Error;

use crate::parser::error::render_snippet;
use crate::parser::{ParseError, ResourceNode};

/// Discriminates [`BuildError`]s for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildErrorKind {
    /// The requested language has never been loaded.
    UnknownLanguage,

    /// An include template referenced a key that does not exist.
    MissingInclude,

    /// A resource referred to a key already being built.
    CyclicReference,

    /// A pipe chain named an unregistered pipe function.
    UnknownPipeFunction,

    /// A pipe function failed.
    PipeFailed,

    /// A runtime argument failed its declared type.
    ArgumentType,

    /// An embedded script failed.
    ScriptFailed,

    /// An accessor outlived the registry it was created from.
    RegistryDropped,
}

/// A runtime error raised while building a resource string.
///
/// Carries the container identifier, source position and rendered snippet of
/// the offending node where one exists, plus the location of the
/// `resource()` call that started the build.
#[derive(Debug, Clone, Error)]
#[error("{}", self.render())]
pub struct BuildError {
    /// What went wrong.
    pub kind: BuildErrorKind,

    /// Human-readable description.
    pub message: String,

    /// Source attribution, absent for errors raised before any resource was
    /// resolved (unknown language, dropped registry).
    pub span: Option<SourceSpan>,

    pub(crate) call_site: Option<&'static Location<'static>>,
}

impl BuildError {
    pub(crate) fn new(kind: BuildErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span: None,
            call_site: None,
        }
    }

    pub(crate) fn at_node(
        kind: BuildErrorKind,
        message: impl Into<String>,
        node: &ResourceNode,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            span: Some(SourceSpan::new(node, line, column)),
            call_site: None,
        }
    }

    pub(crate) fn with_call_site(mut self, call_site: Option<&'static Location<'static>>) -> Self {
        self.call_site = call_site;
        self
    }

    fn render(&self) -> String {
        let mut out = self.message.clone();
        if let Some(span) = &self.span {
            if let Some(snippet) = &span.snippet {
                out.push('\n');
                out.push_str(snippet);
            }
            out.push_str(&format!(
                "\n  at {}:{}:{}",
                span.container, span.line, span.column
            ));
        }
        if let Some(call_site) = self.call_site {
            out.push_str(&format!("\n  called from {call_site}"));
        }
        out
    }
}

/// A source position inside a loaded `.lang` container, with the offending
/// line rendered for display.
#[derive(Debug, Clone)]
pub struct SourceSpan {
    /// Identifier of the source unit.
    pub container: String,

    /// 1-based line.
    pub line: usize,

    /// 1-based column.
    pub column: usize,

    pub(crate) snippet: Option<String>,
}

impl SourceSpan {
    pub(crate) fn new(node: &ResourceNode, line: usize, column: usize) -> Self {
        Self {
            container: node.container.clone(),
            line,
            column,
            snippet: render_snippet(&node.source, line, column),
        }
    }
}

/// A failure inside a pipe function. Rewrapped into a [`BuildError`] with
/// the pipe's source location by the evaluator.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipeError {
    /// Human-readable description.
    pub message: String,
}

impl PipeError {
    /// Create a pipe error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An error raised while loading `.lang` translation files from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O error when reading a translation file.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file's content failed to parse.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Pick the candidate closest to `target`, if any is close enough to be a
/// plausible typo.
pub(crate) fn closest_match<'a>(
    target: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> Option<String> {
    candidates
        .map(|c| (strsim::normalized_levenshtein(target, c), c))
        .filter(|(score, _)| *score > 0.6)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, c)| c.to_string())
}
