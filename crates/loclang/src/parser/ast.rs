//! AST types produced by the `.lang` parser.
//!
//! These types are public to enable external tooling (linters, documentation
//! generators, etc.). Nodes are immutable once parsing completes.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::types::Primitive;

/// One parsed resource definition: a `[key]`, `[category:key]` or
/// `[category(subcategory):key]` declaration and its template body.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    /// Identifier of the source unit this resource came from (usually the
    /// file path); used only for error attribution.
    pub container: String,

    /// The resource key.
    pub key: String,

    /// Category, `"default"` when omitted in source.
    pub category: String,

    /// Subcategory, `"default"` when omitted in source.
    pub subcategory: String,

    /// The template body, in source order. Never empty after a successful
    /// parse.
    pub children: Vec<TemplateNode>,

    /// Argument type declarations accumulated from `##!` comments, in
    /// declaration order.
    pub params: IndexMap<String, TypeDeclaration>,

    /// 1-based line of the opening `[`.
    pub line: usize,

    /// 1-based column of the opening `[`.
    pub column: usize,

    /// The whole source unit's text, shared across nodes from one parse;
    /// used to render error snippets at build time.
    pub(crate) source: Arc<str>,
}

/// One template-body element.
#[derive(Debug, Clone)]
pub enum TemplateNode {
    /// Literal text with escapes resolved and comments stripped.
    StringChunk(StringChunk),

    /// `{{ key }}` substitutes the argument, or the literal `undefined`
    /// when absent.
    Regular(KeyedTemplate),

    /// `{{? key }}` substitutes the argument, or nothing when absent.
    Optional(KeyedTemplate),

    /// `{{> key }}` substitutes another resource's built output.
    Include(KeyedTemplate),

    /// `{{# key : pattern => value, ... }}` substitutes the first
    /// matching pattern's value.
    Match(MatchTemplate),

    /// `{{! ... !}}` substitutes the result of an embedded script.
    Script(ScriptTemplate),
}

impl TemplateNode {
    /// 1-based line of the node's opening marker.
    pub fn line(&self) -> usize {
        match self {
            TemplateNode::StringChunk(n) => n.line,
            TemplateNode::Regular(n) | TemplateNode::Optional(n) | TemplateNode::Include(n) => {
                n.line
            }
            TemplateNode::Match(n) => n.line,
            TemplateNode::Script(n) => n.line,
        }
    }

    /// 1-based column of the node's opening marker.
    pub fn column(&self) -> usize {
        match self {
            TemplateNode::StringChunk(n) => n.column,
            TemplateNode::Regular(n) | TemplateNode::Optional(n) | TemplateNode::Include(n) => {
                n.column
            }
            TemplateNode::Match(n) => n.column,
            TemplateNode::Script(n) => n.column,
        }
    }

    /// Whether this node may build to no value at all (optional, match and
    /// script templates), making it a candidate for isolated-line collapsing.
    pub fn is_maybe(&self) -> bool {
        matches!(
            self,
            TemplateNode::Optional(_) | TemplateNode::Match(_) | TemplateNode::Script(_)
        )
    }
}

/// Literal text between templates.
#[derive(Debug, Clone)]
pub struct StringChunk {
    /// The text, with `\n`/`\t`/`\uXXXX` escapes resolved and comments
    /// stripped.
    pub content: String,
    pub line: usize,
    pub column: usize,
}

/// Shared shape of the regular, optional, and include template variants:
/// an argument (or resource) key plus an optional pipe chain.
#[derive(Debug, Clone)]
pub struct KeyedTemplate {
    /// Argument key (regular/optional) or resource key (include).
    pub key: String,

    /// Value-transform pipes, applied in declaration order.
    pub pipes: Vec<TemplatePipe>,

    pub line: usize,
    pub column: usize,
}

/// A `{{# ... }}` pattern-match template.
#[derive(Debug, Clone)]
pub struct MatchTemplate {
    /// Argument key whose (piped) value is matched.
    pub key: String,

    /// Pipes applied to the argument value before matching.
    pub pipes: Vec<TemplatePipe>,

    /// `(pattern, value)` pairs in declaration order; first strict-equality
    /// match wins.
    pub matchers: Vec<(Primitive, Primitive)>,

    /// The `_ => value` catch-all, if declared.
    pub default_match: Option<Primitive>,

    pub line: usize,
    pub column: usize,
}

/// A `{{! ... !}}` embedded-script template.
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    /// The raw script body, captured verbatim between the markers.
    pub body: String,

    /// 1-based source line of the first non-whitespace character of the
    /// body. Can differ from `line` when the body starts on a later line;
    /// used to remap script-engine error lines back to the `.lang` file.
    pub body_start_line: usize,

    pub line: usize,
    pub column: usize,
}

/// A single pipe in a template's transform chain.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePipe {
    /// Registered pipe-function identifier.
    pub ident: String,

    /// Literal arguments passed after the running value.
    pub args: Vec<Primitive>,

    pub line: usize,
    pub column: usize,
}

/// An argument type declared in a `##!` comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDeclaration {
    /// Declared base type.
    pub kind: DeclaredType,

    /// Whether the argument was marked optional with `?`.
    pub is_optional: bool,

    /// Whether the type was suffixed `[]`.
    pub is_array: bool,

    pub line: usize,
    pub column: usize,
}

impl TypeDeclaration {
    /// The declared type as written, e.g. `string` or `number[]`.
    pub fn expected_type(&self) -> String {
        if self.is_array {
            format!("{}[]", self.kind)
        } else {
            self.kind.to_string()
        }
    }
}

/// The base types permitted in `##!` declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    String,
    Number,
    Boolean,
    Any,
}

impl DeclaredType {
    /// Parse a declared type name, case-insensitively.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(DeclaredType::String),
            "number" => Some(DeclaredType::Number),
            "boolean" => Some(DeclaredType::Boolean),
            "any" => Some(DeclaredType::Any),
            _ => None,
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeclaredType::String => "string",
            DeclaredType::Number => "number",
            DeclaredType::Boolean => "boolean",
            DeclaredType::Any => "any",
        };
        write!(f, "{name}")
    }
}
