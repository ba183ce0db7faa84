//! Top-level `.lang` file parser: classifies upcoming chunks and builds
//! resource nodes from keys, comments, type declarations, string chunks,
//! and templates.

use std::sync::Arc;

use indexmap::IndexMap;

use super::ast::{DeclaredType, ResourceNode, StringChunk, TemplateNode, TypeDeclaration};
use super::cursor::SourceCursor;
use super::error::ParseError;
use super::{is_valid_ident, is_word_char, template, token_display, ParseSession};
use crate::types::DEFAULT_CATEGORY;

/// The kind of chunk the cursor is positioned at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkKind {
    /// End of input.
    None,
    /// A `##` comment line.
    Comment,
    /// A `##!` type-declaration comment.
    TypesDeclaration,
    /// A `[category(subcategory):key]` resource key.
    ParentKey,
    /// Literal text.
    StringChunk,
    /// A `{{ ... }}` template.
    Template,
}

/// Parse `.lang` source text into a list of resource nodes.
///
/// `container` should identify where the input came from (usually the file
/// path); it is carried into every node for error attribution. `\r\n` is
/// normalized to `\n` before parsing.
///
/// # Errors
///
/// Returns a [`ParseError`] for any grammar violation, including input
/// that contains no resource definitions at all.
pub fn parse(container: &str, input: &str) -> Result<Vec<ResourceNode>, ParseError> {
    let source: Arc<str> = Arc::from(input.replace("\r\n", "\n"));
    let mut p = ParseSession::new(container, Arc::clone(&source));
    let mut nodes: Vec<ResourceNode> = Vec::new();

    while !p.cursor.eof(0) {
        match peek_chunk_kind(&p.cursor) {
            // Anything before the first valid key is a header comment and
            // can be discarded line by line.
            ChunkKind::Comment
            | ChunkKind::StringChunk
            | ChunkKind::TypesDeclaration
            | ChunkKind::Template => discard_comment_line(&mut p.cursor),

            ChunkKind::None => break,

            ChunkKind::ParentKey => {
                // Square-braced text mid-line must be escaped to distinguish
                // it from a resource key.
                if !matches!(p.cursor.peek_behind(1), None | Some('\n')) {
                    return Err(p.error(
                        "Localization string key must begin at the start of its own line. \
                         Escape the opening brace if using text in square braces",
                    ));
                }

                let (line, column) = (p.cursor.line, p.cursor.column);
                let (key, category, subcategory) = consume_parent_key(&mut p)?;

                if peek_chunk_kind(&p.cursor) == ChunkKind::ParentKey {
                    return Err(p.error("Unexpected string key, expected string body"));
                }

                let mut node = ResourceNode {
                    container: p.container.clone(),
                    key,
                    category,
                    subcategory,
                    children: Vec::new(),
                    params: IndexMap::new(),
                    line,
                    column,
                    source: Arc::clone(&source),
                };

                loop {
                    match peek_chunk_kind(&p.cursor) {
                        ChunkKind::Comment => discard_comment_line(&mut p.cursor),
                        ChunkKind::TypesDeclaration => {
                            // Declarations accumulate; later declarations for
                            // the same identifier replace earlier ones.
                            let types = consume_type_declarations(&mut p)?;
                            node.params.extend(types);
                        }
                        ChunkKind::StringChunk => {
                            let chunk = consume_string_chunk(&mut p);
                            node.children.push(TemplateNode::StringChunk(chunk));
                        }
                        ChunkKind::Template => node.children.push(template::parse(&mut p)?),
                        ChunkKind::ParentKey | ChunkKind::None => break,
                    }
                }

                nodes.push(node);
            }
        }
    }

    if nodes.is_empty() {
        return Err(p.error("Localization text contained no parsable data"));
    }

    Ok(nodes)
}

/// Classify the chunk at the cursor.
fn peek_chunk_kind(cur: &SourceCursor) -> ChunkKind {
    if cur.peek(0) == Some('\\')
        && (cur.segment_is("##", 1) || cur.segment_is("{{", 1) || cur.peek(1) == Some('['))
    {
        return ChunkKind::StringChunk;
    }

    if cur.segment_is("##", 0) {
        if cur.peek(2) == Some('!') {
            return ChunkKind::TypesDeclaration;
        }
        return ChunkKind::Comment;
    }

    if cur.peek(0) == Some('[') && peek_valid_parent_key(cur, 0) {
        return ChunkKind::ParentKey;
    }

    if cur.segment_is("{{", 0) {
        return ChunkKind::Template;
    }

    if cur.eof(0) {
        return ChunkKind::None;
    }

    ChunkKind::StringChunk
}

/// Whether the characters starting at `offset` form a bracketed span that
/// could be a resource key: `[`, then only word characters, parentheses and
/// colons, then `]`. Syntax within the brackets is validated later.
pub(super) fn peek_valid_parent_key(cur: &SourceCursor, offset: usize) -> bool {
    if cur.peek(offset) != Some('[') {
        return false;
    }
    let mut i = offset + 1;
    loop {
        match cur.peek(i) {
            Some(']') => return true,
            Some(c) if c == '(' || c == ')' || c == ':' || is_word_char(c) => i += 1,
            _ => return false,
        }
    }
}

/// Whether the characters at the cursor form a `category` or
/// `category(subcategory)` prefix terminated by `:`.
fn peek_valid_category(cur: &SourceCursor) -> bool {
    let mut i = 0;
    let mut saw_word = false;
    loop {
        match cur.peek(i) {
            Some(':') => break,
            Some(']') | None => return false,
            Some(c) if c == '(' || c == ')' || is_word_char(c) => {
                saw_word = saw_word || is_word_char(c);
                i += 1;
            }
            _ => return false,
        }
    }
    saw_word
}

/// Consume the category and optional `(subcategory)`, stopping at the `:`
/// separator (not consumed).
fn consume_category(p: &mut ParseSession) -> Result<(String, String), ParseError> {
    let mut category = String::new();
    let mut subcategory = String::new();

    while p.cursor.peek(0) != Some(':') {
        while !matches!(p.cursor.peek(0), Some('(' | ':')) {
            match p.cursor.peek(0) {
                Some(c) if is_word_char(c) => category.push_str(&p.cursor.consume(1)),
                other => {
                    return Err(p.error(format!(
                        "Unexpected token '{}', expected [a-zA-Z0-9_]",
                        token_display(other)
                    )))
                }
            }
        }

        if p.cursor.peek(0) == Some('(') {
            p.cursor.discard(1);
            while p.cursor.peek(0) != Some(')') {
                match p.cursor.peek(0) {
                    Some(c) if is_word_char(c) => subcategory.push_str(&p.cursor.consume(1)),
                    other => {
                        return Err(p.error(format!(
                            "Unexpected token '{}', expected [a-zA-Z0-9_]",
                            token_display(other)
                        )))
                    }
                }
            }
            p.cursor.discard(1);
        }
    }

    Ok((category, subcategory))
}

/// Consume a full `[category(subcategory):key]` declaration including the
/// braces, trailing whitespace and newline.
fn consume_parent_key(p: &mut ParseSession) -> Result<(String, String, String), ParseError> {
    let mut key = String::new();
    let mut category = String::new();
    let mut subcategory = String::new();

    // Opening `[`.
    p.cursor.discard(1);
    let (line, column) = (p.cursor.line, p.cursor.column);

    while p.cursor.peek(0) != Some(']') {
        if peek_valid_category(&p.cursor) {
            let (cat, sub) = consume_category(p)?;
            category = cat;
            subcategory = sub;
            // Category separator `:`.
            p.cursor.discard(1);
        }

        match p.cursor.peek(0) {
            Some(c) if is_word_char(c) => key.push_str(&p.cursor.consume(1)),
            other => {
                return Err(p.error(format!(
                    "Unexpected token '{}', expected [a-zA-Z0-9_]",
                    token_display(other)
                )))
            }
        }
    }

    if category.is_empty() {
        category = DEFAULT_CATEGORY.to_string();
    }
    if subcategory.is_empty() {
        subcategory = DEFAULT_CATEGORY.to_string();
    }

    if !is_valid_ident(&category) {
        return Err(p.error_at("Invalid category identifier", line, column));
    }
    if !is_valid_ident(&subcategory) {
        return Err(p.error_at("Invalid subcategory identifier", line, column));
    }
    if !is_valid_ident(&key) {
        return Err(p.error_at("Invalid resource key identifier", line, column));
    }

    // Closing `]`, trailing whitespace, and the newline if present.
    p.cursor.discard(1);
    discard_inline_whitespace(&mut p.cursor);
    if p.cursor.peek(0) == Some('\n') {
        p.cursor.discard(1);
    }

    Ok((key, category, subcategory))
}

/// Discard the remainder of the line, including the ending newline.
fn discard_comment_line(cur: &mut SourceCursor) {
    while matches!(cur.peek(0), Some(c) if c != '\n') {
        cur.discard(1);
    }
    cur.discard(1);
}

/// Discard whitespace up to (not including) the next newline.
fn discard_inline_whitespace(cur: &mut SourceCursor) {
    while matches!(cur.peek(0), Some(c) if c.is_whitespace() && c != '\n') {
        cur.discard(1);
    }
}

/// Consume the identifier (and optional `?` marker) of one declaration in a
/// `##!` comment.
fn consume_declaration_ident(
    p: &mut ParseSession,
) -> Result<(String, bool, usize, usize), ParseError> {
    discard_inline_whitespace(&mut p.cursor);

    let mut ident = String::new();
    let mut is_optional = false;
    let (line, column) = (p.cursor.line, p.cursor.column);

    while matches!(p.cursor.peek(0), Some(c) if is_word_char(c) || c == '?') {
        if p.cursor.peek(0) == Some('?') {
            if ident.is_empty() {
                return Err(p.error("Unexpected token '?', expected identifier"));
            }
            is_optional = true;
            p.cursor.discard(1);
            break;
        }
        ident.push_str(&p.cursor.consume(1));
    }

    if ident.is_empty() {
        return Err(p.error(format!(
            "Unexpected token '{}', expected identifier",
            token_display(p.cursor.peek(0))
        )));
    }

    Ok((ident, is_optional, line, column))
}

/// Consume the type of one declaration: a type name, optionally suffixed
/// with `[]`.
fn consume_declaration_type(p: &mut ParseSession) -> Result<(DeclaredType, bool), ParseError> {
    let (line, column) = (p.cursor.line, p.cursor.column);

    let name = p.cursor.consume_while(|c| c.is_ascii_alphabetic());
    let mut is_array = false;
    if p.cursor.segment_is("[]", 0) {
        is_array = true;
        p.cursor.discard(2);
    }

    if p.cursor.peek(0) == Some('\n') && name.is_empty() {
        return Err(p.error("Unexpected token 'newline', expected type"));
    }

    match DeclaredType::from_name(&name) {
        Some(kind) => Ok((kind, is_array)),
        None => Err(p.error_at(
            "Invalid type. Must be one of string, number, boolean, or an array of those",
            line,
            column,
        )),
    }
}

/// Consume a `##! ident[?]: type[, ...]` comment and return the declared
/// types.
fn consume_type_declarations(
    p: &mut ParseSession,
) -> Result<IndexMap<String, TypeDeclaration>, ParseError> {
    // `##!` and following whitespace.
    p.cursor.discard(3);
    discard_inline_whitespace(&mut p.cursor);

    let mut types = IndexMap::new();

    while matches!(p.cursor.peek(0), Some(c) if c != '\n') {
        if p.cursor.peek(0) == Some(',') {
            if types.is_empty() {
                return Err(p.error("Unexpected token ',', expected identifier"));
            }
            p.cursor.discard(1);
            discard_inline_whitespace(&mut p.cursor);
            if p.cursor.peek(0) == Some('\n') {
                return Err(p.error("Unexpected token 'newline', expected identifier"));
            }
        } else if !types.is_empty() {
            return Err(p.error(format!(
                "Unexpected token '{}', expected ',' or newline",
                token_display(p.cursor.peek(0))
            )));
        }

        if p.cursor.eof(0) {
            return Ok(types);
        }

        let (ident, is_optional, line, column) = consume_declaration_ident(p)?;
        if !is_valid_ident(&ident) {
            return Err(p.error_at("Invalid template argument identifier", line, column));
        }

        discard_inline_whitespace(&mut p.cursor);
        if p.cursor.peek(0) != Some(':') {
            let token = match p.cursor.peek(0) {
                Some('\n') => "newline".to_string(),
                other => token_display(other),
            };
            return Err(p.error(format!("Unexpected token '{token}', expected ':'")));
        }
        p.cursor.discard(1);
        discard_inline_whitespace(&mut p.cursor);

        let (kind, is_array) = consume_declaration_type(p)?;
        types.insert(
            ident,
            TypeDeclaration {
                kind,
                is_optional,
                is_array,
                line,
                column,
            },
        );

        discard_inline_whitespace(&mut p.cursor);
    }

    // Ending newline.
    p.cursor.discard(1);

    Ok(types)
}

/// Consume literal text up to the next unescaped template or resource key
/// boundary, stripping comments and resolving escapes.
fn consume_string_chunk(p: &mut ParseSession) -> StringChunk {
    let cur = &mut p.cursor;
    let (line, column) = (cur.line, cur.column);
    let mut content = String::new();

    loop {
        // A template or resource key one character ahead ends this chunk,
        // unless the current character escapes it.
        if cur.segment_is("{{", 1) || peek_valid_parent_key(cur, 1) {
            if cur.peek(0) != Some('\\') {
                content.push_str(&cur.consume(1));
                break;
            }
            cur.discard(1);
        }

        // `\##` reads as literal `##`; drop the backslash so the comment
        // checks below (which look behind for the backslash) skip it.
        if cur.segment_is("\\##", 0) {
            cur.discard(1);
        }

        // A comment opening its own line is a separate chunk kind.
        if cur.segment_is("##", 0) && cur.peek_behind(1) == Some('\n') {
            break;
        }

        // Inline comment: discard to end of line.
        if cur.segment_is("##", 0) && cur.peek_behind(1) != Some('\\') {
            while matches!(cur.peek(0), Some(c) if c != '\n') {
                cur.discard(1);
            }
        }

        content.push_str(&cur.consume(1));

        if cur.eof(0) {
            break;
        }
    }

    StringChunk {
        content: resolve_escapes(&content),
        line,
        column,
    }
}

/// Resolve `\n`, `\t` and `\uXXXX` escapes in chunk content.
fn resolve_escapes(content: &str) -> String {
    let chars: Vec<char> = content.chars().collect();
    let mut out = String::with_capacity(content.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' {
            match chars.get(i + 1) {
                Some('n') => {
                    out.push('\n');
                    i += 2;
                    continue;
                }
                Some('t') => {
                    out.push('\t');
                    i += 2;
                    continue;
                }
                Some('u') if i + 6 <= chars.len() => {
                    let hex: String = chars[i + 2..i + 6].iter().collect();
                    if hex.chars().all(|c| c.is_ascii_hexdigit()) {
                        if let Some(c) =
                            u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
                        {
                            out.push(c);
                            i += 6;
                            continue;
                        }
                    }
                }
                _ => {}
            }
        }
        out.push(chars[i]);
        i += 1;
    }

    out
}
