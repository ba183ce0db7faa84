//! Template sub-parser: consumes a `{{ ... }}` span whose variant is
//! determined by the character after the opening braces, including the
//! pipe-chain and match-list grammars.

use super::ast::{KeyedTemplate, MatchTemplate, ScriptTemplate, TemplateNode, TemplatePipe};
use super::cursor::SourceCursor;
use super::error::ParseError;
use super::{is_valid_ident, is_word_char, token_display, ParseSession};
use crate::types::Primitive;

/// The template variant indicated by the opening and closing markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateKind {
    Regular,
    Optional,
    Include,
    Match,
    Script,
    Invalid,
}

/// The three variants sharing the `key (| pipes)?` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyedKind {
    Regular,
    Optional,
    Include,
}

impl KeyedKind {
    fn marker_len(self) -> usize {
        match self {
            KeyedKind::Regular => 2,
            KeyedKind::Optional | KeyedKind::Include => 3,
        }
    }

    fn invalid_ident_message(self) -> &'static str {
        match self {
            KeyedKind::Regular | KeyedKind::Optional => "Invalid template identifier",
            KeyedKind::Include => "Invalid include template identifier",
        }
    }
}

/// Parse the template at the cursor, consuming its content and braces.
/// Should be called when the cursor is positioned at `{{`.
pub(super) fn parse(p: &mut ParseSession) -> Result<TemplateNode, ParseError> {
    match peek_template_kind(&p.cursor) {
        TemplateKind::Regular => consume_keyed(p, KeyedKind::Regular),
        TemplateKind::Optional => consume_keyed(p, KeyedKind::Optional),
        TemplateKind::Include => consume_keyed(p, KeyedKind::Include),
        TemplateKind::Match => consume_match(p),
        TemplateKind::Script => Ok(consume_script(p)),
        TemplateKind::Invalid => Err(p.error("Invalid template")),
    }
}

/// Scan forward to the closing braces and classify the template, validating
/// that the closing marker is consistent with the opening one.
fn peek_template_kind(cur: &SourceCursor) -> TemplateKind {
    let mut kind = match cur.peek(2) {
        Some('!') => TemplateKind::Script,
        Some('>') => TemplateKind::Include,
        Some('#') => TemplateKind::Match,
        Some('?') => TemplateKind::Optional,
        Some(c) if is_word_char(c) || c.is_whitespace() => TemplateKind::Regular,
        _ => return TemplateKind::Invalid,
    };

    let mut index = 0;
    loop {
        if cur.segment_is("}}", index) {
            let before = index.checked_sub(1).and_then(|i| cur.peek(i));

            if before == Some('!') {
                if kind != TemplateKind::Script {
                    kind = TemplateKind::Invalid;
                }
                break;
            }

            if kind == TemplateKind::Script {
                // A script template must close with `!}}`.
                kind = TemplateKind::Invalid;
                break;
            }

            // Non-word, non-whitespace characters right before the closing
            // braces only occur in match templates.
            if !matches!(before, Some(c) if is_word_char(c) || c.is_whitespace())
                && kind != TemplateKind::Match
            {
                kind = TemplateKind::Invalid;
            }
            break;
        }

        index += 1;
        if cur.eof(index) {
            return TemplateKind::Invalid;
        }
    }

    kind
}

/// Discard whitespace and any `##` comments interspersed inside a template.
fn discard_ws_and_comments(cur: &mut SourceCursor) {
    loop {
        while matches!(cur.peek(0), Some(c) if c.is_whitespace()) {
            cur.discard(1);
        }
        if cur.segment_is("##", 0) {
            while matches!(cur.peek(0), Some(c) if c != '\n') {
                cur.discard(1);
            }
        } else {
            break;
        }
    }
}

/// Parse a pipe chain. Should be called when the next character is the
/// first `|`. In match templates the chain is terminated by `:` instead of
/// the closing braces.
fn parse_pipes(p: &mut ParseSession, is_match: bool) -> Result<Vec<TemplatePipe>, ParseError> {
    let mut result = Vec::new();

    loop {
        if is_match && p.cursor.peek(0) == Some(':') {
            break;
        }

        if !p.cursor.segment_is("}}", 0) && p.cursor.peek(0) != Some('|') {
            return Err(p.error(format!(
                "Unexpected token '{}', expected '}}}}' or '|'",
                token_display(p.cursor.peek(0))
            )));
        }

        if p.cursor.peek(0) == Some('|') {
            p.cursor.discard(1);
        }
        discard_ws_and_comments(&mut p.cursor);

        if p.cursor.segment_is("}}", 0) {
            break;
        }

        let (line, column) = (p.cursor.line, p.cursor.column);
        let ident = p.cursor.consume_while(is_word_char);
        if !is_valid_ident(&ident) {
            return Err(p.error_at("Invalid pipe function identifier", line, column));
        }

        discard_ws_and_comments(&mut p.cursor);

        let mut args = Vec::new();
        if p.cursor.peek(0) == Some('(') {
            p.cursor.discard(1);
            loop {
                discard_ws_and_comments(&mut p.cursor);

                if p.cursor.peek(0) == Some(')') {
                    p.cursor.discard(1);
                    break;
                }
                if p.cursor.segment_is("}}", 0) {
                    return Err(p.error_at("Malformed pipe function", line, column));
                }

                args.push(parse_primitive(p)?);

                discard_ws_and_comments(&mut p.cursor);
                if p.cursor.peek(0) == Some(',') {
                    p.cursor.discard(1);
                }
            }
        }

        result.push(TemplatePipe {
            ident,
            args,
            line,
            column,
        });

        discard_ws_and_comments(&mut p.cursor);
    }

    Ok(result)
}

/// Parse a single primitive literal: a quoted string (with backslash
/// escaping of the quote character), a signed decimal number, or
/// `true`/`false`.
fn parse_primitive(p: &mut ParseSession) -> Result<Primitive, ParseError> {
    discard_ws_and_comments(&mut p.cursor);
    let (line, column) = (p.cursor.line, p.cursor.column);

    // Strings.
    if let Some(quote @ ('\'' | '"' | '`')) = p.cursor.peek(0) {
        p.cursor.discard(1);
        let mut result = String::new();
        loop {
            if p.cursor.peek(0) == Some('\\') && p.cursor.peek(1) == Some(quote) {
                p.cursor.discard(1);
                result.push_str(&p.cursor.consume(1));
                continue;
            }
            match p.cursor.peek(0) {
                Some(c) if c == quote => break,
                Some(_) => result.push_str(&p.cursor.consume(1)),
                None => return Err(p.error_at("Unterminated string", line, column)),
            }
        }
        p.cursor.discard(1);
        return Ok(Primitive::String(result));
    }

    // Numbers.
    if matches!(p.cursor.peek(0), Some(c) if c == '-' || c == '.' || c.is_ascii_digit()) {
        let text = p
            .cursor
            .consume_while(|c| c == '-' || c == '.' || c.is_ascii_digit());
        if !is_valid_number(&text) {
            return Err(p.error_at(format!("Invalid number '{text}'"), line, column));
        }
        let value = text
            .parse::<f64>()
            .map_err(|_| p.error_at(format!("Invalid number '{text}'"), line, column))?;
        return Ok(Primitive::Number(value));
    }

    // Booleans and anything word-like.
    let word = p.cursor.consume_while(is_word_char);
    match word.as_str() {
        "true" => Ok(Primitive::Bool(true)),
        "false" => Ok(Primitive::Bool(false)),
        "" if p.cursor.peek(0) == Some(',') => Err(p.error_at(
            "Missing value, expected string, number, or boolean",
            line,
            column,
        )),
        "" => Err(p.error_at(
            format!(
                "Unexpected token '{}', expected string, number, or boolean",
                token_display(p.cursor.peek(0))
            ),
            line,
            column,
        )),
        _ => Err(p.error_at(
            "Unexpected identifier, expected string, number, or boolean",
            line,
            column,
        )),
    }
}

/// Whether `s` is a valid decimal number: `-?(\d+|\.\d+|\d+\.\d+)`.
fn is_valid_number(s: &str) -> bool {
    let t = s.strip_prefix('-').unwrap_or(s);
    if t.is_empty() {
        return false;
    }
    match t.split_once('.') {
        None => t.chars().all(|c| c.is_ascii_digit()),
        Some((int, frac)) => {
            !frac.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
    }
}

/// Consume a regular, optional, or include template.
fn consume_keyed(p: &mut ParseSession, variant: KeyedKind) -> Result<TemplateNode, ParseError> {
    let (line, column) = (p.cursor.line, p.cursor.column);

    p.cursor.discard(variant.marker_len());
    discard_ws_and_comments(&mut p.cursor);

    let key = p.cursor.consume_while(is_word_char);
    if !is_valid_ident(&key) {
        return Err(p.error_at(variant.invalid_ident_message(), line, column));
    }

    discard_ws_and_comments(&mut p.cursor);

    if !p.cursor.segment_is("}}", 0) && p.cursor.peek(0) != Some('|') {
        return Err(p.error(format!(
            "Unexpected token '{}', expected '}}}}' or '|'",
            token_display(p.cursor.peek(0))
        )));
    }

    let pipes = if p.cursor.peek(0) == Some('|') {
        parse_pipes(p, false)?
    } else {
        Vec::new()
    };

    // Closing braces.
    p.cursor.discard(2);

    let node = KeyedTemplate {
        key,
        pipes,
        line,
        column,
    };
    Ok(match variant {
        KeyedKind::Regular => TemplateNode::Regular(node),
        KeyedKind::Optional => TemplateNode::Optional(node),
        KeyedKind::Include => TemplateNode::Include(node),
    })
}

/// Consume a match template: `{{# key (| pipes)? : (pattern => value),*
/// (, _ => default)? }}`.
fn consume_match(p: &mut ParseSession) -> Result<TemplateNode, ParseError> {
    let (line, column) = (p.cursor.line, p.cursor.column);
    let mut matchers = Vec::new();
    let mut default_match = None;

    // `{{#` and following whitespace.
    p.cursor.discard(3);
    discard_ws_and_comments(&mut p.cursor);

    let key = p.cursor.consume_while(is_word_char);
    if !is_valid_ident(&key) {
        return Err(p.error_at("Invalid match template identifier", line, column));
    }

    discard_ws_and_comments(&mut p.cursor);

    if !p.cursor.segment_is("}}", 0) && !matches!(p.cursor.peek(0), Some('|' | ':')) {
        return Err(p.error(format!(
            "Unexpected token '{}', expected '}}}}', '|' or ':'",
            token_display(p.cursor.peek(0))
        )));
    }

    let pipes = if p.cursor.peek(0) == Some('|') {
        parse_pipes(p, true)?
    } else {
        Vec::new()
    };

    discard_ws_and_comments(&mut p.cursor);

    if p.cursor.peek(0) != Some(':') {
        return Err(p.error(format!(
            "Unexpected token '{}', expected ':'",
            token_display(p.cursor.peek(0))
        )));
    }
    p.cursor.discard(1);

    loop {
        discard_ws_and_comments(&mut p.cursor);

        if p.cursor.segment_is("}}", 0) {
            break;
        }

        // A bare `_`-leading word that is not the catch-all marker.
        if p.cursor.peek(0) == Some('_')
            && !matches!(p.cursor.peek(1), Some(c) if c.is_whitespace())
            && !p.cursor.segment_is("=>", 1)
        {
            let (seg_line, seg_column) = (p.cursor.line, p.cursor.column);
            let segment = p.cursor.consume_while(|c| !c.is_whitespace());
            return Err(p.error_at(
                format!("Unexpected segment '{segment}', expected primitive value or '_'"),
                seg_line,
                seg_column,
            ));
        }

        if p.cursor.peek(0) == Some('_') {
            // `_` introduces the catch-all default.
            p.cursor.discard(1);
            discard_ws_and_comments(&mut p.cursor);

            if !p.cursor.segment_is("=>", 0) {
                return Err(p.error(format!(
                    "Unexpected token '{}', expected '=>'",
                    token_display(p.cursor.peek(0))
                )));
            }
            p.cursor.discard(2);
            discard_ws_and_comments(&mut p.cursor);

            default_match = Some(parse_primitive(p)?);
            continue;
        }

        let pattern = parse_primitive(p)?;
        discard_ws_and_comments(&mut p.cursor);

        if !p.cursor.segment_is("=>", 0) {
            return Err(p.error(format!(
                "Unexpected token '{}', expected '=>'",
                token_display(p.cursor.peek(0))
            )));
        }
        p.cursor.discard(2);
        discard_ws_and_comments(&mut p.cursor);

        let value = parse_primitive(p)?;
        discard_ws_and_comments(&mut p.cursor);

        if p.cursor.peek(0) != Some(',') && !p.cursor.segment_is("}}", 0) {
            return Err(p.error(format!(
                "Unexpected token '{}', expected ',' or '}}}}'",
                token_display(p.cursor.peek(0))
            )));
        }

        matchers.push((pattern, value));

        if p.cursor.peek(0) == Some(',') {
            p.cursor.discard(1);
        }
    }

    // Closing braces.
    p.cursor.discard(2);

    Ok(TemplateNode::Match(MatchTemplate {
        key,
        pipes,
        matchers,
        default_match,
        line,
        column,
    }))
}

/// Consume a script template, capturing everything between `{{!` and `!}}`
/// verbatim along with the line its body starts on.
fn consume_script(p: &mut ParseSession) -> TemplateNode {
    let (line, column) = (p.cursor.line, p.cursor.column);
    let mut body = String::new();
    let mut body_start_line = 0;

    p.cursor.discard(3);
    while p.cursor.peek_segment(3, 0) != "!}}" && !p.cursor.eof(0) {
        if body_start_line == 0 && matches!(p.cursor.peek(0), Some(c) if !c.is_whitespace()) {
            body_start_line = p.cursor.line;
        }
        body.push_str(&p.cursor.consume(1));
    }
    p.cursor.discard(3);

    TemplateNode::Script(ScriptTemplate {
        body,
        body_start_line,
        line,
        column,
    })
}
