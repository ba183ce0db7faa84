//! The default script engine: a small expression/statement language.
//!
//! Supports literals, `$ident` argument reads, `res.key(...)` resource
//! forwarding, the usual unary/binary/ternary operators, and an explicit
//! statement form with `return` and `if`/`else`. `//` line comments are
//! skipped.

use super::{CompiledScript, ResourceForward, ScriptEngine, ScriptError, ScriptFn};
use crate::types::{TemplateArguments, Value};

/// The built-in expression engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEngine;

impl ScriptEngine for ExprEngine {
    fn compile(&self, body: &str) -> Result<CompiledScript, ScriptError> {
        let tokens = lex(body)?;

        let stmts = Parser::new(tokens.clone()).parse_program()?;
        let explicit: Box<dyn ScriptFn> = Box::new(ExplicitFn { stmts });

        // The implicit-return form only exists when the whole body reads as
        // one expression.
        let implicit = Parser::new(tokens)
            .parse_single_expression()
            .ok()
            .map(|expr| Box::new(ImplicitFn { expr }) as Box<dyn ScriptFn>);

        Ok(CompiledScript { explicit, implicit })
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Str(String),
    Num(f64),
    True,
    False,
    Undefined,
    /// `$ident` argument reference.
    Arg(String),
    Ident(String),
    Return,
    If,
    Else,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Dot,
    Question,
    Colon,
    Bang,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    /// 1-based line within the script body.
    line: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lex(body: &str) -> Result<Vec<Token>, ScriptError> {
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];

        if c == '\n' {
            line += 1;
            i += 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            let start_line = line;
            let mut text = String::new();
            i += 1;
            loop {
                match chars.get(i) {
                    None => {
                        return Err(ScriptError::at_line("unterminated string", start_line));
                    }
                    Some('\\') => {
                        match chars.get(i + 1) {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(&escaped) => text.push(escaped),
                            None => {
                                return Err(ScriptError::at_line(
                                    "unterminated string",
                                    start_line,
                                ));
                            }
                        }
                        i += 2;
                    }
                    Some(&ch) if ch == quote => {
                        i += 1;
                        break;
                    }
                    Some(&ch) => {
                        if ch == '\n' {
                            line += 1;
                        }
                        text.push(ch);
                        i += 1;
                    }
                }
            }
            tokens.push(Token {
                tok: Tok::Str(text),
                line: start_line,
            });
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && matches!(chars.get(i + 1), Some(d) if d.is_ascii_digit())) {
            let start = i;
            while matches!(chars.get(i), Some(d) if d.is_ascii_digit() || *d == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| ScriptError::at_line(format!("invalid number '{text}'"), line))?;
            tokens.push(Token {
                tok: Tok::Num(value),
                line,
            });
            continue;
        }

        if c == '$' {
            if !matches!(chars.get(i + 1), Some(&n) if is_ident_start(n)) {
                return Err(ScriptError::at_line("expected identifier after '$'", line));
            }
            let start = i + 1;
            i += 1;
            while matches!(chars.get(i), Some(&n) if is_ident_cont(n)) {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            tokens.push(Token {
                tok: Tok::Arg(name),
                line,
            });
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            while matches!(chars.get(i), Some(&n) if is_ident_cont(n)) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let tok = match word.as_str() {
                "true" => Tok::True,
                "false" => Tok::False,
                "undefined" => Tok::Undefined,
                "return" => Tok::Return,
                "if" => Tok::If,
                "else" => Tok::Else,
                _ => Tok::Ident(word),
            };
            tokens.push(Token { tok, line });
            continue;
        }

        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        let three: String = chars[i..(i + 3).min(chars.len())].iter().collect();
        let (tok, len) = match (three.as_str(), two.as_str(), c) {
            ("===", _, _) => (Tok::EqEq, 3),
            ("!==", _, _) => (Tok::NotEq, 3),
            (_, "==", _) => (Tok::EqEq, 2),
            (_, "!=", _) => (Tok::NotEq, 2),
            (_, "<=", _) => (Tok::Le, 2),
            (_, ">=", _) => (Tok::Ge, 2),
            (_, "&&", _) => (Tok::AndAnd, 2),
            (_, "||", _) => (Tok::OrOr, 2),
            (_, _, '(') => (Tok::LParen, 1),
            (_, _, ')') => (Tok::RParen, 1),
            (_, _, '{') => (Tok::LBrace, 1),
            (_, _, '}') => (Tok::RBrace, 1),
            (_, _, ',') => (Tok::Comma, 1),
            (_, _, ';') => (Tok::Semi, 1),
            (_, _, '.') => (Tok::Dot, 1),
            (_, _, '?') => (Tok::Question, 1),
            (_, _, ':') => (Tok::Colon, 1),
            (_, _, '!') => (Tok::Bang, 1),
            (_, _, '<') => (Tok::Lt, 1),
            (_, _, '>') => (Tok::Gt, 1),
            (_, _, '+') => (Tok::Plus, 1),
            (_, _, '-') => (Tok::Minus, 1),
            (_, _, '*') => (Tok::Star, 1),
            (_, _, '/') => (Tok::Slash, 1),
            (_, _, '%') => (Tok::Percent, 1),
            _ => {
                return Err(ScriptError::at_line(format!("unexpected character '{c}'"), line));
            }
        };
        tokens.push(Token { tok, line });
        i += len;
    }

    Ok(tokens)
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Expr {
    Lit(Value),
    Arg(String),
    ResCall { key: String, arg: Option<Box<Expr>> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Ternary { cond: Box<Expr>, then: Box<Expr>, other: Box<Expr> },
}

#[derive(Debug, Clone, Copy)]
enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone)]
enum Stmt {
    Return(Option<Expr>),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        other: Option<Vec<Stmt>>,
    },
    Expr(Expr),
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos).map(|t| &t.tok)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).map(|t| t.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Tok, what: &str) -> Result<(), ScriptError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(ScriptError::at_line(format!("expected {what}"), self.line()))
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut stmts = Vec::new();
        while self.peek().is_some() {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    /// Parse the whole token stream as one expression (with an optional
    /// trailing semicolon); used for the implicit-return form.
    fn parse_single_expression(&mut self) -> Result<Expr, ScriptError> {
        let expr = self.parse_expr()?;
        self.eat(&Tok::Semi);
        if self.peek().is_some() {
            return Err(ScriptError::at_line("expected end of script", self.line()));
        }
        Ok(expr)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ScriptError> {
        match self.peek() {
            Some(Tok::Return) => {
                self.pos += 1;
                let value = match self.peek() {
                    None | Some(Tok::Semi | Tok::RBrace) => None,
                    _ => Some(self.parse_expr()?),
                };
                self.eat(&Tok::Semi);
                Ok(Stmt::Return(value))
            }
            Some(Tok::If) => {
                self.pos += 1;
                self.expect(&Tok::LParen, "'(' after 'if'")?;
                let cond = self.parse_expr()?;
                self.expect(&Tok::RParen, "')' after condition")?;
                let then = self.parse_block_or_stmt()?;
                let other = if self.eat(&Tok::Else) {
                    if self.peek() == Some(&Tok::If) {
                        Some(vec![self.parse_stmt()?])
                    } else {
                        Some(self.parse_block_or_stmt()?)
                    }
                } else {
                    None
                };
                Ok(Stmt::If { cond, then, other })
            }
            _ => {
                let expr = self.parse_expr()?;
                self.eat(&Tok::Semi);
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_block_or_stmt(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        if self.eat(&Tok::LBrace) {
            let mut stmts = Vec::new();
            while self.peek() != Some(&Tok::RBrace) {
                if self.peek().is_none() {
                    return Err(ScriptError::at_line("expected '}'", self.line()));
                }
                stmts.push(self.parse_stmt()?);
            }
            self.pos += 1;
            Ok(stmts)
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, ScriptError> {
        let cond = self.parse_or()?;
        if self.eat(&Tok::Question) {
            let then = self.parse_expr()?;
            self.expect(&Tok::Colon, "':' in conditional expression")?;
            let other = self.parse_expr()?;
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                other: Box::new(other),
            });
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Tok::OrOr) {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_equality()?;
        while self.eat(&Tok::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Tok::EqEq) => BinaryOp::Eq,
                Some(Tok::NotEq) => BinaryOp::Ne,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_relational()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Lt) => BinaryOp::Lt,
                Some(Tok::Le) => BinaryOp::Le,
                Some(Tok::Gt) => BinaryOp::Gt,
                Some(Tok::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinaryOp::Add,
                Some(Tok::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinaryOp::Mul,
                Some(Tok::Slash) => BinaryOp::Div,
                Some(Tok::Percent) => BinaryOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        if self.eat(&Tok::Bang) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        if self.eat(&Tok::Minus) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        let line = self.line();
        match self.advance() {
            Some(Tok::Str(s)) => Ok(Expr::Lit(Value::String(s))),
            Some(Tok::Num(n)) => Ok(Expr::Lit(Value::Number(n))),
            Some(Tok::True) => Ok(Expr::Lit(Value::Bool(true))),
            Some(Tok::False) => Ok(Expr::Lit(Value::Bool(false))),
            Some(Tok::Undefined) => Ok(Expr::Lit(Value::Undefined)),
            Some(Tok::Arg(name)) => Ok(Expr::Arg(name)),
            Some(Tok::LParen) => {
                let expr = self.parse_expr()?;
                self.expect(&Tok::RParen, "')'")?;
                Ok(expr)
            }
            Some(Tok::Ident(name)) if name == "args" => {
                self.expect(&Tok::Dot, "'.' after 'args'")?;
                match self.advance() {
                    Some(Tok::Ident(field)) => Ok(Expr::Arg(field)),
                    _ => Err(ScriptError::at_line("expected identifier after 'args.'", line)),
                }
            }
            Some(Tok::Ident(name)) if name == "res" => {
                self.expect(&Tok::Dot, "'.' after 'res'")?;
                let key = match self.advance() {
                    Some(Tok::Ident(key)) => key,
                    _ => {
                        return Err(ScriptError::at_line(
                            "expected resource key after 'res.'",
                            line,
                        ));
                    }
                };
                self.expect(&Tok::LParen, "'(' in resource call")?;
                let arg = if self.peek() == Some(&Tok::RParen) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                self.expect(&Tok::RParen, "')' in resource call")?;
                Ok(Expr::ResCall { key, arg })
            }
            Some(Tok::Ident(name)) => Err(ScriptError::at_line(
                format!("unknown identifier '{name}'"),
                line,
            )),
            Some(other) => Err(ScriptError::at_line(
                format!("unexpected token {other:?}"),
                line,
            )),
            None => Err(ScriptError::at_line("unexpected end of script", line)),
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ExplicitFn {
    stmts: Vec<Stmt>,
}

#[derive(Debug)]
struct ImplicitFn {
    expr: Expr,
}

enum Flow {
    Continue,
    Return(Value),
}

impl ScriptFn for ExplicitFn {
    fn invoke(
        &self,
        args: &TemplateArguments,
        res: &mut dyn ResourceForward,
    ) -> Result<Value, ScriptError> {
        match exec_block(&self.stmts, args, res)? {
            Flow::Return(value) => Ok(value),
            Flow::Continue => Ok(Value::Undefined),
        }
    }
}

impl ScriptFn for ImplicitFn {
    fn invoke(
        &self,
        args: &TemplateArguments,
        res: &mut dyn ResourceForward,
    ) -> Result<Value, ScriptError> {
        eval_expr(&self.expr, args, res)
    }
}

fn exec_block(
    stmts: &[Stmt],
    args: &TemplateArguments,
    res: &mut dyn ResourceForward,
) -> Result<Flow, ScriptError> {
    for stmt in stmts {
        match stmt {
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => eval_expr(expr, args, res)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::If { cond, then, other } => {
                let branch = if eval_expr(cond, args, res)?.is_truthy() {
                    Some(then)
                } else {
                    other.as_ref()
                };
                if let Some(branch) = branch {
                    if let Flow::Return(value) = exec_block(branch, args, res)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            Stmt::Expr(expr) => {
                eval_expr(expr, args, res)?;
            }
        }
    }
    Ok(Flow::Continue)
}

fn eval_expr(
    expr: &Expr,
    args: &TemplateArguments,
    res: &mut dyn ResourceForward,
) -> Result<Value, ScriptError> {
    match expr {
        Expr::Lit(value) => Ok(value.clone()),
        Expr::Arg(name) => Ok(args.get(name).cloned().unwrap_or_default()),
        Expr::ResCall { key, arg } => {
            let forwarded = match arg {
                None => None,
                Some(expr) => match eval_expr(expr, args, res)? {
                    Value::Object(map) => Some(map),
                    other => {
                        return Err(ScriptError::new(format!(
                            "resource call argument must be an object, got {}",
                            other.type_of()
                        )));
                    }
                },
            };
            res.call(key, forwarded).map(Value::String)
        }
        Expr::Unary { op, expr } => {
            let value = eval_expr(expr, args, res)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!value.is_truthy()),
                UnaryOp::Neg => Value::Number(-value.to_number()),
            })
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, args, res),
        Expr::Ternary { cond, then, other } => {
            if eval_expr(cond, args, res)?.is_truthy() {
                eval_expr(then, args, res)
            } else {
                eval_expr(other, args, res)
            }
        }
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    args: &TemplateArguments,
    res: &mut dyn ResourceForward,
) -> Result<Value, ScriptError> {
    // Short-circuit forms yield the deciding operand itself.
    if let BinaryOp::And = op {
        let left = eval_expr(lhs, args, res)?;
        return if left.is_truthy() {
            eval_expr(rhs, args, res)
        } else {
            Ok(left)
        };
    }
    if let BinaryOp::Or = op {
        let left = eval_expr(lhs, args, res)?;
        return if left.is_truthy() {
            Ok(left)
        } else {
            eval_expr(rhs, args, res)
        };
    }

    let left = eval_expr(lhs, args, res)?;
    let right = eval_expr(rhs, args, res)?;

    Ok(match op {
        BinaryOp::Add => {
            // `+` concatenates when either side is a string.
            if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                Value::String(format!("{left}{right}"))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Eq => Value::Bool(left.strict_eq(&right)),
        BinaryOp::Ne => Value::Bool(!left.strict_eq(&right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            Value::Bool(compare(op, &left, &right))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit forms handled above"),
    })
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Le => a <= b,
            BinaryOp::Gt => a > b,
            BinaryOp::Ge => a >= b,
            _ => false,
        };
    }
    let (a, b) = (left.to_number(), right.to_number());
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => false,
    }
}
