//! Expression parser
//!
//! Builds a [`Program`] from rewritten expression text. The parser works on
//! the tokenizer's output: separator runs are glued into operators
//! (`=` `=` becomes `==`), compact variable tokens such as `$this.add(a,b)`
//! are split into identifiers and punctuation, and backtick segments drive a
//! small template state machine. The grammar itself is plain recursive
//! descent with the usual precedence ladder.

use std::fmt;

use crate::ast::{
    AssignOp, BinaryOp, Expr, LogicalOp, Program, Stmt, TemplatePart, UnaryOp, UpdateOp,
};
use crate::error::ParseError;
use crate::rewrite::{is_ident_char, is_ident_start, quoted_len};
use crate::token::{closes, tokenize, Token, TokenKind};
use crate::value::Value;

/// Operators built from separator runs, longest first.
const OPERATORS: [&str; 24] = [
    "===", "!==", "==", "!=", "<=", ">=", "++", "--", "+=", "-=", "*=", "/=", "+", "-", "*", "/",
    "=", "<", ">", "!", "?", ":", "(", ")",
];

pub fn parse(expression: &str) -> Result<Program, ParseError> {
    parse_tokens(expression, &tokenize(expression))
}

/// Parse an already tokenized expression. `expression` is only used in errors.
pub fn parse_tokens(expression: &str, tokens: &[Token]) -> Result<Program, ParseError> {
    let lexemes = Lexer::new(expression).run(tokens)?;
    let mut parser = Parser {
        expression,
        lexemes,
        pos: 0,
    };
    let body = parser.statements(None)?;
    Ok(Program { body })
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Literal(Value),
    Ident(String),
    Punct(&'static str),
    If,
    Else,
    TemplateStart,
    TemplateText(String),
    InterpStart,
    InterpEnd,
    TemplateEnd,
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Literal(Value::String(s)) => write!(f, "'{s}'"),
            Lexeme::Literal(value) => write!(f, "{value}"),
            Lexeme::Ident(name) => f.write_str(name),
            Lexeme::Punct(punct) => f.write_str(punct),
            Lexeme::If => f.write_str("if"),
            Lexeme::Else => f.write_str("else"),
            Lexeme::TemplateStart | Lexeme::TemplateEnd => f.write_str("`"),
            Lexeme::TemplateText(text) => f.write_str(text),
            Lexeme::InterpStart => f.write_str("${"),
            Lexeme::InterpEnd => f.write_str("}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TemplateMode {
    Literal,
    Interpolation,
}

struct Lexer<'s> {
    expression: &'s str,
    out: Vec<Lexeme>,
    templates: Vec<TemplateMode>,
}

impl<'s> Lexer<'s> {
    fn new(expression: &'s str) -> Self {
        Self {
            expression,
            out: Vec::new(),
            templates: Vec::new(),
        }
    }

    fn run(mut self, tokens: &[Token]) -> Result<Vec<Lexeme>, ParseError> {
        let mut i = 0;
        while let Some(token) = tokens.get(i) {
            i += 1;
            if self.templates.last() == Some(&TemplateMode::Literal) {
                self.template_segment(&token.value);
                continue;
            }
            match token.kind {
                TokenKind::Separator if token.is_whitespace() => {}
                TokenKind::Separator => {
                    let mut run = token.value.clone();
                    while let Some(next) = tokens
                        .get(i)
                        .filter(|t| t.kind == TokenKind::Separator && !t.is_whitespace())
                    {
                        run.push_str(&next.value);
                        i += 1;
                    }
                    self.operators(&run)?;
                }
                TokenKind::Keyword => self.keyword(&token.value)?,
                TokenKind::String => self.string(&token.value)?,
                TokenKind::Number | TokenKind::Variable => self.compact(&token.value)?,
            }
        }

        // Unterminated templates are closed at the end of input.
        while let Some(mode) = self.templates.pop() {
            if mode == TemplateMode::Interpolation {
                self.out.push(Lexeme::InterpEnd);
            }
            self.out.push(Lexeme::TemplateEnd);
        }
        Ok(self.out)
    }

    fn unexpected(&self, found: impl Into<String>) -> ParseError {
        ParseError::Unexpected {
            found: found.into(),
            expression: self.expression.to_string(),
        }
    }

    fn operators(&mut self, run: &str) -> Result<(), ParseError> {
        let mut rest = run;
        while !rest.is_empty() {
            let op = OPERATORS
                .iter()
                .copied()
                .find(|op| rest.starts_with(*op))
                .ok_or_else(|| self.unexpected(rest))?;
            self.out.push(Lexeme::Punct(op));
            rest = &rest[op.len()..];
        }
        Ok(())
    }

    fn keyword(&mut self, word: &str) -> Result<(), ParseError> {
        match word {
            "||" => self.out.push(Lexeme::Punct("||")),
            "&&" => self.out.push(Lexeme::Punct("&&")),
            _ => self.compact(word)?,
        }
        Ok(())
    }

    fn string(&mut self, value: &str) -> Result<(), ParseError> {
        if self.templates.last() == Some(&TemplateMode::Interpolation) {
            if let Some(rest) = value.strip_prefix('}') {
                self.out.push(Lexeme::InterpEnd);
                if let Some(mode) = self.templates.last_mut() {
                    *mode = TemplateMode::Literal;
                }
                self.template_chunk(rest);
                return Ok(());
            }
        }
        if let Some(rest) = value.strip_prefix('`') {
            self.out.push(Lexeme::TemplateStart);
            self.templates.push(TemplateMode::Literal);
            self.template_chunk(rest);
            return Ok(());
        }
        match value.chars().next() {
            Some(quote @ ('\'' | '"')) => {
                self.out.push(Lexeme::Literal(Value::String(quoted_body(value, quote))));
                Ok(())
            }
            _ => Err(self.unexpected(value)),
        }
    }

    fn template_segment(&mut self, value: &str) {
        if value == "${" {
            self.out.push(Lexeme::InterpStart);
            if let Some(mode) = self.templates.last_mut() {
                *mode = TemplateMode::Interpolation;
            }
        } else {
            self.template_chunk(value);
        }
    }

    fn template_chunk(&mut self, text: &str) {
        if closes(text, '`') {
            let body = &text[..text.len() - 1];
            if !body.is_empty() {
                self.out.push(Lexeme::TemplateText(unescape(body)));
            }
            self.out.push(Lexeme::TemplateEnd);
            self.templates.pop();
        } else if !text.is_empty() {
            self.out.push(Lexeme::TemplateText(unescape(text)));
        }
    }

    /// Split a compact token (`$this.todos[$loop.i].done`, `1;`, `add(a,b)`).
    fn compact(&mut self, text: &str) -> Result<(), ParseError> {
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            let len = if is_ident_start(c) {
                let len = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
                self.out.push(match &rest[..len] {
                    "true" => Lexeme::Literal(Value::Bool(true)),
                    "false" => Lexeme::Literal(Value::Bool(false)),
                    "null" => Lexeme::Literal(Value::Null),
                    "undefined" => Lexeme::Literal(Value::Undefined),
                    "NaN" => Lexeme::Literal(Value::Number(f64::NAN)),
                    "Infinity" => Lexeme::Literal(Value::Number(f64::INFINITY)),
                    "if" => Lexeme::If,
                    "else" => Lexeme::Else,
                    word => Lexeme::Ident(word.to_string()),
                });
                len
            } else if c.is_ascii_digit() {
                let len = number_len(rest);
                let literal = &rest[..len];
                let n = literal
                    .parse()
                    .map_err(|_| ParseError::InvalidNumber(literal.to_string()))?;
                self.out.push(Lexeme::Literal(Value::Number(n)));
                len
            } else if c == '\'' || c == '"' {
                let len = quoted_len(rest, c);
                self.out
                    .push(Lexeme::Literal(Value::String(quoted_body(&rest[..len], c))));
                len
            } else if rest.starts_with("&&") {
                self.out.push(Lexeme::Punct("&&"));
                2
            } else if rest.starts_with("||") {
                self.out.push(Lexeme::Punct("||"));
                2
            } else {
                let punct = match c {
                    '.' => ".",
                    '[' => "[",
                    ']' => "]",
                    ',' => ",",
                    ';' => ";",
                    '%' => "%",
                    '{' => "{",
                    '}' => "}",
                    other => return Err(self.unexpected(other.to_string())),
                };
                self.out.push(Lexeme::Punct(punct));
                c.len_utf8()
            };
            rest = &rest[len..];
        }
        Ok(())
    }
}

/// Digits with an optional fractional part.
fn number_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) {
        len += 1;
        len += bytes[len..].iter().take_while(|b| b.is_ascii_digit()).count();
    }
    len
}

fn quoted_body(literal: &str, quote: char) -> String {
    let inner = &literal[quote.len_utf8()..];
    let inner = if closes(inner, quote) {
        &inner[..inner.len() - quote.len_utf8()]
    } else {
        inner
    };
    unescape(inner)
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

struct Parser<'s> {
    expression: &'s str,
    lexemes: Vec<Lexeme>,
    pos: usize,
}

type ParseResult<T> = Result<T, ParseError>;

impl Parser<'_> {
    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Lexeme> {
        self.lexemes.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn check(&self, punct: &str) -> bool {
        matches!(self.peek(), Some(Lexeme::Punct(p)) if *p == punct)
    }

    fn eat(&mut self, punct: &str) -> bool {
        let found = self.check(punct);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_any(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        match self.peek() {
            Some(Lexeme::Punct(p)) if ops.contains(p) => {
                let p = *p;
                self.pos += 1;
                Some(p)
            }
            _ => None,
        }
    }

    fn expect(&mut self, punct: &str) -> ParseResult<()> {
        if self.eat(punct) {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    fn error(&self) -> ParseError {
        match self.peek() {
            Some(lexeme) => ParseError::Unexpected {
                found: lexeme.to_string(),
                expression: self.expression.to_string(),
            },
            None => ParseError::UnexpectedEnd(self.expression.to_string()),
        }
    }

    /// Statements up to `terminator` (consumed) or end of input.
    fn statements(&mut self, terminator: Option<&str>) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            while self.eat(";") {}
            if self.peek().is_none() {
                return match terminator {
                    None => Ok(body),
                    Some(_) => Err(self.error()),
                };
            }
            if let Some(terminator) = terminator {
                if self.eat(terminator) {
                    return Ok(body);
                }
            }

            let stmt = self.statement()?;
            let needs_separator = matches!(stmt, Stmt::Expr(_));
            body.push(stmt);

            let at_boundary = self.peek().is_none()
                || self.check(";")
                || terminator.is_some_and(|t| self.check(t));
            if needs_separator && !at_boundary {
                return Err(self.error());
            }
        }
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.eat("{") {
            return Ok(Stmt::Block(self.statements(Some("}"))?));
        }
        if self.peek() != Some(&Lexeme::If) {
            return Ok(Stmt::Expr(self.expression()?));
        }
        self.pos += 1;
        self.expect("(")?;
        let test = self.expression()?;
        self.expect(")")?;
        let then = Box::new(self.statement()?);
        if self.check(";") && self.peek_at(1) == Some(&Lexeme::Else) {
            self.pos += 1;
        }
        let otherwise = if self.peek() == Some(&Lexeme::Else) {
            self.pos += 1;
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            then,
            otherwise,
        })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let target = self.conditional()?;
        let op = match self.eat_any(&["=", "+=", "-=", "*=", "/="]) {
            Some("=") => AssignOp::Assign,
            Some("+=") => AssignOp::Add,
            Some("-=") => AssignOp::Sub,
            Some("*=") => AssignOp::Mul,
            Some(_) => AssignOp::Div,
            None => return Ok(target),
        };
        self.ensure_place(&target)?;
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn ensure_place(&self, target: &Expr) -> ParseResult<()> {
        if target.is_place() {
            Ok(())
        } else {
            Err(ParseError::InvalidAssignmentTarget {
                target: target.describe(),
                expression: self.expression.to_string(),
            })
        }
    }

    fn conditional(&mut self) -> ParseResult<Expr> {
        let test = self.logical_or()?;
        if !self.eat("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn logical_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.logical_and()?;
        while self.eat("||") {
            let right = self.logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.equality()?;
        while self.eat("&&") {
            let right = self.equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNotEq),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::NotEq),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                ("<=", BinaryOp::LtEq),
                (">=", BinaryOp::GtEq),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn binary_level(
        &mut self,
        ops: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut left = next(self)?;
        'outer: loop {
            for (punct, op) in ops {
                if self.eat(punct) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let Some(op) = self.eat_any(&["!", "-", "+", "++", "--"]) else {
            return self.postfix();
        };
        let operand = self.unary()?;
        let op = match op {
            "++" | "--" => {
                self.ensure_place(&operand)?;
                return Ok(Expr::Update {
                    op: if op == "++" {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    },
                    prefix: true,
                    target: Box::new(operand),
                });
            }
            "!" => UnaryOp::Not,
            "-" => UnaryOp::Neg,
            _ => UnaryOp::Plus,
        };
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                expr = match self.peek() {
                    Some(Lexeme::Ident(name)) => Expr::Member {
                        object: Box::new(expr),
                        property: name.clone(),
                    },
                    Some(Lexeme::Literal(Value::Number(n))) => Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(Expr::Literal(Value::Number(*n))),
                    },
                    _ => return Err(self.error()),
                };
                self.pos += 1;
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.eat("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }

        if expr.is_place() {
            if let Some(op) = self.eat_any(&["++", "--"]) {
                return Ok(Expr::Update {
                    op: if op == "++" {
                        UpdateOp::Increment
                    } else {
                        UpdateOp::Decrement
                    },
                    prefix: false,
                    target: Box::new(expr),
                });
            }
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> ParseResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.assignment()?);
            if !self.eat(",") {
                self.expect(")")?;
                return Ok(args);
            }
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let Some(lexeme) = self.advance() else {
            return Err(self.error());
        };
        match lexeme {
            Lexeme::Literal(value) => Ok(Expr::Literal(value)),
            Lexeme::Ident(name) => Ok(Expr::Ident(name)),
            Lexeme::Punct("(") => {
                let expr = self.expression()?;
                self.expect(")")?;
                Ok(expr)
            }
            Lexeme::Punct("[") => {
                let mut items = Vec::new();
                if self.eat("]") {
                    return Ok(Expr::Array(items));
                }
                loop {
                    items.push(self.assignment()?);
                    if !self.eat(",") {
                        self.expect("]")?;
                        return Ok(Expr::Array(items));
                    }
                }
            }
            Lexeme::TemplateStart => self.template(),
            _ => {
                self.pos -= 1;
                Err(self.error())
            }
        }
    }

    fn template(&mut self) -> ParseResult<Expr> {
        let mut parts = Vec::new();
        loop {
            match self.advance() {
                Some(Lexeme::TemplateText(text)) => parts.push(TemplatePart::Text(text)),
                Some(Lexeme::InterpStart) => {
                    let expr = self.expression()?;
                    if self.peek() != Some(&Lexeme::InterpEnd) {
                        return Err(self.error());
                    }
                    self.pos += 1;
                    parts.push(TemplatePart::Expr(expr));
                }
                Some(Lexeme::TemplateEnd) => return Ok(Expr::Template(parts)),
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.error());
                }
                None => return Err(self.error()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(source: &str) -> Expr {
        let program = parse(source).unwrap();
        program.single_expression().cloned().unwrap()
    }

    fn member(object: Expr, property: &str) -> Expr {
        Expr::Member {
            object: Box::new(object),
            property: property.to_string(),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            expr("1 + 2 * 3"),
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Literal(Value::Number(1.0))),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::Literal(Value::Number(2.0))),
                    right: Box::new(Expr::Literal(Value::Number(3.0))),
                }),
            }
        );
    }

    #[test]
    fn test_separator_runs_become_operators() {
        assert!(matches!(
            expr("$this.a === 1"),
            Expr::Binary {
                op: BinaryOp::StrictEq,
                ..
            }
        ));
        assert!(matches!(
            expr("$this.a += 2"),
            Expr::Assign {
                op: AssignOp::Add,
                ..
            }
        ));
        assert!(matches!(
            expr("$this.count++"),
            Expr::Update {
                op: UpdateOp::Increment,
                prefix: false,
                ..
            }
        ));
    }

    #[test]
    fn test_member_chain_and_index() {
        let this = Expr::Ident("$this".into());
        assert_eq!(
            expr("$this.todos[$loop.i].done"),
            member(
                Expr::Index {
                    object: Box::new(member(this, "todos")),
                    index: Box::new(member(Expr::Ident("$loop".into()), "i")),
                },
                "done"
            )
        );
        assert!(matches!(expr("$this.items.0"), Expr::Index { .. }));
    }

    #[test]
    fn test_calls_and_arguments() {
        let call = expr("$this.add($this.count, 'x y', [1, 2])");
        let Expr::Call { callee, args } = call else {
            panic!("expected call");
        };
        assert_eq!(*callee, member(Expr::Ident("$this".into()), "add"));
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], Expr::Literal(Value::from("x y")));
    }

    #[test]
    fn test_template_literal() {
        assert_eq!(
            expr("`Hi ${$this.name}!`"),
            Expr::Template(vec![
                TemplatePart::Text("Hi ".into()),
                TemplatePart::Expr(member(Expr::Ident("$this".into()), "name")),
                TemplatePart::Text("!".into()),
            ])
        );
    }

    #[test]
    fn test_if_else_and_statements() {
        let program = parse("if ($this.a) $this.b = 1; else $this.b = 2; $this.c = 3").unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(matches!(
            &program.body[0],
            Stmt::If {
                otherwise: Some(_),
                ..
            }
        ));

        let program = parse("if ($this.a) { $this.b = 1; $this.c = 2 }").unwrap();
        let Stmt::If { then, .. } = &program.body[0] else {
            panic!("expected if");
        };
        assert!(matches!(then.as_ref(), Stmt::Block(body) if body.len() == 2));
    }

    #[test]
    fn test_ternary_and_logical() {
        assert!(matches!(
            expr("$this.a && $this.b ? 'y' : 'n'"),
            Expr::Conditional { .. }
        ));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse("$this.a +"),
            Err(ParseError::UnexpectedEnd(_))
        ));
        assert!(matches!(
            parse("1 = 2"),
            Err(ParseError::InvalidAssignmentTarget { .. })
        ));
        assert!(matches!(
            parse("$this.a $this.b"),
            Err(ParseError::Unexpected { .. })
        ));
    }
}
