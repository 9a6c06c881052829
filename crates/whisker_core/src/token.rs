//! Expression tokenizer
//!
//! Splits directive and interpolation text into typed lexical tokens. The
//! tokenizer never fails: unterminated strings simply run to the end of the
//! input. Joining the values of every token reproduces the input exactly.
//!
//! ```
//! use whisker_core::token::{tokenize, TokenKind};
//!
//! let tokens = tokenize("'a b' + c");
//! assert_eq!(tokens[0].kind, TokenKind::String);
//! assert_eq!(tokens[0].value, "'a b'");
//! assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Variable));
//! ```

use std::fmt;

/// Characters that end a token and form a token of their own.
pub const SEPARATORS: [char; 12] = [':', '?', '+', '-', '/', '*', '=', '(', ')', '>', '<', '!'];

/// Words that are never rewritten to instance or loop paths.
pub const KEYWORDS: [&str; 9] = [
    "if",
    "else",
    "true",
    "false",
    "null",
    "alert",
    "console.log",
    "||",
    "&&",
];

/// Root of the current event in handler expressions.
pub const EVENT_ROOT: &str = "$event";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Separator,
    Keyword,
    String,
    Number,
    Variable,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Separator && self.value.chars().all(char::is_whitespace)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.kind, self.value)
    }
}

pub fn is_separator(c: char) -> bool {
    c.is_whitespace() || SEPARATORS.contains(&c)
}

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
        || word == EVENT_ROOT
        || word
            .strip_prefix(EVENT_ROOT)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// Tokenize expression text.
pub fn tokenize(source: &str) -> Vec<Token> {
    let pieces = split(source);
    let pieces = merge_spans(pieces, |piece| piece.starts_with('`').then_some('`'));
    let pieces = merge_spans(pieces, |piece| match piece.chars().next() {
        Some(quote @ ('\'' | '"')) => Some(quote),
        _ => None,
    });

    let mut tokens = Vec::with_capacity(pieces.len());
    for piece in pieces {
        classify(piece, &mut tokens);
    }
    tokens
}

/// Concatenate token values back into text.
pub fn join(tokens: &[Token]) -> String {
    tokens.iter().map(|token| token.value.as_str()).collect()
}

fn split(source: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for c in source.chars() {
        if is_separator(c) {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            pieces.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Merge runs of pieces between an opening and closing delimiter.
///
/// A piece holding the closing delimiter before its end is split there, so
/// `'a b',` yields the string `'a b'` followed by `,`.
fn merge_spans(pieces: Vec<String>, opener: impl Fn(&str) -> Option<char>) -> Vec<String> {
    let mut merged = Vec::with_capacity(pieces.len());
    let mut pending: Vec<String> = pieces.into_iter().rev().collect();
    while let Some(piece) = pending.pop() {
        let Some(delimiter) = opener(&piece) else {
            merged.push(piece);
            continue;
        };
        let mut span = String::new();
        let mut current = piece;
        let mut offset = delimiter.len_utf8();
        loop {
            if let Some(end) = closing_at(&current[offset..], delimiter) {
                let rest = current.split_off(offset + end);
                span.push_str(&current);
                if !rest.is_empty() {
                    pending.push(rest);
                }
                break;
            }
            span.push_str(&current);
            match pending.pop() {
                Some(next) => {
                    current = next;
                    offset = 0;
                }
                None => break,
            }
        }
        merged.push(span);
    }
    merged
}

/// Byte offset just past the first unescaped `delimiter` in `text`.
fn closing_at(text: &str, delimiter: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delimiter {
            return Some(i + c.len_utf8());
        }
    }
    None
}

/// Whether `text` ends with an unescaped `delimiter`.
pub(crate) fn closes(text: &str, delimiter: char) -> bool {
    let Some(body) = text.strip_suffix(delimiter) else {
        return false;
    };
    body.chars().rev().take_while(|&c| c == '\\').count() % 2 == 0
}

fn classify(piece: String, tokens: &mut Vec<Token>) {
    let mut chars = piece.chars();
    let Some(first) = chars.next() else {
        return;
    };
    let single = chars.next().is_none();

    let kind = if single && is_separator(first) {
        TokenKind::Separator
    } else if is_keyword(&piece) {
        TokenKind::Keyword
    } else if first == '`' {
        tokens.extend(tokenize_template(&piece));
        return;
    } else if first == '\'' || first == '"' {
        TokenKind::String
    } else if first.is_ascii_digit() {
        TokenKind::Number
    } else {
        TokenKind::Variable
    };
    tokens.push(Token::new(kind, piece));
}

/// Split a backtick string at `$`, `${` and `}`, tokenizing each interpolation body.
fn tokenize_template(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = source;

    while let Some(dollar) = rest.find('$') {
        literal.push_str(&rest[..dollar]);
        flush_literal(&mut tokens, &mut literal);

        let after = &rest[dollar + 1..];
        let Some(body) = after.strip_prefix('{') else {
            literal.push('$');
            rest = after;
            continue;
        };

        tokens.push(Token::new(TokenKind::String, "${"));
        match body.find('}') {
            Some(end) => {
                tokens.extend(tokenize(&body[..end]));
                literal.push('}');
                rest = &body[end + 1..];
            }
            None => {
                tokens.extend(tokenize(body));
                rest = "";
            }
        }
    }

    literal.push_str(rest);
    flush_literal(&mut tokens, &mut literal);
    tokens
}

fn flush_literal(tokens: &mut Vec<Token>, literal: &mut String) {
    if !literal.is_empty() {
        tokens.push(Token::new(TokenKind::String, std::mem::take(literal)));
    }
}
