//! Expression rewriter
//!
//! Qualifies every path root in a tokenized expression so the interpreter
//! knows where to look it up: loop-local names become `$loop.<name>`,
//! everything else `$this.<name>`. Roots that are neither loop-local nor
//! instance members are reported as unresolved; the caller decides how to
//! surface them.

use crate::token::{tokenize, Token, TokenKind, EVENT_ROOT};

/// Root of the instance view in rewritten expressions.
pub const INSTANCE_ROOT: &str = "$this";
/// Root of the loop-item scope chain in rewritten expressions.
pub const LOOP_ROOT: &str = "$loop";

/// Answers name lookups for the node an expression is attached to.
pub trait NameResolver {
    fn is_loop_local(&self, name: &str) -> bool;
    fn is_instance_member(&self, name: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Loop,
    Instance,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootName {
    pub name: String,
    pub resolution: Resolution,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub roots: Vec<RootName>,
}

impl Rewritten {
    /// Roots that resolved to the instance, in order of appearance.
    pub fn instance_roots(&self) -> impl Iterator<Item = &str> {
        self.roots_with(Resolution::Instance)
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.roots_with(Resolution::Unresolved)
    }

    fn roots_with(&self, resolution: Resolution) -> impl Iterator<Item = &str> {
        self.roots
            .iter()
            .filter(move |root| root.resolution == resolution)
            .map(|root| root.name.as_str())
    }
}

pub fn rewrite<R: NameResolver + ?Sized>(source: &str, resolver: &R) -> Rewritten {
    rewrite_tokens(&tokenize(source), resolver)
}

pub fn rewrite_tokens<R: NameResolver + ?Sized>(tokens: &[Token], resolver: &R) -> Rewritten {
    let mut out = Rewritten::default();
    for token in tokens {
        if token.kind == TokenKind::Variable {
            rewrite_variable(&token.value, resolver, &mut out);
        } else {
            out.text.push_str(&token.value);
        }
    }
    out
}

fn rewrite_variable<R: NameResolver + ?Sized>(value: &str, resolver: &R, out: &mut Rewritten) {
    let mut rest = value;
    let mut root_allowed = true;

    while let Some(c) = rest.chars().next() {
        let len = if c == '\'' || c == '"' {
            quoted_len(rest, c)
        } else if is_ident_start(c) {
            let len = rest.find(|ch: char| !is_ident_char(ch)).unwrap_or(rest.len());
            let word = &rest[..len];
            if root_allowed && !is_reserved(word) {
                let resolution = resolve(word, resolver);
                out.text.push_str(match resolution {
                    Resolution::Loop => LOOP_ROOT,
                    Resolution::Instance | Resolution::Unresolved => INSTANCE_ROOT,
                });
                out.text.push('.');
                out.roots.push(RootName {
                    name: word.to_string(),
                    resolution,
                });
            }
            len
        } else if c.is_ascii_digit() {
            rest.find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_'))
                .unwrap_or(rest.len())
        } else {
            c.len_utf8()
        };

        out.text.push_str(&rest[..len]);
        root_allowed = len == c.len_utf8() && !c.is_alphanumeric() && c != '.' && c != '_';
        rest = &rest[len..];
    }
}

fn resolve<R: NameResolver + ?Sized>(word: &str, resolver: &R) -> Resolution {
    if resolver.is_loop_local(word) {
        Resolution::Loop
    } else if resolver.is_instance_member(word) {
        Resolution::Instance
    } else {
        Resolution::Unresolved
    }
}

pub(crate) fn quoted_len(text: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, c) in text.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return i + c.len_utf8();
        }
    }
    text.len()
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_reserved(word: &str) -> bool {
    matches!(
        word,
        "true"
            | "false"
            | "null"
            | "undefined"
            | "NaN"
            | "Infinity"
            | "alert"
            | "console"
            | INSTANCE_ROOT
            | LOOP_ROOT
            | EVENT_ROOT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Names {
        loop_locals: &'static [&'static str],
        members: &'static [&'static str],
    }

    impl NameResolver for Names {
        fn is_loop_local(&self, name: &str) -> bool {
            self.loop_locals.contains(&name)
        }

        fn is_instance_member(&self, name: &str) -> bool {
            self.members.contains(&name)
        }
    }

    const NAMES: Names = Names {
        loop_locals: &["todo", "i"],
        members: &["todos", "count", "add", "user"],
    };

    #[test]
    fn test_instance_and_loop_roots() {
        let out = rewrite("count + todo.text", &NAMES);
        assert_eq!(out.text, "$this.count + $loop.todo.text");
        assert_eq!(out.instance_roots().collect::<Vec<_>>(), vec!["count"]);
    }

    #[test]
    fn test_index_expressions_rewrite_inner_roots() {
        let out = rewrite("todos[i].done", &NAMES);
        assert_eq!(out.text, "$this.todos[$loop.i].done");
    }

    #[test]
    fn test_keywords_and_literals_pass_through() {
        let out = rewrite("if (count > 1) alert('many') else $event.preventDefault", &NAMES);
        assert_eq!(
            out.text,
            "if ($this.count > 1) alert('many') else $event.preventDefault"
        );
        assert!(out.unresolved().next().is_none());
    }

    #[test]
    fn test_compact_call_arguments() {
        let out = rewrite("add(count,true,user.name)", &NAMES);
        assert_eq!(out.text, "$this.add($this.count,true,$this.user.name)");

        let out = rewrite("add(count,$event.target.value)", &NAMES);
        assert_eq!(out.text, "$this.add($this.count,$event.target.value)");
    }

    #[test]
    fn test_unresolved_roots_are_reported() {
        let out = rewrite("missing + count", &NAMES);
        assert_eq!(out.text, "$this.missing + $this.count");
        assert_eq!(out.unresolved().collect::<Vec<_>>(), vec!["missing"]);
    }

    #[test]
    fn test_quoted_strings_inside_compact_tokens() {
        let out = rewrite("user['first.name']", &NAMES);
        assert_eq!(out.text, "$this.user['first.name']");
    }
}
