//! Parsed expression cache
//!
//! Expressions are parsed once per unique rewritten text and shared between
//! every node that uses them.

use rustc_hash::FxHashMap;
use std::rc::Rc;

use crate::ast::Program;
use crate::error::ParseError;
use crate::parser::parse;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Debug, Default)]
pub struct ExpressionCache {
    programs: FxHashMap<String, Rc<Program>>,
    stats: CacheStats,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the program for `rewritten`, parsing it on first use.
    ///
    /// Parse failures are not cached; the next lookup parses again and
    /// reports the same error.
    pub fn get_or_parse(&mut self, rewritten: &str) -> Result<Rc<Program>, ParseError> {
        if let Some(program) = self.programs.get(rewritten) {
            self.stats.hits += 1;
            return Ok(Rc::clone(program));
        }
        self.stats.misses += 1;
        let program = Rc::new(parse(rewritten)?);
        self.programs
            .insert(rewritten.to_string(), Rc::clone(&program));
        tracing::trace!(expression = rewritten, "parsed expression");
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.programs.clear();
    }
}
