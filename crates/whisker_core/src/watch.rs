//! Watchers
//!
//! A watch pattern is a dotted path. It matches a written path when it equals
//! it or is a strict dotted prefix of it, so watching `user` also fires for
//! `user.name`. A `*` segment matches any single segment.

use smallvec::SmallVec;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Exact(String),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPattern {
    raw: String,
    segments: SmallVec<[Segment; 4]>,
}

impl WatchPattern {
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split('.')
            .map(|segment| match segment {
                "*" => Segment::Any,
                exact => Segment::Exact(exact.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let mut parts = path.split('.');
        self.segments.iter().all(|segment| match (segment, parts.next()) {
            (Segment::Any, Some(_)) => true,
            (Segment::Exact(expected), Some(part)) => expected == part,
            (_, None) => false,
        })
    }
}

/// Registered watchers, invoked in registration order.
#[derive(Debug, Clone)]
pub struct Watchers<H> {
    entries: Vec<(WatchPattern, H)>,
}

impl<H> Default for Watchers<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<H: Clone> Watchers<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: &str, handler: H) {
        self.entries.push((WatchPattern::parse(pattern), handler));
    }

    /// Handlers whose pattern matches `path`, cloned so the caller can run
    /// them while mutating whatever owns this set.
    pub fn matching(&self, path: &str) -> Vec<H> {
        self.entries
            .iter()
            .filter(|(pattern, _)| pattern.matches(path))
            .map(|(_, handler)| handler.clone())
            .collect()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(pattern, _)| pattern.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_prefix() {
        let pattern = WatchPattern::parse("user");
        assert!(pattern.matches("user"));
        assert!(pattern.matches("user.name"));
        assert!(!pattern.matches("username"));
        assert!(!pattern.matches("use"));
    }

    #[test]
    fn test_wildcard_segment() {
        let pattern = WatchPattern::parse("todos.*.done");
        assert!(pattern.matches("todos.3.done"));
        assert!(!pattern.matches("todos.3.text"));
        assert!(!pattern.matches("todos"));
    }

    #[test]
    fn test_all_matches_in_registration_order() {
        let mut watchers = Watchers::new();
        watchers.add("user.name", 1);
        watchers.add("count", 2);
        watchers.add("user", 3);
        assert_eq!(watchers.matching("user.name"), vec![1, 3]);
        assert_eq!(watchers.matching("user.age"), vec![3]);
        assert!(watchers.matching("other").is_empty());
    }
}
