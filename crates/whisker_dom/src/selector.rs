//! CSS selector queries
//!
//! Supports the subset needed for mount targets and scenario scripting:
//! type, universal, `#id`, `.class`, `[attr]` and `[attr=value]` selectors,
//! compounds of those, descendant and child combinators, and comma lists.

use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt},
    error::{context, convert_error, VerboseError},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
    Finish, IResult,
};
use whisker_core::NodeId;

use crate::error::DomError;
use crate::tree::Document;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SelectorPart {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attribute { name: String, value: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompoundSelector {
    parts: Vec<SelectorPart>,
}

/// Compounds left to right; each carries the combinator that links it to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    segments: Vec<(CompoundSelector, Option<Combinator>)>,
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<ComplexSelector>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let trimmed = source.trim();
        all_consuming(selector_list)(trimmed)
            .finish()
            .map(|(_, alternatives)| Self { alternatives })
            .map_err(|error| DomError::InvalidSelector {
                selector: source.to_string(),
                reason: convert_error(trimmed, error),
            })
    }
}

fn identifier(input: &str) -> ParseResult<&str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '-' || c == '_')(input)
}

fn attribute_selector(input: &str) -> ParseResult<SelectorPart> {
    context(
        "attribute selector",
        map(
            delimited(
                char('['),
                tuple((
                    delimited(multispace0, identifier, multispace0),
                    opt(preceded(
                        tuple((char('='), multispace0)),
                        alt((
                            delimited(char('"'), opt(is_not("\"")), char('"')),
                            delimited(char('\''), opt(is_not("'")), char('\'')),
                            map(identifier, Some),
                        )),
                    )),
                )),
                preceded(multispace0, char(']')),
            ),
            |(name, value)| SelectorPart::Attribute {
                name: name.to_ascii_lowercase(),
                value: value.map(|v| v.unwrap_or_default().to_string()),
            },
        ),
    )(input)
}

fn simple_selector(input: &str) -> ParseResult<SelectorPart> {
    alt((
        map(char('*'), |_| SelectorPart::Universal),
        map(preceded(char('#'), identifier), |id| SelectorPart::Id(id.to_string())),
        map(preceded(char('.'), identifier), |class| {
            SelectorPart::Class(class.to_string())
        }),
        attribute_selector,
        map(identifier, |tag| SelectorPart::Type(tag.to_ascii_lowercase())),
    ))(input)
}

fn compound_selector(input: &str) -> ParseResult<CompoundSelector> {
    let (mut remaining, first) = context("compound selector", simple_selector)(input)?;
    let mut parts = vec![first];
    // Type selectors may only lead a compound.
    while let Ok((rest, part)) = simple_selector(remaining) {
        if matches!(part, SelectorPart::Type(_)) {
            break;
        }
        parts.push(part);
        remaining = rest;
    }
    Ok((remaining, CompoundSelector { parts }))
}

fn complex_selector(input: &str) -> ParseResult<ComplexSelector> {
    let mut segments = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, compound) = compound_selector(remaining)?;
        remaining = rest;

        let trimmed = remaining.trim_start();
        if let Some(after) = trimmed.strip_prefix('>') {
            remaining = after.trim_start();
            segments.push((compound, Some(Combinator::Child)));
        } else if trimmed.len() < remaining.len()
            && trimmed.starts_with(|c: char| c.is_alphanumeric() || "#.[*".contains(c))
        {
            remaining = trimmed;
            segments.push((compound, Some(Combinator::Descendant)));
        } else {
            segments.push((compound, None));
            break;
        }
    }

    Ok((remaining, ComplexSelector { segments }))
}

fn selector_list(input: &str) -> ParseResult<Vec<ComplexSelector>> {
    separated_list1(delimited(multispace0, char(','), multispace0), complex_selector)(input)
}

impl Document {
    /// Whether element `id` matches `selector`.
    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        selector
            .alternatives
            .iter()
            .any(|complex| self.matches_complex(id, &complex.segments))
    }

    /// First descendant of `scope` (document order) matching `selector`.
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .find(|&node| self.matches(node, &selector)))
    }

    /// Every descendant of `scope` matching `selector`, in document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(scope)
            .into_iter()
            .filter(|&node| self.matches(node, &selector))
            .collect())
    }

    fn matches_complex(
        &self,
        id: NodeId,
        segments: &[(CompoundSelector, Option<Combinator>)],
    ) -> bool {
        let Some(((subject, _), rest)) = segments.split_last() else {
            return false;
        };
        if !self.matches_compound(id, subject) {
            return false;
        }
        let Some((_, Some(combinator))) = rest.last() else {
            return rest.is_empty();
        };
        match combinator {
            Combinator::Child => self
                .parent(id)
                .is_some_and(|parent| self.matches_complex(parent, rest)),
            Combinator::Descendant => self
                .ancestors(id)
                .any(|ancestor| self.matches_complex(ancestor, rest)),
        }
    }

    fn matches_compound(&self, id: NodeId, compound: &CompoundSelector) -> bool {
        let Some(element) = self.element(id) else {
            return false;
        };
        compound.parts.iter().all(|part| match part {
            SelectorPart::Universal => true,
            SelectorPart::Type(tag) => element.tag == *tag,
            SelectorPart::Id(expected) => element.id() == Some(expected.as_str()),
            SelectorPart::Class(class) => element.classes().any(|c| c == class),
            SelectorPart::Attribute { name, value: None } => element.has_attr(name),
            SelectorPart::Attribute {
                name,
                value: Some(expected),
            } => element.attr(name) == Some(expected.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<div id="app"><ul class="list main"><li data-id="1">a</li><li data-id="2"><span>b</span></li></ul><p>c</p></div>"#;

    fn tags(doc: &Document, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| doc.tag(id).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_parse_compound_and_list() {
        let selector = Selector::parse("ul.list.main > li[data-id='2'], #app p").unwrap();
        assert_eq!(selector.alternatives.len(), 2);
        assert_eq!(selector.alternatives[0].segments.len(), 2);
        assert_eq!(
            selector.alternatives[0].segments[1].0.parts[1],
            SelectorPart::Attribute {
                name: "data-id".to_string(),
                value: Some("2".to_string()),
            }
        );
    }

    #[test]
    fn test_query_selector() {
        let doc = Document::parse(PAGE);
        let root = doc.root();
        let app = doc.query_selector(root, "#app").unwrap().unwrap();
        assert_eq!(doc.attr(app, "id"), Some("app"));
        let span = doc.query_selector(root, ".list span").unwrap().unwrap();
        assert_eq!(doc.text_content(span), "b");
        assert_eq!(doc.query_selector(root, "#app > span").unwrap(), None);
    }

    #[test]
    fn test_query_selector_all_in_document_order() {
        let doc = Document::parse(PAGE);
        let found = doc.query_selector_all(doc.root(), "p, li").unwrap();
        assert_eq!(tags(&doc, &found), vec!["li", "li", "p"]);
        let with_id = doc.query_selector_all(doc.root(), "[data-id]").unwrap();
        assert_eq!(with_id.len(), 2);
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(PAGE);
        let error = doc.query_selector(doc.root(), "li >").unwrap_err();
        assert!(matches!(error, DomError::InvalidSelector { .. }));
        assert!(Selector::parse("").is_err());
    }
}
