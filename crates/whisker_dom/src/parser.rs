//! Tolerant HTML parser
//!
//! Markup is consumed one item at a time (text, comment, doctype, start tag,
//! end tag) with nom combinators, and a small tree builder assembles the
//! items into a [`Document`]. Malformed markup never aborts parsing: a `<`
//! that does not open a recognizable item is kept as text, unmatched end tags
//! are dropped, and unclosed elements are closed at end of input.

use std::borrow::Cow;

use html_escape::decode_html_entities;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_till, take_till1, take_until, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt, rest, verify},
    error::{context, VerboseError},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use tracing::trace;
use whisker_core::NodeId;

use crate::element::{is_raw_text, is_void, Element, NodeData};
use crate::tree::Document;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

#[derive(Debug, Clone, PartialEq)]
enum Item<'a> {
    Text(&'a str),
    Comment(&'a str),
    Doctype,
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
}

/// Parse markup into a new document.
pub fn parse_document(html: &str) -> Document {
    let mut builder = TreeBuilder::new();
    let mut input = html;

    while !input.is_empty() {
        match item(input) {
            Ok((remaining, Item::StartTag { name, attrs, self_closing })) => {
                input = remaining;
                let raw = !self_closing && is_raw_text(&name);
                builder.start_tag(&name, attrs, self_closing);
                if raw {
                    let (content, after) = split_raw_text(input, &name);
                    if !content.is_empty() {
                        if name == "textarea" {
                            builder.text(&decode_html_entities(content));
                        } else {
                            builder.text(content);
                        }
                    }
                    input = after;
                }
            }
            Ok((remaining, Item::EndTag(name))) => {
                input = remaining;
                builder.end_tag(&name);
            }
            Ok((remaining, Item::Text(text))) => {
                input = remaining;
                builder.text(&decode_html_entities(text));
            }
            Ok((remaining, Item::Comment(text))) => {
                input = remaining;
                builder.comment(text);
            }
            Ok((remaining, Item::Doctype)) => input = remaining,
            Err(_) => {
                // A `<` that starts nothing recognizable is ordinary text.
                let (lt, remaining) = input.split_at(1);
                builder.text(lt);
                input = remaining;
            }
        }
    }

    builder.finish()
}

fn item(input: &str) -> ParseResult<Item> {
    alt((comment, doctype, end_tag, start_tag, text))(input)
}

fn text(input: &str) -> ParseResult<Item> {
    map(take_till1(|c: char| c == '<'), Item::Text)(input)
}

/// `<!-- ... -->`; an unterminated comment runs to the end of input.
fn comment(input: &str) -> ParseResult<Item> {
    context(
        "comment",
        map(
            preceded(
                tag("<!--"),
                alt((terminated(take_until("-->"), tag("-->")), rest)),
            ),
            Item::Comment,
        ),
    )(input)
}

fn doctype(input: &str) -> ParseResult<Item> {
    context(
        "doctype",
        map(
            tuple((tag("<!"), tag_no_case("doctype"), take_till(|c: char| c == '>'), char('>'))),
            |_| Item::Doctype,
        ),
    )(input)
}

fn tag_name(input: &str) -> ParseResult<String> {
    map(
        verify(
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':'),
            |name: &str| name.starts_with(|c: char| c.is_ascii_alphabetic()),
        ),
        str::to_ascii_lowercase,
    )(input)
}

fn end_tag(input: &str) -> ParseResult<Item> {
    context(
        "end tag",
        map(
            delimited(tag("</"), tag_name, pair(take_till(|c: char| c == '>'), char('>'))),
            Item::EndTag,
        ),
    )(input)
}

fn attr_name(input: &str) -> ParseResult<&str> {
    take_while1(|c: char| {
        !c.is_whitespace() && !matches!(c, '/' | '>' | '=' | '"' | '\'' | '<')
    })(input)
}

fn attr_value(input: &str) -> ParseResult<&str> {
    preceded(
        tuple((multispace0, char('='), multispace0)),
        alt((
            delimited(char('"'), take_until("\""), char('"')),
            delimited(char('\''), take_until("'"), char('\'')),
            take_while1(|c: char| !c.is_whitespace() && c != '>'),
        )),
    )(input)
}

fn attribute(input: &str) -> ParseResult<(String, String)> {
    map(pair(attr_name, opt(attr_value)), |(name, value)| {
        let value = value.map(decode_html_entities).unwrap_or(Cow::Borrowed(""));
        (name.to_ascii_lowercase(), value.into_owned())
    })(input)
}

fn start_tag(input: &str) -> ParseResult<Item> {
    context("start tag", |input| {
        let (input, _) = char('<')(input)?;
        let (input, name) = tag_name(input)?;
        let (input, parsed) = many0(preceded(multispace0, attribute))(input)?;
        let (input, _) = multispace0(input)?;
        let (input, slash) = opt(char('/'))(input)?;
        let (input, _) = char('>')(input)?;

        // The first occurrence of a repeated attribute wins.
        let mut attrs: Vec<(String, String)> = Vec::with_capacity(parsed.len());
        for (name, value) in parsed {
            if !attrs.iter().any(|(existing, _)| *existing == name) {
                attrs.push((name, value));
            }
        }

        Ok((
            input,
            Item::StartTag {
                name,
                attrs,
                self_closing: slash.is_some(),
            },
        ))
    })(input)
}

/// Split raw element content from the input at its end tag (case-insensitive).
fn split_raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
    let needle = format!("</{name}");
    match input.to_ascii_lowercase().find(&needle) {
        Some(end) => input.split_at(end),
        None => (input, ""),
    }
}

struct TreeBuilder {
    document: Document,
    open: Vec<(NodeId, String)>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            document: Document::new(),
            open: Vec::new(),
        }
    }

    fn current(&self) -> NodeId {
        self.open
            .last()
            .map(|(id, _)| *id)
            .unwrap_or_else(|| self.document.root())
    }

    fn start_tag(&mut self, name: &str, attrs: Vec<(String, String)>, self_closing: bool) {
        let parent = self.current();
        let element = self
            .document
            .create(NodeData::Element(Element::with_attrs(name, attrs)));
        self.document.attach(parent, element);
        if !self_closing && !is_void(name) {
            self.open.push((element, name.to_string()));
        }
    }

    fn end_tag(&mut self, name: &str) {
        match self.open.iter().rposition(|(_, open)| open == name) {
            Some(position) => self.open.truncate(position),
            None => trace!(tag = name, "ignoring unmatched end tag"),
        }
    }

    fn text(&mut self, text: &str) {
        let parent = self.current();
        // Adjacent text (e.g. around a stray `<`) merges into one node.
        if let Some(&last) = self.document.children(parent).last() {
            if let Some(existing) = self.document.text(last) {
                let merged = format!("{existing}{text}");
                self.document.set_text(last, merged);
                return;
            }
        }
        let node = self.document.create(NodeData::Text(text.to_string()));
        self.document.attach(parent, node);
    }

    fn comment(&mut self, text: &str) {
        let parent = self.current();
        let node = self.document.create(NodeData::Comment(text.to_string()));
        self.document.attach(parent, node);
    }

    fn finish(self) -> Document {
        if let Some((_, name)) = self.open.last() {
            trace!(tag = name.as_str(), unclosed = self.open.len(), "closing elements at end of input");
        }
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_start_tag_attributes() {
        let (rest, parsed) =
            item(r#"<INPUT type=checkbox data-model="done" Checked data-on-click.prevent='go()'/>x"#)
                .unwrap();
        assert_eq!(rest, "x");
        assert_eq!(
            parsed,
            Item::StartTag {
                name: "input".to_string(),
                attrs: vec![
                    ("type".to_string(), "checkbox".to_string()),
                    ("data-model".to_string(), "done".to_string()),
                    ("checked".to_string(), String::new()),
                    ("data-on-click.prevent".to_string(), "go()".to_string()),
                ],
                self_closing: true,
            }
        );
    }

    #[test]
    fn test_attribute_entities_are_decoded() {
        let (_, (name, value)) = attribute(r#"title="a &amp; b""#).unwrap();
        assert_eq!(name, "title");
        assert_eq!(value, "a & b");
    }

    #[test]
    fn test_nesting_and_void_elements() {
        let doc = parse_document("<div><br><p>a</p>b</div>");
        let div = doc.children(doc.root())[0];
        let kids = doc.children(div);
        assert_eq!(kids.len(), 3);
        assert_eq!(doc.tag(kids[0]), Some("br"));
        assert_eq!(doc.tag(kids[1]), Some("p"));
        assert_eq!(doc.text(kids[2]), Some("b"));
    }

    #[test]
    fn test_unmatched_end_tags_are_ignored() {
        let doc = parse_document("<ul><li>one</span></li></ul>");
        let ul = doc.children(doc.root())[0];
        assert_eq!(doc.text_content(ul), "one");
        assert_eq!(doc.children(ul).len(), 1);
    }

    #[test]
    fn test_stray_less_than_is_text() {
        let doc = parse_document("<p>1 < 2 &amp; 3</p>");
        let p = doc.children(doc.root())[0];
        assert_eq!(doc.children(p).len(), 1);
        assert_eq!(doc.text_content(p), "1 < 2 & 3");
    }

    #[test]
    fn test_raw_text_elements() {
        let doc = parse_document("<script>if (a < b) {}</SCRIPT><textarea>x &lt; y</textarea>");
        let children = doc.children(doc.root()).to_vec();
        assert_eq!(doc.text_content(children[0]), "if (a < b) {}");
        assert_eq!(doc.text_content(children[1]), "x < y");
    }

    #[test]
    fn test_comments_and_doctype() {
        let doc = parse_document("<!DOCTYPE html><!-- note --><p></p>");
        let children = doc.children(doc.root());
        assert_eq!(children.len(), 2);
        assert_eq!(
            doc.node(children[0]).map(|node| &node.data),
            Some(&NodeData::Comment(" note ".to_string()))
        );
    }
}
