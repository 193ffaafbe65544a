//! Syntax tree for parsed wikitext
//!
//! Every node keeps enough of its source to be written back out unchanged:
//! `Display` on a [`Wikicode`] reproduces the text it was parsed from.

use std::fmt;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// A sequence of nodes: a whole page, or the name/value of a parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Wikicode {
    pub nodes: Vec<Spanned<Node>>,
}

/// A single piece of wikitext
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, including delimiters that never closed
    Text(String),
    /// Template transclusion: `{{name|a|k=v}}`
    Template(TemplateNode),
    /// Template argument: `{{{name|default}}}`
    Argument(ArgumentNode),
    /// Internal link: `[[title|text]]`
    Wikilink(WikilinkNode),
    /// Section heading: `== title ==`
    Heading(HeadingNode),
    /// HTML comment body, without the `<!--`/`-->` delimiters
    Comment(String),
    /// HTML entity as written, e.g. `&amp;`
    Entity(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub name: Wikicode,
    pub params: Vec<TemplateParam>,
}

/// One `|`-separated parameter of a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateParam {
    /// Key for named params; empty for positional ones
    pub name: Wikicode,
    pub value: Wikicode,
    /// Whether the key was written out (`k=v`) or implied by position
    pub showkey: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentNode {
    pub name: Wikicode,
    pub default: Option<Wikicode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WikilinkNode {
    pub title: Wikicode,
    pub text: Option<Wikicode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingNode {
    pub title: Wikicode,
    /// 1 to 6
    pub level: usize,
}

impl Wikicode {
    pub fn new(nodes: Vec<Spanned<Node>>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All templates in the tree, outer before inner, in document order
    pub fn filter_templates(&self) -> Vec<&TemplateNode> {
        let mut out = Vec::new();
        self.collect_templates(&mut out);
        out
    }

    fn collect_templates<'a>(&'a self, out: &mut Vec<&'a TemplateNode>) {
        for spanned in &self.nodes {
            match &spanned.node {
                Node::Template(t) => {
                    out.push(t);
                    t.name.collect_templates(out);
                    for param in &t.params {
                        param.name.collect_templates(out);
                        param.value.collect_templates(out);
                    }
                }
                Node::Argument(a) => {
                    a.name.collect_templates(out);
                    if let Some(default) = &a.default {
                        default.collect_templates(out);
                    }
                }
                Node::Wikilink(l) => {
                    l.title.collect_templates(out);
                    if let Some(text) = &l.text {
                        text.collect_templates(out);
                    }
                }
                Node::Heading(h) => h.title.collect_templates(out),
                Node::Text(_) | Node::Comment(_) | Node::Entity(_) => {}
            }
        }
    }

    /// Readable text with markup removed
    ///
    /// Templates, arguments and comments disappear; links collapse to their
    /// display text; entities are decoded.
    pub fn strip_code(&self) -> String {
        let mut out = String::new();
        for spanned in &self.nodes {
            match &spanned.node {
                Node::Text(s) => out.push_str(s),
                Node::Entity(raw) => match decode_entity(raw) {
                    Some(c) => out.push(c),
                    None => out.push_str(raw),
                },
                Node::Wikilink(l) => {
                    let shown = l.text.as_ref().unwrap_or(&l.title);
                    out.push_str(&shown.strip_code());
                }
                Node::Heading(h) => out.push_str(h.title.strip_code().trim()),
                Node::Template(_) | Node::Argument(_) | Node::Comment(_) => {}
            }
        }
        out
    }

    /// Maximum nesting of structured nodes below this point
    pub fn depth(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.node.depth())
            .max()
            .unwrap_or(0)
    }
}

impl Node {
    /// Nesting depth: 0 for leaves, 1 + deepest child for containers
    pub fn depth(&self) -> usize {
        let children = match self {
            Node::Template(t) => t
                .params
                .iter()
                .map(|p| p.name.depth().max(p.value.depth()))
                .chain(std::iter::once(t.name.depth()))
                .max()
                .unwrap_or(0),
            Node::Argument(a) => a
                .name
                .depth()
                .max(a.default.as_ref().map_or(0, Wikicode::depth)),
            Node::Wikilink(l) => l
                .title
                .depth()
                .max(l.text.as_ref().map_or(0, Wikicode::depth)),
            Node::Heading(h) => h.title.depth(),
            Node::Text(_) | Node::Comment(_) | Node::Entity(_) => return 0,
        };
        children + 1
    }
}

/// Decode an HTML entity such as `&amp;`, `&#65;` or `&#x41;`
pub fn decode_entity(raw: &str) -> Option<char> {
    let body = raw.strip_prefix('&')?.strip_suffix(';')?;
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    let c = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "hellip" => '\u{2026}',
        "copy" => '\u{a9}',
        "reg" => '\u{ae}',
        "deg" => '\u{b0}',
        "times" => '\u{d7}',
        "middot" => '\u{b7}',
        "laquo" => '\u{ab}',
        "raquo" => '\u{bb}',
        _ => return None,
    };
    Some(c)
}

impl fmt::Display for Wikicode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for spanned in &self.nodes {
            write!(f, "{}", spanned.node)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(s) | Node::Entity(s) => f.write_str(s),
            Node::Template(t) => write!(f, "{}", t),
            Node::Argument(a) => {
                write!(f, "{{{{{{{}", a.name)?;
                if let Some(default) = &a.default {
                    write!(f, "|{}", default)?;
                }
                f.write_str("}}}")
            }
            Node::Wikilink(l) => {
                write!(f, "[[{}", l.title)?;
                if let Some(text) = &l.text {
                    write!(f, "|{}", text)?;
                }
                f.write_str("]]")
            }
            Node::Heading(h) => {
                let marks = "=".repeat(h.level);
                write!(f, "{}{}{}", marks, h.title, marks)
            }
            Node::Comment(body) => write!(f, "<!--{}-->", body),
        }
    }
}

impl fmt::Display for TemplateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{{}", self.name)?;
        for param in &self.params {
            if param.showkey {
                write!(f, "|{}={}", param.name, param.value)?;
            } else {
                write!(f, "|{}", param.value)?;
            }
        }
        f.write_str("}}")
    }
}
