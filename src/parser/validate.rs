//! Strict-mode checks run over a finished tree

use crate::error::ParseError;
use crate::parser::ast::{Node, Span, Wikicode};

/// Delimiters that can only survive as text if they were never matched.
/// Longer patterns come first, so a run of three or more braces is an
/// argument rather than a template.
const LEFTOVERS: &[(&str, Leftover)] = &[
    ("<!--", Leftover::Unclosed("comment")),
    ("{{{", Leftover::Unclosed("argument")),
    ("{{", Leftover::Unclosed("template")),
    ("[[", Leftover::Unclosed("wikilink")),
    ("}}", Leftover::Unmatched("}}")),
    ("]]", Leftover::Unmatched("]]")),
];

#[derive(Clone, Copy)]
enum Leftover {
    Unclosed(&'static str),
    Unmatched(&'static str),
}

/// Report delimiters that fell back to text
pub fn check_strict(code: &Wikicode) -> Vec<ParseError> {
    let mut errors = Vec::new();
    walk_text(code, &mut |text, span| scan_text(text, span, &mut errors));
    errors.sort_by_key(|e| e.span().start);
    errors
}

fn walk_text(code: &Wikicode, visit: &mut dyn FnMut(&str, &Span)) {
    for spanned in &code.nodes {
        if let Node::Text(text) = &spanned.node {
            visit(text, &spanned.span);
        }
        for child in children(&spanned.node) {
            walk_text(child, visit);
        }
    }
}

fn scan_text(text: &str, span: &Span, errors: &mut Vec<ParseError>) {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let rest = &text[i..];
        let hit = LEFTOVERS
            .iter()
            .find(|(pattern, _)| rest.starts_with(pattern));
        let Some((pattern, kind)) = hit else {
            i += rest.chars().next().map_or(1, char::len_utf8);
            continue;
        };
        // A run like `{{{{` is one leftover, not several
        let mut end = i + pattern.len();
        if pattern.bytes().all(|b| b == bytes[i]) {
            while end < bytes.len() && bytes[end] == bytes[i] {
                end += 1;
            }
        }
        let at = span.start + i..span.start + end;
        log::trace!("leftover {:?} at {:?}", pattern, at);
        errors.push(match *kind {
            Leftover::Unclosed(construct) => ParseError::Unclosed { span: at, construct },
            Leftover::Unmatched(delimiter) => ParseError::Unmatched { span: at, delimiter },
        });
        i = end;
    }
}

/// Nested code of a node, in source order
fn children(node: &Node) -> Vec<&Wikicode> {
    match node {
        Node::Template(t) => std::iter::once(&t.name)
            .chain(t.params.iter().flat_map(|p| [&p.name, &p.value]))
            .collect(),
        Node::Argument(a) => std::iter::once(&a.name).chain(a.default.as_ref()).collect(),
        Node::Wikilink(l) => std::iter::once(&l.title).chain(l.text.as_ref()).collect(),
        Node::Heading(h) => vec![&h.title],
        Node::Text(_) | Node::Comment(_) | Node::Entity(_) => Vec::new(),
    }
}
