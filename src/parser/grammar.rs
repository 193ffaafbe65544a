//! Parser implementation using chumsky
//!
//! The grammar is total: a construct that fails to close is re-read as
//! literal text, so any input produces a tree. The one exception is nesting
//! past the configured depth, which stops the parse with `TooDeep`.

use chumsky::extra::SimpleState;
use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::config::DEFAULT_MAX_DEPTH;
use crate::error::ParseError;
use crate::parser::ast::*;
use crate::parser::lexer::Token;

type Extra<'a> = extra::Full<Rich<'a, Token>, SimpleState<Nesting>, ()>;

/// Open templates, arguments and wikilinks around the current position
#[derive(Debug)]
struct Nesting {
    depth: usize,
    limit: usize,
    /// Opener of the first construct past `limit`; once set, nothing more nests
    exceeded: Option<Span>,
}

/// Intermediate output of the content parsers, merged into [`Wikicode`]
#[derive(Debug, Clone)]
enum Piece {
    Node(Node),
    Text(String),
    /// `=` inside a template parameter, kept apart so the key can be split off
    Equals,
}

/// Parse wikitext into a syntax tree with the default nesting limit
pub fn parse(input: &str) -> Result<Wikicode, Vec<ParseError>> {
    parse_with_limit(input, DEFAULT_MAX_DEPTH)
}

/// Parse wikitext, nesting constructs at most `max_depth` deep
///
/// Every template, argument or wikilink being read counts one level, closed
/// or not, and top-level ones sit at depth 1. The first `{{` or `[[` that
/// would open a level past the limit ends the parse with a single
/// [`ParseError::TooDeep`] spanning that opener.
pub fn parse_with_limit(input: &str, max_depth: usize) -> Result<Wikicode, Vec<ParseError>> {
    let len = input.len();

    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let mut nesting = SimpleState(Nesting {
        depth: 0,
        limit: max_depth,
        exceeded: None,
    });
    let result = document_parser()
        .parse_with_state(token_stream, &mut nesting)
        .into_result();

    if let Some(span) = nesting.exceeded.take() {
        log::debug!("nesting limit {} reached at {:?}", max_depth, span);
        return Err(vec![ParseError::TooDeep {
            span,
            limit: max_depth,
        }]);
    }
    result.map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Any single token accepted by `allowed`, as text
fn text_where<'a, I>(allowed: fn(&Token) -> bool) -> impl Parser<'a, I, Spanned<Piece>, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    any()
        .filter(move |t: &Token| allowed(t))
        .map_with(|t: Token, e| Spanned::new(Piece::Text(t.to_string()), span_range(&e.span())))
}

/// A closing `}` or `]` that is not doubled, as text
fn lone<'a, I>(tok: Token) -> impl Parser<'a, I, Spanned<Piece>, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let text = tok.to_string();
    just(tok.clone())
        .then_ignore(just(tok).not())
        .map_with(move |_, e| Spanned::new(Piece::Text(text.clone()), span_range(&e.span())))
}

/// Run `construct` one level deeper, or fail once the nesting limit is hit
///
/// Hitting the limit on a real `{{` or `[[` opener records it in the state.
/// From then on every nested attempt fails straight away, so the rest of
/// the input is read as text and the parse finishes quickly.
fn nested<'a, I, O, P>(construct: P) -> impl Parser<'a, I, O, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, O, Extra<'a>> + Clone,
{
    let opener = choice((
        just(Token::BraceOpen).then(just(Token::BraceOpen)),
        just(Token::BracketOpen).then(just(Token::BracketOpen)),
    ));

    custom::<_, I, O, Extra<'a>>(move |inp| {
        let before = inp.save();
        let nesting = inp.state();
        if nesting.exceeded.is_none() && nesting.depth < nesting.limit {
            nesting.depth += 1;
            let result = inp.parse(&construct);
            inp.state().depth -= 1;
            if result.is_err() {
                inp.rewind(before);
            }
            return result;
        }

        let opens = inp.check(&opener).is_ok();
        let span = inp.span_since(before.cursor());
        inp.rewind(before);
        let nesting = inp.state();
        if opens && nesting.exceeded.is_none() {
            nesting.exceeded = Some(span_range(&span));
        }
        Err(Rich::custom(span, "nesting limit reached"))
    })
}

/// Merge pieces into nodes, joining adjacent text
fn build(pieces: Vec<Spanned<Piece>>) -> Wikicode {
    let mut nodes: Vec<Spanned<Node>> = Vec::with_capacity(pieces.len());
    for Spanned { node, span } in pieces {
        match node {
            Piece::Node(n) => nodes.push(Spanned::new(n, span)),
            Piece::Text(s) => push_text(&mut nodes, &s, span),
            Piece::Equals => push_text(&mut nodes, "=", span),
        }
    }
    Wikicode::new(nodes)
}

fn push_text(nodes: &mut Vec<Spanned<Node>>, s: &str, span: Span) {
    if let Some(Spanned {
        node: Node::Text(prev),
        span: prev_span,
    }) = nodes.last_mut()
    {
        if prev_span.end == span.start {
            prev.push_str(s);
            prev_span.end = span.end;
            return;
        }
    }
    nodes.push(Spanned::new(Node::Text(s.to_string()), span));
}

/// Newlines are allowed around a name but not inside it
fn has_interior_newline(code: &Wikicode) -> bool {
    code.to_string().trim().contains('\n')
}

fn build_template(
    name: Vec<Spanned<Piece>>,
    params: Vec<Vec<Spanned<Piece>>>,
) -> Result<TemplateNode, &'static str> {
    let name = build(name);
    if name.to_string().trim().is_empty() {
        return Err("template name is empty");
    }
    if has_interior_newline(&name) {
        return Err("template name spans lines");
    }
    let params = params
        .into_iter()
        .map(build_param)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(TemplateNode { name, params })
}

fn build_param(mut pieces: Vec<Spanned<Piece>>) -> Result<TemplateParam, &'static str> {
    match pieces.iter().position(|p| matches!(p.node, Piece::Equals)) {
        Some(split) => {
            let value = pieces.split_off(split + 1);
            pieces.pop();
            let name = build(pieces);
            if has_interior_newline(&name) {
                return Err("parameter key spans lines");
            }
            Ok(TemplateParam {
                name,
                value: build(value),
                showkey: true,
            })
        }
        None => Ok(TemplateParam {
            name: Wikicode::default(),
            value: build(pieces),
            showkey: false,
        }),
    }
}

fn build_wikilink(
    title: Vec<Spanned<Piece>>,
    text: Option<Vec<Spanned<Piece>>>,
) -> Result<WikilinkNode, &'static str> {
    let title = build(title);
    if title.to_string().trim().is_empty() {
        return Err("link title is empty");
    }
    if title.to_string().contains('\n') {
        return Err("link title spans lines");
    }
    Ok(WikilinkNode {
        title,
        text: text.map(build),
    })
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Wikicode, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    // Templates, arguments, links, comments and entities; the first four nest
    let construct = recursive(|construct| {
        // Content allowed in a template or argument name
        let name_piece = choice((
            construct.clone(),
            lone(Token::BraceClose),
            text_where(|t| !matches!(t, Token::Pipe | Token::BraceClose)),
        ));

        // Content allowed in a template parameter
        let param_piece = choice((
            construct.clone(),
            lone(Token::BraceClose),
            just(Token::Equals)
                .map_with(|_, e| Spanned::new(Piece::Equals, span_range(&e.span()))),
            text_where(|t| !matches!(t, Token::Pipe | Token::BraceClose | Token::Equals)),
        ));

        // Content allowed in an argument default; pipes are literal here
        let default_piece = choice((
            construct.clone(),
            lone(Token::BraceClose),
            text_where(|t| !matches!(t, Token::BraceClose)),
        ));

        let title_piece = choice((
            construct.clone(),
            lone(Token::BracketClose),
            text_where(|t| !matches!(t, Token::Pipe | Token::BracketClose)),
        ));

        let link_text_piece = choice((
            construct.clone(),
            lone(Token::BracketClose),
            text_where(|t| !matches!(t, Token::BracketClose)),
        ));

        let open2 = just(Token::BraceOpen).then(just(Token::BraceOpen));
        let close2 = just(Token::BraceClose).then(just(Token::BraceClose));

        // {{{name|default}}}
        let argument = just(Token::BraceOpen)
            .then(open2.clone())
            .ignore_then(name_piece.clone().repeated().collect::<Vec<_>>())
            .then(
                just(Token::Pipe)
                    .ignore_then(default_piece.repeated().collect::<Vec<_>>())
                    .or_not(),
            )
            .then_ignore(close2.clone().then(just(Token::BraceClose)))
            .map(|(name, default)| {
                Node::Argument(ArgumentNode {
                    name: build(name),
                    default: default.map(build),
                })
            });

        // {{name|positional|key=value}}
        let template = open2
            .ignore_then(name_piece.repeated().collect::<Vec<_>>())
            .then(
                just(Token::Pipe)
                    .ignore_then(param_piece.repeated().collect::<Vec<_>>())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .then_ignore(close2)
            .try_map(|(name, params), span| {
                build_template(name, params)
                    .map(Node::Template)
                    .map_err(|msg| Rich::custom(span, msg))
            });

        // [[title|text]]
        let wikilink = just(Token::BracketOpen)
            .then(just(Token::BracketOpen))
            .ignore_then(title_piece.repeated().collect::<Vec<_>>())
            .then(
                just(Token::Pipe)
                    .ignore_then(link_text_piece.repeated().collect::<Vec<_>>())
                    .or_not(),
            )
            .then_ignore(just(Token::BracketClose).then(just(Token::BracketClose)))
            .try_map(|(title, text), span| {
                build_wikilink(title, text)
                    .map(Node::Wikilink)
                    .map_err(|msg| Rich::custom(span, msg))
            });

        // <!-- body -->
        let comment = just(Token::CommentOpen)
            .ignore_then(
                any()
                    .filter(|t: &Token| *t != Token::CommentClose)
                    .repeated()
                    .collect::<Vec<Token>>(),
            )
            .then_ignore(just(Token::CommentClose))
            .map(|body| Node::Comment(body.iter().map(Token::as_str).collect()));

        let entity = select! { Token::Entity(raw) => Node::Entity(raw) };

        // Argument before template: `{{{` is tried as an argument first.
        // Failures are cached per position, so an unclosed opener is read once.
        let container = nested(choice((argument, template, wikilink)).memoized());

        choice((comment, container, entity))
            .map_with(|n, e| Spanned::new(Piece::Node(n), span_range(&e.span())))
            .boxed()
    });

    let eq_run = just(Token::Equals)
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .map(|run| run.len());

    let line_end = just(Token::Newline).ignored().or(end()).rewind();

    // `=` runs inside a heading title that do not end the line are text
    let title_piece = choice((
        construct.clone(),
        eq_run
            .clone()
            .then_ignore(line_end.clone().not())
            .map_with(|n, e| Spanned::new(Piece::Text("=".repeat(n)), span_range(&e.span()))),
        text_where(|t| !matches!(t, Token::Newline | Token::Equals)),
    ));

    // == title ==, only ever tried at the start of a line
    let heading = eq_run
        .clone()
        .then(title_piece.repeated().at_least(1).collect::<Vec<_>>())
        .then(eq_run)
        .then_ignore(line_end)
        .map_with(|((open, mut title), close), e| {
            let span = span_range(&e.span());
            let level = open.min(close).min(6);
            if open > level {
                let extra = span.start..span.start + (open - level);
                title.insert(0, Spanned::new(Piece::Text("=".repeat(open - level)), extra));
            }
            if close > level {
                let extra = span.end - close..span.end - level;
                title.push(Spanned::new(Piece::Text("=".repeat(close - level)), extra));
            }
            let heading = Node::Heading(HeadingNode {
                title: build(title),
                level,
            });
            vec![Spanned::new(Piece::Node(heading), span)]
        });

    let inline = choice((
        construct,
        text_where(|t| !matches!(t, Token::Newline)),
    ));

    let line = choice((heading, inline.repeated().collect::<Vec<_>>()));

    let newline = just(Token::Newline)
        .map_with(|_, e| Spanned::new(Piece::Text("\n".to_string()), span_range(&e.span())));

    line.clone()
        .then(newline.then(line).repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(first, rest)| {
            let mut pieces = first;
            for (nl, line) in rest {
                pieces.push(nl);
                pieces.extend(line);
            }
            build(pieces)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn only_template(code: &Wikicode) -> &TemplateNode {
        assert_eq!(code.nodes.len(), 1, "expected one node in {:?}", code);
        match &code.nodes[0].node {
            Node::Template(t) => t,
            other => panic!("Expected template, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_plain_text() {
        let doc = parse("just some text").expect("Should parse");
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.nodes[0].node, Node::Text("just some text".to_string()));
        assert_eq!(doc.nodes[0].span, 0..14);
    }

    #[test]
    fn test_parse_empty() {
        let doc = parse("").expect("Should parse");
        assert!(doc.is_empty());
    }

    #[test]
    fn test_parse_positional_params() {
        let doc = parse("{{foo|bar|baz}}").expect("Should parse");
        let t = only_template(&doc);
        assert_eq!(t.name.to_string(), "foo");
        assert_eq!(t.params.len(), 2);
        assert!(!t.params[0].showkey);
        assert_eq!(t.params[0].value.to_string(), "bar");
        assert_eq!(t.params[1].value.to_string(), "baz");
    }

    #[test]
    fn test_parse_named_param() {
        let doc = parse("{{cite | title = A = B | year=2012}}").expect("Should parse");
        let t = only_template(&doc);
        assert_eq!(t.params.len(), 2);
        assert!(t.params[0].showkey);
        assert_eq!(t.params[0].name.to_string(), " title ");
        // Only the first `=` splits
        assert_eq!(t.params[0].value.to_string(), " A = B ");
        assert_eq!(t.params[1].name.to_string(), " year");
        assert_eq!(t.params[1].value.to_string(), "2012");
    }

    #[test]
    fn test_parse_nested_template() {
        let doc = parse("{{a|{{b|c}}}}").expect("Should parse");
        let t = only_template(&doc);
        assert_eq!(t.params.len(), 1);
        match &t.params[0].value.nodes[0].node {
            Node::Template(inner) => {
                assert_eq!(inner.name.to_string(), "b");
                assert_eq!(inner.params[0].value.to_string(), "c");
            }
            other => panic!("Expected nested template, got {:?}", other),
        }
    }

    #[test]
    fn test_equals_in_nested_template_does_not_split() {
        let doc = parse("{{a|{{b|k=v}}}}").expect("Should parse");
        let t = only_template(&doc);
        assert!(!t.params[0].showkey);
    }

    #[test]
    fn test_parse_argument() {
        let doc = parse("{{{1|default|more}}}").expect("Should parse");
        match &doc.nodes[0].node {
            Node::Argument(a) => {
                assert_eq!(a.name.to_string(), "1");
                assert_eq!(a.default.as_ref().unwrap().to_string(), "default|more");
            }
            other => panic!("Expected argument, got {:?}", other),
        }
    }

    #[test]
    fn test_argument_inside_template() {
        let doc = parse("{{a|{{{b}}}}}").expect("Should parse");
        let t = only_template(&doc);
        assert!(matches!(t.params[0].value.nodes[0].node, Node::Argument(_)));
    }

    #[test]
    fn test_parse_wikilink() {
        let doc = parse("see [[Main Page|home]] now").expect("Should parse");
        assert_eq!(doc.nodes.len(), 3);
        match &doc.nodes[1].node {
            Node::Wikilink(l) => {
                assert_eq!(l.title.to_string(), "Main Page");
                assert_eq!(l.text.as_ref().unwrap().to_string(), "home");
            }
            other => panic!("Expected wikilink, got {:?}", other),
        }
        assert_eq!(doc.nodes[1].span, 4..22);
    }

    #[test]
    fn test_pipe_in_link_inside_template() {
        let doc = parse("{{a|[[b|c]]|d}}").expect("Should parse");
        let t = only_template(&doc);
        assert_eq!(t.params.len(), 2);
        assert_eq!(t.params[1].value.to_string(), "d");
    }

    #[test]
    fn test_parse_comment() {
        let doc = parse("a<!-- {{not}} -->b").expect("Should parse");
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[1].node, Node::Comment(" {{not}} ".to_string()));
    }

    #[test]
    fn test_parse_heading() {
        let doc = parse("== History ==\ntext").expect("Should parse");
        match &doc.nodes[0].node {
            Node::Heading(h) => {
                assert_eq!(h.level, 2);
                assert_eq!(h.title.to_string(), " History ");
            }
            other => panic!("Expected heading, got {:?}", other),
        }
        assert_eq!(doc.nodes[1].node, Node::Text("\ntext".to_string()));
    }

    #[test]
    fn test_unbalanced_heading_level() {
        let doc = parse("=== a ==").expect("Should parse");
        match &doc.nodes[0].node {
            Node::Heading(h) => {
                assert_eq!(h.level, 2);
                assert_eq!(h.title.to_string(), "= a ");
            }
            other => panic!("Expected heading, got {:?}", other),
        }
        assert_eq!(doc.to_string(), "=== a ==");
    }

    #[test]
    fn test_heading_only_at_line_start() {
        let doc = parse("x == a ==").expect("Should parse");
        assert_eq!(doc.nodes.len(), 1);
        assert!(matches!(doc.nodes[0].node, Node::Text(_)));
    }

    #[test]
    fn test_entity() {
        let doc = parse("a&amp;b").expect("Should parse");
        assert_eq!(doc.nodes[1].node, Node::Entity("&amp;".to_string()));
    }

    #[test]
    fn test_unclosed_template_is_text() {
        let doc = parse("{{foo|bar").expect("Should parse");
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.nodes[0].node, Node::Text("{{foo|bar".to_string()));
    }

    #[test]
    fn test_unclosed_outer_keeps_inner() {
        let doc = parse("{{a|{{b}}").expect("Should parse");
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.nodes[0].node, Node::Text("{{a|".to_string()));
        assert!(matches!(doc.nodes[1].node, Node::Template(_)));
    }

    #[test]
    fn test_empty_name_is_text() {
        let doc = parse("{{}}").expect("Should parse");
        assert_eq!(doc.nodes[0].node, Node::Text("{{}}".to_string()));
    }

    #[test]
    fn test_newline_in_name_is_text() {
        let doc = parse("{{fo\no}}").expect("Should parse");
        assert!(doc.filter_templates().is_empty());
        let doc = parse("{{\nfoo\n}}").expect("Should parse");
        assert_eq!(doc.filter_templates().len(), 1);
    }

    #[test]
    fn test_lone_brace_in_value() {
        let doc = parse("{{a|x}y}}").expect("Should parse");
        let t = only_template(&doc);
        assert_eq!(t.params[0].value.to_string(), "x}y");
    }

    #[test]
    fn test_multiline_template() {
        let input = "{{Infobox\n| name = X\n| size = 3\n}}";
        let doc = parse(input).expect("Should parse");
        let t = only_template(&doc);
        assert_eq!(t.name.to_string(), "Infobox\n");
        assert_eq!(t.params.len(), 2);
        assert_eq!(doc.to_string(), input);
    }

    #[test]
    fn test_depth_within_limit() {
        let doc = parse_with_limit("{{a|{{b|{{c}}}}}}", 3).expect("Should parse");
        assert_eq!(doc.filter_templates().len(), 3);
    }

    #[test]
    fn test_depth_limit_stops_at_opener() {
        let errors = parse_with_limit("x{{a|{{b|{{c}}}}}}", 2).unwrap_err();
        assert_eq!(errors, vec![ParseError::TooDeep { span: 9..11, limit: 2 }]);
    }

    #[test]
    fn test_unclosed_openers_count_toward_depth() {
        let errors = parse_with_limit("{{a|{{b|{{c", 2).unwrap_err();
        assert_eq!(errors, vec![ParseError::TooDeep { span: 8..10, limit: 2 }]);
    }

    #[test]
    fn test_wikilinks_count_toward_depth() {
        let errors = parse_with_limit("[[a|[[b]]]]", 1).unwrap_err();
        assert_eq!(errors, vec![ParseError::TooDeep { span: 4..6, limit: 1 }]);
    }

    #[test]
    fn test_leaves_at_depth_limit() {
        let doc = parse_with_limit("{{a|&amp;<!--c-->{x}y}}", 1).expect("Should parse");
        let t = only_template(&doc);
        assert_eq!(t.params[0].value.to_string(), "&amp;<!--c-->{x}y");
    }

    #[test]
    fn test_zero_depth_rejects_any_construct() {
        assert!(parse_with_limit("plain & text", 0).is_ok());
        let errors = parse_with_limit("a [[b]]", 0).unwrap_err();
        assert_eq!(errors, vec![ParseError::TooDeep { span: 2..4, limit: 0 }]);
    }

    #[test]
    fn test_deep_valid_nesting_is_rejected() {
        let input = format!("{}{}", "{{a|".repeat(5000), "}}".repeat(5000));
        let errors = parse(&input).unwrap_err();
        assert_eq!(
            errors,
            vec![ParseError::TooDeep {
                span: 160..162,
                limit: DEFAULT_MAX_DEPTH
            }]
        );
    }

    #[test]
    fn test_unclosed_brace_run_is_text() {
        let input = "{".repeat(30);
        let doc = parse_with_limit(&input, 100).expect("Should parse");
        assert_eq!(doc.nodes.len(), 1);
        assert_eq!(doc.nodes[0].node, Node::Text(input));
    }

    #[test]
    fn test_round_trip() {
        let input = "== A ==\n{{x|1|k=v|{{y}}}} [[L|t]] <!--c--> {{{p|d}}} &lt; }} ]] {{ [[";
        let doc = parse(input).expect("Should parse");
        assert_eq!(doc.to_string(), input);
    }
}
