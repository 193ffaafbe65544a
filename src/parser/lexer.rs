//! Lexer for wikitext using logos
//!
//! The lexer never drops input: every byte of the source belongs to exactly
//! one token, so joining the tokens' source text reproduces the input.

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    // Comment delimiters (longer than the single-char markers they start with)
    #[token("<!--")]
    CommentOpen,
    #[token("-->")]
    CommentClose,

    // Braces for templates and arguments
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,

    // Brackets for wikilinks
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,

    #[token("|")]
    Pipe,
    #[token("=")]
    Equals,
    #[token("\n")]
    Newline,

    // HTML entities: named, decimal and hexadecimal
    #[regex(r"&([a-zA-Z][a-zA-Z0-9]*|#[0-9]+|#[xX][0-9a-fA-F]+);", |lex| lex.slice().to_string())]
    Entity(String),

    // Everything else. The single-char fallback covers `<`, `&` and `-` when
    // they do not start a comment or entity.
    #[regex(r"[^{}\[\]|=<&\n-]+", |lex| lex.slice().to_string())]
    #[regex(r"[<&-]", |lex| lex.slice().to_string())]
    Text(String),
}

impl Token {
    /// Source text this token was lexed from
    pub fn as_str(&self) -> &str {
        match self {
            Token::CommentOpen => "<!--",
            Token::CommentClose => "-->",
            Token::BraceOpen => "{",
            Token::BraceClose => "}",
            Token::BracketOpen => "[",
            Token::BracketClose => "]",
            Token::Pipe => "|",
            Token::Equals => "=",
            Token::Newline => "\n",
            Token::Entity(s) | Token::Text(s) => s,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lex input string into tokens with spans
///
/// Slices logos cannot match are kept as `Text` so the stream stays lossless.
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input).spanned().map(move |(tok, span)| match tok {
        Ok(t) => (t, span),
        Err(()) => {
            log::trace!("unlexable slice at {:?}, keeping as text", span);
            (Token::Text(input[span.clone()].to_string()), span)
        }
    })
}
