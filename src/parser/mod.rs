//! Parser for wikitext

pub mod ast;
mod grammar;
pub mod lexer;
pub mod validate;

pub use ast::*;
pub use grammar::{parse, parse_with_limit};
