//! wikitemplate - MediaWiki template extraction
//!
//! This library parses wikitext into a lossless syntax tree and pulls the
//! template invocations out of it as flat [`Template`] values.
//!
//! # Example
//!
//! ```rust
//! use wikitemplate::{extract_templates, Parameter};
//!
//! let templates = extract_templates("{{cite|title=Rust|2015}}").unwrap();
//! assert_eq!(templates[0].name, "cite");
//! assert_eq!(templates[0].params[0], Parameter::new("title", "Rust"));
//! assert_eq!(templates[0].params[1], Parameter::new("1", "2015"));
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod parser;

pub use config::{ConfigError, ParseConfig};
pub use error::ParseError;
pub use model::{Parameter, Template};
pub use parser::{Node, Wikicode};

/// Fixed-output parser
///
/// `parse` does not look at its input: every call returns the single
/// template `{{foo|bar|baz}}`. Use [`extract_templates`] to read templates
/// out of real text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parser;

impl Parser {
    pub fn new() -> Self {
        Self
    }

    /// Returns `text` unchanged
    pub fn tokenize<'a>(&self, text: &'a str) -> &'a str {
        text
    }

    /// Always `[foo(1=bar, 2=baz)]`, whatever `text` holds
    pub fn parse(&self, text: &str) -> Vec<Template> {
        let _tokens = self.tokenize(text);
        let params = vec![Parameter::new("1", "bar"), Parameter::new("2", "baz")];
        vec![Template::new("foo", params)]
    }
}

/// Parse wikitext with default configuration
pub fn parse_wikicode(text: &str) -> Result<Wikicode, Vec<ParseError>> {
    parse_wikicode_with_config(text, &ParseConfig::default())
}

/// Parse wikitext under the configured depth limit, then apply strict mode
/// if it is enabled
///
/// # Example
///
/// ```rust
/// use wikitemplate::{parse_wikicode_with_config, ParseConfig, ParseError};
///
/// let config = ParseConfig::new().with_strict(true);
/// let errors = parse_wikicode_with_config("{{oops", &config).unwrap_err();
/// assert!(matches!(errors[0], ParseError::Unclosed { .. }));
/// ```
pub fn parse_wikicode_with_config(
    text: &str,
    config: &ParseConfig,
) -> Result<Wikicode, Vec<ParseError>> {
    let code = parser::parse_with_limit(text, config.max_depth)?;
    log::debug!(
        "parsed {} bytes into {} top-level nodes, depth {}",
        text.len(),
        code.nodes.len(),
        code.depth()
    );

    if config.strict {
        let errors = parser::validate::check_strict(&code);
        if !errors.is_empty() {
            log::debug!("strict mode rejected {} delimiter(s)", errors.len());
            return Err(errors);
        }
    }
    Ok(code)
}

/// Every template in `text`, outer before inner, in document order
pub fn extract_templates(text: &str) -> Result<Vec<Template>, Vec<ParseError>> {
    extract_templates_with_config(text, &ParseConfig::default())
}

pub fn extract_templates_with_config(
    text: &str,
    config: &ParseConfig,
) -> Result<Vec<Template>, Vec<ParseError>> {
    let code = parse_wikicode_with_config(text, config)?;
    let templates: Vec<Template> = code
        .filter_templates()
        .into_iter()
        .map(Template::from)
        .collect();
    log::debug!("extracted {} template(s)", templates.len());
    Ok(templates)
}
