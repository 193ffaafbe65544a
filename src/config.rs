//! Parser configuration, loadable from TOML
//!
//! ```toml
//! [parser]
//! max_depth = 40
//! strict = true
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Default nesting limit for templates, links and arguments
pub const DEFAULT_MAX_DEPTH: usize = 40;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Settings for [`parse_wikicode_with_config`](crate::parse_wikicode_with_config)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseConfig {
    /// Deepest allowed nesting of structured nodes
    pub max_depth: usize,
    /// Report unclosed and unmatched delimiters instead of keeping them as text
    pub strict: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            strict: false,
        }
    }
}

/// TOML structure for deserializing configs
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    parser: Option<TomlParser>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlParser {
    max_depth: Option<usize>,
    strict: Option<bool>,
}

impl ParseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load config from TOML string; absent keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();
        if let Some(parser) = parsed.parser {
            if let Some(max_depth) = parser.max_depth {
                config.max_depth = max_depth;
            }
            if let Some(strict) = parser.strict {
                config.strict = strict;
            }
        }
        Ok(config)
    }
}
