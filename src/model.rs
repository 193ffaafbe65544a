//! Flat template values handed to callers
//!
//! These carry plain strings rather than syntax trees: a [`Template`] is what
//! a page author would call the template's name and arguments.

use crate::parser::ast::TemplateNode;

/// One argument of a template invocation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A template invocation with its parameters in source order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Template {
    pub name: String,
    pub params: Vec<Parameter>,
}

impl Template {
    pub fn new(name: impl Into<String>, params: Vec<Parameter>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// First parameter with the given name
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl From<&TemplateNode> for Template {
    /// Named parameters are trimmed on both sides of the `=`. Positional
    /// parameters are numbered from 1, counting positional ones only, and
    /// keep their value exactly as written.
    fn from(node: &TemplateNode) -> Self {
        let mut position = 0;
        let params = node
            .params
            .iter()
            .map(|param| {
                if param.showkey {
                    Parameter::new(
                        param.name.to_string().trim(),
                        param.value.to_string().trim(),
                    )
                } else {
                    position += 1;
                    Parameter::new(position.to_string(), param.value.to_string())
                }
            })
            .collect();
        Template::new(node.name.to_string().trim(), params)
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", param.name, param.value)?;
        }
        f.write_str(")")
    }
}
