//! Paths from the document root to a node.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One step of a path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    Index(usize),
    Key(String),
}

pub type Path = Vec<PathElement>;

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => f.write_str(&escape_component(key)),
        }
    }
}

/// Escapes `~` and `/` the JSON Pointer way.
pub fn escape_component(component: &str) -> String {
    if !component.contains(['~', '/']) {
        return component.to_string();
    }
    component.replace('~', "~0").replace('/', "~1")
}

pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    component.replace("~1", "/").replace("~0", "~")
}

/// Formats a path as a JSON Pointer, `""` for the root.
pub fn format_path(path: &[PathElement]) -> String {
    let mut out = String::new();
    for element in path {
        out.push('/');
        out.push_str(&element.to_string());
    }
    out
}

/// Parses a JSON Pointer. Purely numeric components become indices.
pub fn parse_path(pointer: &str) -> Path {
    if pointer.is_empty() || pointer == "/" {
        return Vec::new();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(|token| match token.parse::<usize>() {
            Ok(index) if !token.starts_with('+') => PathElement::Index(index),
            _ => PathElement::Key(unescape_component(token)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_parse_roundtrip() {
        let path: Path = vec!["a/b".into(), 3.into(), "c~d".into()];
        let pointer = format_path(&path);
        assert_eq!(pointer, "/a~1b/3/c~0d");
        assert_eq!(parse_path(&pointer), path);
    }

    #[test]
    fn root_pointer_is_empty() {
        assert_eq!(format_path(&[]), "");
        assert!(parse_path("").is_empty());
    }
}
