//! Front-matter splitting, typed parsing, and rendering.
//!
//! A block is recognized only when the very first line is `---` and a later
//! line is `---`. A missing fence or YAML that is not a mapping means the
//! whole file is body.

use serde_yaml::{Mapping, Value};
use tracing::debug;

/// Line that opens and closes a front-matter block.
const FENCE: &str = "---";

/// Ordered, typed front-matter. Keys keep their file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    /// Recognized-shape entries in file order.
    entries: Vec<(String, FrontMatterValue)>,
}

/// A front-matter value. Nested mappings are not representable and are
/// dropped at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontMatterValue {
    /// `true` / `false`.
    Bool(bool),
    /// A sequence of scalars, e.g. `aliases`.
    List(Vec<String>),
    /// Any other scalar, numbers included, as text.
    Text(String),
}

/// Result of splitting a file into front-matter and body.
#[derive(Debug)]
pub struct Split<'a> {
    /// Text after the closing fence, or the whole file.
    pub body: &'a str,
    /// Number of file lines before the body starts.
    pub body_offset: u32,
    /// Parsed front-matter; empty when absent or malformed.
    pub front_matter: FrontMatter,
}

impl FrontMatter {
    /// Explicit aliases from the `aliases` key, as a list or single string.
    pub fn aliases(&self) -> Vec<String> {
        return match self.get("aliases") {
            Some(FrontMatterValue::List(items)) => items.clone(),
            Some(FrontMatterValue::Text(one)) if !one.trim().is_empty() => vec![one.clone()],
            _ => Vec::new(),
        };
    }

    /// Look up a value by key. Later duplicates shadow earlier ones.
    pub fn get(&self, key: &str) -> Option<&FrontMatterValue> {
        return self.entries.iter().rev().find(|(k, _)| return k == key).map(|(_, v)| return v);
    }

    /// Whether no entries were parsed.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Render as a fenced YAML block, ready to be prepended to a body.
    pub fn render(&self) -> String {
        let mut mapping = Mapping::new();
        for (key, value) in &self.entries {
            mapping.insert(Value::String(key.clone()), value.to_yaml());
        }
        // A mapping of strings, bools, and string lists always serializes.
        let yaml = serde_yaml::to_string(&mapping).unwrap_or_default();
        return format!("{FENCE}\n{yaml}{FENCE}\n");
    }

    /// Explicit route override: `slug` wins over `route`.
    pub fn route_override(&self) -> Option<&str> {
        return ["slug", "route"].iter().find_map(|key| {
            return match self.get(key) {
                Some(FrontMatterValue::Text(value)) if !value.trim().is_empty() => Some(value.as_str()),
                _ => None,
            };
        });
    }
}

impl FrontMatterValue {
    /// Convert a YAML value, rejecting shapes front-matter cannot express.
    fn from_yaml(value: &Value) -> Option<Self> {
        return match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null => Some(Self::Text(String::new())),
            Value::Number(n) => Some(Self::Text(n.to_string())),
            Value::Sequence(items) => items
                .iter()
                .map(yaml_scalar_text)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Mapping(_) | Value::Tagged(_) => None,
        };
    }

    /// Convert back into YAML.
    fn to_yaml(&self) -> Value {
        return match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::List(items) => Value::Sequence(items.iter().cloned().map(Value::String).collect()),
            Self::Text(s) => Value::String(s.clone()),
        };
    }
}

/// Parse the YAML between the fences. `None` means malformed.
fn parse_block(yaml: &str) -> Option<FrontMatter> {
    let value: Value = match serde_yaml::from_str(yaml) {
        Err(e) => {
            debug!("front-matter is not valid YAML: {e}");
            return None;
        },
        Ok(v) => v,
    };
    let mapping = match value {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        _ => return None,
    };

    let mut entries = Vec::with_capacity(mapping.len());
    for (key, value) in &mapping {
        let Value::String(key) = key else {
            return None;
        };
        match FrontMatterValue::from_yaml(value) {
            None => debug!("front-matter key `{key}` has a nested value, ignored"),
            Some(v) => entries.push((key.clone(), v)),
        }
    }
    return Some(FrontMatter { entries });
}

/// Split a file into front-matter and body.
pub fn split(content: &str) -> Split<'_> {
    let whole = Split {
        body: content,
        body_offset: 0,
        front_matter: FrontMatter::default(),
    };

    let mut lines = content.split_inclusive('\n');
    let Some(first) = lines.next() else {
        return whole;
    };
    if first.trim_end() != FENCE {
        return whole;
    }

    let yaml_start = first.len();
    let mut consumed = first.len();
    let mut line_count = 1_u32;
    for line in lines {
        line_count = line_count.saturating_add(1);
        let line_start = consumed;
        consumed = consumed.saturating_add(line.len());
        if line.trim_end() != FENCE {
            continue;
        }
        let Some(yaml) = content.get(yaml_start..line_start) else {
            return whole;
        };
        let Some(front_matter) = parse_block(yaml) else {
            return whole;
        };
        return Split {
            body: content.get(consumed..).unwrap_or(""),
            body_offset: line_count,
            front_matter,
        };
    }

    return whole;
}

/// Scalar YAML value as text; `None` for nested structures.
fn yaml_scalar_text(value: &Value) -> Option<String> {
    return match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Mapping(_) | Value::Null | Value::Sequence(_) | Value::Tagged(_) => None,
    };
}
