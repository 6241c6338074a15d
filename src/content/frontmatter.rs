//! Front-matter parsing and serialization

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_yaml::Value;
use thiserror::Error;

use crate::helpers::parse_loose_date;

/// Errors raised while splitting or parsing a front-matter block
#[derive(Debug, Error)]
pub enum FrontMatterError {
    #[error("no front-matter block (file does not start with ---)")]
    Missing,
    #[error("front-matter block is never closed")]
    Unterminated,
    #[error("invalid YAML front-matter: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Split a document into its front-matter text and the remaining body.
///
/// The block opens with a leading `---` line and closes at the first later
/// line consisting solely of `---`. The body is returned untouched, including
/// any blank line after the closing delimiter.
pub fn split(content: &str) -> Result<(&str, &str), FrontMatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content.strip_prefix("---").ok_or(FrontMatterError::Missing)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .ok_or(FrontMatterError::Missing)?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\n', '\r']) == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Ok((yaml, body));
        }
        offset += line.len();
    }

    Err(FrontMatterError::Unterminated)
}

/// Ordered front-matter fields of an article
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    fields: IndexMap<String, Value>,
    /// Set when the block only parsed with the line-splitting fallback
    needs_repair: bool,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, body)
    pub fn parse(content: &str) -> Result<(Self, &str), FrontMatterError> {
        let (yaml, body) = split(content)?;
        match Self::parse_strict(yaml) {
            Ok(fm) => Ok((fm, body)),
            Err(e) => {
                tracing::debug!("Strict front-matter parse failed, using line parser: {}", e);
                let mut fm = Self::parse_lenient(yaml);
                fm.needs_repair = true;
                Ok((fm, body))
            }
        }
    }

    /// Parse a block with a real YAML parser
    pub fn parse_strict(yaml: &str) -> Result<Self, FrontMatterError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let fields: IndexMap<String, Value> = serde_yaml::from_str(yaml)?;
        Ok(Self {
            fields,
            needs_repair: false,
        })
    }

    /// Parse a block by splitting each line once on the first `:`.
    ///
    /// Tolerates what YAML rejects: stray quotes and backslashes inside
    /// quoted values. Nested structures and multi-line values are not
    /// understood.
    pub fn parse_lenient(yaml: &str) -> Self {
        let mut fields = IndexMap::new();

        for line in yaml.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            fields.insert(key.to_string(), lenient_value(value.trim()));
        }

        Self {
            fields,
            needs_repair: false,
        }
    }

    /// Whether the block needed the fallback parser
    pub fn needs_repair(&self) -> bool {
        self.needs_repair
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Scalar field as a string; numbers and booleans are stringified
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// List field; a single string counts as a one-element list
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn title(&self) -> Option<String> {
        self.get_str("title")
    }

    pub fn date(&self) -> Option<String> {
        self.get_str("date")
    }

    /// Parse the `date` field into a calendar date
    pub fn parse_date(&self) -> Option<NaiveDate> {
        self.date().as_deref().and_then(parse_loose_date)
    }

    pub fn content_id(&self) -> Option<String> {
        self.get_str("contentId")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn tags(&self) -> Vec<String> {
        self.get_list("tags")
    }

    /// Insert or replace a field, keeping the position of an existing key
    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.set(key, Value::String(value.to_string()));
    }

    pub fn set_tags(&mut self, tags: &[String]) {
        let seq = tags.iter().cloned().map(Value::String).collect();
        self.set("tags", Value::Sequence(seq));
    }

    /// Serialize to the store's house style, delimiters included.
    ///
    /// Strings are double-quoted, lists are flow sequences of quoted strings,
    /// numbers and booleans are bare.
    pub fn to_block(&self) -> String {
        let mut out = String::from("---\n");
        for (key, value) in &self.fields {
            let rendered = render_value(value);
            if rendered.is_empty() {
                out.push_str(&format!("{}:\n", key));
            } else {
                out.push_str(&format!("{}: {}\n", key, rendered));
            }
        }
        out.push_str("---\n");
        out
    }

    /// Rebuild a full document from this front matter and a body
    pub fn render(&self, body: &str) -> String {
        format!("{}{}", self.to_block(), body)
    }
}

/// Interpret one raw value from the line parser
fn lenient_value(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']') {
        let items = raw[1..raw.len() - 1]
            .split(',')
            .map(|item| unquote(item.trim()))
            .filter(|item| !item.is_empty())
            .map(Value::String)
            .collect();
        return Value::Sequence(items);
    }

    if is_quoted(raw) {
        return Value::String(unquote(raw));
    }

    match raw {
        "" | "~" | "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => {
            if let Ok(n) = raw.parse::<i64>() {
                Value::Number(n.into())
            } else if let Ok(f) = raw.parse::<f64>() {
                if f.is_finite() {
                    Value::Number(f.into())
                } else {
                    Value::String(raw.to_string())
                }
            } else {
                Value::String(raw.to_string())
            }
        }
    }
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
}

/// Strip one layer of quotes, undoing `\"` and `\\` inside double quotes
fn unquote(s: &str) -> String {
    if !is_quoted(s) {
        return s.to_string();
    }
    let inner = &s[1..s.len() - 1];
    if s.starts_with('\'') {
        return inner.replace("''", "'");
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('"') | Some('\\') => {
                    out.push(chars.next().unwrap_or_default());
                    continue;
                }
                Some('n') => {
                    chars.next();
                    out.push('\n');
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

/// Double-quoted YAML scalar with `\`, `"` and control characters escaped
pub fn quote(s: &str) -> String {
    // JSON string syntax is a subset of YAML double-quoted scalars
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Sequence(items) => {
            let items: Vec<String> = items
                .iter()
                .map(|v| match v {
                    Value::Null => "null".to_string(),
                    other => render_value(other),
                })
                .collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(_) | Value::Tagged(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
        }
    }
}
