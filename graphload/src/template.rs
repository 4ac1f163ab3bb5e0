use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use serde_json::{Map, Value};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$([a-zA-Z_][a-zA-Z0-9_]*)").expect("placeholder pattern is valid")
});

/// A query text with `$name` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTemplate {
    text: String,
}

impl QueryTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitutes every placeholder that has a variable. Others are kept as written.
    pub fn render(&self, variables: &Map<String, Value>) -> String {
        PLACEHOLDER
            .replace_all(&self.text, |caps: &Captures<'_>| match variables.get(&caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}
