//! The mapping expression language.
//!
//! An [`Expression`] is either a string literal or a single-key directive
//! object such as `{"key": ["item", "value"]}` or `{"split": "/"}`. Directives
//! are decoded once when a dataset config is read, so a misspelled directive
//! fails the config rather than silently passing its input through.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

use crate::errors::ExprError;

/// One step of a path extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Name(String),
    Index(usize),
}

impl PathSegment {
    fn from_value(value: &Value) -> Result<Self, ExprError> {
        match value {
            Value::String(name) => Ok(PathSegment::Name(name.clone())),
            Value::Number(n) => n
                .as_u64()
                .map(|i| PathSegment::Index(i as usize))
                .ok_or(ExprError::InvalidArgument {
                    directive: "key",
                    expected: "a non-negative integer index",
                }),
            _ => Err(ExprError::InvalidArgument {
                directive: "key",
                expected: "a string, an index or a list of them",
            }),
        }
    }

    fn lookup<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match (self, value) {
            (PathSegment::Name(name), Value::Object(map)) => map.get(name),
            (PathSegment::Name(name), Value::Array(items)) => {
                name.parse::<usize>().ok().and_then(|i| items.get(i))
            }
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i),
            (PathSegment::Index(i), Value::Object(map)) => map.get(&i.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Used verbatim, never resolved against the input.
    Literal(String),
    /// Descends through the input one segment at a time.
    Key(Vec<PathSegment>),
    Split(String),
    /// Element or character at a position; negative positions count from the end.
    At(i64),
    /// Last `/`-separated segment of a string, e.g. a Wikidata entity URL.
    UrlTail,
    /// `Point(lng lat)` literal into `{"lng": .., "lat": ..}`.
    Point,
}

impl Expression {
    pub fn literal(text: impl Into<String>) -> Self {
        Expression::Literal(text.into())
    }

    pub fn key<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Expression::Key(
            path.into_iter()
                .map(|s| PathSegment::Name(s.into()))
                .collect(),
        )
    }

    pub fn split(delimiter: impl Into<String>) -> Self {
        Expression::Split(delimiter.into())
    }

    /// Decodes the JSON configuration form of an expression.
    pub fn from_value(value: &Value) -> Result<Self, ExprError> {
        let map = match value {
            Value::String(text) => return Ok(Expression::Literal(text.clone())),
            Value::Object(map) => map,
            other => return Err(ExprError::Malformed(other.to_string())),
        };

        let mut entries = map.iter();
        let (directive, args) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => return Err(ExprError::Malformed(value.to_string())),
        };

        match directive.as_str() {
            "key" => {
                let path = match args {
                    Value::Array(segments) => segments
                        .iter()
                        .map(PathSegment::from_value)
                        .collect::<Result<Vec<_>, _>>()?,
                    single => vec![PathSegment::from_value(single)?],
                };
                if path.is_empty() {
                    return Err(ExprError::InvalidArgument {
                        directive: "key",
                        expected: "at least one path segment",
                    });
                }
                Ok(Expression::Key(path))
            }
            "split" => args
                .as_str()
                .map(|d| Expression::Split(d.to_string()))
                .ok_or(ExprError::InvalidArgument {
                    directive: "split",
                    expected: "a delimiter string",
                }),
            "at" => args.as_i64().map(Expression::At).ok_or(ExprError::InvalidArgument {
                directive: "at",
                expected: "an integer position",
            }),
            "from_url_to_wd_id" => Ok(Expression::UrlTail),
            "from_wd_point_to_point" => Ok(Expression::Point),
            unknown => Err(ExprError::UnknownDirective(unknown.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "literal",
            Expression::Key(_) => "key",
            Expression::Split(_) => "split",
            Expression::At(_) => "at",
            Expression::UrlTail => "from_url_to_wd_id",
            Expression::Point => "from_wd_point_to_point",
        }
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Expression::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Evaluates `expression` against `input`. `None` stands for an undefined value.
///
/// Never mutates the input. A missing path yields `Ok(None)`; applying a
/// directive to a value of the wrong type is an [`ExprError::TypeMismatch`].
pub fn evaluate(input: Option<&Value>, expression: &Expression) -> Result<Option<Value>, ExprError> {
    match (expression, input) {
        (Expression::Literal(text), _) => Ok(Some(Value::String(text.clone()))),
        (_, None) => Ok(None),
        (directive, Some(input)) => apply(input, directive),
    }
}

fn apply(input: &Value, expression: &Expression) -> Result<Option<Value>, ExprError> {
    match expression {
        Expression::Literal(text) => Ok(Some(Value::String(text.clone()))),
        Expression::Key(path) => {
            let mut current = input;
            for segment in path {
                match segment.lookup(current) {
                    Some(next) => current = next,
                    None => return Ok(None),
                }
            }
            Ok(Some(current.clone()))
        }
        Expression::Split(delimiter) => {
            let text = expect_str(input, expression)?;
            Ok(Some(Value::Array(
                text.split(delimiter.as_str())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            )))
        }
        Expression::At(position) => match input {
            Value::Array(items) => Ok(resolve_position(*position, items.len())
                .and_then(|i| items.get(i))
                .cloned()),
            Value::String(text) => {
                let chars: Vec<char> = text.chars().collect();
                Ok(resolve_position(*position, chars.len())
                    .map(|i| Value::String(chars[i].to_string())))
            }
            other => Err(mismatch(expression, other)),
        },
        Expression::UrlTail => {
            let text = expect_str(input, expression)?;
            Ok(text.rsplit('/').next().map(|tail| Value::String(tail.to_string())))
        }
        Expression::Point => parse_point(expect_str(input, expression)?).map(Some),
    }
}

fn resolve_position(position: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if position < 0 { len + position } else { position };
    (0..len).contains(&index).then_some(index as usize)
}

fn expect_str<'a>(input: &'a Value, expression: &Expression) -> Result<&'a str, ExprError> {
    input.as_str().ok_or_else(|| mismatch(expression, input))
}

fn mismatch(expression: &Expression, found: &Value) -> ExprError {
    ExprError::TypeMismatch {
        directive: expression.name(),
        found: type_name(found),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_point(text: &str) -> Result<Value, ExprError> {
    let invalid = || ExprError::InvalidPoint(text.to_string());

    let inner = text
        .strip_prefix("Point(")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(invalid)?;
    let mut coords = inner.split_whitespace();
    let (lng, lat) = match (coords.next(), coords.next(), coords.next()) {
        (Some(lng), Some(lat), None) => (lng, lat),
        _ => return Err(invalid()),
    };
    let lng: f64 = lng.parse().map_err(|_| invalid())?;
    let lat: f64 = lat.parse().map_err(|_| invalid())?;

    let mut point = Map::new();
    point.insert("lng".into(), Number::from_f64(lng).map(Value::Number).ok_or_else(invalid)?);
    point.insert("lat".into(), Number::from_f64(lat).map(Value::Number).ok_or_else(invalid)?);
    Ok(Value::Object(point))
}
