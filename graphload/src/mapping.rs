use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::ExprError;
use crate::expr::{Expression, evaluate};

/// A record as returned by the query API or read from a static dataset file.
pub type RawRecord = Map<String, Value>;

/// Reserved field naming the label of the node a record becomes.
pub const NODE_LABEL_FIELD: &str = "#node_label";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    pub from: Expression,
    #[serde(default)]
    pub transform: Vec<Expression>,
    /// Marks the field holding the node key. Informational only: the key is
    /// chosen by the load spec's `primary_id`.
    #[serde(default)]
    pub primary_id: bool,
}

impl FieldMapping {
    pub fn new(from: Expression) -> Self {
        Self {
            from,
            transform: Vec::new(),
            primary_id: false,
        }
    }

    pub fn with_transform(mut self, expression: Expression) -> Self {
        self.transform.push(expression);
        self
    }
}

/// Target field name to its mapping. Empty means pass-through.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DatasetMapping(BTreeMap<String, FieldMapping>);

impl DatasetMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, mapping: FieldMapping) -> Self {
        self.0.insert(name.into(), mapping);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldMapping)> {
        self.0.iter()
    }
}

/// A transformed record: every target field, defined or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Option<Value>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).and_then(Option::as_ref)
    }

    /// `true` when the field exists, even if its value is undefined.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Option<Value>) {
        self.fields.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field).flatten()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Option<Value>)> {
        self.fields.iter()
    }

    /// Only the defined fields, as a JSON object. Used for logging and as mutation parameters.
    pub fn defined(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect()
    }
}

impl From<&RawRecord> for Record {
    fn from(raw: &RawRecord) -> Self {
        Self {
            fields: raw
                .iter()
                .map(|(k, v)| (k.clone(), Some(v.clone())))
                .collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v)))
                .collect(),
        }
    }
}

/// Pulls each target field out of `raw` with its `from` expression.
pub fn extract(raw: &RawRecord, mapping: &DatasetMapping) -> Result<Record, ExprError> {
    if mapping.is_empty() {
        return Ok(Record::from(raw));
    }

    let input = Value::Object(raw.clone());
    let mut record = Record::new();
    for (field, field_mapping) in mapping.iter() {
        record.set(field.clone(), evaluate(Some(&input), &field_mapping.from)?);
    }
    Ok(record)
}

/// Folds each field's transform chain left to right over its extracted value.
pub fn transform(mut record: Record, mapping: &DatasetMapping) -> Result<Record, ExprError> {
    for (field, field_mapping) in mapping.iter() {
        if field_mapping.transform.is_empty() {
            continue;
        }

        let mut value = record.fields.remove(field).flatten();
        for expression in &field_mapping.transform {
            value = evaluate(value.as_ref(), expression)?;
        }
        record.set(field.clone(), value);
    }
    Ok(record)
}
