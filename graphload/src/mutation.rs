//! Turns a transformed record into an idempotent upsert.
//!
//! The primary node is merged on its primary-key attribute, never on a
//! generated identity, and relationships are merged between matched nodes.
//! Loading the same record twice therefore leaves the graph unchanged.

use serde_json::Value;

use crate::config::LoadSpec;
use crate::errors::RecordError;
use crate::expr::{evaluate, type_name};
use crate::mapping::{NODE_LABEL_FIELD, Record};
use crate::sink::{ExecutionSummary, SinkHandle};
use crate::statement::{Clause, Direction, Mutation, Statement};

const NODE_ALIAS: &str = "node";

/// Builds the upsert for `record` without executing it.
pub fn build_mutation(mut record: Record, spec: &LoadSpec) -> Result<Mutation, RecordError> {
    let id_key = match evaluate(Some(&Value::Object(record.defined())), &spec.primary_id)? {
        Some(Value::String(name)) => name,
        Some(other) => return Err(RecordError::InvalidPrimaryKeyName(type_name(&other).to_string())),
        None => return Err(RecordError::InvalidPrimaryKeyName("undefined".to_string())),
    };

    match record.get(&id_key) {
        Some(value) if !value.is_null() => {}
        _ => return Err(RecordError::MissingPrimaryKeyValue(id_key)),
    }

    let label = match record.remove(NODE_LABEL_FIELD) {
        Some(Value::String(label)) => label,
        _ => return Err(RecordError::MissingNodeLabel),
    };

    let mut parameters = record.defined();
    let scope = Value::Object(parameters.clone());

    let mut matches = Vec::with_capacity(spec.relations.len());
    let mut merges = Vec::with_capacity(spec.relations.len());
    for (index, relation) in spec.relations.iter().enumerate() {
        let target_label = relation
            .target
            .get(NODE_LABEL_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| RecordError::InvalidRelationTarget {
                index,
                missing: format!("`{NODE_LABEL_FIELD}`"),
            })?;
        let target_id = relation
            .target
            .get(&id_key)
            .filter(|value| !value.is_null())
            .ok_or_else(|| RecordError::InvalidRelationTarget {
                index,
                missing: format!("primary key `{id_key}`"),
            })?;

        let rel_type = match evaluate(Some(&scope), &relation.rel_type)? {
            Some(Value::String(rel_type)) => rel_type,
            _ => return Err(RecordError::InvalidRelationType { index }),
        };
        let direction = match evaluate(Some(&scope), &relation.direction)? {
            Some(Value::String(token)) => Direction::parse(&token)
                .ok_or(RecordError::InvalidRelationDirection { index, found: token })?,
            other => {
                return Err(RecordError::InvalidRelationDirection {
                    index,
                    found: other.map_or_else(|| "undefined".to_string(), |v| v.to_string()),
                });
            }
        };

        let alias = format!("r{index}");
        let param = format!("{id_key}_r{index}");
        matches.push(Clause::MatchNode {
            alias: alias.clone(),
            label: target_label.to_string(),
            key: id_key.clone(),
            param: param.clone(),
        });
        merges.push(Clause::MergeRelationship {
            alias: NODE_ALIAS.to_string(),
            other: alias,
            rel_type,
            direction,
        });
        parameters.insert(param, target_id.clone());
    }

    let mut statement = Statement::new();
    statement.extend(matches);
    statement.push(Clause::MergeNode {
        alias: NODE_ALIAS.to_string(),
        label,
        key: id_key.clone(),
        param: id_key,
    });
    statement.extend(record.iter().filter(|(_, v)| v.is_some()).map(|(field, _)| {
        Clause::SetProperty {
            alias: NODE_ALIAS.to_string(),
            property: field.clone(),
            param: field.clone(),
        }
    }));
    statement.extend(merges);

    Ok(Mutation::new(statement, parameters))
}

/// Builds the upsert for `record` and executes it through `sink`.
pub async fn load(
    record: Record,
    spec: &LoadSpec,
    sink: &SinkHandle,
) -> Result<ExecutionSummary, RecordError> {
    let mutation = build_mutation(record, spec)?;
    Ok(sink.execute(&mutation).await?)
}
