use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{ImportError, Result};
use crate::sink::{ExecutionSummary, SinkHandle};
use crate::statement::{Clause, Mutation, Statement};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Attribute {
    #[serde(default)]
    pub unique: bool,
    #[serde(default, rename = "type")]
    pub value_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NodeDefinition {
    pub label: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub relations: Vec<String>,
}

/// Shared attribute catalogue plus the node labels built from it (`schema.json`).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GraphSchema {
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

impl GraphSchema {
    pub fn from_json(text: &str) -> Result<Self> {
        let schema: GraphSchema = serde_json::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|err| {
            ImportError::Config(format!("cannot read schema {}: {err}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Every node attribute must be declared in the attribute catalogue.
    pub fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            if let Some(unknown) = node
                .attributes
                .iter()
                .find(|name| !self.attributes.contains_key(*name))
            {
                return Err(ImportError::Config(format!(
                    "node {} references unknown attribute {unknown}",
                    node.label
                )));
            }
        }
        Ok(())
    }

    /// `(label, attribute)` for every unique attribute of every node.
    pub fn unique_attributes(&self) -> Vec<(&str, &str)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                node.attributes
                    .iter()
                    .filter(|name| self.attributes.get(*name).is_some_and(|attr| attr.unique))
                    .map(move |name| (node.label.as_str(), name.as_str()))
            })
            .collect()
    }

    pub fn constraint_mutations(&self) -> Vec<Mutation> {
        self.unique_attributes()
            .into_iter()
            .map(|(label, property)| {
                let mut statement = Statement::new();
                statement.push(Clause::CreateUniqueConstraint {
                    label: label.to_string(),
                    property: property.to_string(),
                });
                Mutation::new(statement, Default::default())
            })
            .collect()
    }

    /// Creates the uniqueness constraints the merge keys rely on.
    pub async fn apply_constraints(&self, sink: &SinkHandle) -> Result<ExecutionSummary> {
        let mut summary = ExecutionSummary::default();
        for mutation in self.constraint_mutations() {
            summary.absorb(sink.execute(&mutation).await?);
        }
        log::info!(
            "Applied {} uniqueness constraint(s), {} new",
            self.unique_attributes().len(),
            summary.constraints_added
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemoryGraph;
    use std::sync::Arc;

    const SCHEMA: &str = r#"{
        "attributes": {
            "wd_id": {"unique": true, "type": "string"},
            "label": {"type": "string"},
            "date": {}
        },
        "nodes": [
            {"label": "Event", "attributes": ["wd_id", "label", "date"], "relations": ["COUNTRY"]},
            {"label": "Country", "attributes": ["wd_id", "label"]}
        ]
    }"#;

    #[test]
    fn collects_unique_attributes() {
        let schema = GraphSchema::from_json(SCHEMA).unwrap();
        assert_eq!(
            schema.unique_attributes(),
            vec![("Event", "wd_id"), ("Country", "wd_id")]
        );
        assert_eq!(
            schema.constraint_mutations()[0].statement.to_cypher(),
            "CREATE CONSTRAINT IF NOT EXISTS FOR (n:Event) REQUIRE n.wd_id IS UNIQUE"
        );
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let err = GraphSchema::from_json(
            r#"{"attributes": {}, "nodes": [{"label": "Event", "attributes": ["wd_id"]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown attribute wd_id"));
    }

    #[tokio::test]
    async fn constraints_apply_once() {
        let schema = GraphSchema::from_json(SCHEMA).unwrap();
        let graph = Arc::new(MemoryGraph::new());
        let sink = SinkHandle::new(graph.clone());

        let first = schema.apply_constraints(&sink).await.unwrap();
        let second = schema.apply_constraints(&sink).await.unwrap();

        assert_eq!(first.constraints_added, 2);
        assert_eq!(second.constraints_added, 0);
        assert_eq!(graph.constraints().len(), 2);
    }
}
