//! Request and response bodies of the Neo4j transactional HTTP endpoint.

use graphload::{ExecutionSummary, Mutation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Neo4jSinkError, Result};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TxRequest {
    pub statements: Vec<TxStatement>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TxStatement {
    pub statement: String,
    pub parameters: Map<String, Value>,
    #[serde(rename = "includeStats")]
    pub include_stats: bool,
}

impl TxRequest {
    /// One rendered statement per request, committed on its own.
    pub fn single(mutation: &Mutation) -> Self {
        Self {
            statements: vec![TxStatement {
                statement: mutation.statement.to_cypher(),
                parameters: mutation.parameters.clone(),
                include_stats: true,
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxResponse {
    #[serde(default)]
    pub results: Vec<TxResult>,
    #[serde(default)]
    pub errors: Vec<TxError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default)]
    pub stats: Option<QueryStats>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TxError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Update counters reported when `includeStats` is set.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct QueryStats {
    pub contains_updates: bool,
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub properties_set: u64,
    pub relationships_created: u64,
    pub relationship_deleted: u64,
    pub labels_added: u64,
    pub constraints_added: u64,
}

impl TxResponse {
    /// The first reported error fails the whole request.
    pub fn into_summary(self) -> Result<ExecutionSummary> {
        if let Some(error) = self.errors.into_iter().next() {
            return Err(Neo4jSinkError::Neo4j {
                code: error.code,
                message: error.message,
            });
        }

        let mut summary = ExecutionSummary::default();
        for stats in self.results.iter().filter_map(|result| result.stats) {
            summary.absorb(ExecutionSummary {
                nodes_created: stats.nodes_created,
                relationships_created: stats.relationships_created,
                properties_set: stats.properties_set,
                constraints_added: stats.constraints_added,
            });
        }
        Ok(summary)
    }
}
