use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::SinkError;
use crate::statement::{Clause, Direction, Mutation, Parameters};

/// Counters reported by a sink for one executed mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub nodes_created: u64,
    pub relationships_created: u64,
    pub properties_set: u64,
    pub constraints_added: u64,
}

impl ExecutionSummary {
    pub fn absorb(&mut self, other: ExecutionSummary) {
        self.nodes_created += other.nodes_created;
        self.relationships_created += other.relationships_created;
        self.properties_set += other.properties_set;
        self.constraints_added += other.constraints_added;
    }
}

/// The graph store end of the pipeline.
#[async_trait]
pub trait MutationSink: Send + Sync {
    async fn execute(&self, mutation: &Mutation) -> Result<ExecutionSummary, SinkError>;
}

/// Shared handle to a sink. Statements go through one at a time, whichever
/// dataset task sends them, since a store session does not accept concurrent
/// statements.
#[derive(Clone)]
pub struct SinkHandle {
    sink: Arc<dyn MutationSink>,
    writer: Arc<tokio::sync::Mutex<()>>,
}

impl SinkHandle {
    pub fn new(sink: Arc<dyn MutationSink>) -> Self {
        Self {
            sink,
            writer: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub async fn execute(&self, mutation: &Mutation) -> Result<ExecutionSummary, SinkError> {
        let _writer = self.writer.lock().await;
        log::debug!(
            "Executing statement:\n{}\nparameters: {}",
            mutation.statement,
            Value::Object(mutation.parameters.clone())
        );
        self.sink.execute(mutation).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub label: String,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphRelationship {
    pub from: usize,
    pub to: usize,
    pub rel_type: String,
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<GraphNode>,
    relationships: Vec<GraphRelationship>,
    constraints: BTreeSet<(String, String)>,
}

impl GraphState {
    fn find_node(&self, label: &str, key: &str, value: &Value) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| n.label == label && n.properties.get(key) == Some(value))
    }
}

/// An in-memory property graph that interprets statements with MATCH/MERGE
/// semantics. Backs dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
    history: Mutex<Vec<Mutation>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn node_count(&self) -> usize {
        self.state().nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.state().relationships.len()
    }

    pub fn nodes(&self) -> Vec<GraphNode> {
        self.state().nodes.clone()
    }

    pub fn constraints(&self) -> Vec<(String, String)> {
        self.state().constraints.iter().cloned().collect()
    }

    pub fn find_node(&self, label: &str, key: &str, value: &Value) -> Option<GraphNode> {
        let state = self.state();
        state
            .find_node(label, key, value)
            .map(|i| state.nodes[i].clone())
    }

    /// Relationships as `(from label, type, to label)` triples.
    pub fn relationships(&self) -> Vec<(String, String, String)> {
        let state = self.state();
        state
            .relationships
            .iter()
            .map(|r| {
                (
                    state.nodes[r.from].label.clone(),
                    r.rel_type.clone(),
                    state.nodes[r.to].label.clone(),
                )
            })
            .collect()
    }

    /// Every mutation executed so far, in order.
    pub fn history(&self) -> Vec<Mutation> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Resolves parameters, aliases and MATCH clauses without writing.
    /// `Ok(false)` means a MATCH found no node, so the statement writes nothing.
    fn check(state: &GraphState, mutation: &Mutation) -> Result<bool, SinkError> {
        let mut declared: HashSet<&str> = HashSet::new();
        for clause in mutation.statement.clauses() {
            match clause {
                Clause::MatchNode {
                    alias,
                    label,
                    key,
                    param,
                } => {
                    let value = param_value(&mutation.parameters, param)?;
                    if state.find_node(label, key, value).is_none() {
                        return Ok(false);
                    }
                    declared.insert(alias);
                }
                Clause::MergeNode { alias, param, .. } => {
                    param_value(&mutation.parameters, param)?;
                    declared.insert(alias);
                }
                Clause::SetProperty { alias, param, .. } => {
                    param_value(&mutation.parameters, param)?;
                    ensure_declared(&declared, alias)?;
                }
                Clause::MergeRelationship { alias, other, .. } => {
                    ensure_declared(&declared, alias)?;
                    ensure_declared(&declared, other)?;
                }
                Clause::CreateUniqueConstraint { .. } => {}
            }
        }
        Ok(true)
    }

    /// Writes a statement that already passed [`MemoryGraph::check`].
    fn apply(state: &mut GraphState, mutation: &Mutation) -> Result<ExecutionSummary, SinkError> {
        let mut summary = ExecutionSummary::default();
        let mut bound: HashMap<&str, usize> = HashMap::new();

        for clause in mutation.statement.clauses() {
            match clause {
                Clause::MatchNode {
                    alias,
                    label,
                    key,
                    param,
                } => {
                    let value = param_value(&mutation.parameters, param)?;
                    if let Some(index) = state.find_node(label, key, value) {
                        bound.insert(alias, index);
                    }
                }
                Clause::MergeNode {
                    alias,
                    label,
                    key,
                    param,
                } => {
                    let value = param_value(&mutation.parameters, param)?;
                    let index = match state.find_node(label, key, value) {
                        Some(index) => index,
                        None => {
                            let mut properties = Map::new();
                            properties.insert(key.clone(), value.clone());
                            state.nodes.push(GraphNode {
                                label: label.clone(),
                                properties,
                            });
                            summary.nodes_created += 1;
                            summary.properties_set += 1;
                            state.nodes.len() - 1
                        }
                    };
                    bound.insert(alias, index);
                }
                Clause::SetProperty {
                    alias,
                    property,
                    param,
                } => {
                    let value = param_value(&mutation.parameters, param)?.clone();
                    let index = bound_node(&bound, alias)?;
                    let properties = &mut state.nodes[index].properties;
                    if value.is_null() {
                        properties.remove(property);
                    } else {
                        properties.insert(property.clone(), value);
                    }
                    summary.properties_set += 1;
                }
                Clause::MergeRelationship {
                    alias,
                    other,
                    rel_type,
                    direction,
                } => {
                    let node = bound_node(&bound, alias)?;
                    let other = bound_node(&bound, other)?;
                    let (from, to) = match direction {
                        Direction::Out => (node, other),
                        Direction::In => (other, node),
                    };
                    let relationship = GraphRelationship {
                        from,
                        to,
                        rel_type: rel_type.clone(),
                    };
                    if !state.relationships.contains(&relationship) {
                        state.relationships.push(relationship);
                        summary.relationships_created += 1;
                    }
                }
                Clause::CreateUniqueConstraint { label, property } => {
                    if state.constraints.insert((label.clone(), property.clone())) {
                        summary.constraints_added += 1;
                    }
                }
            }
        }

        Ok(summary)
    }
}

fn param_value<'a>(parameters: &'a Parameters, name: &str) -> Result<&'a Value, SinkError> {
    parameters
        .get(name)
        .ok_or_else(|| SinkError::Store(format!("Expected parameter(s): {name}")))
}

fn ensure_declared(declared: &HashSet<&str>, alias: &str) -> Result<(), SinkError> {
    if declared.contains(alias) {
        Ok(())
    } else {
        Err(SinkError::Store(format!("Variable `{alias}` not defined")))
    }
}

fn bound_node(bound: &HashMap<&str, usize>, alias: &str) -> Result<usize, SinkError> {
    bound
        .get(alias)
        .copied()
        .ok_or_else(|| SinkError::Store(format!("Variable `{alias}` not defined")))
}

#[async_trait]
impl MutationSink for MemoryGraph {
    async fn execute(&self, mutation: &Mutation) -> Result<ExecutionSummary, SinkError> {
        let mut state = self.state();
        if !Self::check(&state, mutation)? {
            return Ok(ExecutionSummary::default());
        }
        let summary = Self::apply(&mut state, mutation)?;
        drop(state);

        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(mutation.clone());
        Ok(summary)
    }
}
