//! Scripted collaborators: a query client that replays canned pages and
//! records every query it receives, and a sink that fails chosen calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use graphload::errors::{QueryError, SinkError};
use graphload::{
    ExecutionSummary, MemoryGraph, Mutation, MutationSink, QueryClient, QueryResponse, RawRecord,
};
use serde_json::Value;
use tokio::sync::Mutex;

pub enum ScriptedPage {
    Records(Vec<RawRecord>),
    Fail(QueryError),
}

pub struct ScriptedQueryClient {
    pages: Mutex<VecDeque<ScriptedPage>>,
    queries: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedQueryClient {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// A client that answers every query with `count` full pages of generated events, then empty pages.
    pub fn with_event_pages(count: usize, page_size: usize) -> Self {
        let pages = (0..count)
            .map(|page| {
                ScriptedPage::Records(
                    (0..page_size)
                        .map(|i| event_binding(&format!("Q{}", page * page_size + i), "Event"))
                        .collect(),
                )
            })
            .collect();
        Self::new(pages)
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.queries.lock().await.len()
    }
}

#[async_trait]
impl QueryClient for ScriptedQueryClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch(&self, query: &str) -> Result<QueryResponse, QueryError> {
        self.queries.lock().await.push(query.to_string());
        match self.pages.lock().await.pop_front() {
            Some(ScriptedPage::Records(records)) => Ok(QueryResponse::new(records)),
            Some(ScriptedPage::Fail(err)) => Err(err),
            None => Ok(QueryResponse::default()),
        }
    }
}

/// Forwards to a [`MemoryGraph`] except on the listed calls (1-based),
/// which fail as if the store had dropped the connection.
#[allow(dead_code)]
pub struct FailingSink {
    graph: Arc<MemoryGraph>,
    fail_on: Vec<usize>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingSink {
    pub fn new(graph: Arc<MemoryGraph>, fail_on: Vec<usize>) -> Self {
        Self {
            graph,
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MutationSink for FailingSink {
    async fn execute(&self, mutation: &Mutation) -> Result<ExecutionSummary, SinkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(SinkError::Transport(format!("connection reset on call {call}")));
        }
        self.graph.execute(mutation).await
    }
}

/// A SPARQL JSON binding shaped like the Wikidata historical-events query output.
pub fn event_binding(id: &str, label: &str) -> RawRecord {
    let value = serde_json::json!({
        "item": {"type": "uri", "value": format!("http://www.wikidata.org/entity/{id}")},
        "itemLabel": {"xml:lang": "fr", "type": "literal", "value": label},
        "date": {
            "datatype": "http://www.w3.org/2001/XMLSchema#dateTime",
            "type": "literal",
            "value": "1889-05-06T00:00:00Z"
        }
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}
