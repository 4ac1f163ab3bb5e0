pub mod catalog;
pub mod config;
pub mod errors;
pub mod expr;
pub mod mapping;
pub mod models;
pub mod mutation;
pub mod query;
pub mod runner;
pub mod schema;
pub mod sink;
pub mod statement;
pub mod template;

pub use crate::catalog::DatasetCatalog;
pub use crate::config::{Dataset, DatasetParams, DatasetSource, LoadSpec, RelationSpec, RunOptions};
pub use crate::errors::{ErrorKind, ImportError, RecordError, Result};
pub use crate::expr::{Expression, evaluate};
pub use crate::mapping::{DatasetMapping, FieldMapping, RawRecord, Record, extract, transform};
pub use crate::models::{DatasetReport, PageReport};
pub use crate::mutation::{build_mutation, load};
pub use crate::query::{QueryClient, QueryResponse};
pub use crate::runner::Importer;
pub use crate::schema::GraphSchema;
pub use crate::sink::{ExecutionSummary, MemoryGraph, MutationSink, SinkHandle};
pub use crate::statement::{Mutation, Statement};

/// Builds an [`Importer`] that writes into a fresh [`MemoryGraph`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use graphload::{DatasetCatalog, QueryClient, RunOptions};
///
/// async fn dry_run(client: Arc<dyn QueryClient>) -> graphload::Result<()> {
///     let (importer, graph) = graphload::in_memory(client, RunOptions::default());
///     let datasets = DatasetCatalog::new("datasets").discover(None).await?;
///     for (name, outcome) in Arc::new(importer).run_all(datasets).await {
///         println!("{name}: {:?}", outcome.map(|report| report.loaded));
///     }
///     println!("{} nodes", graph.node_count());
///     Ok(())
/// }
/// ```
pub fn in_memory(
    query_client: std::sync::Arc<dyn QueryClient>,
    options: RunOptions,
) -> (Importer, std::sync::Arc<MemoryGraph>) {
    let graph = std::sync::Arc::new(MemoryGraph::new());
    let sink = SinkHandle::new(graph.clone());
    (Importer::new(query_client, sink, options), graph)
}
