use std::sync::Arc;

use graphload::{
    Dataset, DatasetParams, DatasetSource, Importer, LoadSpec, MemoryGraph, RunOptions,
    SinkHandle, template::QueryTemplate,
};
use serde_json::json;

pub mod fixture;

use fixture::ScriptedQueryClient;

pub const EVENTS_QUERY: &str = "SELECT ?item ?itemLabel ?date WHERE { ?item wdt:P17 wd:$country } LIMIT $limit OFFSET $offset";

#[allow(dead_code)]
pub struct TestContext {
    pub client: Arc<ScriptedQueryClient>,
    pub graph: Arc<MemoryGraph>,
    pub importer: Arc<Importer>,
}

pub fn init_test_context(client: ScriptedQueryClient) -> TestContext {
    let _ = env_logger::builder().is_test(true).try_init();

    let client = Arc::new(client);
    let graph = Arc::new(MemoryGraph::new());
    let importer = Arc::new(Importer::new(
        client.clone(),
        SinkHandle::new(graph.clone()),
        RunOptions {
            page_delay: std::time::Duration::ZERO,
        },
    ));

    TestContext {
        client,
        graph,
        importer,
    }
}

/// Params mapping a Wikidata binding onto an `Event` node keyed on `wd_id`.
#[allow(dead_code)]
pub fn event_params() -> DatasetParams {
    serde_json::from_value(json!({
        "args": {"country": "Q142"},
        "mapping": {
            "wd_id": {
                "from": {"key": ["item", "value"]},
                "transform": [{"split": "/"}, {"at": -1}]
            },
            "label": {"from": {"key": ["itemLabel", "value"]}},
            "date": {"from": {"key": ["date", "value"]}},
            "#node_label": {"from": "Event"}
        },
        "load": {"primary_id": "wd_id"}
    }))
    .expect("event params are valid")
}

#[allow(dead_code)]
pub fn events_dataset(params: DatasetParams) -> Dataset {
    Dataset::new(
        "historical-events",
        DatasetSource::Query(QueryTemplate::new(EVENTS_QUERY)),
        params,
    )
}

#[allow(dead_code)]
pub fn countries_dataset() -> Dataset {
    let records = vec![
        json!({"wd_id": "Q142", "label": "France", "#node_label": "Country"}),
        json!({"wd_id": "Q183", "label": "Germany", "#node_label": "Country"}),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect();

    Dataset::new(
        "countries",
        DatasetSource::Static(records),
        DatasetParams::new(LoadSpec::new(graphload::Expression::literal("wd_id"))),
    )
}
