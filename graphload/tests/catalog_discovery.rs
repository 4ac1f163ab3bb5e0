//! Discovering datasets from a directory tree.

use std::fs;
use std::path::Path;

use graphload::config::DatasetMode;
use graphload::{DatasetCatalog, DatasetSource, ImportError};
use serde_json::json;
use tempfile::TempDir;

mod common;

use common::fixture::ScriptedQueryClient;

fn write_dataset(root: &Path, name: &str, files: &[(&str, String)]) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("create dataset dir");
    for (file, contents) in files {
        fs::write(dir.join(file), contents).expect("write dataset file");
    }
}

fn sample_tree() -> TempDir {
    let tmp = TempDir::new().expect("temp dir");
    write_dataset(
        tmp.path(),
        "historical-events",
        &[
            (
                "params.json",
                json!({
                    "args": {"country": "Q142"},
                    "limit": 100,
                    "resultsPerPage": 50,
                    "mapping": {
                        "wd_id": {"from": {"key": ["item", "value"]}, "transform": [{"from_url_to_wd_id": true}]},
                        "label": {"from": {"key": ["itemLabel", "value"]}},
                        "#node_label": {"from": "Event"}
                    },
                    "load": {"primary_id": "wd_id"}
                })
                .to_string(),
            ),
            ("events.sparql", common::EVENTS_QUERY.to_string()),
        ],
    );
    write_dataset(
        tmp.path(),
        "countries",
        &[
            ("params.json", json!({"load": {"primary_id": "wd_id"}}).to_string()),
            (
                "data.json",
                json!([{"wd_id": "Q142", "label": "France", "#node_label": "Country"}]).to_string(),
            ),
        ],
    );
    fs::create_dir_all(tmp.path().join(".cache")).expect("hidden dir");
    fs::write(tmp.path().join("README.md"), "not a dataset").expect("stray file");
    tmp
}

#[tokio::test]
async fn discovers_query_and_static_datasets() -> anyhow::Result<()> {
    let tmp = sample_tree();
    let catalog = DatasetCatalog::new(tmp.path());

    let datasets = catalog.discover(None).await?;

    let names: Vec<_> = datasets.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["countries", "historical-events"]);
    assert_eq!(datasets[0].mode(), DatasetMode::Static);
    assert_eq!(datasets[1].mode(), DatasetMode::Query);
    match &datasets[1].source {
        DatasetSource::Query(template) => assert_eq!(template.text(), common::EVENTS_QUERY),
        DatasetSource::Static(_) => panic!("expected a query dataset"),
    }
    assert_eq!(datasets[1].params.limit, 100);
    Ok(())
}

#[tokio::test]
async fn selection_filters_and_rejects_unknown_names() -> anyhow::Result<()> {
    let tmp = sample_tree();
    let catalog = DatasetCatalog::new(tmp.path());

    let only = vec!["countries".to_string()];
    let datasets = catalog.discover(Some(only.as_slice())).await?;
    assert_eq!(datasets.len(), 1);
    assert_eq!(datasets[0].name, "countries");

    let unknown = vec!["nope".to_string()];
    let err = catalog.discover(Some(unknown.as_slice())).await.unwrap_err();
    assert!(matches!(err, ImportError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn dataset_needs_exactly_one_source() {
    let tmp = TempDir::new().expect("temp dir");
    let params = json!({"load": {"primary_id": "id"}}).to_string();
    write_dataset(tmp.path(), "empty", &[("params.json", params.clone())]);
    write_dataset(
        tmp.path(),
        "both",
        &[
            ("params.json", params),
            ("data.json", "[]".to_string()),
            ("q.sparql", "SELECT * WHERE {}".to_string()),
        ],
    );
    let catalog = DatasetCatalog::new(tmp.path());

    assert!(matches!(catalog.load("empty").await, Err(ImportError::Config(_))));
    assert!(matches!(catalog.load("both").await, Err(ImportError::Config(_))));
}

#[tokio::test]
async fn bad_params_name_the_dataset() {
    let tmp = TempDir::new().expect("temp dir");
    write_dataset(
        tmp.path(),
        "typo",
        &[
            (
                "params.json",
                json!({"mapping": {"id": {"from": {"slpit": "/"}}}, "load": {"primary_id": "id"}})
                    .to_string(),
            ),
            ("data.json", "[]".to_string()),
        ],
    );

    let err = DatasetCatalog::new(tmp.path()).load("typo").await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("typo/params.json"));
    assert!(message.contains("unknown directive `slpit`"));
}

#[tokio::test]
async fn discovered_datasets_run_end_to_end() -> anyhow::Result<()> {
    let tmp = sample_tree();
    let datasets = DatasetCatalog::new(tmp.path()).discover(None).await?;
    let ctx = common::init_test_context(ScriptedQueryClient::with_event_pages(1, 5));

    let results = ctx.importer.clone().run_all(datasets).await;

    assert!(results.iter().all(|(_, outcome)| outcome.is_ok()));
    assert_eq!(ctx.graph.node_count(), 6);
    let queries = ctx.client.queries().await;
    assert_eq!(queries.len(), 2);
    assert!(queries[0].contains("wd:Q142"));
    Ok(())
}
