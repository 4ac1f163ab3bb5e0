use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::config::{Dataset, DatasetParams, DatasetSource, RunOptions};
use crate::errors::{ImportError, RecordError, Result};
use crate::mapping::{RawRecord, extract, transform};
use crate::models::{BatchTally, DatasetReport, PageReport};
use crate::mutation::load;
use crate::query::QueryClient;
use crate::sink::{ExecutionSummary, SinkHandle};
use crate::template::QueryTemplate;

/// Drives datasets through extract, transform and load.
///
/// Records of one dataset are loaded strictly one after another. Several
/// datasets may run at once through [`Importer::run_all`]; they only share
/// the sink handle, which admits one statement at a time.
pub struct Importer {
    query_client: Arc<dyn QueryClient>,
    sink: SinkHandle,
    options: RunOptions,
}

impl Importer {
    pub fn new(query_client: Arc<dyn QueryClient>, sink: SinkHandle, options: RunOptions) -> Self {
        Self {
            query_client,
            sink,
            options,
        }
    }

    pub fn sink(&self) -> &SinkHandle {
        &self.sink
    }

    /// Runs one dataset to completion.
    ///
    /// Rejected records are logged and counted as failures. A failure to
    /// fetch a page ends the run with an error.
    pub async fn run_dataset(&self, dataset: &Dataset) -> Result<DatasetReport> {
        log::info!("Starting import {} ({} mode)", dataset.name, dataset.mode());
        let mut report = DatasetReport::new(&dataset.name, dataset.mode());

        match &dataset.source {
            DatasetSource::Query(template) => {
                if let Err(err) = self.run_pages(dataset, template, &mut report).await {
                    log::error!("{}: LOAD_ERROR {}", dataset.name, err);
                    return Err(err);
                }
            }
            DatasetSource::Static(records) => {
                let tally = self.process_records(dataset, records).await;
                report.loaded = tally.loaded;
                report.failed = tally.failed;
                report.summary = tally.summary;
                log::info!(
                    "{} : {} records successfully inserted",
                    dataset.name,
                    tally.loaded
                );
            }
        }

        report.finished_at = Utc::now();
        log::info!(
            "Finished import {}: {} loaded, {} failed in {} ms",
            dataset.name,
            report.loaded,
            report.failed,
            report.elapsed().num_milliseconds()
        );
        Ok(report)
    }

    async fn run_pages(
        &self,
        dataset: &Dataset,
        template: &QueryTemplate,
        report: &mut DatasetReport,
    ) -> Result<()> {
        let mut pages = dataset.params.pagination().pages().peekable();

        while let Some(page) = pages.next() {
            let query = template.render(&page.variables(&dataset.params.args));
            log::debug!(
                "{}: fetching offset {} limit {} via {}",
                dataset.name,
                page.offset,
                page.limit,
                self.query_client.name()
            );
            let response = self.query_client.fetch(&query).await?;

            let mut page_report = PageReport {
                offset: page.offset,
                limit: page.limit,
                fetched: response.records.len(),
                loaded: 0,
                failed: 0,
            };

            if response.is_empty() {
                log::info!("{}: no records at offset {}, stopping", dataset.name, page.offset);
                report.pages.push(page_report);
                break;
            }

            let tally = self.process_records(dataset, &response.records).await;
            page_report.loaded = tally.loaded;
            page_report.failed = tally.failed;
            report.loaded += tally.loaded;
            report.failed += tally.failed;
            report.summary.absorb(tally.summary);
            report.pages.push(page_report);

            log::info!(
                "{} : {} records successfully inserted",
                dataset.name,
                tally.loaded
            );

            if pages.peek().is_some() && !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }
        }

        Ok(())
    }

    async fn process_records(&self, dataset: &Dataset, records: &[RawRecord]) -> BatchTally {
        let mut tally = BatchTally::default();

        for raw in records {
            match self.process_record(&dataset.params, raw).await {
                Ok(summary) => {
                    tally.loaded += 1;
                    tally.summary.absorb(summary);
                }
                Err(err) => {
                    tally.failed += 1;
                    log::error!(
                        "{}: record rejected ({:?}): {} -- {}",
                        dataset.name,
                        err.kind(),
                        err,
                        Value::Object(raw.clone())
                    );
                }
            }
        }

        tally
    }

    async fn process_record(
        &self,
        params: &DatasetParams,
        raw: &RawRecord,
    ) -> std::result::Result<ExecutionSummary, RecordError> {
        let record = extract(raw, &params.mapping)?;
        let record = transform(record, &params.mapping)?;
        load(record, &params.load, &self.sink).await
    }

    /// Runs every dataset as its own task and waits for all of them,
    /// whatever their outcome. Results come back in input order.
    pub async fn run_all(self: Arc<Self>, datasets: Vec<Dataset>) -> Vec<(String, Result<DatasetReport>)> {
        let handles: Vec<_> = datasets
            .into_iter()
            .map(|dataset| {
                let importer = Arc::clone(&self);
                let name = dataset.name.clone();
                let handle = tokio::spawn(async move { importer.run_dataset(&dataset).await });
                (name, handle)
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) => {
                    log::error!("{}: dataset task aborted: {}", name, join_err);
                    Err(ImportError::Task(join_err.to_string()))
                }
            };
            results.push((name, outcome));
        }
        results
    }
}
