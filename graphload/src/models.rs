use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::DatasetMode;
use crate::sink::ExecutionSummary;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PageReport {
    pub offset: u64,
    pub limit: u64,
    pub fetched: usize,
    pub loaded: usize,
    pub failed: usize,
}

/// Outcome of one dataset run.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub dataset: String,
    pub mode: DatasetMode,
    pub pages: Vec<PageReport>,
    pub loaded: usize,
    pub failed: usize,
    pub summary: ExecutionSummary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DatasetReport {
    pub fn new(dataset: impl Into<String>, mode: DatasetMode) -> Self {
        let now = Utc::now();
        Self {
            dataset: dataset.into(),
            mode,
            pages: Vec::new(),
            loaded: 0,
            failed: 0,
            summary: ExecutionSummary::default(),
            started_at: now,
            finished_at: now,
        }
    }

    /// Number of calls made to the query client.
    pub fn fetches(&self) -> usize {
        match self.mode {
            DatasetMode::Query => self.pages.len(),
            DatasetMode::Static => 0,
        }
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Per-record outcome tally for one batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    pub loaded: usize,
    pub failed: usize,
    pub summary: ExecutionSummary,
}
