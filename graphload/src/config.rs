use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ImportError, Result};
use crate::expr::Expression;
use crate::mapping::{DatasetMapping, RawRecord};
use crate::template::QueryTemplate;

/// Declares one relationship to create for every record of a dataset.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RelationSpec {
    /// Evaluates to `IN` or `OUT`, seen from the primary node.
    pub direction: Expression,
    #[serde(rename = "type")]
    pub rel_type: Expression,
    /// Must hold `#node_label` and the primary-key attribute of the target node.
    pub target: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoadSpec {
    /// Evaluates to the *name* of the field holding the primary key.
    pub primary_id: Expression,
    #[serde(default)]
    pub relations: Vec<RelationSpec>,
}

impl LoadSpec {
    pub fn new(primary_id: Expression) -> Self {
        Self {
            primary_id,
            relations: Vec::new(),
        }
    }

    pub fn with_relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }
}

/// Contents of a dataset's `params.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatasetParams {
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Total number of records to request across all pages.
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(
        default = "default_results_per_page",
        rename = "resultsPerPage",
        alias = "results_per_page"
    )]
    pub results_per_page: u64,
    #[serde(default)]
    pub mapping: DatasetMapping,
    pub load: LoadSpec,
}

fn default_limit() -> u64 {
    500
}

fn default_results_per_page() -> u64 {
    50
}

impl DatasetParams {
    pub fn new(load: LoadSpec) -> Self {
        Self {
            args: Map::new(),
            limit: default_limit(),
            results_per_page: default_results_per_page(),
            mapping: DatasetMapping::default(),
            load,
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let params: DatasetParams = serde_json::from_str(text)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if self.results_per_page == 0 {
            return Err(ImportError::Config(
                "resultsPerPage must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn pagination(&self) -> Pagination {
        Pagination {
            ceiling: self.limit,
            page_size: self.results_per_page,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub ceiling: u64,
    pub page_size: u64,
}

impl Pagination {
    /// Every page up to the ceiling. The last page is shortened so the ceiling is never exceeded.
    pub fn pages(self) -> impl Iterator<Item = Page> {
        let step = self.page_size.max(1);
        (0..self.ceiling).step_by(step as usize).map(move |offset| Page {
            limit: step.min(self.ceiling - offset),
            offset,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    /// Template variables for this page: the dataset args plus `limit` and `offset`.
    pub fn variables(&self, args: &Map<String, Value>) -> Map<String, Value> {
        let mut variables = args.clone();
        variables.insert("limit".into(), Value::from(self.limit));
        variables.insert("offset".into(), Value::from(self.offset));
        variables
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetMode {
    Query,
    Static,
}

impl fmt::Display for DatasetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetMode::Query => f.write_str("query"),
            DatasetMode::Static => f.write_str("static"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSource {
    Query(QueryTemplate),
    Static(Vec<RawRecord>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub name: String,
    pub source: DatasetSource,
    pub params: DatasetParams,
}

impl Dataset {
    pub fn new(name: impl Into<String>, source: DatasetSource, params: DatasetParams) -> Self {
        Self {
            name: name.into(),
            source,
            params,
        }
    }

    pub fn mode(&self) -> DatasetMode {
        match self.source {
            DatasetSource::Query(_) => DatasetMode::Query,
            DatasetSource::Static(_) => DatasetMode::Static,
        }
    }

    /// The query sent for the first page, if this dataset queries at all.
    pub fn first_query(&self) -> Option<String> {
        let DatasetSource::Query(template) = &self.source else {
            return None;
        };
        let page = self.params.pagination().pages().next()?;
        Some(template.render(&page.variables(&self.params.args)))
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Pause between two pages of the same dataset.
    pub page_delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(10),
        }
    }
}
