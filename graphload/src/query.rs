use async_trait::async_trait;

use crate::errors::QueryError;
use crate::mapping::RawRecord;

/// One page of results from the query API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    pub records: Vec<RawRecord>,
}

impl QueryResponse {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Executes a rendered query text against the upstream API.
#[async_trait]
pub trait QueryClient: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, query: &str) -> Result<QueryResponse, QueryError>;
}
