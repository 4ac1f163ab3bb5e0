use async_trait::async_trait;
use graphload::errors::SinkError;
use graphload::{ExecutionSummary, Mutation, MutationSink};

use crate::error::{Neo4jSinkError, Result};
use crate::models::{TxRequest, TxResponse};
use crate::params::Neo4jParams;

/// Writes mutations to Neo4j through the HTTP transactional API, one
/// auto-committed request per mutation.
pub struct Neo4jHttpSink {
    http: reqwest::Client,
    params: Neo4jParams,
    commit_url: String,
}

impl Neo4jHttpSink {
    pub fn new(params: Neo4jParams) -> Result<Self> {
        params.validate()?;
        let http = reqwest::Client::builder().build()?;
        let commit_url = params.commit_url();
        Ok(Self {
            http,
            params,
            commit_url,
        })
    }

    pub fn params(&self) -> &Neo4jParams {
        &self.params
    }

    pub async fn commit(&self, request: &TxRequest) -> Result<ExecutionSummary> {
        let mut builder = self
            .http
            .post(&self.commit_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request);
        if let Some(username) = &self.params.username {
            builder = builder.basic_auth(username, self.params.password.as_ref());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Neo4jSinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TxResponse = serde_json::from_str(&body)?;
        parsed.into_summary()
    }

    /// Round-trips an empty transaction to check connectivity and credentials.
    pub async fn ping(&self) -> Result<()> {
        self.commit(&TxRequest { statements: vec![] }).await.map(|_| ())
    }
}

#[async_trait]
impl MutationSink for Neo4jHttpSink {
    async fn execute(
        &self,
        mutation: &Mutation,
    ) -> std::result::Result<ExecutionSummary, SinkError> {
        let request = TxRequest::single(mutation);
        self.commit(&request).await.map_err(|err| {
            log::debug!("Neo4j rejected statement: {}", err);
            SinkError::from(err)
        })
    }
}
