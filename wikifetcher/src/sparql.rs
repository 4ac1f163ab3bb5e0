//! SPARQL endpoint client.
//!
//! Sends SELECT queries to a SPARQL 1.1 endpoint (Wikidata by default) and
//! hands the result bindings back as raw records, one JSON object per row.

use async_trait::async_trait;
use graphload::errors::QueryError;
use graphload::{QueryClient, QueryResponse, RawRecord};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Public Wikidata query service.
pub const WIKIDATA_SPARQL_URL: &str = "https://query.wikidata.org/sparql";

const RESULTS_MEDIA_TYPE: &str = "application/sparql-results+json";
const USER_AGENT: &str = concat!(
    "wikifetcher/",
    env!("CARGO_PKG_VERSION"),
    " (graph importer; https://www.mediawiki.org/wiki/Wikidata_Query_Service/User_Manual)"
);

#[derive(Error, Debug)]
pub enum SparqlError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("invalid endpoint url '{0}'")]
    InvalidEndpoint(String),
}

pub type Result<T> = std::result::Result<T, SparqlError>;

impl From<SparqlError> for QueryError {
    fn from(err: SparqlError) -> Self {
        match err {
            SparqlError::ApiError { status, body } => QueryError::Status { status, body },
            SparqlError::JsonError(err) => QueryError::Decode(err.to_string()),
            SparqlError::RequestError(err) if err.is_decode() => QueryError::Decode(err.to_string()),
            other => QueryError::Transport(other.to_string()),
        }
    }
}

/// `application/sparql-results+json` document.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: Head,
    #[serde(default)]
    pub results: Bindings,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Bindings {
    #[serde(default)]
    pub bindings: Vec<RawRecord>,
}

impl SparqlResults {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Clone, Debug)]
pub struct SparqlClient {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl Default for SparqlClient {
    fn default() -> Self {
        Self {
            http_client: reqwest::Client::new(),
            endpoint: Url::parse(WIKIDATA_SPARQL_URL).expect("static endpoint url is valid"),
        }
    }
}

impl SparqlClient {
    /// Client for the public Wikidata endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let endpoint =
            Url::parse(endpoint).map_err(|_| SparqlError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SparqlError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(Self {
            http_client: reqwest::Client::new(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `<endpoint>?query=<query>&format=json`
    pub fn request_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("format", "json");
        url
    }

    pub async fn select(&self, query: &str) -> Result<SparqlResults> {
        let url = self.request_url(query);
        log::debug!("SPARQL GET {} ({} bytes of query)", self.endpoint, query.len());

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, RESULTS_MEDIA_TYPE)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SparqlError::ApiError {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let text = response.text().await?;
        let results = SparqlResults::from_json(&text)?;
        log::debug!(
            "SPARQL returned {} row(s) over {:?}",
            results.results.bindings.len(),
            results.head.vars
        );
        Ok(results)
    }
}

#[async_trait]
impl QueryClient for SparqlClient {
    fn name(&self) -> &'static str {
        "sparql"
    }

    async fn fetch(&self, query: &str) -> std::result::Result<QueryResponse, QueryError> {
        let results = self.select(query).await?;
        Ok(QueryResponse::new(results.results.bindings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"{
        "head": {"vars": ["item", "itemLabel", "coord"]},
        "results": {"bindings": [
            {
                "item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q243"},
                "itemLabel": {"xml:lang": "fr", "type": "literal", "value": "tour Eiffel"},
                "coord": {
                    "datatype": "http://www.opengis.net/ont/geosparql#wktLiteral",
                    "type": "literal",
                    "value": "Point(2.294479 48.858296)"
                }
            },
            {
                "item": {"type": "uri", "value": "http://www.wikidata.org/entity/Q90"}
            }
        ]}
    }"#;

    #[test]
    fn test_client_creation() {
        let client = SparqlClient::new();
        assert_eq!(client.endpoint().as_str(), WIKIDATA_SPARQL_URL);

        let custom = SparqlClient::with_endpoint("http://localhost:9999/bigdata/sparql").unwrap();
        assert_eq!(custom.endpoint().host_str(), Some("localhost"));
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(matches!(
            SparqlClient::with_endpoint("not a url"),
            Err(SparqlError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            SparqlClient::with_endpoint("ftp://example.org/sparql"),
            Err(SparqlError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_request_url_encodes_query() {
        let client = SparqlClient::new();
        let url = client.request_url("SELECT ?item WHERE { ?item wdt:P31 wd:Q5 } LIMIT 50 OFFSET 0");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "query".to_string(),
                    "SELECT ?item WHERE { ?item wdt:P31 wd:Q5 } LIMIT 50 OFFSET 0".to_string()
                ),
                ("format".to_string(), "json".to_string()),
            ]
        );
        assert!(url.as_str().starts_with("https://query.wikidata.org/sparql?query=SELECT"));
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_decode_bindings() {
        let results = SparqlResults::from_json(RESULTS).unwrap();
        assert_eq!(results.head.vars, vec!["item", "itemLabel", "coord"]);
        assert_eq!(results.results.bindings.len(), 2);

        let first = &results.results.bindings[0];
        assert_eq!(first["itemLabel"]["value"], "tour Eiffel");
        assert!(!results.results.bindings[1].contains_key("itemLabel"));
    }

    #[test]
    fn test_decode_empty_results() {
        let results = SparqlResults::from_json(r#"{"head": {"vars": []}, "results": {"bindings": []}}"#).unwrap();
        assert!(results.results.bindings.is_empty());

        let err = SparqlResults::from_json("<html>busy</html>").unwrap_err();
        assert!(matches!(QueryError::from(err), QueryError::Decode(_)));
    }

    #[test]
    fn test_error_mapping() {
        let status = QueryError::from(SparqlError::ApiError {
            status: 429,
            body: "Too Many Requests".to_string(),
        });
        assert_eq!(
            status,
            QueryError::Status {
                status: 429,
                body: "Too Many Requests".to_string()
            }
        );

        let endpoint = QueryError::from(SparqlError::InvalidEndpoint("x".to_string()));
        assert!(matches!(endpoint, QueryError::Transport(_)));
    }

    #[tokio::test]
    #[ignore = "queries the live Wikidata endpoint"]
    async fn test_live_select() {
        let client = SparqlClient::new();
        let response = client
            .fetch("SELECT ?item WHERE { ?item wdt:P31 wd:Q6256 } LIMIT 3 OFFSET 0")
            .await
            .unwrap();
        assert_eq!(response.records.len(), 3);
    }
}
