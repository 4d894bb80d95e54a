use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::{
    auth::Credentials,
    http::transport::{BuildError, SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch, SearchParts,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

use crate::query::SearchRequest;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search engine URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] elasticsearch::Error),
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse search response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("search request timed out after {0:?}")]
    Timeout(Duration),
}

/// One hit: the index it came from and its source document.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub index: String,
    pub source: Map<String, Value>,
}

/// Executes structured search requests against the search engine.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError>;

    async fn ping(&self) -> Result<(), SearchError>;
}

/// Gateway backed by the Elasticsearch client, used against OpenSearch
/// clusters through their compatible REST API.
#[derive(Clone)]
pub struct OpenSearchGateway {
    client: Elasticsearch,
    request_timeout: Duration,
}

impl OpenSearchGateway {
    pub fn new(
        url: &str,
        username: &str,
        password: &str,
        request_timeout: Duration,
    ) -> Result<Self, SearchError> {
        let parsed = Url::parse(url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(pool)
            .auth(Credentials::Basic(username.to_string(), password.to_string()))
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            request_timeout,
        })
    }

    async fn execute(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .search(SearchParts::Index(&[request.index.as_str()]))
            .body(request.to_body())
            .send()
            .await?;

        let status = response.status_code();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        decode_hits(&body)
    }
}

#[async_trait]
impl SearchGateway for OpenSearchGateway {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        with_timeout(self.request_timeout, self.execute(request)).await
    }

    async fn ping(&self) -> Result<(), SearchError> {
        let response = with_timeout(self.request_timeout, async {
            self.client.ping().send().await.map_err(SearchError::from)
        })
        .await?;

        let status = response.status_code();
        if status.is_success() {
            Ok(())
        } else {
            Err(SearchError::Status {
                status: status.as_u16(),
                body: "ping failed".to_string(),
            })
        }
    }
}

/// Bounds a single search call so a stalled backend cannot hold a batch.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, SearchError>
where
    F: Future<Output = Result<T, SearchError>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(SearchError::Timeout(duration)),
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: InnerHits,
}

#[derive(Debug, Deserialize)]
struct InnerHits {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_index", default)]
    index: String,
    #[serde(rename = "_source")]
    source: Option<Map<String, Value>>,
}

/// Decodes a `_search` response body, dropping hits without a source.
pub fn decode_hits(body: &str) -> Result<Vec<SearchHit>, SearchError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| {
            hit.source.map(|source| SearchHit {
                index: hit.index,
                source,
            })
        })
        .collect())
}
