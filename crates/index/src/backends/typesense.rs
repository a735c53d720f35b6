//! Typesense HTTP client.
//!
//! Speaks the subset of the Typesense REST API a rebuild needs. Every call is
//! one request authenticated with the `X-TYPESENSE-API-KEY` header. Nothing
//! is retried here; retrying is the driver's decision.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::config::{ImportAction, IndexConfig};
use crate::document::Document;
use crate::engine::ndjson::{decode_import_response, encode_documents};
use crate::engine::{AliasMapping, DeleteOutcome, ImportResult, SearchEngine};
use crate::error::{EngineError, EngineResult};
use crate::schema::SchemaDefinition;

const API_KEY_HEADER: &str = "x-typesense-api-key";

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CollectionSummary {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AliasList {
    aliases: Vec<AliasMapping>,
}

#[derive(Debug, Deserialize)]
struct Health {
    ok: bool,
}

/// Client for one Typesense node.
#[derive(Debug, Clone)]
pub struct TypesenseClient {
    base_url: Url,
    http: reqwest::Client,
}

impl TypesenseClient {
    /// Creates a client for the configured primary node.
    pub fn new(config: &IndexConfig) -> EngineResult<Self> {
        let node = config
            .primary_node()
            .ok_or_else(|| EngineError::InvalidResponse {
                message: "no search engine node configured".to_string(),
            })?;
        let base_url = Url::parse(node).map_err(|e| EngineError::InvalidResponse {
            message: format!("invalid node URL '{}': {}", node, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(EngineError::InvalidResponse {
                message: format!("node URL '{}' cannot be a base URL", node),
            });
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|e| {
            EngineError::InvalidResponse {
                message: format!("invalid API key: {}", e),
            }
        })?;
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| EngineError::transport(e.to_string()))?;

        Ok(Self { base_url, http })
    }

    /// Returns the node URL requests are sent to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!(method = %method, url = %url, "Typesense request");
        self.http.request(method, url)
    }

    async fn send(&self, builder: RequestBuilder) -> EngineResult<Response> {
        builder
            .send()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))
    }
}

/// Maps a non-success response to an engine error.
async fn error_for(resp: Response, resource: &str) -> EngineError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&text)
        .map(|m| m.message)
        .unwrap_or(text);

    match status {
        StatusCode::NOT_FOUND => EngineError::NotFound {
            resource: resource.to_string(),
        },
        StatusCode::CONFLICT => EngineError::SchemaConflict {
            name: resource.to_string(),
        },
        s if s.is_server_error() => EngineError::transport(format!("{}: {}", s, message)),
        s => EngineError::Api {
            status: s.as_u16(),
            message,
        },
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> EngineResult<T> {
    let body = resp
        .text()
        .await
        .map_err(|e| EngineError::transport(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| EngineError::InvalidResponse {
        message: e.to_string(),
    })
}

#[async_trait]
impl SearchEngine for TypesenseClient {
    fn name(&self) -> &'static str {
        "typesense"
    }

    async fn health(&self) -> EngineResult<()> {
        let resp = self.send(self.request(Method::GET, &["health"])).await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, "health").await);
        }
        let health: Health = decode(resp).await?;
        if health.ok {
            Ok(())
        } else {
            Err(EngineError::transport("node reports unhealthy"))
        }
    }

    async fn create_collection(&self, name: &str, schema: &SchemaDefinition) -> EngineResult<()> {
        let resp = self
            .send(
                self.request(Method::POST, &["collections"])
                    .json(&schema.to_collection_payload(name)),
            )
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_for(resp, name).await)
        }
    }

    async fn delete_collection(&self, name: &str) -> EngineResult<DeleteOutcome> {
        let resp = self
            .send(self.request(Method::DELETE, &["collections", name]))
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            _ => Err(error_for(resp, name).await),
        }
    }

    async fn list_collections(&self) -> EngineResult<Vec<String>> {
        let resp = self.send(self.request(Method::GET, &["collections"])).await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, "collections").await);
        }
        let collections: Vec<CollectionSummary> = decode(resp).await?;
        Ok(collections.into_iter().map(|c| c.name).collect())
    }

    async fn get_alias(&self, alias: &str) -> EngineResult<Option<String>> {
        let resp = self
            .send(self.request(Method::GET, &["aliases", alias]))
            .await?;
        match resp.status() {
            s if s.is_success() => {
                let mapping: AliasMapping = decode(resp).await?;
                Ok(Some(mapping.collection_name))
            }
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(error_for(resp, alias).await),
        }
    }

    async fn upsert_alias(&self, alias: &str, target: &str) -> EngineResult<()> {
        let resp = self
            .send(
                self.request(Method::PUT, &["aliases", alias])
                    .json(&json!({ "collection_name": target })),
            )
            .await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_for(resp, target).await)
        }
    }

    async fn list_aliases(&self) -> EngineResult<Vec<AliasMapping>> {
        let resp = self.send(self.request(Method::GET, &["aliases"])).await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, "aliases").await);
        }
        let list: AliasList = decode(resp).await?;
        Ok(list.aliases)
    }

    async fn bulk_upsert(
        &self,
        collection: &str,
        documents: &[Document],
        action: ImportAction,
    ) -> EngineResult<Vec<ImportResult>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .send(
                self.request(
                    Method::POST,
                    &["collections", collection, "documents", "import"],
                )
                .query(&[("action", action.as_str())])
                .header(CONTENT_TYPE, "text/plain")
                .body(encode_documents(documents)),
            )
            .await?;
        if !resp.status().is_success() {
            return Err(error_for(resp, collection).await);
        }

        let body = resp
            .text()
            .await
            .map_err(|e| EngineError::transport(e.to_string()))?;
        Ok(decode_import_response(&body, documents))
    }
}
