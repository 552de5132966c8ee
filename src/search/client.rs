use super::error::SearchError;
use super::{DocumentSink, ImportResponse};
use crate::config::TypesenseConfig;
use crate::models::CollectionSchema;
use log::{debug, info};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use std::time::Duration;

const API_KEY_HEADER: &str = "X-TYPESENSE-API-KEY";

/// Result of deleting a collection that may not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Absent,
}

/// Result of creating a collection that may already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// HTTP client for the Typesense collections and import APIs.
///
/// Administrative calls and bulk imports run on separate connection pools so each
/// can carry its own timeout.
#[derive(Debug, Clone)]
pub struct TypesenseClient {
    admin: Client,
    import: Client,
    base_url: Url,
    api_key: String,
    admin_timeout: Duration,
    import_timeout: Duration,
}

impl TypesenseClient {
    pub fn new(config: &TypesenseConfig) -> Result<Self, SearchError> {
        let invalid_host = |reason: String| SearchError::InvalidHost {
            host: config.host.clone(),
            reason,
        };
        let base_url = Url::parse(config.host.trim_end_matches('/'))
            .map_err(|err| invalid_host(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid_host("not a base URL".to_string()));
        }

        Ok(Self {
            admin: build_http(config.admin_timeout)?,
            import: build_http(config.import_timeout)?,
            base_url,
            api_key: config.api_key.clone(),
            admin_timeout: config.admin_timeout,
            import_timeout: config.import_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Endpoint below the base URL; each segment is percent-encoded, so a collection
    /// name cannot add path segments, a query or a fragment.
    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, http: &Client, method: Method, segments: &[&str]) -> RequestBuilder {
        http.request(method, self.url_for(segments))
            .header(API_KEY_HEADER, &self.api_key)
    }

    pub async fn delete_collection(&self, name: &str) -> Result<DeleteOutcome, SearchError> {
        let response = self
            .request(&self.admin, Method::DELETE, &["collections", name])
            .send()
            .await
            .map_err(|err| SearchError::transport(err, self.admin_timeout))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::Absent);
        }
        if status.is_success() {
            return Ok(DeleteOutcome::Deleted);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "failed to read error body".to_string());
        Err(SearchError::status(status, body))
    }

    pub async fn create_collection(
        &self,
        schema: &CollectionSchema,
    ) -> Result<CreateOutcome, SearchError> {
        let payload = serde_json::to_vec(schema)?;
        debug!(
            "typesense: creating collection '{}' with {} fields",
            schema.name,
            schema.fields.len()
        );

        let response = self
            .request(&self.admin, Method::POST, &["collections"])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|err| SearchError::transport(err, self.admin_timeout))?;

        match response.status() {
            StatusCode::CONFLICT => Ok(CreateOutcome::AlreadyExists),
            status if status.is_success() => Ok(CreateOutcome::Created),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "failed to read error body".to_string());
                Err(SearchError::status(status, body))
            }
        }
    }

    /// Upsert newline-delimited JSON documents. Any HTTP status is returned to the
    /// caller; only transport failures are errors.
    pub async fn import_jsonl(
        &self,
        collection: &str,
        body: String,
    ) -> Result<ImportResponse, SearchError> {
        let bytes = body.len();
        let response = self
            .request(
                &self.import,
                Method::POST,
                &["collections", collection, "documents", "import"],
            )
            .query(&[("action", "upsert")])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(body)
            .send()
            .await
            .map_err(|err| SearchError::transport(err, self.import_timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| SearchError::transport(err, self.import_timeout))?;
        debug!("typesense: import of {bytes} bytes into '{collection}' returned {status}");
        Ok(ImportResponse { status, body })
    }
}

impl DocumentSink for TypesenseClient {
    async fn import_documents(
        &self,
        collection: &str,
        body: String,
    ) -> Result<ImportResponse, SearchError> {
        self.import_jsonl(collection, body).await
    }
}

fn build_http(timeout: Duration) -> Result<Client, SearchError> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent("typesense-sync/0.1")
        .build()
        .map_err(SearchError::Http)?;
    info!("typesense: http client ready (timeout {timeout:?})");
    Ok(client)
}
