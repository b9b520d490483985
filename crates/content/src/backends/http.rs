//! Content store reached over the remote REST API.
//!
//! Rows live under `items/{collection}`; successful responses wrap their
//! payload as `{"data": ...}` and failures as
//! `{"errors": [{"message": ..., "extensions": {"code": ...}}]}`.

use crate::error::{ContentError, ContentResult};
use crate::query::{Filter, Item, Query};
use crate::store::ContentStore;
use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Deserialize)]
struct ErrorEntry {
    #[serde(default)]
    message: String,
    #[serde(default)]
    extensions: ErrorExtensions,
}

#[derive(Default, Deserialize)]
struct ErrorExtensions {
    code: Option<String>,
    field: Option<String>,
}

/// HTTP-backed [`ContentStore`].
#[derive(Clone)]
pub struct HttpContentStore {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpContentStore {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> ContentResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| ContentError::Config(format!("invalid content base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ContentError::Config(format!(
                "content base_url cannot be a base: {base_url}"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn url(&self, segments: &[&str]) -> ContentResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ContentError::Config(format!("invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, collection: &str, req: RequestBuilder) -> ContentResult<String> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let response = req.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let error = map_error(status, &body, collection);
            debug!(collection = %collection, status = %status, error = %error, "Content API request failed");
            return Err(error);
        }
        Ok(body)
    }

    async fn send_data<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        req: RequestBuilder,
    ) -> ContentResult<T> {
        let body = self.send(collection, req).await?;
        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        Ok(envelope.data)
    }
}

/// Translate an error response into a [`ContentError`].
fn map_error(status: StatusCode, body: &str, collection: &str) -> ContentError {
    let entry = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.errors.into_iter().next());
    let (code, message, field) = match entry {
        Some(e) => (e.extensions.code, e.message, e.extensions.field),
        None => (None, body.to_string(), None),
    };
    let mentions_field = message.to_ascii_lowercase().contains("field");

    match code.as_deref() {
        Some("COLLECTION_NOT_FOUND" | "ROUTE_NOT_FOUND") => {
            ContentError::CollectionNotFound(collection.to_string())
        }
        Some("FIELD_NOT_FOUND") => ContentError::FieldNotFound(field.unwrap_or(message)),
        Some("INVALID_QUERY") if mentions_field => {
            ContentError::FieldNotFound(field.unwrap_or(message))
        }
        Some("INVALID_QUERY") => ContentError::InvalidQuery(message),
        Some("FIELD_NOT_WRITABLE") => ContentError::FieldNotWritable(field.unwrap_or(message)),
        Some("INVALID_PAYLOAD") if field.is_some() || mentions_field => {
            ContentError::FieldNotWritable(field.unwrap_or(message))
        }
        Some("INVALID_PAYLOAD") => ContentError::InvalidQuery(message),
        Some(
            "RECORD_NOT_UNIQUE" | "INVALID_FOREIGN_KEY" | "NOT_NULL_VIOLATION"
            | "CONTAINS_NULL_VALUES" | "VALUE_OUT_OF_RANGE",
        ) => ContentError::Constraint(message),
        Some("FORBIDDEN") => ContentError::Forbidden(message),
        _ => match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ContentError::Forbidden(message),
            StatusCode::NOT_FOUND => ContentError::NotFound(message),
            StatusCode::CONFLICT => ContentError::Constraint(message),
            _ => ContentError::UnexpectedStatus {
                status: status.as_u16(),
                message,
            },
        },
    }
}

fn parse_count(data: &Value) -> ContentResult<u64> {
    let count = data
        .as_array()
        .and_then(|rows| rows.first())
        .and_then(|row| row.get("count"))
        .ok_or_else(|| ContentError::Internal(format!("missing count in aggregate: {data}")))?;
    match count {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ContentError::Internal(format!("invalid count: {count}")))
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn read_many(&self, collection: &str, query: &Query) -> ContentResult<Vec<Item>> {
        let mut url = self.url(&["items", collection])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = &query.filter {
                pairs.append_pair("filter", &filter.to_json().to_string());
            }
            if !query.fields.is_empty() {
                pairs.append_pair("fields", &query.fields.join(","));
            }
            let limit = query.limit.map_or(-1, |l| l as i64);
            pairs.append_pair("limit", &limit.to_string());
            if query.offset > 0 {
                pairs.append_pair("offset", &query.offset.to_string());
            }
        }
        self.send_data(collection, self.http.get(url)).await
    }

    async fn create_one(&self, collection: &str, item: Item) -> ContentResult<Item> {
        let url = self.url(&["items", collection])?;
        self.send_data(collection, self.http.post(url).json(&item))
            .await
    }

    async fn update_one(&self, collection: &str, id: &str, patch: Item) -> ContentResult<Item> {
        let url = self.url(&["items", collection, id])?;
        self.send_data(collection, self.http.patch(url).json(&patch))
            .await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Item,
    ) -> ContentResult<u64> {
        let url = self.url(&["items", collection])?;
        let body = json!({
            "query": { "filter": filter.to_json(), "limit": -1 },
            "data": patch,
        });
        let response = self
            .send(collection, self.http.patch(url).json(&body))
            .await?;
        if response.trim().is_empty() {
            return Ok(0);
        }
        let envelope: Envelope<Value> = serde_json::from_str(&response)?;
        Ok(envelope.data.as_array().map_or(0, |keys| keys.len() as u64))
    }

    async fn delete_one(&self, collection: &str, id: &str) -> ContentResult<()> {
        let url = self.url(&["items", collection, id])?;
        self.send(collection, self.http.delete(url)).await?;
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> ContentResult<u64> {
        let mut url = self.url(&["items", collection])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("aggregate[count]", "*");
            if let Some(filter) = filter {
                pairs.append_pair("filter", &filter.to_json().to_string());
            }
        }
        let data: Value = self.send_data(collection, self.http.get(url)).await?;
        parse_count(&data)
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn health_check(&self) -> ContentResult<()> {
        let url = self.url(&["server", "ping"])?;
        self.send("server", self.http.get(url)).await?;
        Ok(())
    }
}
