//! Asset store reached over the remote file API.

use crate::error::{StorageError, StorageResult};
use crate::traits::{AssetStore, ListingOptions, ListingPage};
use async_trait::async_trait;
use folio_core::FileId;
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct FileRow {
    id: String,
}

/// HTTP-backed [`AssetStore`].
#[derive(Clone)]
pub struct HttpAssetStore {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpAssetStore {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> StorageResult<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| StorageError::Config(format!("invalid assets base_url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::Config(format!(
                "assets base_url cannot be a base: {base_url}"
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

    fn url(&self, segments: &[&str]) -> StorageResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::Config(format!("invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

fn status_error(status: StatusCode, body: String) -> StorageError {
    match status {
        StatusCode::NOT_FOUND => StorageError::NotFound(body),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StorageError::Forbidden(body),
        _ => StorageError::UnexpectedStatus {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    async fn delete_file(&self, id: &FileId) -> StorageResult<bool> {
        let url = self.url(&["files", &id.to_string()])?;
        let response = self.authorize(self.http.delete(url)).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if status.is_success() {
            return Ok(true);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }

    async fn list_uploaded_page(
        &self,
        owner: &Uuid,
        options: &ListingOptions,
        offset: usize,
    ) -> StorageResult<ListingPage> {
        let page_size = options.normalized_page_size();
        let mut url = self.url(&["files"])?;
        url.query_pairs_mut()
            .append_pair(
                "filter",
                &json!({ "uploaded_by": { "_eq": owner.to_string() } }).to_string(),
            )
            .append_pair("fields", "id")
            .append_pair("sort", "id")
            .append_pair("limit", &page_size.to_string())
            .append_pair("offset", &offset.to_string());

        let response = self.authorize(self.http.get(url)).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(status_error(status, body));
        }

        let rows: Envelope<Vec<FileRow>> = serde_json::from_str(&body)?;
        let fetched = rows.data.len();
        let ids = rows
            .data
            .into_iter()
            .filter_map(|row| match FileId::parse(&row.id) {
                Ok(id) => Some(id),
                Err(_) => {
                    debug!(file_id = %row.id, "Skipping file with non-uuid id");
                    None
                }
            })
            .collect();
        let next_offset = (fetched == page_size).then(|| offset + page_size);
        Ok(ListingPage { ids, next_offset })
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }

    async fn health_check(&self) -> StorageResult<()> {
        let url = self.url(&["server", "ping"])?;
        let response = self.authorize(self.http.get(url)).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }
}
