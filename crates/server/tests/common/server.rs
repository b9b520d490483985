//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use folio_content::{ContentStore, Item, MemoryContentStore};
use folio_core::FileId;
use folio_core::config::AppConfig;
use folio_server::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use folio_server::{AppState, create_router};
use folio_storage::MemoryAssetStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

/// Who a test request is sent as.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum Caller {
    Anonymous,
    User(Uuid),
    Admin(Uuid),
}

/// A test server backed by in-memory stores.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub content: Arc<MemoryContentStore>,
    pub assets: Arc<MemoryAssetStore>,
}

#[allow(dead_code)]
impl TestServer {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a test server with custom config modifications.
    pub fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        Self::with_content(MemoryContentStore::platform(), modifier)
    }

    /// Create a test server over a prepared content store.
    pub fn with_content<F>(content: MemoryContentStore, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = AppConfig::for_testing();
        modifier(&mut config);

        let content = Arc::new(content);
        let assets = Arc::new(MemoryAssetStore::new());
        let state = AppState::new(config, content.clone(), assets.clone());
        let router = create_router(state.clone());

        Self {
            router,
            state,
            content,
            assets,
        }
    }

    /// Store a new file, optionally recording its uploader.
    pub fn file(&self, uploaded_by: Option<Uuid>) -> FileId {
        let id = FileId::new_v4();
        self.assets.insert(id, uploaded_by);
        id
    }

    pub fn exists(&self, id: &FileId) -> bool {
        self.assets.contains(id)
    }

    pub async fn insert(&self, collection: &str, row: Value) -> Item {
        let item = row.as_object().cloned().expect("fixture rows are objects");
        self.content
            .create_one(collection, item)
            .await
            .expect("fixture insert")
    }

    pub async fn account(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.insert(
            folio_content::collections::ACCOUNT,
            json!({ "id": id.to_string(), "email": format!("{id}@example.com") }),
        )
        .await;
        id
    }

    pub async fn row(&self, collection: &str, id: &str) -> Option<Item> {
        self.content
            .read_one(collection, id, &[])
            .await
            .expect("fixture read")
    }

    /// Send a JSON request and return the status and decoded body.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        caller: Caller,
    ) -> (StatusCode, Value) {
        json_request(&self.router, method, uri, body, caller).await
    }
}

/// Helper to make JSON requests.
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    caller: Caller,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    match caller {
        Caller::Anonymous => {}
        Caller::User(id) => {
            builder = builder.header(ACTOR_ID_HEADER, id.to_string());
        }
        Caller::Admin(id) => {
            builder = builder
                .header(ACTOR_ID_HEADER, id.to_string())
                .header(ACTOR_ROLE_HEADER, "admin");
        }
    }

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}
