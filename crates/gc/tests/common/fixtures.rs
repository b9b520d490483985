use folio_content::{ContentSettingsStore, ContentStore, Item, MemoryContentStore, SettingsStore};
use folio_core::FileId;
use folio_core::config::GcConfig;
use folio_gc::AssetGc;
use folio_storage::{AssetStore, MemoryAssetStore};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Convert a JSON object literal into a row.
pub fn item(value: Value) -> Item {
    value.as_object().cloned().expect("fixture rows are objects")
}

/// In-memory stores wired into a collector.
#[allow(dead_code)]
pub struct Fixture {
    pub content: Arc<MemoryContentStore>,
    pub assets: Arc<MemoryAssetStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub gc: AssetGc,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    pub fn with_config(config: GcConfig) -> Self {
        let content = Arc::new(MemoryContentStore::platform());
        let assets = Arc::new(MemoryAssetStore::new());
        Self::from_parts(content, assets, config)
    }

    pub fn from_parts(
        content: Arc<MemoryContentStore>,
        assets: Arc<MemoryAssetStore>,
        config: GcConfig,
    ) -> Self {
        let settings: Arc<dyn SettingsStore> =
            Arc::new(ContentSettingsStore::new(content.clone()));
        let gc = AssetGc::new(content.clone(), assets.clone(), settings.clone(), &config);
        Self {
            content,
            assets,
            settings,
            gc,
        }
    }

    /// Store a new file, optionally recording its uploader.
    pub fn file(&self, uploaded_by: Option<Uuid>) -> FileId {
        let id = FileId::new_v4();
        self.assets.insert(id, uploaded_by);
        id
    }

    pub async fn insert(&self, collection: &str, row: Value) -> Item {
        self.content
            .create_one(collection, item(row))
            .await
            .expect("fixture insert")
    }

    pub async fn account(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.insert(
            folio_content::collections::ACCOUNT,
            serde_json::json!({ "id": id.to_string(), "email": format!("{id}@example.com") }),
        )
        .await;
        id
    }

    pub fn exists(&self, id: &FileId) -> bool {
        self.assets.contains(id)
    }

    pub async fn delete_file_directly(&self, id: &FileId) {
        self.assets.delete_file(id).await.expect("memory delete");
    }
}
