//! Candidate collection.
//!
//! Each collector reads the pre-mutation state of one entity and returns the
//! file ids that may become orphaned once the mutation lands. Collectors
//! never fail: a sub-query that errors contributes nothing and is logged,
//! because fewer candidates only means fewer deletions.

use folio_content::{ContentResult, ContentStore, Filter, Item, Query, collections::*};
use folio_core::{FileIdSet, embedded_file_ids, normalize};
use folio_storage::{AssetStore, ListingOptions};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Gathers candidate file ids per mutation scenario.
#[derive(Clone)]
pub struct CandidateCollector {
    content: Arc<dyn ContentStore>,
    assets: Arc<dyn AssetStore>,
    page_size: usize,
    max_config_depth: usize,
}

impl CandidateCollector {
    pub fn new(
        content: Arc<dyn ContentStore>,
        assets: Arc<dyn AssetStore>,
        page_size: usize,
        max_config_depth: usize,
    ) -> Self {
        Self {
            content,
            assets,
            page_size: page_size.max(1),
            max_config_depth,
        }
    }

    /// The profile's current avatar, before it is swapped or cleared.
    pub async fn profile_avatar(&self, profile_id: &str) -> FileIdSet {
        or_empty(
            "profile.avatar_file",
            self.own_field(PROFILE, profile_id, "avatar_file").await,
        )
    }

    /// The account-level avatar, before it is swapped or cleared.
    pub async fn account_avatar(&self, account_id: &str) -> FileIdSet {
        or_empty(
            "account.avatar",
            self.own_field(ACCOUNT, account_id, "avatar").await,
        )
    }

    /// The article's cover.
    pub async fn article(&self, article_id: &str) -> FileIdSet {
        or_empty(
            "article.cover_file",
            self.own_field(ARTICLE, article_id, "cover_file").await,
        )
    }

    /// The anime entry's cover.
    pub async fn anime_entry(&self, entry_id: &str) -> FileIdSet {
        or_empty(
            "anime_entry.cover_file",
            self.own_field(ANIME_ENTRY, entry_id, "cover_file").await,
        )
    }

    /// The album's cover and every photo under it.
    pub async fn album(&self, album_id: &str) -> FileIdSet {
        let (cover, photos) = futures::join!(
            self.own_field(ALBUM, album_id, "cover_file"),
            self.field_values(ALBUM_PHOTO, Filter::eq("album", album_id), "file_id"),
        );
        let mut ids = or_empty("album.cover_file", cover);
        ids.extend(or_empty("album_photo.file_id", photos));
        ids
    }

    /// Every image under the diary.
    pub async fn diary(&self, diary_id: &str) -> FileIdSet {
        or_empty(
            "diary_image.file_id",
            self.field_values(DIARY_IMAGE, Filter::eq("diary", diary_id), "file_id")
                .await,
        )
    }

    /// Everything owned by or uploaded by the account.
    pub async fn account(&self, account_id: &Uuid) -> FileIdSet {
        let id = account_id.to_string();
        let by_author = || Filter::eq("author", id.as_str());

        let (profiles, avatar, articles, anime, registrations, uploads) = futures::join!(
            self.field_values(PROFILE, Filter::eq("account", id.as_str()), "avatar_file"),
            self.own_field(ACCOUNT, &id, "avatar"),
            self.field_values(ARTICLE, by_author(), "cover_file"),
            self.field_values(ANIME_ENTRY, by_author(), "cover_file"),
            self.field_values(
                REGISTRATION_REQUEST,
                Filter::eq("approved_account", id.as_str()),
                "avatar_file"
            ),
            self.uploaded_by(account_id),
        );
        let (albums, diaries) = futures::join!(self.album_files(&id), self.diary_files(&id));

        let mut ids = FileIdSet::new();
        ids.extend(or_empty("profile.avatar_file", profiles));
        ids.extend(or_empty("account.avatar", avatar));
        ids.extend(or_empty("article.cover_file", articles));
        ids.extend(or_empty("anime_entry.cover_file", anime));
        ids.extend(or_empty("registration_request.avatar_file", registrations));
        ids.extend(albums);
        ids.extend(diaries);
        ids.extend(uploads);
        debug!(account_id = %account_id, candidates = ids.len(), "Collected account candidates");
        ids
    }

    /// File ids present in `before` and absent from `after`.
    ///
    /// Ids only present in `after` are never candidates. When either
    /// document exceeds the depth bound the diff is unknown and nothing is
    /// proposed.
    pub fn settings_patch(&self, before: &Value, after: &Value) -> FileIdSet {
        match (self.embedded(before, "before"), self.embedded(after, "after")) {
            (Some(before_ids), Some(after_ids)) => {
                before_ids.difference(&after_ids).copied().collect()
            }
            _ => FileIdSet::new(),
        }
    }

    fn embedded(&self, doc: &Value, label: &str) -> Option<FileIdSet> {
        match embedded_file_ids(doc, self.max_config_depth) {
            Ok((ids, _)) => Some(ids),
            Err(e) => {
                warn!(
                    document = label,
                    max_depth = self.max_config_depth,
                    error = %e,
                    "Cannot diff configuration document, proposing no candidates"
                );
                None
            }
        }
    }

    async fn album_files(&self, account_id: &str) -> FileIdSet {
        let albums = match self
            .read_all(ALBUM, Filter::eq("author", account_id), &["id", "cover_file"])
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log_skipped("album", &e);
                return FileIdSet::new();
            }
        };
        let mut ids: FileIdSet = albums
            .iter()
            .filter_map(|row| row.get("cover_file").and_then(normalize))
            .collect();
        let album_ids = row_ids(&albums);
        if !album_ids.is_empty() {
            ids.extend(or_empty(
                "album_photo.file_id",
                self.field_values(ALBUM_PHOTO, Filter::is_in("album", album_ids), "file_id")
                    .await,
            ));
        }
        ids
    }

    async fn diary_files(&self, account_id: &str) -> FileIdSet {
        let diaries = match self
            .read_all(DIARY, Filter::eq("author", account_id), &["id"])
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                log_skipped("diary", &e);
                return FileIdSet::new();
            }
        };
        let diary_ids = row_ids(&diaries);
        if diary_ids.is_empty() {
            return FileIdSet::new();
        }
        or_empty(
            "diary_image.file_id",
            self.field_values(DIARY_IMAGE, Filter::is_in("diary", diary_ids), "file_id")
                .await,
        )
    }

    async fn uploaded_by(&self, account_id: &Uuid) -> FileIdSet {
        match self
            .assets
            .list_files_uploaded_by(account_id, ListingOptions::new(self.page_size))
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    account_id = %account_id,
                    error = %e,
                    "Failed to list uploaded files, skipping"
                );
                FileIdSet::new()
            }
        }
    }

    /// The normalized value of `field` on one row. Missing row yields empty.
    async fn own_field(&self, collection: &str, id: &str, field: &str) -> ContentResult<FileIdSet> {
        let row = self.content.read_one(collection, id, &[field]).await?;
        Ok(row
            .and_then(|row| row.get(field).and_then(normalize))
            .into_iter()
            .collect())
    }

    /// Normalized values of `field` over every row matching `filter`.
    async fn field_values(
        &self,
        collection: &str,
        filter: Filter,
        field: &str,
    ) -> ContentResult<FileIdSet> {
        let rows = self.read_all(collection, filter, &[field]).await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get(field).and_then(normalize))
            .collect())
    }

    async fn read_all(
        &self,
        collection: &str,
        filter: Filter,
        fields: &[&str],
    ) -> ContentResult<Vec<Item>> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let query = Query::new()
                .filter(filter.clone())
                .fields(fields.iter().copied())
                .limit(self.page_size)
                .offset(offset);
            let page = self.content.read_many(collection, &query).await?;
            let fetched = page.len();
            rows.extend(page);
            if fetched < self.page_size {
                return Ok(rows);
            }
            offset += fetched;
        }
    }
}

fn row_ids(rows: &[Item]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

fn log_skipped(relation: &str, error: &folio_content::ContentError) {
    if error.is_soft() {
        debug!(relation, error = %error, "Candidate relation unavailable, skipping");
    } else {
        warn!(relation, error = %error, "Candidate query failed, skipping");
    }
}

fn or_empty(relation: &str, result: ContentResult<FileIdSet>) -> FileIdSet {
    result.unwrap_or_else(|e| {
        log_skipped(relation, &e);
        FileIdSet::new()
    })
}
