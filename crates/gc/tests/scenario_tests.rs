mod common;

use common::{Fixture, item};
use folio_content::{
    CollectionSchema, ContentStore, MemoryContentStore, OnDelete, Schema, collections::*,
};
use folio_core::FileIdSet;
use folio_core::config::GcConfig;
use folio_gc::CascadeError;
use folio_storage::MemoryAssetStore;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_avatar_swap_deletes_previous_avatar_only() {
    let fx = Fixture::new();
    let a = fx.file(None);
    let b = fx.file(None);
    fx.insert(PROFILE, json!({ "id": "p1", "avatar_file": a.to_string() }))
        .await;

    let candidates = fx.gc.collector().profile_avatar("p1").await;
    fx.content
        .update_one(PROFILE, "p1", item(json!({ "avatar_file": b.to_string() })))
        .await
        .unwrap();
    let report = fx.gc.sweep(&candidates).await;

    assert_eq!(report.deleted, FileIdSet::from([a]));
    assert!(!fx.exists(&a));
    assert!(fx.exists(&b));
}

#[tokio::test]
async fn test_avatar_still_used_by_account_is_kept() {
    let fx = Fixture::new();
    let shared = fx.file(None);
    let account = fx.account().await;
    fx.content
        .update_one(
            ACCOUNT,
            &account.to_string(),
            item(json!({ "avatar": shared.to_string() })),
        )
        .await
        .unwrap();
    fx.insert(PROFILE, json!({ "id": "p1", "avatar_file": shared.to_string() }))
        .await;

    let candidates = fx.gc.collector().profile_avatar("p1").await;
    fx.content
        .update_one(PROFILE, "p1", item(json!({ "avatar_file": null })))
        .await
        .unwrap();
    let report = fx.gc.sweep(&candidates).await;

    assert!(report.deleted.is_empty());
    assert!(fx.exists(&shared));
}

#[tokio::test]
async fn test_album_delete_removes_cover_and_photos() {
    let fx = Fixture::new();
    let p1 = fx.file(None);
    let p2 = fx.file(None);
    fx.insert(ALBUM, json!({ "id": "al1", "cover_file": p1.to_string() }))
        .await;
    fx.insert(ALBUM_PHOTO, json!({ "album": "al1", "file_id": p1.to_string() }))
        .await;
    fx.insert(ALBUM_PHOTO, json!({ "album": "al1", "file_id": p2.to_string() }))
        .await;

    let candidates = fx.gc.collector().album("al1").await;
    assert_eq!(candidates, FileIdSet::from([p1, p2]));
    fx.content.delete_one(ALBUM, "al1").await.unwrap();
    let report = fx.gc.sweep(&candidates).await;

    assert_eq!(report.deleted, FileIdSet::from([p1, p2]));
    assert_eq!(fx.content.row_count(ALBUM_PHOTO).await, 0);
}

#[tokio::test]
async fn test_article_cover_shared_with_another_article_is_kept() {
    let fx = Fixture::new();
    let cover = fx.file(None);
    fx.insert(ARTICLE, json!({ "id": "a1", "cover_file": cover.to_string() }))
        .await;
    fx.insert(ARTICLE, json!({ "id": "a2", "cover_file": cover.to_string().to_uppercase() }))
        .await;

    let candidates = fx.gc.collector().article("a1").await;
    fx.content.delete_one(ARTICLE, "a1").await.unwrap();
    let report = fx.gc.sweep(&candidates).await;

    assert!(report.deleted.is_empty());
    assert!(fx.exists(&cover));
}

#[tokio::test]
async fn test_diary_delete_removes_its_images() {
    let fx = Fixture::new();
    let img = fx.file(None);
    fx.insert(DIARY, json!({ "id": "d1" })).await;
    fx.insert(DIARY_IMAGE, json!({ "diary": "d1", "file_id": img.to_string() }))
        .await;

    let candidates = fx.gc.collector().diary("d1").await;
    fx.content.delete_one(DIARY, "d1").await.unwrap();
    let report = fx.gc.sweep(&candidates).await;

    assert_eq!(report.deleted, FileIdSet::from([img]));
}

#[tokio::test]
async fn test_settings_patch_removing_banner_used_as_avatar_keeps_it() {
    let fx = Fixture::new();
    let x = fx.file(None);
    let y = fx.file(None);
    fx.insert(PROFILE, json!({ "avatar_file": x.to_string() })).await;
    let before = fx
        .settings
        .patch(
            "site",
            &json!({ "banner": [x.to_string(), y.to_string()] }),
            None,
        )
        .await
        .unwrap();

    let after = fx
        .settings
        .patch("site", &json!({ "banner": [] }), None)
        .await
        .unwrap();
    let candidates = fx.gc.collector().settings_patch(&before.value, &after.value);
    assert_eq!(candidates, FileIdSet::from([x, y]));
    let report = fx.gc.sweep(&candidates).await;

    assert_eq!(report.deleted, FileIdSet::from([y]));
    assert!(fx.exists(&x));
}

#[tokio::test]
async fn test_settings_patch_never_proposes_new_ids() {
    let fx = Fixture::new();
    let added = fx.file(None);
    let before = json!({ "favicon": null });
    let after = json!({ "favicon": added.to_string() });
    assert!(fx.gc.collector().settings_patch(&before, &after).is_empty());
}

#[tokio::test]
async fn test_account_deletion_sweeps_authored_covers() {
    let fx = Fixture::new();
    let owner = fx.account().await;
    let reviewer = fx.account().await;
    let y = fx.file(None);
    let z = fx.file(None);
    let photo = fx.file(None);
    let upload = fx.file(Some(owner));
    let foreign = fx.file(Some(reviewer));
    let owner_id = owner.to_string();

    fx.insert(
        ARTICLE,
        json!({ "author": owner_id, "updated_by": owner_id, "cover_file": y.to_string() }),
    )
    .await;
    fx.insert(
        ALBUM,
        json!({ "id": "al1", "author": owner_id, "cover_file": z.to_string() }),
    )
    .await;
    fx.insert(ALBUM_PHOTO, json!({ "album": "al1", "file_id": photo.to_string() }))
        .await;
    // Rows owned by someone else that point at the account through restrict columns.
    fx.insert(
        ARTICLE,
        json!({ "author": reviewer.to_string(), "updated_by": owner_id }),
    )
    .await;
    fx.insert(
        NOTIFICATION,
        json!({ "recipient": reviewer.to_string(), "sender": owner_id }),
    )
    .await;

    let outcome = fx.gc.delete_account(Some(reviewer), owner).await.unwrap();

    assert_eq!(outcome.nullified, 3);
    assert_eq!(outcome.gc.deleted, FileIdSet::from([y, z, photo, upload]));
    assert!(fx.exists(&foreign));
    assert_eq!(fx.content.row_count(ACCOUNT).await, 1);
    assert_eq!(fx.content.row_count(ARTICLE).await, 1);
    assert_eq!(fx.content.row_count(NOTIFICATION).await, 1);
}

#[tokio::test]
async fn test_account_deletion_keeps_files_referenced_elsewhere() {
    let fx = Fixture::new();
    let owner = fx.account().await;
    let cover = fx.file(None);
    fx.insert(
        ARTICLE,
        json!({ "author": owner.to_string(), "cover_file": cover.to_string() }),
    )
    .await;
    fx.settings
        .patch("site", &json!({ "hero": cover.to_string() }), None)
        .await
        .unwrap();

    let outcome = fx.gc.delete_account(None, owner).await.unwrap();

    assert!(outcome.gc.deleted.is_empty());
    assert!(fx.exists(&cover));
}

#[tokio::test]
async fn test_account_cannot_delete_itself() {
    let fx = Fixture::new();
    let owner = fx.account().await;
    let avatar = fx.file(Some(owner));

    let err = fx.gc.delete_account(Some(owner), owner).await.unwrap_err();

    assert!(matches!(err, CascadeError::SelfDeletion));
    assert_eq!(fx.content.row_count(ACCOUNT).await, 1);
    assert!(fx.exists(&avatar));
}

#[tokio::test]
async fn test_missing_account_is_not_found() {
    let fx = Fixture::new();
    let missing = Uuid::new_v4();
    let err = fx.gc.delete_account(None, missing).await.unwrap_err();
    assert!(matches!(err, CascadeError::NotFound(id) if id == missing));
}

#[tokio::test]
async fn test_failed_delete_is_returned_and_nothing_is_swept() {
    // A read-only restrict column cannot be nulled, so the delete is refused.
    let schema = Schema::platform().with_collection(
        CollectionSchema::new(NOTIFICATION)
            .field("message")
            .relation("recipient", ACCOUNT, OnDelete::Cascade)
            .relation("sender", ACCOUNT, OnDelete::Restrict)
            .read_only("sender"),
    );
    let fx = Fixture::from_parts(
        Arc::new(MemoryContentStore::new(schema)),
        Arc::new(MemoryAssetStore::new()),
        GcConfig::default(),
    );
    let owner = fx.account().await;
    let other = fx.account().await;
    let upload = fx.file(Some(owner));
    fx.insert(
        NOTIFICATION,
        json!({ "recipient": other.to_string(), "sender": owner.to_string() }),
    )
    .await;

    let err = fx.gc.delete_account(None, owner).await.unwrap_err();

    assert!(matches!(err, CascadeError::Store(_)));
    assert!(fx.exists(&upload));
    let account = fx
        .content
        .read_one(ACCOUNT, &owner.to_string(), &[])
        .await
        .unwrap();
    assert!(account.is_some());
    assert_ne!(account.unwrap()["id"], Value::Null);
}
