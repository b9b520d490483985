//! Mutation endpoints: each drops references and sweeps what became orphaned.

mod common;

use axum::http::StatusCode;
use common::{Caller, TestServer};
use folio_content::collections::{
    ACCOUNT, ALBUM, ALBUM_PHOTO, ARTICLE, DIARY, DIARY_IMAGE, PROFILE,
};
use folio_content::ContentStore;
use serde_json::{Value, json};
use uuid::Uuid;

fn ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn test_profile_avatar_swap_deletes_previous_file() {
    let server = TestServer::new();
    let owner = server.account().await;
    let old = server.file(Some(owner));
    let new = server.file(Some(owner));
    let profile = server
        .insert(
            PROFILE,
            json!({ "account": owner.to_string(), "avatar_file": old.to_string() }),
        )
        .await;
    let profile_id = profile["id"].as_str().unwrap().to_string();

    let (status, body) = server
        .request(
            "PATCH",
            &format!("/v1/profiles/{profile_id}/avatar"),
            Some(json!({ "avatar": format!("https://cdn.example/api/v1/public/assets/{new}?w=256") })),
            Caller::User(owner),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["avatar"], json!(new.to_string()));
    assert_eq!(body["gc"]["candidates"], 1);
    assert_eq!(ids(&body["gc"]["deleted"]), vec![old.to_string()]);
    assert!(!server.exists(&old));
    assert!(server.exists(&new));

    let row = server.row(PROFILE, &profile_id).await.unwrap();
    assert_eq!(row["avatar_file"], json!(new.to_string()));
}

#[tokio::test]
async fn test_profile_avatar_requires_owner() {
    let server = TestServer::new();
    let owner = server.account().await;
    let old = server.file(Some(owner));
    let profile = server
        .insert(
            PROFILE,
            json!({ "account": owner.to_string(), "avatar_file": old.to_string() }),
        )
        .await;
    let uri = format!("/v1/profiles/{}/avatar", profile["id"].as_str().unwrap());

    let (status, _) = server
        .request("PATCH", &uri, Some(json!({ "avatar": null })), Caller::Anonymous)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = server
        .request(
            "PATCH",
            &uri,
            Some(json!({ "avatar": null })),
            Caller::User(Uuid::new_v4()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
    assert!(server.exists(&old));

    let (status, body) = server
        .request(
            "PATCH",
            &uri,
            Some(json!({ "avatar": null })),
            Caller::Admin(Uuid::new_v4()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["avatar"], Value::Null);
    assert!(!server.exists(&old));
}

#[tokio::test]
async fn test_avatar_rejects_non_file_values() {
    let server = TestServer::new();
    let owner = server.account().await;

    let (status, body) = server
        .request(
            "PATCH",
            &format!("/v1/accounts/{owner}/avatar"),
            Some(json!({ "avatar": "me.png" })),
            Caller::User(owner),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn test_missing_profile_is_not_found() {
    let server = TestServer::new();
    let (status, _) = server
        .request(
            "PATCH",
            &format!("/v1/profiles/{}/avatar", Uuid::new_v4()),
            Some(json!({ "avatar": null })),
            Caller::Admin(Uuid::new_v4()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clearing_account_avatar_keeps_file_shared_with_profile() {
    let server = TestServer::new();
    let owner = server.account().await;
    let shared = server.file(Some(owner));
    server
        .content
        .update_one(
            ACCOUNT,
            &owner.to_string(),
            json!({ "avatar": shared.to_string() })
                .as_object()
                .cloned()
                .unwrap(),
        )
        .await
        .unwrap();
    server
        .insert(
            PROFILE,
            json!({ "account": owner.to_string(), "avatar_file": shared.to_string().to_uppercase() }),
        )
        .await;

    let (status, body) = server
        .request(
            "PATCH",
            &format!("/v1/accounts/{owner}/avatar"),
            Some(json!({ "avatar": null })),
            Caller::User(owner),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["gc"]["candidates"], 1);
    assert!(ids(&body["gc"]["deleted"]).is_empty());
    assert!(server.exists(&shared));
}

#[tokio::test]
async fn test_delete_album_removes_cover_and_photos() {
    let server = TestServer::new();
    let owner = server.account().await;
    let p1 = server.file(Some(owner));
    let p2 = server.file(Some(owner));
    let album = server
        .insert(
            ALBUM,
            json!({ "title": "Trip", "author": owner.to_string(), "cover_file": p1.to_string() }),
        )
        .await;
    let album_id = album["id"].as_str().unwrap().to_string();
    for photo in [p1, p2] {
        server
            .insert(
                ALBUM_PHOTO,
                json!({ "album": album_id, "file_id": photo.to_string() }),
            )
            .await;
    }

    let (status, body) = server
        .request(
            "DELETE",
            &format!("/v1/albums/{album_id}"),
            None,
            Caller::User(owner),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["deleted"], true);
    assert_eq!(body["gc"]["candidates"], 2);
    assert!(!server.exists(&p1));
    assert!(!server.exists(&p2));
    assert_eq!(server.content.row_count(ALBUM_PHOTO).await, 0);
}

#[tokio::test]
async fn test_delete_article_keeps_cover_shared_with_another_article() {
    let server = TestServer::new();
    let owner = server.account().await;
    let cover = server.file(Some(owner));
    let first = server
        .insert(
            ARTICLE,
            json!({ "title": "One", "author": owner.to_string(), "cover_file": cover.to_string() }),
        )
        .await;
    server
        .insert(
            ARTICLE,
            json!({ "title": "Two", "author": owner.to_string(), "cover_file": cover.to_string().to_uppercase() }),
        )
        .await;

    let (status, body) = server
        .request(
            "DELETE",
            &format!("/v1/articles/{}", first["id"].as_str().unwrap()),
            None,
            Caller::User(owner),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert!(ids(&body["gc"]["deleted"]).is_empty());
    assert!(server.exists(&cover));
}

#[tokio::test]
async fn test_delete_diary_removes_images() {
    let server = TestServer::new();
    let owner = server.account().await;
    let image = server.file(Some(owner));
    let diary = server
        .insert(DIARY, json!({ "title": "Day 1", "author": owner.to_string() }))
        .await;
    let diary_id = diary["id"].as_str().unwrap().to_string();
    server
        .insert(
            DIARY_IMAGE,
            json!({ "diary": diary_id, "file_id": image.to_string() }),
        )
        .await;

    let (status, _) = server
        .request(
            "DELETE",
            &format!("/v1/diaries/{diary_id}"),
            None,
            Caller::User(owner),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(!server.exists(&image));
}

#[tokio::test]
async fn test_delete_by_non_author_is_forbidden() {
    let server = TestServer::new();
    let owner = server.account().await;
    let cover = server.file(Some(owner));
    let article = server
        .insert(
            ARTICLE,
            json!({ "title": "One", "author": owner.to_string(), "cover_file": cover.to_string() }),
        )
        .await;

    let (status, _) = server
        .request(
            "DELETE",
            &format!("/v1/articles/{}", article["id"].as_str().unwrap()),
            None,
            Caller::User(Uuid::new_v4()),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(server.exists(&cover));
    assert_eq!(server.content.row_count(ARTICLE).await, 1);
}

#[tokio::test]
async fn test_delete_missing_item_is_not_found() {
    let server = TestServer::new();
    let (status, body) = server
        .request(
            "DELETE",
            &format!("/v1/anime/{}", Uuid::new_v4()),
            None,
            Caller::Admin(Uuid::new_v4()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn test_dry_run_reports_without_deleting() {
    let server = TestServer::with_config(|config| config.gc.dry_run = true);
    let owner = server.account().await;
    let cover = server.file(Some(owner));
    let article = server
        .insert(
            ARTICLE,
            json!({ "title": "One", "author": owner.to_string(), "cover_file": cover.to_string() }),
        )
        .await;

    let (status, body) = server
        .request(
            "DELETE",
            &format!("/v1/articles/{}", article["id"].as_str().unwrap()),
            None,
            Caller::User(owner),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gc"]["dry_run"], true);
    assert_eq!(ids(&body["gc"]["orphans"]), vec![cover.to_string()]);
    assert!(ids(&body["gc"]["deleted"]).is_empty());
    assert!(server.exists(&cover));
}

#[tokio::test]
async fn test_account_deletion_sweeps_authored_files() {
    let server = TestServer::new();
    let admin = server.account().await;
    let user = server.account().await;
    let article_cover = server.file(Some(user));
    let album_cover = server.file(Some(user));
    let upload = server.file(Some(user));
    let admin_file = server.file(Some(admin));

    server
        .insert(
            ARTICLE,
            json!({ "title": "Hi", "author": user.to_string(), "cover_file": article_cover.to_string() }),
        )
        .await;
    server
        .insert(
            ALBUM,
            json!({ "title": "Pics", "author": user.to_string(), "cover_file": album_cover.to_string() }),
        )
        .await;
    // An article by someone else that the user last edited blocks the delete
    // until the reference is nulled.
    server
        .insert(
            ARTICLE,
            json!({ "title": "Theirs", "author": admin.to_string(), "updated_by": user.to_string(), "cover_file": admin_file.to_string() }),
        )
        .await;

    let (status, body) = server
        .request(
            "DELETE",
            &format!("/v1/accounts/{user}"),
            None,
            Caller::Admin(admin),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["account_id"], json!(user.to_string()));
    assert_eq!(body["nullified"], 1);
    let deleted = ids(&body["gc"]["deleted"]);
    for id in [article_cover, album_cover, upload] {
        assert!(deleted.contains(&id.to_string()), "{id} not deleted");
        assert!(!server.exists(&id));
    }
    assert!(server.exists(&admin_file));
    assert!(server.row(ACCOUNT, &user.to_string()).await.is_none());
}

#[tokio::test]
async fn test_account_deletion_rules() {
    let server = TestServer::new();
    let user = server.account().await;
    let other = server.account().await;

    let (status, body) = server
        .request(
            "DELETE",
            &format!("/v1/accounts/{user}"),
            None,
            Caller::User(user),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "self_deletion");

    let (status, _) = server
        .request(
            "DELETE",
            &format!("/v1/accounts/{other}"),
            None,
            Caller::User(user),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = server
        .request(
            "DELETE",
            &format!("/v1/accounts/{}", Uuid::new_v4()),
            None,
            Caller::Admin(user),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = server
        .request("DELETE", "/v1/accounts/not-a-uuid", None, Caller::Admin(user))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(server.row(ACCOUNT, &user.to_string()).await.is_some());
    assert!(server.row(ACCOUNT, &other.to_string()).await.is_some());
}
