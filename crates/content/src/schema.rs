//! Collection schema for the in-memory backend.
//!
//! Mirrors the relational layout the remote content store enforces: which
//! fields exist, which cannot be written, and what happens to referencing
//! rows when a row is deleted.

use std::collections::{BTreeMap, BTreeSet};

/// Collection names used across the platform.
pub mod collections {
    pub const ACCOUNT: &str = "account";
    pub const PROFILE: &str = "profile";
    pub const ARTICLE: &str = "article";
    pub const ANIME_ENTRY: &str = "anime_entry";
    pub const ALBUM: &str = "album";
    pub const ALBUM_PHOTO: &str = "album_photo";
    pub const DIARY: &str = "diary";
    pub const DIARY_IMAGE: &str = "diary_image";
    pub const REGISTRATION_REQUEST: &str = "registration_request";
    pub const NOTIFICATION: &str = "notification";
    pub const SITE_CONFIG: &str = "site_config";
}

/// Foreign-key action applied when the referenced row is deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the referencing row too.
    Cascade,
    /// Refuse the delete while a referencing row survives it.
    Restrict,
    /// Null the referencing field.
    SetNull,
}

/// A foreign key from `field` to the `id` of `target`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    pub field: String,
    pub target: String,
    pub on_delete: OnDelete,
}

/// Fields and relations of one collection. `id` is implicit.
#[derive(Clone, Debug)]
pub struct CollectionSchema {
    pub name: String,
    fields: BTreeSet<String>,
    read_only: BTreeSet<String>,
    relations: Vec<Relation>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeSet::from(["id".to_string()]),
            read_only: BTreeSet::new(),
            relations: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str) -> Self {
        self.fields.insert(name.to_string());
        self
    }

    pub fn relation(mut self, field: &str, target: &str, on_delete: OnDelete) -> Self {
        self.fields.insert(field.to_string());
        self.relations.push(Relation {
            field: field.to_string(),
            target: target.to_string(),
            on_delete,
        });
        self
    }

    /// Mark an existing field as not writable through updates.
    pub fn read_only(mut self, field: &str) -> Self {
        self.read_only.insert(field.to_string());
        self
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn is_writable(&self, field: &str) -> bool {
        self.has_field(field) && !self.read_only.contains(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

/// A set of collections.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    collections: BTreeMap<String, CollectionSchema>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// The platform's default layout.
    pub fn platform() -> Self {
        use collections::*;
        use OnDelete::*;

        let authored = |name: &str| {
            CollectionSchema::new(name)
                .field("title")
                .field("cover_file")
                .relation("author", ACCOUNT, Cascade)
                .relation("updated_by", ACCOUNT, Restrict)
        };

        Self::new()
            .with_collection(
                CollectionSchema::new(ACCOUNT)
                    .field("email")
                    .field("display_name")
                    .field("avatar"),
            )
            .with_collection(
                CollectionSchema::new(PROFILE)
                    .field("bio")
                    .field("avatar_file")
                    .relation("account", ACCOUNT, Cascade),
            )
            .with_collection(authored(ARTICLE).field("body"))
            .with_collection(authored(ANIME_ENTRY).field("rating"))
            .with_collection(authored(ALBUM))
            .with_collection(
                CollectionSchema::new(ALBUM_PHOTO)
                    .field("file_id")
                    .field("caption")
                    .relation("album", ALBUM, Cascade),
            )
            .with_collection(
                CollectionSchema::new(DIARY)
                    .field("title")
                    .field("body")
                    .relation("author", ACCOUNT, Cascade)
                    .relation("updated_by", ACCOUNT, Restrict),
            )
            .with_collection(
                CollectionSchema::new(DIARY_IMAGE)
                    .field("file_id")
                    .relation("diary", DIARY, Cascade),
            )
            .with_collection(
                CollectionSchema::new(REGISTRATION_REQUEST)
                    .field("email")
                    .field("status")
                    .field("avatar_file")
                    .relation("approved_account", ACCOUNT, SetNull)
                    .relation("reviewed_by", ACCOUNT, Restrict),
            )
            .with_collection(
                CollectionSchema::new(NOTIFICATION)
                    .field("message")
                    .relation("recipient", ACCOUNT, Cascade)
                    .relation("sender", ACCOUNT, Restrict),
            )
            .with_collection(
                CollectionSchema::new(SITE_CONFIG)
                    .field("key")
                    .field("value")
                    .relation("updated_by", ACCOUNT, Restrict),
            )
    }

    /// Add or replace a collection.
    pub fn with_collection(mut self, collection: CollectionSchema) -> Self {
        self.collections.insert(collection.name.clone(), collection);
        self
    }

    /// Remove a collection, e.g. to model a deployment without it.
    pub fn without_collection(mut self, name: &str) -> Self {
        self.collections.remove(name);
        self
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSchema> {
        self.collections.get(name)
    }

    pub fn collections(&self) -> impl Iterator<Item = &CollectionSchema> {
        self.collections.values()
    }

    /// Every (collection, relation) pointing at `target`.
    pub fn referencing<'a>(
        &'a self,
        target: &'a str,
    ) -> impl Iterator<Item = (&'a CollectionSchema, &'a Relation)> + 'a {
        self.collections.values().flat_map(move |c| {
            c.relations
                .iter()
                .filter(move |r| r.target == target)
                .map(move |r| (c, r))
        })
    }
}
