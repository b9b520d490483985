//! Places where a file id may be stored as a scalar field.
//!
//! [`REFERENCE_TARGETS`] is the single source of truth for the structured
//! reference scan. A new asset-bearing field that is not registered here (or
//! through `gc.extra_reference_targets`) is invisible to the scanner, and the
//! sweeper will delete files it still points at.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A (collection, field) pair that may hold a file id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceTarget {
    pub collection: Cow<'static, str>,
    pub field: Cow<'static, str>,
}

impl ReferenceTarget {
    /// Create a target from static names.
    pub const fn new(collection: &'static str, field: &'static str) -> Self {
        Self {
            collection: Cow::Borrowed(collection),
            field: Cow::Borrowed(field),
        }
    }

    /// Create a target from owned names, e.g. from configuration.
    pub fn owned(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            collection: Cow::Owned(collection.into()),
            field: Cow::Owned(field.into()),
        }
    }

    /// Validate that both names are usable identifiers.
    pub fn validate(&self) -> crate::Result<()> {
        fn is_ident(s: &str) -> bool {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        if is_ident(&self.collection) && is_ident(&self.field) {
            Ok(())
        } else {
            Err(crate::Error::InvalidReferenceTarget(self.to_string()))
        }
    }
}

impl fmt::Display for ReferenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.collection, self.field)
    }
}

/// Every registered asset-bearing field.
pub const REFERENCE_TARGETS: &[ReferenceTarget] = &[
    ReferenceTarget::new("profile", "avatar_file"),
    ReferenceTarget::new("article", "cover_file"),
    ReferenceTarget::new("anime_entry", "cover_file"),
    ReferenceTarget::new("album", "cover_file"),
    ReferenceTarget::new("album_photo", "file_id"),
    ReferenceTarget::new("diary_image", "file_id"),
    ReferenceTarget::new("registration_request", "avatar_file"),
    // Account-level avatar, distinct from the profile avatar.
    ReferenceTarget::new("account", "avatar"),
];

/// The effective set of reference targets for one deployment.
#[derive(Clone, Debug)]
pub struct ReferenceRegistry {
    targets: Vec<ReferenceTarget>,
}

impl ReferenceRegistry {
    /// The built-in registry.
    pub fn standard() -> Self {
        Self {
            targets: REFERENCE_TARGETS.to_vec(),
        }
    }

    /// The built-in registry plus deployment-specific targets.
    /// Duplicates of built-in targets are ignored.
    pub fn with_extra(extra: &[ReferenceTarget]) -> Self {
        let mut registry = Self::standard();
        for target in extra {
            if !registry.targets.contains(target) {
                registry.targets.push(target.clone());
            }
        }
        registry
    }

    /// A registry with exactly these targets.
    pub fn from_targets(targets: Vec<ReferenceTarget>) -> Self {
        Self { targets }
    }

    pub fn targets(&self) -> &[ReferenceTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Default for ReferenceRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
