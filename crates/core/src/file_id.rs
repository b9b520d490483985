//! Asset identifiers and the normalizer that canonicalizes them.
//!
//! The same stored file shows up in several shapes: a bare UUID, an object
//! carrying an `id`, or an asset URL a client rendered earlier and pasted
//! back. All of them must resolve to the same [`FileId`], otherwise the
//! reference scanners under-count and live files get deleted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

/// A set of file ids. Ordered so sweeps iterate and log deterministically.
pub type FileIdSet = BTreeSet<FileId>;

/// Route segments that precede a file id in asset URLs.
pub const ASSET_ROUTE_SEGMENTS: &[&str] = &["/assets/", "/files/"];

static UUID_EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("valid uuid regex")
});

static UUID_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("valid uuid regex")
});

/// UUID-shaped substrings of `s` that are not part of a longer hex run.
fn uuid_matches(s: &str) -> impl Iterator<Item = regex::Match<'_>> {
    let bytes = s.as_bytes();
    UUID_ANYWHERE.find_iter(s).filter(move |m| {
        let before = m.start().checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(m.end()).copied();
        !before.is_some_and(|b| b.is_ascii_hexdigit())
            && !after.is_some_and(|b| b.is_ascii_hexdigit())
    })
}

/// Identifier of one immutable stored binary object.
///
/// Displays in canonical form: lowercase, hyphenated.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(Uuid);

impl FileId {
    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh random id.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse a strictly hyphenated UUID, case-insensitively.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let trimmed = s.trim();
        if !UUID_EXACT.is_match(trimmed) {
            return Err(crate::Error::InvalidFileId(s.to_string()));
        }
        Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|_| crate::Error::InvalidFileId(s.to_string()))
    }
}

impl fmt::Debug for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for FileId {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.to_string()
    }
}

impl From<Uuid> for FileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Canonicalize an arbitrary JSON value into a file id.
///
/// Rules, in order: null or empty string yields `None`; a bare UUID string is
/// accepted as-is; an object with a string `id` is normalized through that
/// id; any other string is searched for UUID substrings. Everything else
/// yields `None`.
pub fn normalize(value: &Value) -> Option<FileId> {
    match value {
        Value::Null => None,
        Value::String(s) => normalize_str(s),
        Value::Object(map) => match map.get("id") {
            Some(id @ Value::String(_)) => normalize(id),
            _ => None,
        },
        _ => None,
    }
}

/// Canonicalize a string into a file id.
///
/// Bare UUIDs match directly. Otherwise the string is scanned for UUID
/// substrings, preferring one that directly follows an asset route segment
/// such as `/assets/`, falling back to the first UUID found.
pub fn normalize_str(s: &str) -> Option<FileId> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if UUID_EXACT.is_match(trimmed) {
        return FileId::parse(trimmed).ok();
    }

    let mut first = None;
    for m in uuid_matches(trimmed) {
        let Ok(id) = FileId::parse(m.as_str()) else {
            continue;
        };
        let prefix = &trimmed[..m.start()];
        if ASSET_ROUTE_SEGMENTS
            .iter()
            .any(|segment| prefix.ends_with(segment))
        {
            return Some(id);
        }
        first.get_or_insert(id);
    }
    first
}

/// Extract every UUID substring of `s` as a file id.
///
/// Used when walking free-form documents, where a string may embed several
/// assets (e.g. inline HTML) and any of them counts as a reference.
pub fn extract_file_ids(s: &str) -> Vec<FileId> {
    uuid_matches(s)
        .filter_map(|m| FileId::parse(m.as_str()).ok())
        .collect()
}
