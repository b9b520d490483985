//! Row filters and read queries.
//!
//! Filters serialize to the JSON filter syntax of the remote content API
//! (`{"field": {"_in": [...]}}`) and are evaluated directly by the in-memory
//! backend.

use folio_core::FileId;
use serde_json::{Map, Value, json};

/// One row of a collection.
pub type Item = Map<String, Value>;

/// Row filter.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// `field == value`.
    Eq { field: String, value: Value },
    /// `field` is one of `values`.
    In { field: String, values: Vec<Value> },
    /// `field` is a string containing `value`, ignoring case.
    Contains { field: String, value: String },
    /// `field IS NULL` when `null` is true, `IS NOT NULL` otherwise.
    IsNull { field: String, null: bool },
    /// Every sub-filter matches.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
            null: true,
        }
    }

    pub fn not_null(field: impl Into<String>) -> Self {
        Self::IsNull {
            field: field.into(),
            null: false,
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    /// Render in the remote API's JSON filter syntax.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Eq { field, value } => json!({ field.as_str(): { "_eq": value } }),
            Self::In { field, values } => json!({ field.as_str(): { "_in": values } }),
            Self::Contains { field, value } => json!({ field.as_str(): { "_icontains": value } }),
            Self::IsNull { field, null: true } => json!({ field.as_str(): { "_null": true } }),
            Self::IsNull { field, null: false } => json!({ field.as_str(): { "_nnull": true } }),
            Self::And(filters) => {
                json!({ "_and": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Self::Or(filters) => {
                json!({ "_or": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
        }
    }

    /// Every field name the filter touches.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::Eq { field, .. }
            | Self::In { field, .. }
            | Self::Contains { field, .. }
            | Self::IsNull { field, .. } => vec![field.as_str()],
            Self::And(filters) | Self::Or(filters) => {
                filters.iter().flat_map(Filter::fields).collect()
            }
        }
    }

    /// Evaluate against a row. Absent fields read as null.
    pub fn matches(&self, item: &Item) -> bool {
        let get = |field: &str| item.get(field).unwrap_or(&Value::Null);
        match self {
            Self::Eq { field, value } => values_equal(get(field), value),
            Self::In { field, values } => {
                let actual = get(field);
                values.iter().any(|v| values_equal(actual, v))
            }
            Self::Contains { field, value } => get(field)
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(&value.to_lowercase())),
            Self::IsNull { field, null } => get(field).is_null() == *null,
            Self::And(filters) => filters.iter().all(|f| f.matches(item)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(item)),
        }
    }
}

/// Equality as a UUID-typed column sees it: two strings holding the same
/// UUID compare equal regardless of case.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => {
            x == y
                || matches!(
                    (FileId::parse(x), FileId::parse(y)),
                    (Ok(l), Ok(r)) if l == r
                )
        }
        _ => a == b,
    }
}

/// Read query for one collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Filter>,
    /// Projected fields. Empty means every field.
    pub fields: Vec<String>,
    /// Maximum rows returned. `None` means no limit.
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Project a full row down to the requested fields.
    pub fn project(&self, item: &Item) -> Item {
        if self.fields.is_empty() || self.fields.iter().any(|f| f == "*") {
            return item.clone();
        }
        self.fields
            .iter()
            .map(|f| (f.clone(), item.get(f).cloned().unwrap_or(Value::Null)))
            .collect()
    }
}
