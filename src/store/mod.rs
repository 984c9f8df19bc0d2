// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Remote store contract
//!
//! The core reads and writes two entity kinds, meal records and favorite
//! entries, through [`RemoteStore`]. Rows travel as JSON objects because the
//! stored shapes are looser than the canonical types; the repository is the
//! parsing boundary.

pub mod memory;
pub mod rest;

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::future::Future;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// A raw row as stored remotely
pub type Row = serde_json::Map<String, Value>;

/// Entity kinds the core touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    /// Meal records
    Menus,
    /// Favorite entries
    Favorites,
}

impl Entity {
    /// Remote table name
    #[must_use]
    pub fn table(&self) -> &'static str {
        match self {
            Self::Menus => "menus",
            Self::Favorites => "favorites",
        }
    }
}

/// Predicate on a single field
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value
    Eq(String, Value),
    /// Field is greater than or equal to value
    Gte(String, Value),
    /// Field is less than or equal to value
    Lte(String, Value),
    /// Field equals one of the values in an array
    In(String, Value),
}

impl Filter {
    /// Equality predicate
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::Eq(field.to_string(), value.into())
    }

    /// Lower bound, inclusive
    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::Gte(field.to_string(), value.into())
    }

    /// Upper bound, inclusive
    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::Lte(field.to_string(), value.into())
    }

    /// Membership predicate
    pub fn in_list<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(
            field.to_string(),
            Value::Array(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Field the predicate applies to
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Eq(field, _) | Self::Gte(field, _) | Self::Lte(field, _) | Self::In(field, _) => {
                field
            }
        }
    }

    /// Value the predicate compares against
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            Self::Eq(_, value) | Self::Gte(_, value) | Self::Lte(_, value) | Self::In(_, value) => {
                value
            }
        }
    }

    /// Evaluate the predicate against a row; a missing field never matches
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(self.field()) else {
            return false;
        };
        if let Self::In(_, Value::Array(values)) = self {
            return values
                .iter()
                .any(|v| compare_values(actual, v) == Ordering::Equal);
        }
        let ordering = compare_values(actual, self.value());
        match self {
            Self::Eq(..) | Self::In(..) => ordering == Ordering::Equal,
            Self::Gte(..) => ordering != Ordering::Less,
            Self::Lte(..) => ordering != Ordering::Greater,
        }
    }
}

/// Compare two stored values.
///
/// Numbers compare numerically, everything else by its text form, which keeps
/// `YYYY-MM-DD` dates and RFC 3339 timestamps in calendar order and lets a
/// numeric id match its string spelling.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    value_text(a).cmp(&value_text(b))
}

/// Text form of a stored value: strings unquoted, everything else as JSON
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field to sort on
    pub field: String,
    /// Ascending when true
    pub ascending: bool,
}

/// A read against one entity
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Entity to read
    pub entity: Entity,
    /// Predicates combined with AND
    pub filters: Vec<Filter>,
    /// Optional ordering
    pub order: Option<Order>,
    /// Optional row cap
    pub limit: Option<usize>,
}

impl Query {
    /// Unfiltered read of an entity
    #[must_use]
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    /// Add a predicate
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Sort the result
    #[must_use]
    pub fn order_by(mut self, field: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            field: field.to_string(),
            ascending,
        });
        self
    }

    /// Cap the number of rows
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Read/write access to the remote rows.
///
/// Implementations must classify failures (see [`StoreError::kind`]) so
/// callers can tell a permission problem from a transient one.
pub trait RemoteStore: Send + Sync {
    /// Rows of `query.entity` matching every filter, in store order unless an
    /// ordering is requested
    fn query(&self, query: &Query) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;

    /// Insert one row and return it as stored
    fn insert(&self, entity: Entity, row: Row)
        -> impl Future<Output = Result<Row, StoreError>> + Send;

    /// Delete every row matching all filters and return how many went away
    fn delete(
        &self,
        entity: Entity,
        filters: &[Filter],
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;
}

/// The store chosen by configuration
#[derive(Debug)]
pub enum Backend {
    /// Remote HTTP store
    Rest(RestStore),
    /// Local JSON-backed store
    Memory(MemoryStore),
}

impl RemoteStore for Backend {
    async fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        match self {
            Self::Rest(store) => store.query(query).await,
            Self::Memory(store) => store.query(query).await,
        }
    }

    async fn insert(&self, entity: Entity, row: Row) -> Result<Row, StoreError> {
        match self {
            Self::Rest(store) => store.insert(entity, row).await,
            Self::Memory(store) => store.insert(entity, row).await,
        }
    }

    async fn delete(&self, entity: Entity, filters: &[Filter]) -> Result<u64, StoreError> {
        match self {
            Self::Rest(store) => store.delete(entity, filters).await,
            Self::Memory(store) => store.delete(entity, filters).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn test_date_range_filters() {
        let r = row(json!({"date": "2026-01-15"}));

        assert!(Filter::gte("date", "2026-01-01").matches(&r));
        assert!(Filter::lte("date", "2026-01-15").matches(&r));
        assert!(!Filter::lte("date", "2026-01-14").matches(&r));
    }

    #[test]
    fn test_numeric_id_matches_string() {
        let r = row(json!({"id": 7}));

        assert!(Filter::eq("id", "7").matches(&r));
        assert!(Filter::eq("id", 7).matches(&r));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let r = row(json!({"city": "İstanbul"}));

        assert!(!Filter::eq("date", "2026-01-01").matches(&r));
    }

    #[test]
    fn test_in_list_filter() {
        let r = row(json!({"id": 7}));

        assert!(Filter::in_list("id", ["3", "7"]).matches(&r));
        assert!(!Filter::in_list("id", ["3"]).matches(&r));
        assert!(!Filter::in_list("id", Vec::<String>::new()).matches(&r));
    }

    #[test]
    fn test_query_builder() {
        let q = Query::new(Entity::Favorites)
            .filter(Filter::eq("user_id", "u1"))
            .order_by("created_at", false)
            .limit(10);

        assert_eq!(q.entity.table(), "favorites");
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.order.as_ref().map(|o| o.ascending), Some(false));
        assert_eq!(q.limit, Some(10));
    }
}
