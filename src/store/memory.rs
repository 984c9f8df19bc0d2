// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! In-process store, optionally backed by a JSON file
//!
//! Used for offline browsing with `--store-file` and as the test double for
//! every component. Failures can be injected per operation and entity.

use super::{compare_values, value_text, Entity, Filter, Query, RemoteStore, Row};
use crate::error::{StoreError, StoreErrorKind};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Store operation, used to target failure injection and call counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `query`
    Query,
    /// `insert`
    Insert,
    /// `delete`
    Delete,
}

/// On-disk layout of a store file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    /// Meal record rows
    #[serde(default)]
    pub menus: Vec<Row>,
    /// Favorite entry rows
    #[serde(default)]
    pub favorites: Vec<Row>,
}

impl Tables {
    fn rows(&self, entity: Entity) -> &Vec<Row> {
        match entity {
            Entity::Menus => &self.menus,
            Entity::Favorites => &self.favorites,
        }
    }

    fn rows_mut(&mut self, entity: Entity) -> &mut Vec<Row> {
        match entity {
            Entity::Menus => &mut self.menus,
            Entity::Favorites => &mut self.favorites,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    failures: HashMap<(Operation, Entity), StoreErrorKind>,
    calls: HashMap<(Operation, Entity), usize>,
    next_id: u64,
}

/// A [`RemoteStore`] that keeps its rows in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    path: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given tables
    #[must_use]
    pub fn with_tables(tables: Tables) -> Self {
        let next_id = (tables.menus.len() + tables.favorites.len()) as u64;
        Self {
            state: Mutex::new(State {
                tables,
                next_id,
                ..State::default()
            }),
            path: None,
        }
    }

    /// Open a store file; a missing file yields an empty store that will be
    /// created on the first write
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let tables = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                StoreError::NotFound(format!("failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str(&content)?
        } else {
            Tables::default()
        };
        let mut store = Self::with_tables(tables);
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    /// Make every subsequent `operation` on `entity` fail with `kind`
    pub fn fail(&self, operation: Operation, entity: Entity, kind: StoreErrorKind) {
        self.lock().failures.insert((operation, entity), kind);
    }

    /// Undo [`MemoryStore::fail`]
    pub fn recover(&self, operation: Operation, entity: Entity) {
        self.lock().failures.remove(&(operation, entity));
    }

    /// How many times `operation` was attempted on `entity`
    #[must_use]
    pub fn calls(&self, operation: Operation, entity: Entity) -> usize {
        self.lock()
            .calls
            .get(&(operation, entity))
            .copied()
            .unwrap_or(0)
    }

    /// Copy of every row of `entity`
    #[must_use]
    pub fn rows(&self, entity: Entity) -> Vec<Row> {
        self.lock().tables.rows(entity).clone()
    }

    /// Append a row directly, bypassing failure injection
    pub fn push(&self, entity: Entity, row: Row) {
        self.lock().tables.rows_mut(entity).push(row);
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(state: &mut State, operation: Operation, entity: Entity) -> Result<(), StoreError> {
        *state.calls.entry((operation, entity)).or_insert(0) += 1;
        match state.failures.get(&(operation, entity)) {
            Some(kind) => Err(StoreError::new(
                *kind,
                format!("injected {operation:?} failure on {}", entity.table()),
            )),
            None => Ok(()),
        }
    }

    fn persist(&self, tables: &Tables) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(tables)?;
        fs::write(path, json)
            .map_err(|e| StoreError::Network(format!("failed to write {}: {e}", path.display())))
    }

    /// Replace the tables only once the file write went through
    fn commit(&self, state: &mut State, tables: Tables) -> Result<(), StoreError> {
        self.persist(&tables)?;
        state.tables = tables;
        Ok(())
    }

    fn run_query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        let mut state = self.lock();
        Self::begin(&mut state, Operation::Query, query.entity)?;

        let mut rows: Vec<Row> = state
            .tables
            .rows(query.entity)
            .iter()
            .filter(|row| query.filters.iter().all(|f| f.matches(row)))
            .cloned()
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(&order.field).unwrap_or(&Value::Null),
                    b.get(&order.field).unwrap_or(&Value::Null),
                );
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    fn run_insert(&self, entity: Entity, mut row: Row) -> Result<Row, StoreError> {
        let mut state = self.lock();
        Self::begin(&mut state, Operation::Insert, entity)?;

        if entity == Entity::Favorites {
            let key = favorite_key(&row);
            if state.tables.favorites.iter().any(|r| favorite_key(r) == key) {
                return Err(StoreError::Conflict(format!(
                    "favorite ({}, {}) already exists",
                    key.0, key.1
                )));
            }
            row.entry("created_at").or_insert_with(|| {
                Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
            });
        }
        if !row.contains_key("id") {
            state.next_id += 1;
            row.insert("id".into(), Value::String(state.next_id.to_string()));
        }

        let mut tables = state.tables.clone();
        tables.rows_mut(entity).push(row.clone());
        self.commit(&mut state, tables)?;
        Ok(row)
    }

    fn run_delete(&self, entity: Entity, filters: &[Filter]) -> Result<u64, StoreError> {
        let mut state = self.lock();
        Self::begin(&mut state, Operation::Delete, entity)?;

        let mut tables = state.tables.clone();
        let rows = tables.rows_mut(entity);
        let before = rows.len();
        rows.retain(|row| !filters.iter().all(|f| f.matches(row)));
        let removed = (before - rows.len()) as u64;

        if removed > 0 {
            self.commit(&mut state, tables)?;
        }
        Ok(removed)
    }
}

fn favorite_key(row: &Row) -> (String, String) {
    let field = |name: &str| row.get(name).map(value_text).unwrap_or_default();
    (field("user_id"), field("menu_id"))
}

impl RemoteStore for MemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.run_query(query)
    }

    async fn insert(&self, entity: Entity, row: Row) -> Result<Row, StoreError> {
        self.run_insert(entity, row)
    }

    async fn delete(&self, entity: Entity, filters: &[Filter]) -> Result<u64, StoreError> {
        self.run_delete(entity, filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_favorite_is_conflict() {
        let store = MemoryStore::new();
        let fav = row(json!({"user_id": "u1", "menu_id": "7", "food_name": "Soup"}));

        store.insert(Entity::Favorites, fav.clone()).await.unwrap();
        let err = store.insert(Entity::Favorites, fav).await.unwrap_err();

        assert_eq!(err.kind(), StoreErrorKind::Conflict);
        assert_eq!(store.rows(Entity::Favorites).len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let store = MemoryStore::new();
        store.fail(Operation::Query, Entity::Menus, StoreErrorKind::Network);

        let err = store.query(&Query::new(Entity::Menus)).await.unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::Network);

        store.recover(Operation::Query, Entity::Menus);
        assert!(store.query(&Query::new(Entity::Menus)).await.is_ok());
        assert_eq!(store.calls(Operation::Query, Entity::Menus), 2);
    }

    #[tokio::test]
    async fn test_delete_counts_rows() {
        let store = MemoryStore::new();
        store.push(Entity::Favorites, row(json!({"user_id": "u1", "menu_id": "1"})));
        store.push(Entity::Favorites, row(json!({"user_id": "u1", "menu_id": "2"})));

        let removed = store
            .delete(
                Entity::Favorites,
                &[Filter::eq("user_id", "u1"), Filter::eq("menu_id", "2")],
            )
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.rows(Entity::Favorites).len(), 1);
    }

    #[tokio::test]
    async fn test_file_backed_store_persists_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::open(&path).unwrap();
        store
            .insert(Entity::Favorites, row(json!({"user_id": "u1", "menu_id": "9"})))
            .await
            .unwrap();

        let reopened = MemoryStore::open(&path).unwrap();
        assert_eq!(reopened.rows(Entity::Favorites).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_rows_untouched() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::open(&dir.path().join("missing").join("store.json")).unwrap();

        let err = store
            .insert(Entity::Favorites, row(json!({"user_id": "u1", "menu_id": "9"})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), StoreErrorKind::Network);
        assert!(store.rows(Entity::Favorites).is_empty());

        store.push(Entity::Favorites, row(json!({"user_id": "u1", "menu_id": "9"})));
        assert!(store
            .delete(Entity::Favorites, &[Filter::eq("menu_id", "9")])
            .await
            .is_err());
        assert_eq!(store.rows(Entity::Favorites).len(), 1);
    }
}
