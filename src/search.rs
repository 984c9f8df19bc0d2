// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Search index - a year of canonical meals per city, held in memory

use crate::repository::MenuRepository;
use crate::store::RemoteStore;
use crate::types::{fold_case, MealRecord};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Substring search over the meals of one date window
#[derive(Debug)]
pub struct SearchIndex<S> {
    repository: Arc<MenuRepository<S>>,
    start: NaiveDate,
    end: NaiveDate,
    cities: HashMap<String, Vec<MealRecord>>,
}

impl<S: RemoteStore> SearchIndex<S> {
    /// Index covering every day of `year`.
    ///
    /// Returns `None` if the year is outside the supported calendar.
    pub fn for_year(repository: Arc<MenuRepository<S>>, year: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
        Some(Self::new(repository, start, end))
    }

    /// Index covering `start..=end`
    pub fn new(repository: Arc<MenuRepository<S>>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            repository,
            start,
            end,
            cities: HashMap::new(),
        }
    }

    /// Load `city` unless it is already held; returns the number of records.
    ///
    /// A failed load is logged and leaves the city unloaded, so the next use
    /// asks the store again.
    pub async fn ensure_loaded(&mut self, city: &str) -> usize {
        if let Some(records) = self.cities.get(city) {
            return records.len();
        }

        match self
            .repository
            .try_fetch_range(city, self.start, self.end)
            .await
        {
            Ok(records) => {
                info!("Indexed {} meals for {} ({} - {})", records.len(), city, self.start, self.end);
                let count = records.len();
                self.cities.insert(city.to_string(), records);
                count
            }
            Err(err) => {
                warn!(
                    "Search index load for {} failed [{:?}]: {}",
                    city,
                    err.kind(),
                    err
                );
                0
            }
        }
    }

    /// Whether `city` is held in memory
    #[must_use]
    pub fn is_loaded(&self, city: &str) -> bool {
        self.cities.contains_key(city)
    }

    /// Meals of a loaded city whose content contains `term`, ignoring case.
    ///
    /// The empty term matches nothing. Results keep index order and are a
    /// fresh vector on every call.
    #[must_use]
    pub fn search(&self, city: &str, term: &str) -> Vec<MealRecord> {
        if term.is_empty() {
            return Vec::new();
        }
        let Some(records) = self.cities.get(city) else {
            debug!("Search in {} before it was indexed", city);
            return Vec::new();
        };

        let needle = fold_case(term);
        records
            .iter()
            .filter(|record| record.content.contains_folded(&needle))
            .cloned()
            .collect()
    }

    /// Load `city` on first use, then search it
    pub async fn search_in(&mut self, city: &str, term: &str) -> Vec<MealRecord> {
        self.ensure_loaded(city).await;
        self.search(city, term)
    }

    /// Every meal held for `city`, in index order
    #[must_use]
    pub fn records(&self, city: &str) -> &[MealRecord] {
        self.cities.get(city).map_or(&[], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreErrorKind;
    use crate::store::memory::Operation;
    use crate::store::{Entity, MemoryStore, Row};
    use serde_json::{json, Value};

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    fn index_with(rows: Vec<Value>) -> (Arc<MemoryStore>, SearchIndex<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        for r in rows {
            store.push(Entity::Menus, row(r));
        }
        let repository = Arc::new(MenuRepository::new(store.clone()));
        (store, SearchIndex::for_year(repository, 2026).unwrap())
    }

    #[tokio::test]
    async fn test_list_content_matches_case_insensitively() {
        let (_, mut index) = index_with(vec![json!({
            "id": "1", "date": "2026-03-01", "city": "X",
            "meal_type": "Akşam", "content": ["Soup", "Rice"]
        })]);

        let hits = index.search_in("X", "soup").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");
        assert!(index.search("X", "").is_empty());
    }

    #[tokio::test]
    async fn test_separator_is_searchable() {
        let (_, mut index) = index_with(vec![json!({
            "id": "1", "date": "2026-03-01", "city": "X",
            "meal_type": "Akşam", "content": "[\"Soup\",\"Rice\"]"
        })]);

        assert_eq!(index.search_in("X", "soup, rice").await.len(), 1);
    }

    #[tokio::test]
    async fn test_loads_once_per_city() {
        let (store, mut index) = index_with(vec![
            json!({"id": "1", "date": "2026-01-01", "city": "X", "meal_type": "Kahvaltı", "content": "Egg"}),
            json!({"id": "2", "date": "2025-12-31", "city": "X", "meal_type": "Kahvaltı", "content": "Egg"}),
        ]);

        assert_eq!(index.ensure_loaded("X").await, 1);
        index.search_in("X", "egg").await;
        index.search_in("X", "eg").await;

        assert_eq!(store.calls(Operation::Query, Entity::Menus), 1);
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let (store, mut index) = index_with(vec![json!({
            "id": "1", "date": "2026-01-01", "city": "X", "meal_type": "Kahvaltı", "content": "Egg"
        })]);
        store.fail(Operation::Query, Entity::Menus, StoreErrorKind::Network);

        assert!(index.search_in("X", "egg").await.is_empty());
        assert!(!index.is_loaded("X"));

        store.recover(Operation::Query, Entity::Menus);
        assert_eq!(index.search_in("X", "egg").await.len(), 1);
    }
}
