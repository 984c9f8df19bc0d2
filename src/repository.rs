// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Menu repository - fetches meal rows and turns them into the canonical view
//!
//! Every view (daily, weekly, monthly, search) goes through
//! [`normalize_rows`]: rows with an unknown meal type or an unreadable date are
//! dropped, dinner label variants collapse into one tag, and only the first
//! row seen for each (date, meal type) survives.

use crate::error::StoreError;
use crate::store::{value_text, Entity, Filter, Query, RemoteStore, Row};
use crate::types::{MealContent, MealRecord, MealType};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Date format used by the store
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Normalization
// =============================================================================

/// Parse one raw row into a canonical record, or `None` if it is invalid
#[must_use]
pub fn parse_row(row: &Row) -> Option<MealRecord> {
    let id = match row.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => {
            debug!("Dropping meal row without id");
            return None;
        }
    };

    let Some(date) = row.get("date").and_then(Value::as_str).and_then(parse_date) else {
        debug!("Dropping meal {}: unreadable date {:?}", id, row.get("date"));
        return None;
    };

    let label = row.get("meal_type").map(value_text).unwrap_or_default();
    let Some(meal_type) = MealType::from_label(&label) else {
        debug!("Dropping meal {} ({}): unsupported meal type {:?}", id, date, label);
        return None;
    };

    Some(MealRecord {
        id,
        date,
        city: row.get("city").map(value_text).unwrap_or_default(),
        meal_type,
        content: MealContent::parse(row.get("content").unwrap_or(&Value::Null)),
        calorie_range: row.get("calories").map(value_text).unwrap_or_default(),
    })
}

/// Parse a stored date, ignoring any time-of-day suffix
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(day, DATE_FORMAT).ok()
}

/// Keep the first record for each (date, meal type), preserving input order.
///
/// The input is expected to belong to a single city.
#[must_use]
pub fn dedupe(records: impl IntoIterator<Item = MealRecord>) -> Vec<MealRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(record.slot());
            if !fresh {
                debug!(
                    "Dropping duplicate meal {} for {} {}",
                    record.id, record.date, record.meal_type
                );
            }
            fresh
        })
        .collect()
}

/// Normalize and deduplicate raw rows in store order
#[must_use]
pub fn normalize_rows(rows: &[Row]) -> Vec<MealRecord> {
    dedupe(rows.iter().filter_map(parse_row))
}

// =============================================================================
// Request Generations
// =============================================================================

/// Sequence number attached to a fetch; higher is newer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// Issues generations and remembers the latest one
#[derive(Debug, Default)]
pub struct Generations {
    latest: AtomicU64,
}

impl Generations {
    /// Issue a new generation, superseding every earlier one
    pub fn issue(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `generation` is the most recently issued
    #[must_use]
    pub fn is_latest(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::SeqCst) == generation.0
    }
}

/// Outcome of a generation-tagged fetch
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Generation issued when the fetch started
    pub generation: Generation,
    /// Canonical records; empty on failure
    pub records: Vec<MealRecord>,
    /// The swallowed failure, if any. When set, an empty result means
    /// "unknown" rather than "no meals".
    pub error: Option<StoreError>,
}

// =============================================================================
// Repository
// =============================================================================

/// Reads meal records for a city and date window
#[derive(Debug)]
pub struct MenuRepository<S> {
    store: Arc<S>,
    generations: Generations,
}

impl<S: RemoteStore> MenuRepository<S> {
    /// Repository reading from `store`
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            generations: Generations::default(),
        }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Canonical records for `city` between `start` and `end`, inclusive.
    ///
    /// A store failure is logged and yields an empty list.
    pub async fn fetch_range(&self, city: &str, start: NaiveDate, end: NaiveDate) -> Vec<MealRecord> {
        match self.try_fetch_range(city, start, end).await {
            Ok(records) => records,
            Err(err) => {
                report_failure(city, start, end, &err);
                Vec::new()
            }
        }
    }

    /// Like [`MenuRepository::fetch_range`], tagged with a fresh generation and
    /// carrying the swallowed error
    pub async fn fetch_window(&self, city: &str, start: NaiveDate, end: NaiveDate) -> Fetched {
        let generation = self.generations.issue();
        match self.try_fetch_range(city, start, end).await {
            Ok(records) => Fetched {
                generation,
                records,
                error: None,
            },
            Err(err) => {
                report_failure(city, start, end, &err);
                Fetched {
                    generation,
                    records: Vec::new(),
                    error: Some(err),
                }
            }
        }
    }

    /// Whether `generation` belongs to the most recent `fetch_window` call
    #[must_use]
    pub fn is_latest(&self, generation: Generation) -> bool {
        self.generations.is_latest(generation)
    }

    /// Canonical records for a window without swallowing the store failure
    pub async fn try_fetch_range(
        &self,
        city: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MealRecord>, StoreError> {
        let query = Query::new(Entity::Menus)
            .filter(Filter::eq("city", city))
            .filter(Filter::gte("date", start.format(DATE_FORMAT).to_string()))
            .filter(Filter::lte("date", end.format(DATE_FORMAT).to_string()));

        let rows = self.store.query(&query).await?;
        let records = normalize_rows(&rows);
        debug!(
            "Loaded {} of {} meal rows for {} ({} - {})",
            records.len(),
            rows.len(),
            city,
            start,
            end
        );
        Ok(records)
    }

    /// Canonical records with the given ids, in store order.
    ///
    /// Ids may span dates and cities, so no deduplication is applied.
    pub async fn fetch_ids(&self, ids: &[String]) -> Result<Vec<MealRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new(Entity::Menus).filter(Filter::in_list("id", ids.iter().cloned()));
        let rows = self.store.query(&query).await?;
        Ok(rows.iter().filter_map(parse_row).collect())
    }
}

fn report_failure(city: &str, start: NaiveDate, end: NaiveDate, err: &StoreError) {
    warn!(
        "Menu fetch for {} ({} - {}) failed [{:?}]: {}",
        city,
        start,
        end,
        err.kind(),
        err
    );
}

// =============================================================================
// Latest Window
// =============================================================================

/// The records currently on display, guarded against stale responses
#[derive(Debug, Default)]
pub struct MenuWindow {
    generation: Option<Generation>,
    records: Vec<MealRecord>,
    error: Option<StoreError>,
}

impl MenuWindow {
    /// Empty window
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `fetched` only if no newer fetch was issued since it started.
    ///
    /// Returns whether the window changed.
    pub fn apply<S: RemoteStore>(&mut self, repository: &MenuRepository<S>, fetched: Fetched) -> bool {
        if !repository.is_latest(fetched.generation) {
            debug!("Discarding stale menu response {:?}", fetched.generation);
            return false;
        }
        self.generation = Some(fetched.generation);
        self.records = fetched.records;
        self.error = fetched.error;
        true
    }

    /// Records on display
    #[must_use]
    pub fn records(&self) -> &[MealRecord] {
        &self.records
    }

    /// True when the last accepted fetch failed, so emptiness is not proof
    /// of "no meals"
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.error.is_some()
    }

    /// Generation of the accepted fetch
    #[must_use]
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }
}
