// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for the canonical menu view
//!
//! These tests verify:
//! 1. Normalization - deduplication is idempotent and slots are unique
//! 2. Search - longer terms never widen the result
//! 3. Stale responses - an older fetch never replaces a newer one

use mealbook::calendar::{aggregate, DayRange, Filters};
use mealbook::repository::{dedupe, normalize_rows, MenuRepository, MenuWindow};
use mealbook::search::SearchIndex;
use mealbook::store::{Entity, MemoryStore, Row};
use mealbook::types::{MealContent, MealRecord, MealType, DISH_SEPARATOR};
use chrono::NaiveDate;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

// =============================================================================
// Test Helpers
// =============================================================================

fn make_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => panic!("test rows must be objects"),
    }
}

fn make_store(rows: Vec<Row>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for row in rows {
        store.push(Entity::Menus, row);
    }
    store
}

fn to_rows(records: &[MealRecord]) -> Vec<Row> {
    records
        .iter()
        .map(|r| make_row(serde_json::to_value(r).unwrap()))
        .collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn label() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "Kahvaltı",
        "Akşam",
        "Akşam Yemeği",
        "dinner",
        "AKŞAM YEMEĞİ",
        "KAHVALTI",
        "Öğle",
        "Öğle Yemeği",
        "Lunch",
    ])
}

fn content() -> impl Strategy<Value = Value> {
    prop_oneof![
        prop::collection::vec("[a-zçşğüö]{1,8}", 0..4).prop_map(|dishes| json!(dishes)),
        "[a-z ]{0,16}".prop_map(Value::String),
    ]
}

fn raw_rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec((1u32..=5, label(), content()), 0..30).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (day, label, content))| {
                make_row(json!({
                    "id": i.to_string(),
                    "date": format!("2026-01-{:02}", day),
                    "city": "X",
                    "meal_type": label,
                    "content": content,
                }))
            })
            .collect()
    })
}

// =============================================================================
// Normalization Properties
// =============================================================================

proptest! {
    #[test]
    fn normalization_is_idempotent(rows in raw_rows()) {
        let once = normalize_rows(&rows);
        let twice = normalize_rows(&to_rows(&once));
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(dedupe(once.clone()), once);
    }

    #[test]
    fn slots_are_unique(rows in raw_rows()) {
        let records = normalize_rows(&rows);
        let mut seen = HashSet::new();
        for record in &records {
            prop_assert!(seen.insert(record.slot()), "duplicate slot {:?}", record.slot());
        }
    }

    #[test]
    fn first_row_of_each_slot_survives(rows in raw_rows()) {
        let records = normalize_rows(&rows);
        for record in &records {
            let first = rows
                .iter()
                .filter_map(mealbook::repository::parse_row)
                .find(|r| r.slot() == record.slot())
                .unwrap();
            prop_assert_eq!(&first.id, &record.id);
        }
    }

    #[test]
    fn search_is_monotonic(rows in raw_rows(), q in "[a-zç]{1,3}", s in "[a-z ]{0,3}") {
        let store = make_store(rows);
        let repository = Arc::new(MenuRepository::new(store));
        let mut index = SearchIndex::for_year(repository, 2026).unwrap();

        let (short, long) = block_on(async {
            let short = index.search_in("X", &q).await;
            let long = index.search_in("X", &format!("{}{}", q, s)).await;
            (short, long)
        });

        let short_ids: HashSet<_> = short.iter().map(|r| r.id.clone()).collect();
        for record in &long {
            prop_assert!(short_ids.contains(&record.id));
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_duplicate_breakfast_first_wins() {
    let store = make_store(vec![
        make_row(json!({"id": "1", "date": "2026-01-01", "city": "X", "meal_type": "Kahvaltı", "content": "a"})),
        make_row(json!({"id": "2", "date": "2026-01-01", "city": "X", "meal_type": "Kahvaltı", "content": "b"})),
    ]);
    let repository = MenuRepository::new(store);

    let records = repository
        .fetch_range("X", date(2026, 1, 1), date(2026, 1, 1))
        .await;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "1");
}

#[tokio::test]
async fn test_lunch_never_reaches_a_view() {
    let store = make_store(vec![
        make_row(json!({"id": "1", "date": "2026-01-01", "city": "X", "meal_type": "Öğle", "content": "Soup"})),
        make_row(json!({"id": "2", "date": "2026-01-01", "city": "X", "meal_type": "Lunch", "content": "Soup"})),
        make_row(json!({"id": "3", "date": "2026-01-01", "city": "X", "meal_type": "Akşam", "content": "Soup"})),
    ]);
    let repository = Arc::new(MenuRepository::new(store));

    let records = repository
        .fetch_range("X", date(2026, 1, 1), date(2026, 1, 31))
        .await;
    let buckets = aggregate(&records, DayRange::month_of(date(2026, 1, 1)), &Filters::default());
    assert_eq!(buckets.len(), 1);
    assert_eq!(buckets[0].meals.len(), 1);
    assert_eq!(buckets[0].meals[0].meal_type, MealType::Dinner);

    let mut index = SearchIndex::for_year(repository, 2026).unwrap();
    let hits: Vec<_> = index.search_in("X", "soup").await.into_iter().map(|r| r.id).collect();
    assert_eq!(hits, vec!["3"]);
}

#[tokio::test]
async fn test_empty_term_matches_nothing() {
    let store = make_store(vec![make_row(json!({
        "id": "1", "date": "2026-01-01", "city": "X", "meal_type": "Akşam", "content": "Soup"
    }))]);
    let mut index = SearchIndex::for_year(Arc::new(MenuRepository::new(store)), 2026).unwrap();

    assert!(index.search_in("X", "").await.is_empty());
}

#[tokio::test]
async fn test_list_content_found_by_dish() {
    let store = make_store(vec![make_row(json!({
        "id": "1", "date": "2026-01-01", "city": "X", "meal_type": "Akşam", "content": ["Soup", "Rice"]
    }))]);
    let mut index = SearchIndex::for_year(Arc::new(MenuRepository::new(store)), 2026).unwrap();

    let hits = index.search_in("X", "soup").await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].content.display(), format!("Soup{}Rice", DISH_SEPARATOR));
}

#[tokio::test]
async fn test_store_failure_yields_unknown_empty_window() {
    let store = make_store(vec![]);
    store.fail(
        mealbook::store::memory::Operation::Query,
        Entity::Menus,
        mealbook::error::StoreErrorKind::Permission,
    );
    let repository = MenuRepository::new(store);

    let mut window = MenuWindow::new();
    let fetched = repository.fetch_window("X", date(2026, 1, 1), date(2026, 1, 7)).await;
    assert!(window.apply(&repository, fetched));
    assert!(window.records().is_empty());
    assert!(window.is_unknown());
    assert!(repository
        .fetch_range("X", date(2026, 1, 1), date(2026, 1, 7))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_stale_window_is_discarded() {
    let store = make_store(vec![
        make_row(json!({"id": "1", "date": "2026-01-01", "city": "X", "meal_type": "Kahvaltı", "content": "a"})),
        make_row(json!({"id": "2", "date": "2026-02-01", "city": "X", "meal_type": "Kahvaltı", "content": "b"})),
    ]);
    let repository = MenuRepository::new(store);

    let january = repository.fetch_window("X", date(2026, 1, 1), date(2026, 1, 31)).await;
    let february = repository.fetch_window("X", date(2026, 2, 1), date(2026, 2, 28)).await;

    let mut window = MenuWindow::new();
    assert!(window.apply(&repository, february));
    assert!(!window.apply(&repository, january));
    assert_eq!(window.records()[0].id, "2");
}

#[test]
fn test_content_shapes() {
    assert_eq!(
        MealContent::parse(&json!("[\"Soup\",\"Rice\"]")),
        MealContent::List(vec!["Soup".into(), "Rice".into()])
    );
    assert_eq!(
        MealContent::parse(&json!("[not json")),
        MealContent::Plain("[not json".into())
    );
    assert_eq!(MealContent::parse(&Value::Null).display(), "");
    assert_eq!(MealContent::parse(&json!(["Soup", 2])).display(), "Soup, 2");
}
