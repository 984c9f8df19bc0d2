// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Search and aggregation over a full year of meals

use chrono::{Days, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mealbook::calendar::{aggregate, DayRange, Filters, MealTypeFilter};
use mealbook::repository::{normalize_rows, MenuRepository};
use mealbook::search::SearchIndex;
use mealbook::store::{Entity, MemoryStore, Row};
use serde_json::{json, Value};
use std::sync::Arc;

const DISHES: [&str; 8] = [
    "Mercimek Çorbası",
    "Pilav",
    "Izgara Köfte",
    "Simit",
    "Beyaz Peynir",
    "Menemen",
    "Karnıyarık",
    "Sütlaç",
];

fn year_rows() -> Vec<Row> {
    let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let mut rows = Vec::new();
    for day in 0..365u64 {
        let date = start.checked_add_days(Days::new(day)).unwrap();
        for (offset, label) in ["Kahvaltı", "Akşam"].iter().enumerate() {
            let i = day as usize * 2 + offset;
            let content = json!([DISHES[i % 8], DISHES[(i + 3) % 8], DISHES[(i + 5) % 8]]);
            if let Value::Object(row) = json!({
                "id": i.to_string(),
                "date": date.to_string(),
                "city": "İstanbul",
                "meal_type": label,
                "content": content,
            }) {
                rows.push(row);
            }
        }
    }
    rows
}

fn bench_search(c: &mut Criterion) {
    let rows = year_rows();
    let store = Arc::new(MemoryStore::new());
    for row in rows.clone() {
        store.push(Entity::Menus, row);
    }
    let repository = Arc::new(MenuRepository::new(store));
    let mut index = SearchIndex::for_year(repository, 2026).unwrap();
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    runtime.block_on(index.ensure_loaded("İstanbul"));

    c.bench_function("normalize_year", |b| {
        b.iter(|| normalize_rows(black_box(&rows)))
    });

    c.bench_function("search_year", |b| {
        b.iter(|| index.search("İstanbul", black_box("çorba")))
    });

    let records = index.records("İstanbul").to_vec();
    let filters = Filters::meal_type(MealTypeFilter::Dinner).with_text("pilav");
    let month = DayRange::month_of(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    c.bench_function("aggregate_month", |b| {
        b.iter(|| aggregate(black_box(&records), month, &filters))
    });
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
