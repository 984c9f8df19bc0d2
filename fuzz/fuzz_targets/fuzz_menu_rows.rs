// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use libfuzzer_sys::fuzz_target;
use mealbook::repository::normalize_rows;
use mealbook::store::Row;
use std::collections::HashSet;

// Arbitrary store payloads must normalize without panicking, and the
// result must never hold two meals for the same slot.
fuzz_target!(|data: &[u8]| {
    let Ok(rows) = serde_json::from_slice::<Vec<Row>>(data) else {
        return;
    };
    let records = normalize_rows(&rows);
    let mut seen = HashSet::new();
    for record in &records {
        assert!(seen.insert(record.slot()));
    }
});
