// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mealbook::types::{fold_case, MealContent};
use serde_json::Value;

#[derive(Debug, Arbitrary)]
struct Input {
    content: String,
    term: String,
    extra: String,
}

fuzz_target!(|input: Input| {
    let content = MealContent::parse(&Value::String(input.content));
    let _ = content.display();

    // A longer term never matches where a shorter one did not
    let short = fold_case(&input.term);
    let long = fold_case(&format!("{}{}", input.term, input.extra));
    if content.contains_folded(&long) {
        assert!(content.contains_folded(&short));
    }
});
