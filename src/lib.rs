// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Mealbook library - cafeteria menus, kept consistent
//!
//! This crate provides the data-consistency core behind a menu browser:
//! a canonical per-day view of meal records fetched from a remote store,
//! an in-memory search index, calendar grouping, and a favorite cache that
//! applies toggles optimistically and rolls them back on failure.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod calendar;
pub mod commands;
pub mod config;
pub mod error;
pub mod favorites;
pub mod repository;
pub mod search;
pub mod store;

/// Core data types shared by every component
pub mod types {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::Value;
    use std::fmt;

    // =========================================================================
    // Meal Types
    // =========================================================================

    /// The closed set of meal types a canonical record can carry.
    ///
    /// Ordering is display ordering: breakfast is listed before dinner.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum MealType {
        /// Morning meal ("Kahvaltı")
        Breakfast,
        /// Evening meal ("Akşam", "Akşam Yemeği")
        Dinner,
    }

    impl MealType {
        /// Collapse a raw storage label into a canonical meal type.
        ///
        /// Returns `None` for anything outside the closed set, including the
        /// legacy lunch labels that were entered by mistake.
        #[must_use]
        pub fn from_label(label: &str) -> Option<Self> {
            // `İ` lowercases to `i` plus a combining dot above
            let folded: String = label
                .trim()
                .to_lowercase()
                .chars()
                .filter(|c| *c != '\u{307}')
                .collect();
            match folded.as_str() {
                "kahvaltı" | "kahvalti" | "breakfast" => Some(Self::Breakfast),
                "akşam" | "akşam yemeği" | "aksam" | "aksam yemegi" | "dinner" => {
                    Some(Self::Dinner)
                }
                _ => None,
            }
        }

        /// Label written to storage for this meal type
        #[must_use]
        pub fn label(&self) -> &'static str {
            match self {
                Self::Breakfast => "Kahvaltı",
                Self::Dinner => "Akşam",
            }
        }
    }

    impl fmt::Display for MealType {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Breakfast => f.write_str("Breakfast"),
                Self::Dinner => f.write_str("Dinner"),
            }
        }
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Separator used when a list of dishes is flattened for display or search
    pub const DISH_SEPARATOR: &str = ", ";

    /// Dishes served in a meal, in one of the two shapes storage produces
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum MealContent {
        /// Ordered dish names
        List(Vec<String>),
        /// Free text
        Plain(String),
    }

    impl MealContent {
        /// Parse whatever storage returned into a content value.
        ///
        /// This is the only place that inspects the raw shape. A string that
        /// holds a JSON-encoded array is unwrapped into a list.
        #[must_use]
        pub fn parse(raw: &Value) -> Self {
            match raw {
                Value::Array(items) => Self::List(items.iter().map(dish_name).collect()),
                Value::String(text) => Self::parse_text(text),
                Value::Null => Self::Plain(String::new()),
                other => Self::Plain(other.to_string()),
            }
        }

        fn parse_text(text: &str) -> Self {
            let trimmed = text.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
                    return Self::List(items.iter().map(dish_name).collect());
                }
            }
            Self::Plain(text.to_string())
        }

        /// Flattened display string; lists are joined with [`DISH_SEPARATOR`]
        #[must_use]
        pub fn display(&self) -> String {
            match self {
                Self::List(items) => items.join(DISH_SEPARATOR),
                Self::Plain(text) => text.clone(),
            }
        }

        /// Case-insensitive substring match against the display string.
        ///
        /// `needle` must already be folded with [`fold_case`].
        #[must_use]
        pub fn contains_folded(&self, needle: &str) -> bool {
            fold_case(&self.display()).contains(needle)
        }
    }

    impl fmt::Display for MealContent {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.display())
        }
    }

    /// Lowercase one character at a time.
    ///
    /// Unlike `str::to_lowercase` this never looks at neighbouring characters,
    /// so folding a prefix yields a prefix of the folded whole.
    #[must_use]
    pub fn fold_case(text: &str) -> String {
        text.chars().flat_map(char::to_lowercase).collect()
    }

    fn dish_name(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    // =========================================================================
    // Meal Record
    // =========================================================================

    /// A single city/date/meal-type entry in the canonical view
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct MealRecord {
        /// Opaque unique identifier
        pub id: String,
        /// Calendar date the meal is served
        pub date: NaiveDate,
        /// Location key
        pub city: String,
        /// Canonical meal type
        pub meal_type: MealType,
        /// Dishes
        pub content: MealContent,
        /// Display-only calorie range, e.g. "600-800 kcal"
        #[serde(rename = "calories", default)]
        pub calorie_range: String,
    }

    impl MealRecord {
        /// Key that must be unique within a city's canonical view
        #[must_use]
        pub fn slot(&self) -> (NaiveDate, MealType) {
            (self.date, self.meal_type)
        }
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// Identity of an authenticated user
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct UserId(pub String);

    impl fmt::Display for UserId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// Explicit identity handed to components instead of an ambient lookup
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Session {
        user: Option<UserId>,
    }

    impl Session {
        /// Session with no authenticated user
        #[must_use]
        pub fn anonymous() -> Self {
            Self { user: None }
        }

        /// Session for an authenticated user
        #[must_use]
        pub fn authenticated(user: impl Into<String>) -> Self {
            Self {
                user: Some(UserId(user.into())),
            }
        }

        /// The authenticated user, if any
        #[must_use]
        pub fn user(&self) -> Option<&UserId> {
            self.user.as_ref()
        }
    }

    /// A user's persisted marking of a meal as liked
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FavoriteEntry {
        /// Owner of the favorite
        pub user_id: UserId,
        /// Favorited meal record id
        pub menu_id: String,
        /// Meal content as it read when it was favorited
        #[serde(rename = "food_name", default)]
        pub snapshot_name: String,
        /// Insertion time; newest favorites are listed first
        pub created_at: DateTime<Utc>,
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{StoreError, StoreErrorKind, ToggleError};
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}
