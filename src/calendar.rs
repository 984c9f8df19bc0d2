// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Calendar aggregation - day buckets for the list views

use crate::types::{fold_case, MealRecord, MealType};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Day Ranges
// =============================================================================

/// An inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DayRange {
    /// Range from `start` to `end`; `None` if `end` precedes `start`
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// A single day
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Monday through Sunday of the week containing `date`
    #[must_use]
    pub fn week_of(date: NaiveDate) -> Self {
        let back = u64::from(date.weekday().num_days_from_monday());
        let start = date.checked_sub_days(Days::new(back)).unwrap_or(date);
        let end = start.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// First through last day of the month containing `date`
    #[must_use]
    pub fn month_of(date: NaiveDate) -> Self {
        let start = date.with_day(1).unwrap_or(date);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// First day
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls inside the range
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every day of the range in order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

// =============================================================================
// Filters
// =============================================================================

/// Which meal types a list view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MealTypeFilter {
    /// Breakfast and dinner
    #[default]
    All,
    /// Breakfast only
    Breakfast,
    /// Dinner only
    Dinner,
}

impl MealTypeFilter {
    /// Whether a meal of `meal_type` passes
    #[must_use]
    pub fn admits(self, meal_type: MealType) -> bool {
        match self {
            Self::All => true,
            Self::Breakfast => meal_type == MealType::Breakfast,
            Self::Dinner => meal_type == MealType::Dinner,
        }
    }
}

impl FromStr for MealTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") || s.trim() == "Tümü" {
            return Ok(Self::All);
        }
        match MealType::from_label(s) {
            Some(MealType::Breakfast) => Ok(Self::Breakfast),
            Some(MealType::Dinner) => Ok(Self::Dinner),
            None => Err(format!("unknown meal filter: {s} (expected all, breakfast or dinner)")),
        }
    }
}

impl fmt::Display for MealTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Breakfast => f.write_str("breakfast"),
            Self::Dinner => f.write_str("dinner"),
        }
    }
}

/// Filters applied per meal, combined with AND
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// Meal-type filter
    pub meal_type: MealTypeFilter,
    /// Text filter; blank means inactive
    pub text: Option<String>,
}

impl Filters {
    /// Filters with only a meal-type restriction
    #[must_use]
    pub fn meal_type(meal_type: MealTypeFilter) -> Self {
        Self {
            meal_type,
            text: None,
        }
    }

    /// Add a text filter
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(fold_case)
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Meals of one day that survived the filters, breakfast first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    /// The day
    pub day: NaiveDate,
    /// Surviving meals
    pub meals: Vec<MealRecord>,
}

/// Group canonical records into day buckets.
///
/// Only days inside `range` that keep at least one meal after filtering are
/// returned, in calendar order.
#[must_use]
pub fn aggregate(records: &[MealRecord], range: DayRange, filters: &Filters) -> Vec<DayBucket> {
    let needle = filters.needle();
    let mut days: BTreeMap<NaiveDate, Vec<MealRecord>> = BTreeMap::new();

    for record in records {
        if !range.contains(record.date) || !filters.meal_type.admits(record.meal_type) {
            continue;
        }
        if let Some(needle) = &needle {
            if !record.content.contains_folded(needle) {
                continue;
            }
        }
        days.entry(record.date).or_default().push(record.clone());
    }

    days.into_iter()
        .map(|(day, mut meals)| {
            meals.sort_by_key(|m| m.meal_type);
            DayBucket { day, meals }
        })
        .collect()
}
