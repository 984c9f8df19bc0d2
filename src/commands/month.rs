// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Month command - a month of meals with meal-type and text filters

use super::{show_range, Context};
use crate::calendar::{DayRange, Filters, MealTypeFilter};
use anyhow::Result;
use chrono::NaiveDate;

/// Parse a `YYYY-MM` month into its first day
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid month: {} (expected YYYY-MM)", raw))
}

/// Show the month containing `date`, keeping meals that pass both filters
pub async fn run(
    ctx: &Context,
    date: NaiveDate,
    only: MealTypeFilter,
    search: Option<String>,
) -> Result<()> {
    let mut filters = Filters::meal_type(only);
    if let Some(text) = search {
        filters = filters.with_text(text);
    }
    show_range(ctx, DayRange::month_of(date), &filters).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_month() {
        assert_eq!(
            parse_month("2026-02").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
        );
        assert!(parse_month("2026-13").is_err());
        assert!(parse_month("february").is_err());
    }
}
