// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod favorites;
pub mod like;
pub mod month;
pub mod search;
pub mod today;
pub mod week;

use crate::calendar::{aggregate, DayBucket, DayRange, Filters};
use crate::config::Config;
use crate::favorites::FavoriteCache;
use crate::repository::{MenuRepository, MenuWindow};
use crate::store::Backend;
use crate::types::{MealRecord, MealType};
use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

// =============================================================================
// Shared Context
// =============================================================================

/// How results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Output {
    /// Print JSON instead of text
    pub json: bool,
    /// Use terminal colors in text output
    pub color: bool,
}

/// Everything a store-backed command needs
#[derive(Debug)]
pub struct Context {
    /// Effective configuration
    pub config: Config,
    /// City the command works on
    pub city: String,
    /// Output mode
    pub output: Output,
    /// Meal reads
    pub repository: Arc<MenuRepository<Backend>>,
    /// Favorite state of the configured session
    pub favorites: FavoriteCache<Backend>,
}

impl Context {
    /// Open the configured store and wire the components to it
    pub fn open(config: Config, output: Output) -> Result<Self> {
        let store = Arc::new(config.open_store().context("Failed to open the menu store")?);
        let repository = Arc::new(MenuRepository::new(store.clone()));
        let favorites = FavoriteCache::new(store, config.session());
        Ok(Self {
            city: config.city.clone(),
            config,
            output,
            repository,
            favorites,
        })
    }

    /// Load the session's favorites; a failure only costs the liked markers
    pub async fn load_favorites(&self) {
        if self.favorites.session().user().is_none() {
            return;
        }
        if let Err(err) = self.favorites.load().await {
            warn!("Favorites unavailable [{:?}]: {}", err.kind(), err);
        }
    }
}

/// Fetch `range`, apply `filters`, and print the day buckets
pub async fn show_range(ctx: &Context, range: DayRange, filters: &Filters) -> Result<()> {
    info!("Loading {} meals {} - {}", ctx.city, range.start(), range.end());

    let mut window = MenuWindow::new();
    let fetched = ctx
        .repository
        .fetch_window(&ctx.city, range.start(), range.end())
        .await;
    window.apply(&*ctx.repository, fetched);
    if window.is_unknown() {
        anyhow::bail!("Menus for {} could not be loaded", ctx.city);
    }

    ctx.load_favorites().await;
    let buckets = aggregate(window.records(), range, filters);
    let liked = ctx.favorites.liked_ids();

    if ctx.output.json {
        println!("{}", serde_json::to_string_pretty(&day_views(&buckets, &liked))?);
    } else if buckets.is_empty() {
        println!("No meals for {} between {} and {}", ctx.city, range.start(), range.end());
    } else {
        println!("{}", render_days(&buckets, &liked, ctx.output.color));
    }
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// A meal as printed in JSON output
#[derive(Debug, Serialize)]
pub struct MealView<'a> {
    /// The record
    #[serde(flatten)]
    pub meal: &'a MealRecord,
    /// Whether the session likes it
    pub liked: bool,
}

/// A day as printed in JSON output
#[derive(Debug, Serialize)]
pub struct DayView<'a> {
    /// The day
    pub day: chrono::NaiveDate,
    /// Meals, breakfast first
    pub meals: Vec<MealView<'a>>,
}

/// Pair every meal with its liked flag
#[must_use]
pub fn meal_views<'a>(meals: &'a [MealRecord], liked: &HashSet<String>) -> Vec<MealView<'a>> {
    meals
        .iter()
        .map(|meal| MealView {
            meal,
            liked: liked.contains(&meal.id),
        })
        .collect()
}

fn day_views<'a>(buckets: &'a [DayBucket], liked: &HashSet<String>) -> Vec<DayView<'a>> {
    buckets
        .iter()
        .map(|bucket| DayView {
            day: bucket.day,
            meals: meal_views(&bucket.meals, liked),
        })
        .collect()
}

/// One meal line: liked marker, meal type, dishes, calories
#[must_use]
pub fn render_meal(meal: &MealRecord, liked: bool, color: bool) -> String {
    let marker = if liked { "♥" } else { "·" };
    let label = format!("{:<9}", meal.meal_type.to_string());

    let (marker, label) = if color {
        let label = match meal.meal_type {
            MealType::Breakfast => label.yellow().to_string(),
            MealType::Dinner => label.blue().to_string(),
        };
        let marker = if liked {
            marker.red().to_string()
        } else {
            marker.dimmed().to_string()
        };
        (marker, label)
    } else {
        (marker.to_string(), label)
    };

    let mut line = format!("{} {} {}", marker, label, meal.content);

    if !meal.calorie_range.is_empty() {
        line.push_str(&format!(" ({})", meal.calorie_range));
    }
    line
}

/// Day buckets as text, one heading per day
#[must_use]
pub fn render_days(buckets: &[DayBucket], liked: &HashSet<String>, color: bool) -> String {
    let mut blocks = Vec::with_capacity(buckets.len());
    for bucket in buckets {
        let heading = bucket.day.format("%A %-d %B %Y").to_string();
        let mut block = if color {
            heading.bold().to_string()
        } else {
            heading
        };
        for meal in &bucket.meals {
            block.push_str("\n  ");
            block.push_str(&render_meal(meal, liked.contains(&meal.id), color));
        }
        blocks.push(block);
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MealContent;
    use chrono::NaiveDate;

    fn meal(id: &str, meal_type: MealType, content: MealContent, calories: &str) -> MealRecord {
        MealRecord {
            id: id.into(),
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            city: "İstanbul".into(),
            meal_type,
            content,
            calorie_range: calories.into(),
        }
    }

    #[test]
    fn test_render_days_plain() {
        let buckets = vec![
            DayBucket {
                day: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                meals: vec![
                    meal(
                        "1",
                        MealType::Breakfast,
                        MealContent::List(vec!["Pişi".into(), "Haşlanmış Yumurta".into()]),
                        "600-800 kcal",
                    ),
                    meal("2", MealType::Dinner, MealContent::Plain("Mercimek Çorbası".into()), ""),
                ],
            },
            DayBucket {
                day: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
                meals: vec![meal("3", MealType::Dinner, MealContent::Plain("Pilav".into()), "")],
            },
        ];
        let liked: HashSet<String> = ["1".to_string()].into_iter().collect();

        insta::assert_snapshot!(render_days(&buckets, &liked, false), @r"
Thursday 1 January 2026
  ♥ Breakfast Pişi, Haşlanmış Yumurta (600-800 kcal)
  · Dinner    Mercimek Çorbası

Friday 2 January 2026
  · Dinner    Pilav
");
    }

    #[test]
    fn test_meal_view_json_flattens_record() {
        let meals = vec![meal("7", MealType::Dinner, MealContent::Plain("Pilav".into()), "")];
        let liked: HashSet<String> = ["7".to_string()].into_iter().collect();

        let json = serde_json::to_value(meal_views(&meals, &liked)).unwrap();

        assert_eq!(json[0]["id"], "7");
        assert_eq!(json[0]["meal_type"], "dinner");
        assert_eq!(json[0]["liked"], true);
    }
}
