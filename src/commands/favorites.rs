// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Favorites command - the session's liked meals, newest first

use super::{render_meal, Context};
use crate::types::{FavoriteEntry, MealRecord};
use anyhow::{Context as _, Result};
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

/// A favorite as printed in JSON output
#[derive(Debug, Serialize)]
struct FavoriteView<'a> {
    #[serde(flatten)]
    entry: &'a FavoriteEntry,
    /// The meal as currently listed; absent once it was removed
    meal: Option<&'a MealRecord>,
}

/// List the user's favorites
pub async fn run(ctx: &Context) -> Result<()> {
    if ctx.favorites.session().user().is_none() {
        anyhow::bail!("Sign in to see favorites (set user_id in the configuration)");
    }

    let entries = ctx
        .favorites
        .recent()
        .await
        .context("Failed to load favorites")?;

    let ids: Vec<String> = entries.iter().map(|e| e.menu_id.clone()).collect();
    let meals: HashMap<String, MealRecord> = match ctx.repository.fetch_ids(&ids).await {
        Ok(records) => records.into_iter().map(|m| (m.id.clone(), m)).collect(),
        Err(err) => {
            warn!("Favorite meals unavailable [{:?}]: {}", err.kind(), err);
            HashMap::new()
        }
    };

    if ctx.output.json {
        let views: Vec<_> = entries
            .iter()
            .map(|entry| FavoriteView {
                entry,
                meal: meals.get(&entry.menu_id),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No favorites yet. Use 'mealbook like <MENU_ID>' to add one.");
        return Ok(());
    }

    println!("Favorites ({}):", entries.len());
    for entry in &entries {
        match meals.get(&entry.menu_id) {
            Some(meal) => println!(
                "  {}  {}  #{}",
                meal.date,
                render_meal(meal, true, ctx.output.color),
                entry.menu_id
            ),
            None => {
                let marker = if ctx.output.color {
                    "♥".red().to_string()
                } else {
                    "♥".to_string()
                };
                println!(
                    "  {} {}  (no longer listed)  #{}",
                    marker, entry.snapshot_name, entry.menu_id
                );
            }
        }
    }
    Ok(())
}
