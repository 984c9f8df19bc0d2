// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Search command - substring search over a year of meals

use super::{meal_views, render_meal, Context};
use crate::search::SearchIndex;
use anyhow::Result;
use tracing::info;

/// Print every meal of the configured year whose dishes contain `term`
pub async fn run(ctx: &Context, term: &str) -> Result<()> {
    let year = ctx.config.search_year;
    let mut index = SearchIndex::for_year(ctx.repository.clone(), year)
        .ok_or_else(|| anyhow::anyhow!("Unsupported search year: {}", year))?;

    info!("Searching {} {} for {:?}", ctx.city, year, term);
    let hits = index.search_in(&ctx.city, term).await;
    if !index.is_loaded(&ctx.city) {
        anyhow::bail!("Search index for {} could not be loaded", ctx.city);
    }

    ctx.load_favorites().await;
    let liked = ctx.favorites.liked_ids();

    if ctx.output.json {
        println!("{}", serde_json::to_string_pretty(&meal_views(&hits, &liked))?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No meals matching '{}' in {} {}", term, ctx.city, year);
        return Ok(());
    }

    println!("Meals matching '{}' in {} {} ({}):", term, ctx.city, year, hits.len());
    for meal in &hits {
        println!(
            "  {}  {}",
            meal.date,
            render_meal(meal, liked.contains(&meal.id), ctx.output.color)
        );
    }
    Ok(())
}
