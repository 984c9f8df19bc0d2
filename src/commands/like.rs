// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Like command - toggles the favorite status of one meal

use super::Context;
use crate::error::ToggleError;
use crate::favorites::FavoriteState;
use crate::repository::parse_row;
use crate::store::{Entity, Filter, Query, RemoteStore};
use crate::types::MealRecord;
use anyhow::{Context as _, Result};
use serde_json::json;
use tracing::info;

/// Flip the favorite status of `menu_id`
pub async fn run(ctx: &Context, menu_id: &str) -> Result<()> {
    if ctx.favorites.session().user().is_none() {
        return Err::<(), _>(ToggleError::AuthRequired)
            .context("Set user_id and access_token in the configuration to keep favorites");
    }

    let meal = find_meal(ctx, menu_id).await?;
    ctx.load_favorites().await;

    let state = ctx
        .favorites
        .toggle(&meal.id, &meal.content.display())
        .await
        .with_context(|| format!("Failed to update favorite {}", meal.id))?;
    info!("Favorite {} committed as {:?}", meal.id, state);

    if ctx.output.json {
        println!("{}", json!({ "menu_id": meal.id, "state": state }));
    } else if state == FavoriteState::Liked {
        println!("♥ Liked #{} ({} {}): {}", meal.id, meal.date, meal.meal_type, meal.content);
    } else {
        println!("Removed #{} from favorites", meal.id);
    }
    Ok(())
}

async fn find_meal(ctx: &Context, menu_id: &str) -> Result<MealRecord> {
    let query = Query::new(Entity::Menus)
        .filter(Filter::eq("id", menu_id))
        .limit(1);
    let rows = ctx
        .repository
        .store()
        .query(&query)
        .await
        .with_context(|| format!("Failed to look up meal {}", menu_id))?;

    rows.iter()
        .find_map(parse_row)
        .ok_or_else(|| anyhow::anyhow!("Meal not found: {}", menu_id))
}
