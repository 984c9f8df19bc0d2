// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Week command - the Monday-to-Sunday week around a date

use super::{show_range, Context};
use crate::calendar::{DayRange, Filters};
use anyhow::Result;
use chrono::NaiveDate;

/// Show every meal of the week containing `date`
pub async fn run(ctx: &Context, date: NaiveDate) -> Result<()> {
    show_range(ctx, DayRange::week_of(date), &Filters::default()).await
}
