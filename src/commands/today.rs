// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Today command - breakfast and dinner for one day

use super::{show_range, Context};
use crate::calendar::{DayRange, Filters};
use anyhow::Result;
use chrono::NaiveDate;

/// Show the meals of `date`
pub async fn run(ctx: &Context, date: NaiveDate) -> Result<()> {
    show_range(ctx, DayRange::day(date), &Filters::default()).await
}
