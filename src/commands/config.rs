// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - prints the effective configuration

use super::Output;
use crate::config::Config;
use anyhow::Result;

/// Print `config` with credentials masked
pub fn run(config: &Config, output: Output) -> Result<()> {
    if output.json {
        println!("{}", serde_json::to_string_pretty(&config.redacted())?);
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
