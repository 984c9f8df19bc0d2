// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Mealbook CLI - cafeteria breakfasts and dinners from the terminal

use anyhow::{Context as _, Result};
use chrono::{Local, NaiveDate};
use clap::{CommandFactory, Parser, Subcommand};
use mealbook::calendar::MealTypeFilter;
use mealbook::commands::{self, Context, Output};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mealbook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "MEALBOOK_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// City to show (overrides the configured one)
    #[arg(long)]
    city: Option<String>,

    /// JSON store file to read instead of the remote store
    #[arg(long, env = "MEALBOOK_STORE_FILE")]
    store_file: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    no_color: bool,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show breakfast and dinner for one day
    Today {
        /// Day to show (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show the Monday-to-Sunday week around a day
    Week {
        /// Any day of the week (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show a month of meals
    Month {
        /// Month to show (YYYY-MM, default the current month)
        month: Option<String>,

        /// Meal types to keep (all, breakfast, dinner)
        #[arg(long, default_value = "all")]
        only: MealTypeFilter,

        /// Keep only meals whose dishes contain this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Search a year of meals for a dish
    Search {
        /// Text to look for, case-insensitive
        term: String,
    },

    /// List favorite meals, newest first
    Favorites,

    /// Like or unlike a meal
    Like {
        /// Meal id
        menu_id: String,
    },

    /// Print the effective configuration
    Config,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = mealbook::config::load(cli.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(city) = cli.city {
        config.city = city;
    }
    if let Some(store_file) = cli.store_file {
        config.store_file = Some(store_file);
    }

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let output = Output {
        json: cli.json,
        color: !cli.no_color,
    };
    let today = Local::now().date_naive();

    // Commands that need no store
    match cli.command {
        Commands::Config => return commands::config::run(&config, output),
        Commands::Completions { shell } => {
            return commands::completions::run(shell, &mut Cli::command());
        }
        _ => {}
    }

    let ctx = Context::open(config, output)?;

    // Execute command
    match cli.command {
        Commands::Today { date } => commands::today::run(&ctx, date.unwrap_or(today)).await,
        Commands::Week { date } => commands::week::run(&ctx, date.unwrap_or(today)).await,
        Commands::Month { month, only, search } => {
            let date = match month {
                Some(raw) => commands::month::parse_month(&raw)?,
                None => today,
            };
            commands::month::run(&ctx, date, only, search).await
        }
        Commands::Search { term } => commands::search::run(&ctx, &term).await,
        Commands::Favorites => commands::favorites::run(&ctx).await,
        Commands::Like { menu_id } => commands::like::run(&ctx, &menu_id).await,
        Commands::Config | Commands::Completions { .. } => Ok(()),
    }
}
