mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    Tracker, cmd_classify, cmd_delete, cmd_export, cmd_families, cmd_family, cmd_history,
    cmd_import, cmd_log, cmd_stats,
};
use crate::config::Config;
use bidou_core::service::TrackerService;
use bidou_core::stats::{GroupBy, TimeWindow};

#[derive(Parser)]
#[command(
    name = "bidou",
    version,
    about = "A meal journal that links what you eat to stomach pain",
    long_about = "A meal journal that links what you eat to stomach pain.\n\n\
        Log each meal with its ingredients and a pain score from 1 to 5, then \
        see which ingredients and food families hurt the most."
)]
struct Cli {
    /// Meal history to use: a `.json` snapshot file or a SQLite database
    #[arg(long, global = true)]
    store: Option<PathBuf>,
    /// Food family catalog (JSON array of {id, label, keywords})
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a meal and how much it hurt
    Log {
        /// Ingredient, repeatable or comma separated (e.g. -i "riz, poulet")
        #[arg(short, long = "ingredient", required = true)]
        ingredients: Vec<String>,
        /// Pain score from 1 (none) to 5 (severe)
        #[arg(short, long)]
        pain: i64,
        /// Time of day: morning, noon, evening
        #[arg(short, long, default_value = "noon")]
        time: String,
        /// Date of the meal (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Meal type: homemade, processed, restaurant
        #[arg(long)]
        meal_type: Option<String>,
        /// How you felt: overate, too_fatty
        #[arg(long)]
        feeling: Option<String>,
        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List logged meals with their positions
    History {
        /// Only the last N days (default: all meals)
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal by its position in `history`
    Delete {
        /// Position shown by `history` (starting at 1)
        position: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Average pain per ingredient or food family, worst first
    Stats {
        /// Group by: ingredient or family
        #[arg(short, long, default_value = "family")]
        by: String,
        /// Time window: all, week, month, or a number of days
        #[arg(short, long, default_value = "all")]
        window: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Meals containing an ingredient of one family
    Family {
        /// Family id (see `families`)
        id: String,
        /// Time window: all, week, month, or a number of days
        #[arg(short, long, default_value = "all")]
        window: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the food families and their keywords
    Families {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which family ingredient names fall into
    Classify {
        /// Ingredient names
        #[arg(required = true)]
        labels: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export the meal history
    Export {
        /// Output file, `-` for stdout
        file: PathBuf,
        /// Output format: json or csv
        #[arg(short, long, default_value = "json")]
        format: String,
    },
    /// Import meals from a JSON snapshot, appending to the history
    Import {
        /// Path to the JSON snapshot
        file: PathBuf,
        /// Preview what would be imported without saving
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let catalog = config.load_catalog(cli.catalog.as_deref())?;
    let store = config.open_store(cli.store.as_deref())?;
    let mut tracker: Tracker<'_> = TrackerService::with_catalog(store, &catalog);

    match cli.command {
        Commands::Log {
            ingredients,
            pain,
            time,
            date,
            meal_type,
            feeling,
            note,
            json,
        } => cmd_log(
            &mut tracker,
            &ingredients,
            pain,
            &time,
            date,
            meal_type.as_deref(),
            feeling.as_deref(),
            note,
            json,
        ),
        Commands::History { days, json } => {
            let window = days.map_or(TimeWindow::All, TimeWindow::Days);
            cmd_history(&tracker, window, json)
        }
        Commands::Delete { position, json } => cmd_delete(&mut tracker, position, json),
        Commands::Stats { by, window, json } => cmd_stats(
            &tracker,
            by.parse::<GroupBy>()?,
            window.parse::<TimeWindow>()?,
            json,
        ),
        Commands::Family { id, window, json } => {
            cmd_family(&tracker, &id, window.parse::<TimeWindow>()?, json)
        }
        Commands::Families { json } => cmd_families(&tracker, json),
        Commands::Classify { labels, json } => cmd_classify(&tracker, &labels, json),
        Commands::Export { file, format } => cmd_export(&tracker, &format, &file),
        Commands::Import {
            file,
            dry_run,
            json,
        } => cmd_import(&mut tracker, &file, dry_run, json),
    }
}
