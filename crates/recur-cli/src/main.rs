//! `recur` CLI: expand recurrence rules, evaluate schedules and convert
//! durations from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Last Friday of each month in the first half of 2026
//! recur expand "FREQ=MONTHLY;BYDAY=-1FR" --start 2026-01-01T09:00:00 --to 2026-06-30T23:59:59
//!
//! # Same, as a JSON array, skipping the first quarter
//! recur expand "FREQ=MONTHLY;BYDAY=-1FR" --start 2026-01-01T09:00:00 \
//!     --from 2026-04-01T00:00:00 --to 2026-06-30T23:59:59 --json
//!
//! # Weekdays minus a rule, 45 minutes each
//! recur schedule --start 2026-01-05T09:00:00 --to 2026-01-31T23:59:59 \
//!     --include "FREQ=DAILY" --exclude "FREQ=WEEKLY;BYDAY=SA,SU" --duration PT45M
//!
//! # Convert a duration
//! recur duration P1W --unit day
//!
//! # Validate and normalize a rule
//! recur check "RRULE:BYDAY=MO;FREQ=WEEKLY;INTERVAL=1"
//! ```
//!
//! Log output goes to stderr. `RUST_LOG` takes precedence over `--log-level`.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use recur_engine::{
    duration_to, CalendarEntity, Duration, ExpansionWindow, Occurrence, RecurrenceRule, RuleBook,
};
use tracing_subscriber::EnvFilter;

/// Output format for instants.
const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Parser)]
#[command(
    name = "recur",
    version,
    about = "Expand iCalendar recurrence rules and ISO 8601 durations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace); overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand one RRULE into its instants
    Expand {
        /// RRULE value, e.g. "FREQ=WEEKLY;BYDAY=MO,WE"
        rule: String,
        /// Start instant (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        start: String,
        /// Window start; defaults to --start
        #[arg(long)]
        from: Option<String>,
        /// Window end (inclusive)
        #[arg(long)]
        to: String,
        /// Stop after this many instants
        #[arg(long)]
        limit: Option<usize>,
        /// Print a JSON array instead of one instant per line
        #[arg(long)]
        json: bool,
    },
    /// Combine inclusion and exclusion rules around a start instant
    Schedule {
        /// Start instant (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        start: String,
        /// Window start; defaults to --start
        #[arg(long)]
        from: Option<String>,
        /// Window end (inclusive)
        #[arg(long)]
        to: String,
        /// Inclusion rule (repeatable)
        #[arg(long)]
        include: Vec<String>,
        /// Exclusion rule (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Length of each occurrence, e.g. PT1H
        #[arg(long, allow_hyphen_values = true)]
        duration: Option<String>,
        /// Print JSON objects with start and end
        #[arg(long)]
        json: bool,
    },
    /// Convert an ISO 8601 duration into a time unit
    Duration {
        /// Duration text, e.g. P1DT2H or -PT15M
        #[arg(allow_hyphen_values = true)]
        text: String,
        /// week, day, hour, minute or second
        #[arg(long, default_value = "second")]
        unit: String,
        /// Print the canonical duration text instead of a number
        #[arg(long, conflicts_with = "unit")]
        canonical: bool,
    },
    /// Validate an RRULE and print its canonical form
    Check {
        /// RRULE value
        rule: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Expand {
            rule,
            start,
            from,
            to,
            limit,
            json,
        } => {
            let rule = parse_rule(&rule)?;
            let start = parse_instant("--start", &start)?;
            let window = parse_window(start, from.as_deref(), &to)?;

            let instants: Vec<NaiveDateTime> = rule
                .occurrences(start, window)
                .take(limit.unwrap_or(usize::MAX))
                .collect();
            tracing::info!(rule = %rule, instants = instants.len(), "expanded rule");

            if json {
                let rendered: Vec<String> = instants.iter().map(|t| format_instant(*t)).collect();
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else {
                for instant in instants {
                    println!("{}", format_instant(instant));
                }
            }
        }
        Commands::Schedule {
            start,
            from,
            to,
            include,
            exclude,
            duration,
            json,
        } => {
            let start = parse_instant("--start", &start)?;
            let window = parse_window(start, from.as_deref(), &to)?;

            let mut book = RuleBook::new();
            let mut entity = CalendarEntity::event(start);
            for text in &include {
                entity = entity.include(book.insert(parse_rule(text)?));
            }
            for text in &exclude {
                entity = entity.exclude(book.insert(parse_rule(text)?));
            }
            if let Some(text) = duration {
                let duration: Duration = text
                    .parse()
                    .with_context(|| format!("Invalid --duration '{}'", text))?;
                entity = entity.with_duration(duration).context("Invalid --duration")?;
            }

            let occurrences = entity
                .occurrences(&book, window)
                .context("Failed to evaluate schedule")?;
            tracing::info!(
                inclusions = include.len(),
                exclusions = exclude.len(),
                occurrences = occurrences.len(),
                "evaluated schedule"
            );
            print_occurrences(&occurrences, json)?;
        }
        Commands::Duration {
            text,
            unit,
            canonical,
        } => {
            if canonical {
                let duration: Duration = text
                    .parse()
                    .with_context(|| format!("Invalid duration '{}'", text))?;
                println!("{}", duration);
            } else {
                let amount = duration_to(&text, &unit)
                    .with_context(|| format!("Failed to convert '{}' to {}", text, unit))?;
                println!("{}", amount);
            }
        }
        Commands::Check { rule } => {
            println!("{}", parse_rule(&rule)?);
        }
    }

    Ok(())
}

/// Install a stderr subscriber. `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid --log-level '{}'", level))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn parse_rule(text: &str) -> Result<RecurrenceRule> {
    text.parse().with_context(|| format!("Invalid rule '{}'", text))
}

fn parse_instant(flag: &str, text: &str) -> Result<NaiveDateTime> {
    recur_engine::parse_instant(text).with_context(|| format!("Invalid {}", flag))
}

fn parse_window(start: NaiveDateTime, from: Option<&str>, to: &str) -> Result<ExpansionWindow> {
    let from = match from {
        Some(text) => parse_instant("--from", text)?,
        None => start,
    };
    let to = parse_instant("--to", to)?;
    ExpansionWindow::new(from, to).context("Invalid window")
}

fn format_instant(instant: NaiveDateTime) -> String {
    instant.format(INSTANT_FORMAT).to_string()
}

fn print_occurrences(occurrences: &[Occurrence], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(occurrences)?);
        return Ok(());
    }
    for o in occurrences {
        if o.start == o.end {
            println!("{}", format_instant(o.start));
        } else {
            println!("{} {}", format_instant(o.start), format_instant(o.end));
        }
    }
    Ok(())
}
