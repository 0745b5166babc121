use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn, Level};

use wellrs::config::AppConfig;
use wellrs::database::SqliteRecordStore;
use wellrs::engine::WellnessEngine;
use wellrs::error::WellnessError;
use wellrs::logging::init_logging;
use wellrs::models::{MentalRecord, PhysicalRecord, SleepRecord, UserId};
use wellrs::report::{render, OutputFormat};

/// WellRS - Wellness Analytics CLI
///
/// Log physical, mental and sleep records and turn the recent window into a
/// single wellness score with insights, recommendations and daily trends.
#[derive(Parser)]
#[command(name = "wellrs")]
#[command(author = "WellRS Contributors")]
#[command(version)]
#[command(about = "Wellness Analytics CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the SQLite database location
    #[arg(short, long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append a record to the store
    Log {
        #[command(subcommand)]
        record: LogCommand,
    },

    /// Compute the wellness summary for a trailing window
    Summary {
        /// User to summarize (defaults to settings.default_user_id)
        #[arg(short, long)]
        user: Option<UserId>,

        /// Trailing window in days (defaults to scoring.default_window_days)
        #[arg(short, long, allow_hyphen_values = true)]
        window: Option<i64>,

        /// Output format (text, json)
        #[arg(short = 'f', long, default_value = "text")]
        format: OutputFormat,
    },

    /// Configure application settings
    Config {
        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(Subcommand)]
enum LogCommand {
    /// Vitals and activity
    Physical {
        #[arg(short, long)]
        user: Option<UserId>,

        /// Timestamp (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(long)]
        heart_rate: Option<i32>,

        #[arg(long)]
        bp_sys: Option<i32>,

        #[arg(long)]
        bp_dia: Option<i32>,

        #[arg(long)]
        steps: Option<i32>,

        #[arg(long)]
        calories: Option<i32>,

        /// Body temperature in °C
        #[arg(long)]
        temperature: Option<f64>,
    },

    /// Mood, stress, anxiety and energy on 1-10 scales
    Mental {
        #[arg(short, long)]
        user: Option<UserId>,

        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(long)]
        mood: Option<i32>,

        #[arg(long)]
        stress: Option<i32>,

        #[arg(long)]
        anxiety: Option<i32>,

        #[arg(long)]
        energy: Option<i32>,

        #[arg(long)]
        sleep_quality: Option<i32>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// A night of sleep
    Sleep {
        #[arg(short, long)]
        user: Option<UserId>,

        #[arg(long)]
        at: Option<DateTime<Utc>>,

        /// Total sleep in hours
        #[arg(long)]
        hours: Option<f64>,

        #[arg(long)]
        quality: Option<i32>,

        #[arg(long)]
        bedtime: Option<DateTime<Utc>>,

        #[arg(long)]
        wake_time: Option<DateTime<Utc>>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    let database_path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.settings.resolved_database_path());
    debug!(database = %database_path.display(), "Resolved database path");

    match cli.command {
        Commands::Log { record } => log_record(&config, &database_path, record),
        Commands::Summary {
            user,
            window,
            format,
        } => {
            let engine = WellnessEngine::from_config(&config)?;
            let store = open_store(&database_path)?;
            let user_id = user.unwrap_or(config.settings.default_user_id);

            let outcome = match engine.compute_summary(&store, user_id, window) {
                Ok(outcome) => outcome,
                Err(err) => {
                    report_error(&err);
                    return Err(err.into());
                }
            };

            println!("{}", render(&outcome, format)?);
            Ok(())
        }
        Commands::Config { init, show } => manage_config(cli.config, config, init, show),
    }
}

/// Log a failed summary at its severity and show the user-facing message
fn report_error(err: &WellnessError) {
    if err.severity().to_tracing_level() == Level::ERROR {
        error!(error = %err, "Summary failed");
    } else {
        warn!(error = %err, "Summary request rejected");
    }

    eprintln!("{}", err.user_message().red());
    if err.is_retryable() {
        eprintln!("{}", "The record store is busy. Try again in a moment.".yellow());
    }
}

fn open_store(path: &Path) -> Result<SqliteRecordStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }
    SqliteRecordStore::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))
}

fn log_record(config: &AppConfig, database_path: &Path, record: LogCommand) -> Result<()> {
    let store = open_store(database_path)?;
    let default_user = config.settings.default_user_id;

    match record {
        LogCommand::Physical {
            user,
            at,
            heart_rate,
            bp_sys,
            bp_dia,
            steps,
            calories,
            temperature,
        } => {
            let record = PhysicalRecord {
                user_id: user.unwrap_or(default_user),
                timestamp: at.unwrap_or_else(Utc::now),
                heart_rate,
                bp_sys,
                bp_dia,
                steps,
                calories_burned: calories,
                temperature,
            };
            if [heart_rate, bp_sys, bp_dia, steps, calories].iter().all(Option::is_none)
                && temperature.is_none()
            {
                bail!("Provide at least one measurement to log");
            }
            store.insert_physical(&record)?;
            println!("{}", "✓ Physical record logged".green());
        }
        LogCommand::Mental {
            user,
            at,
            mood,
            stress,
            anxiety,
            energy,
            sleep_quality,
            notes,
        } => {
            if [mood, stress, anxiety, energy, sleep_quality].iter().all(Option::is_none)
                && notes.is_none()
            {
                bail!("Provide at least one rating or a note to log");
            }
            let record = MentalRecord {
                user_id: user.unwrap_or(default_user),
                timestamp: at.unwrap_or_else(Utc::now),
                mood_score: mood,
                stress_level: stress,
                anxiety_level: anxiety,
                energy_level: energy,
                sleep_quality,
                notes,
            };
            store.insert_mental(&record)?;
            println!("{}", "✓ Mental health record logged".green());
        }
        LogCommand::Sleep {
            user,
            at,
            hours,
            quality,
            bedtime,
            wake_time,
        } => {
            let record = SleepRecord {
                user_id: user.unwrap_or(default_user),
                timestamp: at.or(wake_time).unwrap_or_else(Utc::now),
                duration_hours: hours,
                quality,
                bedtime,
                wake_time,
            };
            if record.effective_duration_hours().is_none() && quality.is_none() {
                bail!("Provide --hours, --quality, or both --bedtime and --wake-time");
            }
            store.insert_sleep(&record)?;
            println!("{}", "✓ Sleep record logged".green());
        }
    }

    Ok(())
}

fn manage_config(path: Option<PathBuf>, mut config: AppConfig, init: bool, show: bool) -> Result<()> {
    let config_path = path.unwrap_or_else(AppConfig::default_config_path);

    if init {
        if config_path.exists() {
            bail!("Config file already exists: {}", config_path.display());
        }
        config = AppConfig::default();
        config.save_to_file(&config_path)?;
        println!(
            "{} {}",
            "✓ Wrote default configuration to".green(),
            config_path.display()
        );
    }

    if show || !init {
        println!("{}", format!("# {}", config_path.display()).dimmed());
        println!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?
        );
    }

    Ok(())
}
