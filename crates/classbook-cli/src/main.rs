//! `classbook`: maintenance commands for a Classbook store.
//!
//! Works directly on the SQLite file the server uses.
//!
//! # Usage
//!
//! ```
//! classbook backup export --out ~/backups
//! classbook backup import backup-2025-06-15-1430.json
//! classbook report gradebook --course 6-A
//! classbook report roster --fields name,age,parentPhone --json
//! ```

mod commands;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use classbook_core::gradebook::Gradebook;
use classbook_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "classbook", version, about = "Maintenance commands for a Classbook store")]
struct Args {
  /// Path of the SQLite store.
  #[arg(
    long,
    env = "CLASSBOOK_STORE",
    default_value = "~/.local/share/classbook/classbook.db"
  )]
  store: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Export or import a full backup file.
  #[command(subcommand)]
  Backup(BackupCommand),

  /// Print a roster or gradebook report.
  Report {
    #[command(subcommand)]
    kind: ReportCommand,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,
  },

  /// List courses with student counts and compliance.
  Courses,

  /// Change the security code. Reads current, new and confirmation from
  /// stdin, one per line.
  SetCode,

  /// Load the sample classes into an empty store.
  Seed,

  /// List gradebook copies that were set aside because they did not parse.
  Corrupt,
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
  /// Write `backup-YYYY-MM-DD-HHMM.json` into a directory.
  Export {
    #[arg(long, default_value = ".")]
    out: PathBuf,
  },
  /// Replace the whole store with a backup file.
  Import { file: PathBuf },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
  Roster {
    /// Course to report on; every course when omitted.
    #[arg(long)]
    course: Option<String>,
    /// Comma-separated field keys, e.g. `name,age,parentPhone`.
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,
  },
  Gradebook {
    #[arg(long)]
    course: Option<String>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let store_path = expand_tilde(&args.store);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let gradebook = Gradebook::new(store);
  let mut out = std::io::stdout().lock();

  match args.command {
    Command::Backup(BackupCommand::Export { out: dir }) => {
      commands::export_backup(&gradebook, &expand_tilde(&dir), &mut out).await
    }
    Command::Backup(BackupCommand::Import { file }) => {
      commands::import_backup(&gradebook, &file, &mut out).await
    }
    Command::Report { kind, json } => {
      let report = match kind {
        ReportCommand::Roster { course, fields } => {
          commands::roster(&gradebook, course.as_deref(), &fields).await?
        }
        ReportCommand::Gradebook { course } => {
          commands::gradebook(&gradebook, course.as_deref()).await?
        }
      };
      commands::print_report(&report, json, &mut out)
    }
    Command::Courses => commands::courses(&gradebook, &mut out).await,
    Command::SetCode => {
      let lines = commands::read_lines(std::io::stdin().lock(), 3)?;
      commands::set_code(&gradebook, &lines[0], &lines[1], &lines[2], &mut out).await
    }
    Command::Seed => commands::seed(&gradebook, &mut out).await,
    Command::Corrupt => commands::corrupt(gradebook.store(), &mut out).await,
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
