//! Command implementations. Each writes its human-readable output to `out`.

use std::{
  io::{BufRead, Write},
  path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use classbook_core::{
  aggregate::format_grade,
  gradebook::Gradebook,
  report::{Report, RosterField, Scope},
  store::DocumentStore,
};
use classbook_store_sqlite::SqliteStore;

// ── Backup ────────────────────────────────────────────────────────────────

pub async fn export_backup<S: DocumentStore>(
  gradebook: &Gradebook<S>,
  dir: &Path,
  out: &mut impl Write,
) -> Result<()> {
  let file = gradebook.export_backup().await?;
  let path: PathBuf = dir.join(&file.file_name);
  std::fs::write(&path, file.contents)
    .with_context(|| format!("writing backup to {}", path.display()))?;
  writeln!(out, "{}", path.display())?;
  Ok(())
}

pub async fn import_backup<S: DocumentStore>(
  gradebook: &Gradebook<S>,
  file: &Path,
  out: &mut impl Write,
) -> Result<()> {
  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading backup {}", file.display()))?;
  let summary = gradebook.import_backup(&raw).await?;
  tracing::info!(file = %file.display(), "backup imported");
  writeln!(
    out,
    "imported {} students in {} courses",
    summary.students, summary.courses
  )?;
  Ok(())
}

// ── Reports ───────────────────────────────────────────────────────────────

pub async fn roster<S: DocumentStore>(
  gradebook: &Gradebook<S>,
  course: Option<&str>,
  fields: &[String],
) -> Result<Report> {
  let fields = if fields.is_empty() {
    RosterField::default_selection()
  } else {
    fields
      .iter()
      .map(|f| f.parse())
      .collect::<Result<Vec<RosterField>, _>>()?
  };
  Ok(gradebook.roster_report(&Scope::from_param(course), &fields).await?)
}

pub async fn gradebook<S: DocumentStore>(
  gradebook: &Gradebook<S>,
  course: Option<&str>,
) -> Result<Report> {
  Ok(gradebook.gradebook_report(&Scope::from_param(course)).await?)
}

pub fn print_report(report: &Report, json: bool, out: &mut impl Write) -> Result<()> {
  if json {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
  } else {
    write!(out, "{}", report.to_text())?;
  }
  Ok(())
}

// ── Courses ───────────────────────────────────────────────────────────────

pub async fn courses<S: DocumentStore>(gradebook: &Gradebook<S>, out: &mut impl Write) -> Result<()> {
  let overview = gradebook.overview().await?;
  for summary in &overview.courses {
    writeln!(
      out,
      "{:<12} {:>3} students  {:>2} activities  {:>3}% graded  avg {}",
      summary.course,
      summary.students,
      summary.activities,
      summary.compliance.percent,
      format_grade(summary.compliance.average),
    )?;
  }
  writeln!(
    out,
    "{} students in {} courses",
    overview.total_students, overview.total_courses
  )?;
  Ok(())
}

// ── Settings ──────────────────────────────────────────────────────────────

/// Read `count` trimmed lines from `input`.
pub fn read_lines(input: impl BufRead, count: usize) -> Result<Vec<String>> {
  let lines = input
    .lines()
    .take(count)
    .map(|l| l.map(|l| l.trim().to_owned()))
    .collect::<std::io::Result<Vec<_>>>()?;
  if lines.len() < count {
    bail!("expected {count} lines on stdin, got {}", lines.len());
  }
  Ok(lines)
}

pub async fn set_code<S: DocumentStore>(
  gradebook: &Gradebook<S>,
  current: &str,
  new: &str,
  confirm: &str,
  out: &mut impl Write,
) -> Result<()> {
  gradebook.change_security_code(current, new, confirm).await?;
  writeln!(out, "security code changed")?;
  Ok(())
}

// ── Maintenance ───────────────────────────────────────────────────────────

pub async fn seed<S: DocumentStore>(gradebook: &Gradebook<S>, out: &mut impl Write) -> Result<()> {
  if gradebook.seed_demo().await? {
    writeln!(out, "loaded sample classes")?;
  } else {
    writeln!(out, "store already has students; nothing loaded")?;
  }
  Ok(())
}

pub async fn corrupt(store: &SqliteStore, out: &mut impl Write) -> Result<()> {
  for key in store.corrupt_copies().await? {
    writeln!(out, "{key}")?;
  }
  Ok(())
}
