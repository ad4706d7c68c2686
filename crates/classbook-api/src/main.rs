//! classbook-server binary.
//!
//! Reads `classbook.toml` (or the path given with `--config`) and
//! `CLASSBOOK_*` environment variables, opens the SQLite store, and serves
//! the JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use classbook_api::ServerConfig;
use classbook_core::gradebook::Gradebook;
use classbook_store_sqlite::SqliteStore;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Classbook gradebook server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "classbook.toml")]
  config: PathBuf,

  /// Load the sample classes into an empty store before serving.
  #[arg(long)]
  seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CLASSBOOK"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let corrupt = store.corrupt_copies().await?;
  if !corrupt.is_empty() {
    tracing::warn!(count = corrupt.len(), "store holds set-aside gradebook copies");
  }

  let gradebook = Gradebook::new(store)
    .with_missing_attendance(server_cfg.attendance_missing)
    .with_deletion_cooldown(Duration::from_secs(server_cfg.deletion_cooldown));

  if cli.seed && gradebook.seed_demo().await? {
    tracing::info!("loaded sample classes");
  }

  let app = classbook_api::api_router(Arc::new(gradebook));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
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
