//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;

use classbook_core::{
  document::Document,
  settings::Settings,
  store::{DOCUMENT_KEY, DocumentStore, SETTINGS_KEY},
};

use crate::{Error, Result, schema::SCHEMA};

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run on the connection thread, inside `Connection::call`.

type CallResult<T> = std::result::Result<T, tokio_rusqlite::Error>;

fn now_str() -> String { Utc::now().to_rfc3339() }

fn read_value(conn: &rusqlite::Connection, key: &str) -> CallResult<Option<String>> {
  Ok(
    conn
      .query_row(
        "SELECT value FROM documents WHERE key = ?1",
        rusqlite::params![key],
        |row| row.get(0),
      )
      .optional()?,
  )
}

fn write_value(conn: &rusqlite::Connection, key: &str, value: &str) -> CallResult<()> {
  conn.execute(
    "INSERT INTO documents (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    rusqlite::params![key, value, now_str()],
  )?;
  Ok(())
}

fn other<E>(err: E) -> tokio_rusqlite::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tokio_rusqlite::Error::Other(Box::new(err))
}

/// Load the gradebook document.
///
/// Students stored without an id get one, and the document is written back
/// so the id is the same on the next read. A value that does not parse is
/// copied to `sms_data_v1.corrupt.<timestamp>` and removed, and an empty
/// document is returned in its place. Call inside a transaction.
fn read_document(conn: &rusqlite::Connection, today: NaiveDate) -> CallResult<Document> {
  let Some(raw) = read_value(conn, DOCUMENT_KEY)? else {
    return Ok(Document::default());
  };

  match Document::from_stored_json(&raw, today) {
    Ok((doc, 0)) => Ok(doc),
    Ok((doc, new_ids)) => {
      tracing::info!(students = new_ids, "assigned ids to stored students");
      write_document(conn, &doc, today)?;
      Ok(doc)
    }
    Err(err) => {
      let aside = format!(
        "{DOCUMENT_KEY}.corrupt.{}",
        Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
      );
      tracing::warn!(
        error = %err,
        preserved_as = %aside,
        "stored gradebook does not parse; continuing with an empty document"
      );
      write_value(conn, &aside, &raw)?;
      conn.execute(
        "DELETE FROM documents WHERE key = ?1",
        rusqlite::params![DOCUMENT_KEY],
      )?;
      Ok(Document::default())
    }
  }
}

fn write_document(
  conn: &rusqlite::Connection,
  doc: &Document,
  today: NaiveDate,
) -> CallResult<()> {
  let json = doc.to_json(today).map_err(other)?;
  write_value(conn, DOCUMENT_KEY, &json)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Classbook store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every call
/// is serialized on the connection thread, and [`DocumentStore::modify`]
/// runs its read, mutation and write in one transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Keys of gradebook copies that were set aside because they did not
  /// parse, oldest first.
  pub async fn corrupt_copies(&self) -> Result<Vec<String>> {
    let pattern = format!("{DOCUMENT_KEY}.corrupt.%");
    let keys = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare("SELECT key FROM documents WHERE key LIKE ?1 ORDER BY key")?;
        let keys = stmt
          .query_map(rusqlite::params![pattern], |row| row.get(0))?
          .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys)
  }

  /// Raw JSON stored under `key`.
  pub async fn raw(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    Ok(self.conn.call(move |conn| read_value(conn, &key)).await?)
  }

  #[cfg(test)]
  pub(crate) async fn put_raw(&self, key: &str, value: &str) -> Result<()> {
    let (key, value) = (key.to_owned(), value.to_owned());
    Ok(
      self
        .conn
        .call(move |conn| write_value(conn, &key, &value))
        .await?,
    )
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn load(&self, today: NaiveDate) -> Result<Document> {
    let doc = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let doc = read_document(&tx, today)?;
        tx.commit()?;
        Ok(doc)
      })
      .await?;
    Ok(doc)
  }

  async fn save(&self, doc: Document, today: NaiveDate) -> Result<()> {
    let json = doc.to_json(today)?;
    self
      .conn
      .call(move |conn| write_value(conn, DOCUMENT_KEY, &json))
      .await?;
    tracing::debug!(students = doc.students.len(), "gradebook saved");
    Ok(())
  }

  async fn modify<F, T>(&self, today: NaiveDate, f: F) -> Result<T>
  where
    F: FnOnce(&mut Document) -> T + Send + 'static,
    T: Send + 'static,
  {
    let out = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut doc = read_document(&tx, today)?;
        let before = doc.clone();
        let out = f(&mut doc);
        if doc != before {
          write_document(&tx, &doc, today)?;
        }
        tx.commit()?;
        Ok(out)
      })
      .await?;
    Ok(out)
  }

  async fn load_settings(&self) -> Result<Settings> {
    let raw = self
      .conn
      .call(|conn| read_value(conn, SETTINGS_KEY))
      .await?;

    let Some(raw) = raw else {
      return Ok(Settings::default());
    };
    match serde_json::from_str(&raw) {
      Ok(settings) => Ok(settings),
      Err(err) => {
        tracing::warn!(error = %err, "stored settings do not parse; using defaults");
        Ok(Settings::default())
      }
    }
  }

  async fn save_settings(&self, settings: Settings) -> Result<()> {
    let json = serde_json::to_string(&settings)?;
    self
      .conn
      .call(move |conn| write_value(conn, SETTINGS_KEY, &json))
      .await?;
    Ok(())
  }
}
