//! src/store.rs
use anyhow::Context;
use rusqlite::{Connection, OpenFlags, params};
use std::path::Path;

/// One key/value record. Both fields are opaque text; equality on `key`
/// governs reducer grouping.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Pair {
    pub key: String,
    pub value: String,
}

impl Pair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// An on-disk table of `Pair` rows, schema `pairs(key TEXT, value TEXT)`.
///
/// Stores are single-writer. A store must be closed before its file is
/// exposed through the file server.
#[derive(Debug)]
pub struct RecordStore {
    conn: Connection,
}

const PRAGMAS: &str = "\
    PRAGMA busy_timeout = 10000; \
    PRAGMA journal_mode = OFF; \
    PRAGMA synchronous = OFF;";

impl RecordStore {
    /// Creates an empty store at `path`, replacing any existing file.
    pub fn create(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("failed to replace existing store {}", path.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to create store {}", path.display()))?;
        conn.execute_batch(PRAGMAS)
            .context("failed to apply store pragmas")?;
        conn.execute_batch("CREATE TABLE pairs (key TEXT, value TEXT);")
            .with_context(|| format!("failed to create pairs table in {}", path.display()))?;
        Ok(Self { conn })
    }

    /// Opens an existing store; fails if the file is missing.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("failed to open store {}", path.display()))?;
        conn.execute_batch(PRAGMAS)
            .context("failed to apply store pragmas")?;
        Ok(Self { conn })
    }

    pub fn insert(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                "INSERT INTO pairs (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .context("failed to insert pair")?;
        Ok(())
    }

    pub fn count(&self) -> anyhow::Result<u64> {
        let rows: i64 = self
            .conn
            .query_row("SELECT count(1) FROM pairs", [], |row| row.get(0))
            .context("failed to count pairs")?;
        Ok(rows as u64)
    }

    /// Bulk-appends every row of the store file at `other` into this store.
    pub fn gather_into(&self, other: &Path) -> anyhow::Result<()> {
        let other = other
            .to_str()
            .context("store path is not valid UTF-8")?
            .to_string();
        self.conn
            .execute("ATTACH DATABASE ?1 AS feed", params![other])
            .context("failed to attach store")?;
        let appended = self
            .conn
            .execute("INSERT INTO pairs SELECT key, value FROM feed.pairs", [])
            .context("failed to bulk-insert attached pairs")?;
        self.conn
            .execute("DETACH DATABASE feed", [])
            .context("failed to detach store")?;
        tracing::debug!("gathered {appended} pairs");
        Ok(())
    }

    /// Visits every row in table-scan order.
    pub fn for_each(&self, mut f: impl FnMut(Pair) -> anyhow::Result<()>) -> anyhow::Result<()> {
        let mut statement = self
            .conn
            .prepare("SELECT key, value FROM pairs")
            .context("failed to prepare scan")?;
        let mut rows = statement.query([]).context("failed to start scan")?;
        while let Some(row) = rows.next().context("scan failed")? {
            f(Pair {
                key: row.get(0).context("failed to read key")?,
                value: row.get(1).context("failed to read value")?,
            })?;
        }
        Ok(())
    }

    /// Visits every row ordered by `(key, value)` ascending.
    pub fn for_each_ordered(
        &self,
        mut f: impl FnMut(Pair) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let mut statement = self
            .conn
            .prepare("SELECT key, value FROM pairs ORDER BY key, value")
            .context("failed to prepare ordered scan")?;
        let mut rows = statement.query([]).context("failed to start ordered scan")?;
        while let Some(row) = rows.next().context("ordered scan failed")? {
            f(Pair {
                key: row.get(0).context("failed to read key")?,
                value: row.get(1).context("failed to read value")?,
            })?;
        }
        Ok(())
    }

    pub fn all_pairs_ordered(&self) -> anyhow::Result<Vec<Pair>> {
        let mut pairs = vec![];
        self.for_each_ordered(|pair| {
            pairs.push(pair);
            Ok(())
        })?;
        Ok(pairs)
    }

    pub fn close(self) -> anyhow::Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("failed to close store")
    }
}
