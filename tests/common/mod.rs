//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use vectora_backend::error::{Error, Result};
use vectora_backend::source::{prefetch, RowStream, SourceDatabase, SourceRow};

/// `sqlite:` URL that creates the file on first connect
pub fn sqlite_url(path: &Path) -> String {
    format!("sqlite:{}?mode=rwc", path.display())
}

/// Create a SQLite database at `path` and run `statements` against it
pub async fn seed_sqlite(path: &Path, statements: &[&str]) -> String {
    let url = sqlite_url(path);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }
    pool.close().await;
    url
}

/// The `users` / `logs` fixture: one keyed table and one without a key
pub const USERS_AND_LOGS: &[&str] = &[
    "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
    "INSERT INTO users (id, name) VALUES (1, 'a'), (2, 'b')",
    "CREATE TABLE logs (line TEXT)",
    "INSERT INTO logs (line) VALUES ('l1'), ('l2'), ('l3'), ('l4'), ('l5')",
];

/// A table served from memory, optionally failing part way through its scan
#[derive(Clone)]
pub struct ScriptedTable {
    pub name: String,
    pub primary_keys: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<SourceRow>,
    pub fail_after: Option<usize>,
}

impl ScriptedTable {
    pub fn new(name: &str, primary_keys: &[&str], columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            primary_keys: primary_keys.iter().map(|s| s.to_string()).collect(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
            fail_after: None,
        }
    }

    pub fn row(mut self, row: SourceRow) -> Self {
        self.rows.push(row);
        self
    }

    /// Deliver `rows` rows and then a driver error
    pub fn failing_after(mut self, rows: usize) -> Self {
        self.fail_after = Some(rows);
        self
    }
}

/// In-memory source database for paths a real database cannot easily produce
#[derive(Clone, Default)]
pub struct ScriptedSource {
    pub tables: Vec<ScriptedTable>,
    pub fail_listing: bool,
}

impl ScriptedSource {
    pub fn new(tables: Vec<ScriptedTable>) -> Self {
        Self {
            tables,
            fail_listing: false,
        }
    }

    /// A source whose table listing fails, which aborts the whole pass
    pub fn unreachable() -> Self {
        Self {
            tables: Vec::new(),
            fail_listing: true,
        }
    }

    fn table(&self, name: &str) -> Result<&ScriptedTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::Source(sqlx::Error::RowNotFound))
    }
}

#[async_trait]
impl SourceDatabase for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        if self.fail_listing {
            return Err(Error::Source(sqlx::Error::PoolTimedOut));
        }
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn primary_key_columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.primary_keys.clone())
    }

    async fn columns(&self, table: &str) -> Result<Vec<String>> {
        Ok(self.table(table)?.columns.clone())
    }

    fn stream_rows(&self, table: &str, fetch_size: usize) -> RowStream {
        let items: Vec<Result<SourceRow>> = match self.table(table) {
            Ok(t) => {
                let mut items: Vec<Result<SourceRow>> = match t.fail_after {
                    Some(n) => t.rows.iter().take(n).cloned().map(Ok).collect(),
                    None => t.rows.iter().cloned().map(Ok).collect(),
                };
                if t.fail_after.is_some() {
                    items.push(Err(Error::Source(sqlx::Error::Protocol(
                        "connection reset during scan".to_string(),
                    ))));
                }
                items
            }
            Err(e) => vec![Err(e)],
        };
        prefetch(futures::stream::iter(items), fetch_size)
    }
}
