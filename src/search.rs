//! Derived SQLite index over the file-backed item stores.
//!
//! The per-category JSON files are the single canonical store; this index
//! exists only to serve point lookups by item id and metadata-tag searches
//! without scanning every category. It is rebuilt per category on hydrate and
//! refreshed after every flush, so the read and write paths always agree.
//!
//! Metadata is stored as one `|`-delimited column (`|faq|help|`) and searched
//! with `LIKE '%|tag|%'`, which matches whole tags only.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::models::{ExternalItem, Item};
use crate::transform::to_external;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS content_items (
    id TEXT PRIMARY KEY,
    category_id TEXT NOT NULL,
    metadata TEXT NOT NULL,
    item_json TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_content_items_category ON content_items(category_id);
"#;

/// Handle on the derived search index.
pub struct SearchIndex {
    pool: SqlitePool,
}

impl SearchIndex {
    /// Open (creating if needed) the index database and ensure its schema.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Replace every indexed row for a category with the given items, in one
    /// transaction.
    pub async fn rebuild_category(&self, category_id: &str, items: &[Item]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM content_items WHERE category_id = ?")
            .bind(category_id)
            .execute(&mut *tx)
            .await?;

        for item in items {
            let item_json = serde_json::to_string(item)?;
            sqlx::query(
                "INSERT INTO content_items (id, category_id, metadata, item_json) VALUES (?, ?, ?, ?)",
            )
            .bind(&item.id)
            .bind(category_id)
            .bind(delimit_metadata(&item.metadata))
            .bind(item_json)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Drop indexed rows for the given item ids.
    pub async fn delete_items(&self, ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM content_items WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Fetch one item by exact id.
    pub async fn get_by_id(&self, item_id: &str) -> Result<Option<ExternalItem>> {
        let row: Option<String> =
            sqlx::query_scalar("SELECT item_json FROM content_items WHERE id = ?")
                .bind(item_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(json) => {
                let item: Item = serde_json::from_str(&json)?;
                Ok(to_external(Some(&item)))
            }
            None => Ok(None),
        }
    }

    /// Fetch every item whose metadata contains the given tag.
    pub async fn get_by_metadata_tag(&self, tag: &str) -> Result<Vec<ExternalItem>> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT item_json FROM content_items WHERE metadata LIKE ? ORDER BY id",
        )
        .bind(format!("%|{tag}|%"))
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for json in rows {
            let item: Item = serde_json::from_str(&json)?;
            if let Some(external) = to_external(Some(&item)) {
                items.push(external);
            }
        }
        Ok(items)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn delimit_metadata(metadata: &[String]) -> String {
    if metadata.is_empty() {
        return String::new();
    }
    format!("|{}|", metadata.join("|"))
}
