//! SQLite storage backend implementation
//!
//! Uses rusqlite behind a deadpool-sqlite connection pool. Ranking updates
//! run in an IMMEDIATE transaction, which takes the write lock before the
//! row is read, so a live poll loop and a manual reprocessing run cannot
//! lose each other's increments.

use crate::error::{BugmonitorError, Result};
use crate::ranking::{Counter, RankingLogEntry, RankingRow};
use crate::storage::RankingBackend;
use crate::types::{BugId, Category, ChangeEvent, EvaluationTier};
use async_trait::async_trait;
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// How long a connection waits for a competing writer
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const DROP_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS timeline;
    DROP INDEX IF EXISTS ranking_name_idx;
    DROP TABLE IF EXISTS ranking;
    DROP TABLE IF EXISTS ranking_log;
"#;

const CREATE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS timeline (
        date TEXT NOT NULL,
        bug_id INTEGER NOT NULL,
        subject TEXT NOT NULL,
        assigned_to TEXT NOT NULL,
        changed_fields TEXT NOT NULL,
        classification TEXT NOT NULL,
        component TEXT NOT NULL,
        foundby TEXT NOT NULL,
        keywords TEXT NOT NULL,
        priority TEXT NOT NULL,
        product TEXT NOT NULL,
        severity TEXT NOT NULL,
        status TEXT NOT NULL,
        target_milestone TEXT NOT NULL,
        type TEXT NOT NULL,
        version TEXT NOT NULL,
        who TEXT NOT NULL,
        body TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ranking (
        name TEXT NOT NULL,
        gold_fix INTEGER NOT NULL DEFAULT 0,
        silver_fix INTEGER NOT NULL DEFAULT 0,
        bronze_fix INTEGER NOT NULL DEFAULT 0,
        other_fix INTEGER NOT NULL DEFAULT 0,
        gold_scr INTEGER NOT NULL DEFAULT 0,
        silver_scr INTEGER NOT NULL DEFAULT 0,
        bronze_scr INTEGER NOT NULL DEFAULT 0,
        other_scr INTEGER NOT NULL DEFAULT 0,
        suspicious INTEGER NOT NULL DEFAULT 0,
        other INTEGER NOT NULL DEFAULT 0
    );

    CREATE UNIQUE INDEX IF NOT EXISTS ranking_name_idx ON ranking (name);

    CREATE TABLE IF NOT EXISTS ranking_log (
        name TEXT NOT NULL,
        bugid TEXT NOT NULL,
        status TEXT NOT NULL
    );
"#;

const RANKING_COLUMNS: &str = "name, gold_fix, silver_fix, bronze_fix, other_fix, \
     gold_scr, silver_scr, bronze_scr, other_scr, suspicious, other";

/// SQLite ranking store
pub struct SqliteRankingStore {
    pool: Pool,
}

impl SqliteRankingStore {
    /// Open (creating if needed) the database file and its tables
    ///
    /// # Example
    /// ```ignore
    /// let store = SqliteRankingStore::open("bugmonitor.db").await?;
    /// ```
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        info!("Opening ranking database: {}", path_str);

        let pool = Config::new(path_str).create_pool(Runtime::Tokio1).map_err(|e| {
            BugmonitorError::Database(format!(
                "Failed to create connection pool: {}",
                e
            ))
        })?;

        let store = Self { pool };
        store
            .with_conn(|conn| {
                conn.execute_batch(CREATE_SCHEMA)?;
                Ok(())
            })
            .await?;

        Ok(store)
    }

    /// Run `f` on a pooled connection
    async fn with_conn<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.pool.get().await?;
        conn.interact(move |conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            f(conn)
        })
        .await?
    }
}

fn row_from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<RankingRow> {
    let count = |i: usize| row.get::<_, i64>(i).map(|v| v.max(0) as u64);
    Ok(RankingRow {
        name: row.get(0)?,
        gold_fix: count(1)?,
        silver_fix: count(2)?,
        bronze_fix: count(3)?,
        other_fix: count(4)?,
        gold_scr: count(5)?,
        silver_scr: count(6)?,
        bronze_scr: count(7)?,
        other_scr: count(8)?,
        suspicious: count(9)?,
        other: count(10)?,
    })
}

fn load_row(conn: &Connection, name: &str) -> rusqlite::Result<Option<RankingRow>> {
    conn.query_row(
        &format!("SELECT {} FROM ranking WHERE name = ?1", RANKING_COLUMNS),
        params![name],
        row_from_sql,
    )
    .optional()
}

fn upsert_row(conn: &Connection, row: &RankingRow) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO ranking ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(name) DO UPDATE SET
                 gold_fix = excluded.gold_fix,
                 silver_fix = excluded.silver_fix,
                 bronze_fix = excluded.bronze_fix,
                 other_fix = excluded.other_fix,
                 gold_scr = excluded.gold_scr,
                 silver_scr = excluded.silver_scr,
                 bronze_scr = excluded.bronze_scr,
                 other_scr = excluded.other_scr,
                 suspicious = excluded.suspicious,
                 other = excluded.other",
            RANKING_COLUMNS
        ),
        params![
            row.name,
            row.gold_fix as i64,
            row.silver_fix as i64,
            row.bronze_fix as i64,
            row.other_fix as i64,
            row.gold_scr as i64,
            row.silver_scr as i64,
            row.bronze_scr as i64,
            row.other_scr as i64,
            row.suspicious as i64,
            row.other as i64,
        ],
    )?;
    Ok(())
}

fn insert_timeline(conn: &Connection, event: &ChangeEvent) -> rusqlite::Result<()> {
    let meta = &event.classification_meta;
    conn.execute(
        "INSERT INTO timeline (date, bug_id, subject, assigned_to, changed_fields,
             classification, component, foundby, keywords, priority, product,
             severity, status, target_milestone, type, version, who, body)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            event.timestamp.to_rfc3339(),
            event.bug_id.0 as i64,
            event.subject,
            event.assignee,
            event.changed_fields.as_str(),
            meta.classification,
            meta.component,
            meta.found_by,
            meta.keywords,
            meta.priority,
            meta.product,
            meta.severity,
            event.status,
            meta.target_milestone,
            event.lifecycle_type.as_str(),
            meta.version,
            event.reporter_name,
            event.body_text,
        ],
    )?;
    Ok(())
}

#[async_trait]
impl RankingBackend for SqliteRankingStore {
    async fn reset(&self) -> Result<()> {
        info!("Resetting ranking database");
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(DROP_SCHEMA)?;
            tx.execute_batch(CREATE_SCHEMA)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn archive(&self, event: &ChangeEvent) -> Result<()> {
        let event = event.clone();
        self.with_conn(move |conn| Ok(insert_timeline(conn, &event)?))
            .await
    }

    async fn record(
        &self,
        event: &ChangeEvent,
        category: Category,
        tier: EvaluationTier,
    ) -> Result<RankingRow> {
        let name = event.reporter_name.clone();
        let bug_id = event.bug_id;
        let counter = Counter::select(category, tier);
        let entry = RankingLogEntry::new(name.clone(), bug_id, category, tier);
        let event = event.clone();

        let row = self
            .with_conn(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                insert_timeline(&tx, &event)?;

                let mut row = load_row(&tx, &name)?.unwrap_or_else(|| RankingRow::new(name.clone()));
                row.increment(counter);
                upsert_row(&tx, &row)?;

                tx.execute(
                    "INSERT INTO ranking_log (name, bugid, status) VALUES (?1, ?2, ?3)",
                    params![entry.name, entry.bug_id.to_string(), entry.status],
                )?;

                tx.commit()?;
                Ok(row)
            })
            .await?;

        debug!(
            "Recorded {} for {} on bug {} ({}): score now {}",
            category,
            row.name,
            bug_id,
            tier,
            row.score()
        );
        Ok(row)
    }

    async fn rows(&self) -> Result<Vec<RankingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM ranking ORDER BY rowid",
                RANKING_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], row_from_sql)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn row(&self, name: &str) -> Result<Option<RankingRow>> {
        let name = name.to_string();
        self.with_conn(move |conn| Ok(load_row(conn, &name)?)).await
    }

    async fn log_entries(&self, name: Option<&str>) -> Result<Vec<RankingLogEntry>> {
        let name = name.map(str::to_string);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, bugid, status FROM ranking_log
                 WHERE ?1 IS NULL OR name = ?1
                 ORDER BY rowid",
            )?;
            let entries = stmt
                .query_map(params![name], |row| {
                    let bug: String = row.get(1)?;
                    let bug_id = bug.parse().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                    })?;
                    Ok(RankingLogEntry {
                        name: row.get(0)?,
                        bug_id: BugId(bug_id),
                        status: row.get(2)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(entries)
        })
        .await
    }

    async fn timeline_len(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM timeline", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}
