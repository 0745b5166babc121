use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::StoreError;
use crate::models::{MentalRecord, PhysicalRecord, SleepRecord, UserId};
use crate::store::RecordStore;

/// SQLite-backed record store
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path).map_err(|err| classify_error("database", err))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Private in-memory database, used by tests and one-off computations
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<(), StoreError> {
        // WAL lets summaries read while a log command writes
        let _mode: String =
            self.conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;

        // Timestamps are UTC text, which sorts chronologically
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS physical_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                heart_rate INTEGER,
                bp_sys INTEGER,
                bp_dia INTEGER,
                steps INTEGER,
                calories_burned INTEGER,
                temperature REAL
            );

            CREATE TABLE IF NOT EXISTS mental_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                mood_score INTEGER,
                stress_level INTEGER,
                anxiety_level INTEGER,
                energy_level INTEGER,
                sleep_quality INTEGER,
                notes TEXT
            );

            CREATE TABLE IF NOT EXISTS sleep_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                duration_hours REAL,
                quality INTEGER,
                bedtime TEXT,
                wake_time TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_physical_user_time ON physical_records (user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_mental_user_time ON mental_records (user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_sleep_user_time ON sleep_records (user_id, timestamp);
            "#,
        )?;

        Ok(())
    }

    /// Append a physical record, returning its row id
    pub fn insert_physical(&self, record: &PhysicalRecord) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO physical_records (
                user_id, timestamp, heart_rate, bp_sys, bp_dia, steps, calories_burned, temperature
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.user_id,
                record.timestamp,
                record.heart_rate,
                record.bp_sys,
                record.bp_dia,
                record.steps,
                record.calories_burned,
                record.temperature,
            ],
        )
        .map_err(|err| classify_error("physical_records", err))?;
        debug!(user_id = record.user_id, "Stored physical record");
        Ok(self.conn.last_insert_rowid())
    }

    /// Append a mental-health record, returning its row id
    pub fn insert_mental(&self, record: &MentalRecord) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO mental_records (
                user_id, timestamp, mood_score, stress_level, anxiety_level, energy_level,
                sleep_quality, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.user_id,
                record.timestamp,
                record.mood_score,
                record.stress_level,
                record.anxiety_level,
                record.energy_level,
                record.sleep_quality,
                record.notes,
            ],
        )
        .map_err(|err| classify_error("mental_records", err))?;
        debug!(user_id = record.user_id, "Stored mental record");
        Ok(self.conn.last_insert_rowid())
    }

    /// Append a sleep record, returning its row id
    ///
    /// A missing duration is filled in from bedtime and wake time when both exist.
    pub fn insert_sleep(&self, record: &SleepRecord) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO sleep_records (
                user_id, timestamp, duration_hours, quality, bedtime, wake_time
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.user_id,
                record.timestamp,
                record.effective_duration_hours(),
                record.quality,
                record.bedtime,
                record.wake_time,
            ],
        )
        .map_err(|err| classify_error("sleep_records", err))?;
        debug!(user_id = record.user_id, "Stored sleep record");
        Ok(self.conn.last_insert_rowid())
    }

    /// Row counts per table
    pub fn get_stats(&self) -> Result<StoreStats, StoreError> {
        let count = |table: &str| -> Result<usize, StoreError> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            physical_records: count("physical_records")?,
            mental_records: count("mental_records")?,
            sleep_records: count("sleep_records")?,
        })
    }

    fn physical_from_row(row: &Row) -> rusqlite::Result<PhysicalRecord> {
        Ok(PhysicalRecord {
            user_id: row.get(0)?,
            timestamp: row.get(1)?,
            heart_rate: row.get(2)?,
            bp_sys: row.get(3)?,
            bp_dia: row.get(4)?,
            steps: row.get(5)?,
            calories_burned: row.get(6)?,
            temperature: row.get(7)?,
        })
    }

    fn mental_from_row(row: &Row) -> rusqlite::Result<MentalRecord> {
        Ok(MentalRecord {
            user_id: row.get(0)?,
            timestamp: row.get(1)?,
            mood_score: row.get(2)?,
            stress_level: row.get(3)?,
            anxiety_level: row.get(4)?,
            energy_level: row.get(5)?,
            sleep_quality: row.get(6)?,
            notes: row.get(7)?,
        })
    }

    fn sleep_from_row(row: &Row) -> rusqlite::Result<SleepRecord> {
        Ok(SleepRecord {
            user_id: row.get(0)?,
            timestamp: row.get(1)?,
            duration_hours: row.get(2)?,
            quality: row.get(3)?,
            bedtime: row.get(4)?,
            wake_time: row.get(5)?,
        })
    }

    fn query_since<T>(
        &self,
        table: &str,
        sql: &str,
        user_id: UserId,
        since: DateTime<Utc>,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>, StoreError> {
        let read = || -> rusqlite::Result<Vec<T>> {
            let mut stmt = self.conn.prepare(sql)?;
            let rows = stmt.query_map(params![user_id, since], map)?;
            rows.collect()
        };
        read().map_err(|err| classify_error(table, err))
    }
}

/// Sort a SQLite failure into the store error a caller can act on
///
/// Rows that cannot be mapped back into records are corrupt. A busy, locked or
/// unopenable database is unavailable and worth retrying.
fn classify_error(table: &str, err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(column, _, source) => StoreError::CorruptRow {
            table: table.to_string(),
            reason: format!("column {}: {}", column, source),
        },
        rusqlite::Error::InvalidColumnType(column, name, found) => StoreError::CorruptRow {
            table: table.to_string(),
            reason: format!("column {} ({}) holds {}", column, name, found),
        },
        rusqlite::Error::SqliteFailure(failure, message)
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
            ) =>
        {
            StoreError::Unavailable {
                reason: message.unwrap_or_else(|| failure.to_string()),
            }
        }
        other => StoreError::Sqlite(other),
    }
}

impl RecordStore for SqliteRecordStore {
    fn list_physical_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<PhysicalRecord>, StoreError> {
        self.query_since(
            "physical_records",
            r#"
            SELECT user_id, timestamp, heart_rate, bp_sys, bp_dia, steps, calories_burned, temperature
            FROM physical_records
            WHERE user_id = ?1 AND timestamp >= ?2
            ORDER BY timestamp ASC, id ASC
            "#,
            user_id,
            since,
            Self::physical_from_row,
        )
    }

    fn list_mental_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<MentalRecord>, StoreError> {
        self.query_since(
            "mental_records",
            r#"
            SELECT user_id, timestamp, mood_score, stress_level, anxiety_level, energy_level,
                   sleep_quality, notes
            FROM mental_records
            WHERE user_id = ?1 AND timestamp >= ?2
            ORDER BY timestamp ASC, id ASC
            "#,
            user_id,
            since,
            Self::mental_from_row,
        )
    }

    fn list_sleep_records(
        &self,
        user_id: UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SleepRecord>, StoreError> {
        self.query_since(
            "sleep_records",
            r#"
            SELECT user_id, timestamp, duration_hours, quality, bedtime, wake_time
            FROM sleep_records
            WHERE user_id = ?1 AND timestamp >= ?2
            ORDER BY timestamp ASC, id ASC
            "#,
            user_id,
            since,
            Self::sleep_from_row,
        )
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub physical_records: usize,
    pub mental_records: usize,
    pub sleep_records: usize,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.physical_records + self.mental_records + self.sleep_records
    }
}
