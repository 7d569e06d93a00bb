use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;

use crate::session::Snapshot;

/// Day-keyed persistence for session snapshots. One record per local date;
/// saving the same date again replaces the earlier record.
pub trait ProductivityStore {
    fn load(&mut self, date: NaiveDate) -> Result<Option<Snapshot>>;

    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;

    /// Stored dates, oldest first.
    fn list_dates(&mut self) -> Result<Vec<NaiveDate>>;

    /// Remove a day's record. Returns whether one existed.
    fn delete(&mut self, date: NaiveDate) -> Result<bool>;
}

pub struct SqliteProductivityStore {
    conn: Connection,
}

impl SqliteProductivityStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS daily_records (
              date TEXT PRIMARY KEY,
              saved_at INTEGER NOT NULL,
              payload_json TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|e| anyhow!("corrupt daily record key {:?}: {}", key, e))
}

fn decode(date: NaiveDate, payload: &str) -> Result<Snapshot> {
    let snapshot: Snapshot = serde_json::from_str(payload)
        .map_err(|e| anyhow!("corrupt daily record for {}: {}", date, e))?;
    if snapshot.date != date {
        return Err(anyhow!(
            "daily record for {} carries date {}",
            date,
            snapshot.date
        ));
    }
    Ok(snapshot)
}

impl ProductivityStore for SqliteProductivityStore {
    fn load(&mut self, date: NaiveDate) -> Result<Option<Snapshot>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload_json FROM daily_records WHERE date = ?1",
                params![date_key(date)],
                |row| row.get(0),
            )
            .optional()?;
        payload.map(|p| decode(date, &p)).transpose()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        let payload_json = serde_json::to_string(snapshot)?;
        self.conn.execute(
            r#"
            INSERT INTO daily_records(date, saved_at, payload_json)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(date) DO UPDATE SET
              saved_at = excluded.saved_at,
              payload_json = excluded.payload_json
            "#,
            params![date_key(snapshot.date), snapshot.as_of.millis(), payload_json],
        )?;
        Ok(())
    }

    fn list_dates(&mut self) -> Result<Vec<NaiveDate>> {
        let keys = {
            let mut stmt = self
                .conn
                .prepare("SELECT date FROM daily_records ORDER BY date ASC")?;
            let mut rows = stmt.query([])?;
            let mut keys = Vec::new();
            while let Some(row) = rows.next()? {
                let key: String = row.get(0)?;
                keys.push(key);
            }
            keys
        };
        keys.iter().map(|k| parse_key(k)).collect()
    }

    fn delete(&mut self, date: NaiveDate) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM daily_records WHERE date = ?1",
            params![date_key(date)],
        )?;
        Ok(removed > 0)
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryProductivityStore {
    records: BTreeMap<NaiveDate, String>,
}

impl InMemoryProductivityStore {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ProductivityStore for InMemoryProductivityStore {
    fn load(&mut self, date: NaiveDate) -> Result<Option<Snapshot>> {
        self.records
            .get(&date)
            .map(|payload| decode(date, payload))
            .transpose()
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        // Stored as JSON so both stores exercise the same encoding.
        let payload_json = serde_json::to_string(snapshot)?;
        self.records.insert(snapshot.date, payload_json);
        Ok(())
    }

    fn list_dates(&mut self) -> Result<Vec<NaiveDate>> {
        Ok(self.records.keys().copied().collect())
    }

    fn delete(&mut self, date: NaiveDate) -> Result<bool> {
        Ok(self.records.remove(&date).is_some())
    }
}
