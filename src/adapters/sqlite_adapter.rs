//! SQLite history store and signal log.

use crate::domain::error::PulseError;
use crate::domain::verdict::Tier;
use crate::ports::config_port::ConfigPort;
use crate::ports::history_port::{HistoryStore, SignalLog};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn query_err(e: rusqlite::Error) -> PulseError {
    PulseError::HistoryQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PulseError> {
        let db_path =
            config
                .get_string("history", "path")
                .ok_or_else(|| PulseError::ConfigMissing {
                    section: "history".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("history", "pool_size", 4);
        if pool_size < 1 {
            return Err(PulseError::ConfigInvalid {
                section: "history".into(),
                key: "pool_size".into(),
                reason: "pool_size must be at least 1".into(),
            });
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size as u32)
            .build(manager)
            .map_err(|e: r2d2::Error| PulseError::History {
                reason: e.to_string(),
            })?;

        tracing::debug!(path = %db_path, pool_size, "opened history database");
        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, PulseError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| PulseError::History {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PulseError> {
        self.pool.get().map_err(|e: r2d2::Error| PulseError::History {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), PulseError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS history (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS signal_log (
                    date TEXT PRIMARY KEY,
                    tier TEXT NOT NULL
                );",
            )
            .map_err(query_err)
    }
}

impl HistoryStore for SqliteAdapter {
    fn get_previous(&self, key: &str) -> Result<Option<String>, PulseError> {
        self.conn()?
            .query_row(
                "SELECT value FROM history WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)
    }

    fn set_current(&self, key: &str, value: &str) -> Result<(), PulseError> {
        self.conn()?
            .execute(
                "INSERT INTO history (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map_err(query_err)?;
        Ok(())
    }
}

impl SignalLog for SqliteAdapter {
    fn record(&self, date: NaiveDate, tier: Tier) -> Result<bool, PulseError> {
        let inserted = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO signal_log (date, tier) VALUES (?1, ?2)",
                params![date.format("%Y-%m-%d").to_string(), tier.label()],
            )
            .map_err(query_err)?;
        Ok(inserted == 1)
    }

    fn entries(&self) -> Result<Vec<(NaiveDate, Tier)>, PulseError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT date, tier FROM signal_log ORDER BY date")
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| {
                let date: String = row.get(0)?;
                let tier: String = row.get(1)?;
                Ok((date, tier))
            })
            .map_err(query_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (date_str, tier_str) = row.map_err(query_err)?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                PulseError::HistoryQuery {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;
            let tier = tier_str
                .parse::<Tier>()
                .map_err(|reason| PulseError::HistoryQuery { reason })?;
            entries.push((date, tier));
        }
        Ok(entries)
    }
}
