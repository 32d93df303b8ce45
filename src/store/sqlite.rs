use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::DateTime;
use rusqlite::{Connection, params};
use tracing::debug;

use super::{LedgerStore, StoreError};
use crate::engine::Balances;
use crate::model::{Points, Transaction};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        payer TEXT NOT NULL CHECK (payer <> ''),
        points INTEGER NOT NULL,
        timestamp_us INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_order
    ON transactions (timestamp_us, id);
    CREATE INDEX IF NOT EXISTS idx_transactions_payer
    ON transactions (payer);
";

/// SQLite-backed store. Timestamps are kept as UTC microseconds.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`; `:memory:` opens a
    /// private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = if path == Path::new(":memory:") {
            Connection::open_in_memory()?
        } else {
            let conn = Connection::open(path)?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            debug!(path = %path.display(), journal_mode = %mode, "opened sqlite ledger");
            conn
        };
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Poisoned("sqlite connection"))
    }
}

impl LedgerStore for SqliteStore {
    fn append_many(&self, transactions: &[Transaction]) -> Result<(), StoreError> {
        if transactions.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        let batch = conn.transaction()?;
        {
            let mut insert = batch.prepare_cached(
                "INSERT INTO transactions (payer, points, timestamp_us) VALUES (?1, ?2, ?3)",
            )?;
            for tx in transactions {
                insert.execute(params![tx.payer, tx.points, tx.timestamp.timestamp_micros()])?;
            }
        }
        // dropping an uncommitted transaction rolls it back
        batch.commit()?;
        Ok(())
    }

    fn list_ordered(&self) -> Result<Vec<Transaction>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, payer, points, timestamp_us FROM transactions
             ORDER BY timestamp_us ASC, id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Points>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, payer, points, micros) = row?;
            let timestamp = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                StoreError::Corrupt(id, format!("timestamp {micros}us out of range"))
            })?;
            out.push(Transaction {
                payer,
                points,
                timestamp,
            });
        }
        Ok(out)
    }

    fn balances(&self) -> Result<Balances, StoreError> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare_cached("SELECT payer, SUM(points) FROM transactions GROUP BY payer")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Points>(1)?))
        })?;
        let balances = rows.collect::<Result<Balances, rusqlite::Error>>()?;
        Ok(balances)
    }

    fn balance(&self, payer: &str) -> Result<Points, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare_cached("SELECT COALESCE(SUM(points), 0) FROM transactions WHERE payer = ?1")?;
        let points = stmt.query_row([payer], |row| row.get::<_, Points>(0))?;
        Ok(points)
    }

    fn close(self: Box<Self>) -> Result<(), StoreError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| StoreError::Poisoned("sqlite connection"))?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }
}
