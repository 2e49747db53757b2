//! Reading Store Implementation

use crate::{NewReading, Reading, StorageError};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqliteSynchronous};
use sqlx::{ConnectOptions, Connection};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maximum number of rows kept before the oldest is evicted (one week of 2-minute samples)
pub const DEFAULT_CAPACITY: usize = 5040;

/// Backing file used when none is configured
pub const DEFAULT_DB_PATH: &str = "aqi_data.db";

/// Name of the readings table
pub const TABLE_NAME: &str = "aqi_readings";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS aqi_readings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    NO REAL NOT NULL,
    NO2 REAL NOT NULL,
    NOx REAL NOT NULL,
    NH3 REAL NOT NULL,
    CO REAL NOT NULL,
    Benzene REAL NOT NULL,
    Toluene REAL NOT NULL,
    Xylene REAL NOT NULL,
    AQI REAL NOT NULL
)
"#;

const SELECT_COLUMNS: &str = "SELECT id, NO, NO2, NOx, NH3, CO, Benzene, Toluene, Xylene, AQI FROM aqi_readings";

type ConnFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'c>>;

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite file holding the readings table
    pub db_path: PathBuf,
    /// Row count at which inserts start evicting the oldest row
    pub capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Handle to the readings table.
///
/// The handle only carries connection options. Each operation connects,
/// runs its statements and closes the connection again, so nothing is held
/// open between requests and the SQLite file lock is the only coordination
/// between concurrent callers.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    options: SqliteConnectOptions,
    db_path: PathBuf,
    capacity: usize,
}

impl ReadingStore {
    /// Open the store, creating the backing file and table if missing
    pub async fn open(config: &StoreConfig) -> Result<Self, StorageError> {
        if config.capacity == 0 {
            return Err(StorageError::InvalidCapacity);
        }

        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let store = Self {
            options,
            db_path: config.db_path.clone(),
            capacity: config.capacity,
        };

        store
            .with_connection(|conn| Box::pin(create_schema(conn)))
            .await?;

        info!(
            "Opened {} at {} (capacity {})",
            TABLE_NAME,
            store.db_path.display(),
            store.capacity
        );
        Ok(store)
    }

    /// Insert a reading, evicting the single oldest row first when full
    pub async fn insert(&self, reading: NewReading) -> Result<(), StorageError> {
        let capacity = self.capacity;
        self.with_connection(move |conn| Box::pin(insert_row(conn, reading, capacity)))
            .await
    }

    /// Most recent reading, if any
    pub async fn latest(&self) -> Result<Option<Reading>, StorageError> {
        self.with_connection(|conn| Box::pin(edge_row(conn, "DESC")))
            .await
    }

    /// Oldest reading still retained, if any
    pub async fn oldest(&self) -> Result<Option<Reading>, StorageError> {
        self.with_connection(|conn| Box::pin(edge_row(conn, "ASC")))
            .await
    }

    /// Current row count
    pub async fn count(&self) -> Result<usize, StorageError> {
        self.with_connection(|conn| Box::pin(count_rows(conn))).await
    }

    /// AQI values of the newest `limit` rows, newest first
    pub async fn recent_aqi(&self, limit: usize) -> Result<Vec<f64>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_connection(move |conn| Box::pin(recent_aqi_rows(conn, limit)))
            .await
    }

    /// Path of the backing file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `op` on a fresh connection and close it on every exit path.
    ///
    /// A failed `op` leaves any open transaction uncommitted; closing the
    /// connection rolls it back.
    async fn with_connection<T, F>(&self, op: F) -> Result<T, StorageError>
    where
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> ConnFuture<'c, T>,
    {
        let mut conn = self.options.connect().await?;
        let result = op(&mut conn).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close store connection: {}", e);
        }
        result
    }
}

async fn create_schema(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    sqlx::query(SCHEMA_SQL).execute(&mut *conn).await?;
    Ok(())
}

/// First row in `id` order; `order` is `ASC` or `DESC`
async fn edge_row(
    conn: &mut SqliteConnection,
    order: &'static str,
) -> Result<Option<Reading>, StorageError> {
    let sql = format!("{SELECT_COLUMNS} ORDER BY id {order} LIMIT 1");
    let row = sqlx::query_as::<_, Reading>(&sql)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn recent_aqi_rows(conn: &mut SqliteConnection, limit: i64) -> Result<Vec<f64>, StorageError> {
    let values = sqlx::query_scalar::<_, f64>("SELECT AQI FROM aqi_readings ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
    Ok(values)
}

async fn count_rows(conn: &mut SqliteConnection) -> Result<usize, StorageError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM aqi_readings")
        .fetch_one(&mut *conn)
        .await?;
    Ok(usize::try_from(count).unwrap_or(0))
}

async fn insert_row(
    conn: &mut SqliteConnection,
    reading: NewReading,
    capacity: usize,
) -> Result<(), StorageError> {
    // Take the write lock up front so count and eviction see the same table.
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    if count_rows(&mut *conn).await? >= capacity {
        let evicted = sqlx::query(
            "DELETE FROM aqi_readings WHERE id = (SELECT MIN(id) FROM aqi_readings)",
        )
        .execute(&mut *conn)
        .await?;
        debug!("Evicted {} oldest reading(s)", evicted.rows_affected());
    }

    let id = sqlx::query(
        "INSERT INTO aqi_readings (NO, NO2, NOx, NH3, CO, Benzene, Toluene, Xylene, AQI) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(reading.no)
    .bind(reading.no2)
    .bind(reading.nox)
    .bind(reading.nh3)
    .bind(reading.co)
    .bind(reading.benzene)
    .bind(reading.toluene)
    .bind(reading.xylene)
    .bind(reading.aqi)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    sqlx::query("COMMIT").execute(&mut *conn).await?;
    debug!("Inserted reading with ID {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn sample(aqi: f64) -> NewReading {
        NewReading {
            no: 1.0,
            no2: 2.0,
            nox: 3.0,
            nh3: 4.0,
            co: 5.0,
            benzene: 6.0,
            toluene: 7.0,
            xylene: 8.0,
            aqi,
        }
    }

    async fn open_store(dir: &TempDir, capacity: usize) -> ReadingStore {
        let config = StoreConfig {
            db_path: dir.path().join("aqi_data.db"),
            capacity,
        };
        ReadingStore::open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 10).await;

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.latest().await.unwrap().is_none());
        assert!(store.oldest().await.unwrap().is_none());
        assert!(store.recent_aqi(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_and_latest() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 10).await;

        store.insert(sample(42.0)).await.unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.sample(), sample(42.0));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_tracks_most_recent_insert() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 3).await;

        for i in 0..7 {
            store.insert(sample(i as f64)).await.unwrap();
            let latest = store.latest().await.unwrap().unwrap();
            assert_eq!(latest.aqi, i as f64);
        }
    }

    #[tokio::test]
    async fn test_eviction_removes_only_oldest() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 5).await;

        for i in 0..5 {
            store.insert(sample(i as f64)).await.unwrap();
        }
        let first = store.oldest().await.unwrap().unwrap();
        assert_eq!(first.aqi, 0.0);

        store.insert(sample(5.0)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 5);
        let oldest = store.oldest().await.unwrap().unwrap();
        assert_eq!(oldest.aqi, 1.0);
        assert!(oldest.id > first.id);
        assert_eq!(store.recent_aqi(10).await.unwrap(), vec![5.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_ids_never_reused_after_eviction() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, 1).await;

        store.insert(sample(1.0)).await.unwrap();
        let first = store.latest().await.unwrap().unwrap();
        store.insert(sample(2.0)).await.unwrap();
        let second = store.latest().await.unwrap().unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_default_capacity_evicts_first_row() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir, DEFAULT_CAPACITY).await;

        for i in 0..DEFAULT_CAPACITY {
            store.insert(sample(i as f64)).await.unwrap();
        }
        assert_eq!(store.count().await.unwrap(), DEFAULT_CAPACITY);
        let first = store.oldest().await.unwrap().unwrap();

        store.insert(sample(-1.0)).await.unwrap();

        assert_eq!(store.count().await.unwrap(), DEFAULT_CAPACITY);
        let oldest = store.oldest().await.unwrap().unwrap();
        assert!(oldest.id > first.id);
        assert_eq!(store.latest().await.unwrap().unwrap().aqi, -1.0);
    }

    #[tokio::test]
    async fn test_rows_persist_across_handles() {
        let dir = TempDir::new().unwrap();
        open_store(&dir, 10).await.insert(sample(7.0)).await.unwrap();

        let reopened = open_store(&dir, 10).await;
        assert_eq!(reopened.count().await.unwrap(), 1);
        assert_eq!(reopened.latest().await.unwrap().unwrap().aqi, 7.0);
    }

    #[tokio::test]
    async fn test_zero_capacity_rejected() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            db_path: dir.path().join("aqi_data.db"),
            capacity: 0,
        };
        assert!(matches!(
            ReadingStore::open(&config).await,
            Err(StorageError::InvalidCapacity)
        ));
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig {
            db_path: dir.path().join("nested").join("aqi_data.db"),
            capacity: 10,
        };
        let store = ReadingStore::open(&config).await.unwrap();
        assert!(store.db_path().exists());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_count_never_exceeds_capacity(capacity in 1usize..8, inserts in 0usize..20) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let dir = TempDir::new().unwrap();
                let store = open_store(&dir, capacity).await;
                for i in 0..inserts {
                    store.insert(sample(i as f64)).await.unwrap();
                    let count = store.count().await.unwrap();
                    assert_eq!(count, (i + 1).min(capacity));
                }
            });
        }
    }
}
