use crate::domain::Store;
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, instrument};

const MAX_CONNECTIONS: u32 = 20;

/// Errors raised by a [`StoreRepository`]
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The database could not be reached or rejected the query
    #[error("database query failed")]
    Query(#[from] sqlx::Error),
}

/// Read access to the stored stores
#[async_trait]
pub trait StoreRepository {
    /// All stores located in the given city
    async fn stores_by_city(&self, city: &str) -> Result<Vec<Store>, RepositoryError>;

    /// All stores with known coordinates
    async fn all_stores(&self) -> Result<Vec<Store>, RepositoryError>;
}

/// [`StoreRepository`] backed by an SQLite database
#[derive(Clone)]
pub struct SqliteStoreRepository {
    pool: SqlitePool,
}

impl SqliteStoreRepository {
    /// Creates a new instance from an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to the given database
    #[instrument]
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(url)
            .await?;

        debug!("Connected to database");

        Ok(Self::new(pool))
    }

    /// Creates the store table unless it exists
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS starbucks_store (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                store_name  TEXT,
                address     TEXT,
                province    TEXT,
                city        TEXT,
                latitude    TEXT,
                longitude   TEXT,
                open_time   TEXT,
                close_time  TEXT,
                created_at  TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS starbucks_store_city ON starbucks_store (city)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[cfg(test)]
    async fn insert(&self, store: &Store) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO starbucks_store (store_name, address, province, city, latitude, longitude, open_time, close_time, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&store.store_name)
        .bind(&store.address)
        .bind(&store.province)
        .bind(&store.city)
        .bind(&store.latitude)
        .bind(&store.longitude)
        .bind(&store.open_time)
        .bind(&store.close_time)
        .bind(&store.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl StoreRepository for SqliteStoreRepository {
    async fn stores_by_city(&self, city: &str) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(
            "SELECT store_name, address, province, city, latitude, longitude, open_time, close_time, created_at \
             FROM starbucks_store \
             WHERE city = ?",
        )
        .bind(city)
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }

    async fn all_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        let stores = sqlx::query_as::<_, Store>(
            "SELECT store_name, address, province, city, latitude, longitude, open_time, close_time, created_at \
             FROM starbucks_store \
             WHERE latitude IS NOT NULL AND longitude IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(stores)
    }
}
