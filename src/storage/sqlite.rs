use crate::models::{BanAction, Location};
use crate::storage::StorageResult;
use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

/// SQLite-backed store for ban actions and the IP→location cache.
///
/// A single pooled connection is enough here: the program is a one-shot CLI
/// and the schema relies on SQLite's own uniqueness constraints rather than
/// any in-process locking.
pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Initialize the schema (idempotent).
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS ban_actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                protocol TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                ip TEXT NOT NULL,
                location TEXT
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ban_actions_protocol ON ban_actions(protocol)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_ban_actions_created_at ON ban_actions(created_at)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_ban_actions_ip ON ban_actions(ip)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ip TEXT NOT NULL UNIQUE,
                country_name TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_locations_country_name ON locations(country_name)",
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    /// Record a new ban action with `created_at = now` and no location yet.
    pub async fn save_ban_action(&self, protocol: &str, ip: &str) -> StorageResult<i64> {
        self.save_ban_action_at(protocol, ip, chrono::Utc::now().timestamp())
            .await
    }

    /// Record a ban action with an explicit timestamp (backfill/import path).
    pub async fn save_ban_action_at(
        &self,
        protocol: &str,
        ip: &str,
        created_at: i64,
    ) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO ban_actions (protocol, created_at, ip, location)
            VALUES (?, ?, ?, NULL)
            "#,
        )
        .bind(protocol)
        .bind(created_at)
        .bind(ip)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Set the location of a previously saved ban action. Returns false when
    /// no row matched; the caller treats that as a logged, non-fatal outcome.
    pub async fn update_ban_action_location(
        &self,
        id: i64,
        location: &str,
    ) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE ban_actions SET location = ? WHERE id = ?")
            .bind(location)
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Look up the cached location for an IP. `None` means the IP was never
    /// looked up; a row with `country_name = "Unknown"` means a lookup
    /// happened but produced nothing usable.
    pub async fn lookup_location(&self, ip: &str) -> StorageResult<Option<Location>> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, ip, country_name FROM locations WHERE ip = ?",
        )
        .bind(ip)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(location)
    }

    /// Cache a location for an IP, or return the already cached row if one
    /// exists. The `ip` uniqueness constraint makes this safe against two
    /// invocations racing on the same never-before-seen IP.
    pub async fn save_location(&self, ip: &str, country_name: &str) -> StorageResult<Location> {
        sqlx::query(
            r#"
            INSERT INTO locations (ip, country_name)
            VALUES (?, ?)
            ON CONFLICT(ip) DO NOTHING
            "#,
        )
        .bind(ip)
        .bind(country_name)
        .execute(self.pool.as_ref())
        .await?;

        let location = sqlx::query_as::<_, Location>(
            "SELECT id, ip, country_name FROM locations WHERE ip = ?",
        )
        .bind(ip)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(location)
    }

    /// Overwrite the cached country name of an IP. Used by the
    /// resolve-unknown maintenance job; ban actions recorded earlier keep
    /// whatever location they captured at save time.
    pub async fn update_location(&self, ip: &str, country_name: &str) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE locations SET country_name = ? WHERE ip = ?")
            .bind(country_name)
            .bind(ip)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All cache rows still holding the "Unknown" sentinel.
    pub async fn list_unknown_ips(&self) -> StorageResult<Vec<Location>> {
        let locations = sqlx::query_as::<_, Location>(
            r#"
            SELECT id, ip, country_name
            FROM locations
            WHERE country_name = ?
            ORDER BY id
            "#,
        )
        .bind(crate::models::UNKNOWN_LOCATION)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(locations)
    }

    /// Ban actions with `created_at >= since`. There is deliberately no
    /// upper bound; see `report::aggregate` for the windowing contract.
    pub async fn list_actions_since(&self, since: i64) -> StorageResult<Vec<BanAction>> {
        let actions = sqlx::query_as::<_, BanAction>(
            r#"
            SELECT id, protocol, created_at, ip, location
            FROM ban_actions
            WHERE created_at >= ?
            ORDER BY id
            "#,
        )
        .bind(since)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(actions)
    }

    /// Delete every ban action. The location cache is left untouched.
    pub async fn purge_logs(&self) -> StorageResult<u64> {
        let result = sqlx::query("DELETE FROM ban_actions")
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}
