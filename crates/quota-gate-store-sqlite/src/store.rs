// crates/quota-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Principal Store
// Description: Durable PrincipalStore + RateLimitStore backed by SQLite WAL.
// Purpose: Persist entitlement state with atomic conditional mutations.
// Dependencies: quota-gate-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements the durable principal and rate-limit stores on
//! `SQLite`. Every quota-bearing mutation is a single conditional statement
//! or an immediate transaction, never a read-modify-write in process
//! memory: concurrent service instances sharing one database file cannot
//! race past a quota boundary or a rate-limit cap.
//!
//! Decode is fail-closed with one deliberate exception: an unknown tier
//! label degrades to the free tier (the least-privileged entitlement),
//! while unknown status labels and negative counters are corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use quota_gate_core::ActivationOutcome;
use quota_gate_core::BillingPeriod;
use quota_gate_core::ConsumeOutcome;
use quota_gate_core::ExternalSubscriptionId;
use quota_gate_core::MessageLimit;
use quota_gate_core::NewPrincipal;
use quota_gate_core::Principal;
use quota_gate_core::PrincipalId;
use quota_gate_core::PrincipalStore;
use quota_gate_core::RateLimitStore;
use quota_gate_core::StoreError;
use quota_gate_core::SubscriptionStatus;
use quota_gate_core::Tier;
use quota_gate_core::TokenDigest;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` principal store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
/// - `read_pool_size` must be greater than zero.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of read-only connections used for read path isolation.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Returns the default read connection pool size.
const fn default_read_pool_size() -> usize {
    4
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages never embed raw tokens or digests.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or decode failure.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Wraps a `rusqlite` error, classifying constraint violations separately.
fn db_error(error: &rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(inner, _) = error
        && inner.code == ErrorCode::ConstraintViolation
    {
        return SqliteStoreError::Invalid("uniqueness constraint violated".to_string());
    }
    SqliteStoreError::Db(error.to_string())
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Raw principal row as stored, before fail-closed decoding.
struct PrincipalRow {
    /// Row id.
    principal_id: i64,
    /// Account email.
    email: String,
    /// Stored tier label.
    tier: String,
    /// Stored status label.
    subscription_status: String,
    /// Stored usage counter.
    messages_used: i64,
    /// Stored period marker.
    messages_reset_period: String,
    /// Stored external subscription id, when activated.
    external_subscription_id: Option<String>,
}

impl PrincipalRow {
    /// Column list matching [`PrincipalRow::from_row`] ordering.
    const COLUMNS: &'static str = "principal_id, email, tier, subscription_status, \
                                   messages_used, messages_reset_period, external_subscription_id";

    /// Extracts a raw row from a query result.
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            principal_id: row.get(0)?,
            email: row.get(1)?,
            tier: row.get(2)?,
            subscription_status: row.get(3)?,
            messages_used: row.get(4)?,
            messages_reset_period: row.get(5)?,
            external_subscription_id: row.get(6)?,
        })
    }

    /// Decodes the raw row into a principal snapshot, failing closed.
    ///
    /// Unknown tier labels degrade to the free tier; every other decode
    /// failure is reported as corruption.
    fn decode(self) -> Result<Principal, SqliteStoreError> {
        let principal_id = u64::try_from(self.principal_id)
            .ok()
            .and_then(PrincipalId::from_raw)
            .ok_or_else(|| {
                SqliteStoreError::Corrupt(format!("invalid principal id: {}", self.principal_id))
            })?;
        let tier = Tier::from_label(&self.tier).unwrap_or_default();
        let subscription_status =
            SubscriptionStatus::from_label(&self.subscription_status).ok_or_else(|| {
                SqliteStoreError::Corrupt(format!(
                    "unknown subscription status: {}",
                    self.subscription_status
                ))
            })?;
        let messages_used = u64::try_from(self.messages_used).map_err(|_| {
            SqliteStoreError::Corrupt(format!("negative usage counter: {}", self.messages_used))
        })?;
        let messages_reset_period = BillingPeriod::parse_marker(&self.messages_reset_period)
            .ok_or_else(|| {
                SqliteStoreError::Corrupt(format!(
                    "invalid period marker: {}",
                    self.messages_reset_period
                ))
            })?;
        Ok(Principal {
            principal_id,
            email: self.email,
            tier,
            subscription_status,
            messages_used,
            messages_reset_period,
            external_subscription_id: self.external_subscription_id.map(Into::into),
        })
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed principal and rate-limit store with WAL support.
///
/// # Invariants
/// - Quota-bearing mutations run as single conditional statements or
///   immediate transactions; the database is the sole concurrency arbiter.
/// - Connection access is serialized through mutexes; reads round-robin
///   over a dedicated pool for WAL read path isolation.
#[derive(Clone)]
pub struct SqlitePrincipalStore {
    /// Shared writer connection guarded by a mutex.
    write_connection: Arc<Mutex<Connection>>,
    /// Read connection pool used for read path isolation under WAL.
    read_connections: Arc<Vec<Mutex<Connection>>>,
    /// Round-robin cursor for read connection selection.
    read_cursor: Arc<AtomicUsize>,
}

impl SqlitePrincipalStore {
    /// Opens an `SQLite`-backed principal store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        if config.read_pool_size == 0 {
            return Err(SqliteStoreError::Invalid(
                "read_pool_size must be greater than zero".to_string(),
            ));
        }
        let mut write_connection = open_connection(config)?;
        initialize_schema(&mut write_connection)?;
        let mut read_connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0 .. config.read_pool_size {
            read_connections.push(Mutex::new(open_connection(config)?));
        }
        Ok(Self {
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_connections: Arc::new(read_connections),
            read_cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Selects the next read connection in round-robin order.
    fn read_connection(&self) -> &Mutex<Connection> {
        let index = self.read_cursor.fetch_add(1, Ordering::Relaxed) % self.read_connections.len();
        &self.read_connections[index]
    }

    /// Locks a connection mutex, surfacing poisoning as an I/O error.
    fn lock_connection<'a>(
        mutex: &'a Mutex<Connection>,
    ) -> Result<std::sync::MutexGuard<'a, Connection>, SqliteStoreError> {
        mutex.lock().map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Loads one principal by an equality predicate on a single column.
    fn find_where(
        &self,
        predicate: &str,
        value: &dyn rusqlite::ToSql,
    ) -> Result<Option<Principal>, SqliteStoreError> {
        let guard = Self::lock_connection(self.read_connection())?;
        let sql = format!(
            "SELECT {} FROM principals WHERE {predicate} = ?1",
            PrincipalRow::COLUMNS
        );
        let row = guard
            .query_row(&sql, [value], PrincipalRow::from_row)
            .optional()
            .map_err(|err| db_error(&err))?;
        row.map(PrincipalRow::decode).transpose()
    }
}

impl PrincipalStore for SqlitePrincipalStore {
    fn create(&self, signup: &NewPrincipal, digest: &TokenDigest) -> Result<Principal, StoreError> {
        let status = if signup.tier.is_paid() {
            SubscriptionStatus::Pending
        } else {
            SubscriptionStatus::Active
        };
        let guard = Self::lock_connection(&self.write_connection)?;
        guard
            .execute(
                "INSERT INTO principals (email, credential_hash, token_digest, tier, \
                 subscription_status, messages_used, messages_reset_period) \
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![
                    signup.email,
                    signup.credential_hash,
                    digest.as_str(),
                    signup.tier.as_str(),
                    status.as_str(),
                    signup.period.marker(),
                ],
            )
            .map_err(|err| db_error(&err))?;
        let principal_id = u64::try_from(guard.last_insert_rowid())
            .ok()
            .and_then(PrincipalId::from_raw)
            .ok_or_else(|| StoreError::Store("insert produced no row id".to_string()))?;
        Ok(Principal {
            principal_id,
            email: signup.email.clone(),
            tier: signup.tier,
            subscription_status: status,
            messages_used: 0,
            messages_reset_period: signup.period,
            external_subscription_id: None,
        })
    }

    fn find_by_id(&self, id: PrincipalId) -> Result<Option<Principal>, StoreError> {
        let id_sql = sql_id(id)?;
        Ok(self.find_where("principal_id", &id_sql)?)
    }

    fn find_by_token_digest(
        &self,
        digest: &TokenDigest,
    ) -> Result<Option<Principal>, StoreError> {
        // Digest equality runs inside the database. The digest column holds
        // one-way hashes of high-entropy tokens, so index comparison timing
        // reveals nothing usable about the raw token.
        Ok(self.find_where("token_digest", &digest.as_str())?)
    }

    fn replace_token_digest(
        &self,
        id: PrincipalId,
        digest: &TokenDigest,
    ) -> Result<bool, StoreError> {
        let id_sql = sql_id(id)?;
        let guard = Self::lock_connection(&self.write_connection)?;
        let changed = guard
            .execute(
                "UPDATE principals SET token_digest = ?2 WHERE principal_id = ?1",
                params![id_sql, digest.as_str()],
            )
            .map_err(|err| db_error(&err))?;
        Ok(changed > 0)
    }

    fn reset_usage_if_stale(
        &self,
        id: PrincipalId,
        current: BillingPeriod,
    ) -> Result<bool, StoreError> {
        // Zero-padded markers sort lexicographically in chronological order,
        // so the staleness guard is a plain text comparison. The predicate
        // also makes the reset a winner-takes-all race: the losing caller
        // matches zero rows.
        let id_sql = sql_id(id)?;
        let guard = Self::lock_connection(&self.write_connection)?;
        let changed = guard
            .execute(
                "UPDATE principals SET messages_used = 0, messages_reset_period = ?2 \
                 WHERE principal_id = ?1 AND messages_reset_period < ?2",
                params![id_sql, current.marker()],
            )
            .map_err(|err| db_error(&err))?;
        Ok(changed > 0)
    }

    fn consume_message(
        &self,
        id: PrincipalId,
        limit: MessageLimit,
    ) -> Result<ConsumeOutcome, StoreError> {
        let id_sql = sql_id(id)?;
        let mut guard = Self::lock_connection(&self.write_connection)?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| db_error(&err))?;
        let consumed: Option<i64> = match limit {
            MessageLimit::Unlimited => tx
                .query_row(
                    "UPDATE principals SET messages_used = messages_used + 1 \
                     WHERE principal_id = ?1 RETURNING messages_used",
                    params![id_sql],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| db_error(&err))?,
            MessageLimit::Limited(ceiling) => {
                let ceiling = i64::try_from(ceiling).unwrap_or(i64::MAX);
                tx.query_row(
                    "UPDATE principals SET messages_used = messages_used + 1 \
                     WHERE principal_id = ?1 AND messages_used < ?2 RETURNING messages_used",
                    params![id_sql, ceiling],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|err| db_error(&err))?
            }
        };
        let outcome = match consumed {
            Some(used) => ConsumeOutcome::Consumed {
                messages_used: decode_counter(used)?,
            },
            None => {
                // The guard did not match: either the principal is missing
                // or the counter sits at the limit. Distinguish inside the
                // same transaction so the answer cannot drift.
                let observed: Option<i64> = tx
                    .query_row(
                        "SELECT messages_used FROM principals WHERE principal_id = ?1",
                        params![id_sql],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|err| db_error(&err))?;
                match observed {
                    Some(used) => ConsumeOutcome::LimitReached {
                        messages_used: decode_counter(used)?,
                    },
                    None => ConsumeOutcome::MissingPrincipal,
                }
            }
        };
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(outcome)
    }

    fn activate_subscription(
        &self,
        id: PrincipalId,
        plan: Tier,
        external_id: &ExternalSubscriptionId,
        period: BillingPeriod,
    ) -> Result<ActivationOutcome, StoreError> {
        let id_sql = sql_id(id)?;
        let mut guard = Self::lock_connection(&self.write_connection)?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| db_error(&err))?;
        let current: Option<(String, String, Option<String>)> = tx
            .query_row(
                "SELECT tier, subscription_status, external_subscription_id \
                 FROM principals WHERE principal_id = ?1",
                params![id_sql],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|err| db_error(&err))?;
        let Some((tier, status, external)) = current else {
            return Ok(ActivationOutcome::MissingPrincipal);
        };
        let already_applied = tier == plan.as_str()
            && status == SubscriptionStatus::Active.as_str()
            && external.as_deref() == Some(external_id.as_str());
        if already_applied {
            return Ok(ActivationOutcome::AlreadyActive);
        }
        tx.execute(
            "UPDATE principals SET tier = ?2, subscription_status = ?3, \
             external_subscription_id = ?4, messages_used = 0, messages_reset_period = ?5 \
             WHERE principal_id = ?1",
            params![
                id_sql,
                plan.as_str(),
                SubscriptionStatus::Active.as_str(),
                external_id.as_str(),
                period.marker(),
            ],
        )
        .map_err(|err| db_error(&err))?;
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(ActivationOutcome::Activated)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        let guard = Self::lock_connection(self.read_connection())?;
        guard.execute("SELECT 1", []).map_err(|err| db_error(&err))?;
        Ok(())
    }
}

impl RateLimitStore for SqlitePrincipalStore {
    fn record_request(
        &self,
        id: PrincipalId,
        now_unix: i64,
        max_requests: u32,
        window_seconds: u32,
    ) -> Result<bool, StoreError> {
        let id_sql = sql_id(id)?;
        let horizon = now_unix.saturating_sub(i64::from(window_seconds));
        let mut guard = Self::lock_connection(&self.write_connection)?;
        let tx = guard
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| db_error(&err))?;
        // Prune, count, and record under one immediate transaction so the
        // cap holds across concurrent instances.
        tx.execute(
            "DELETE FROM rate_limit_events WHERE principal_id = ?1 AND requested_at <= ?2",
            params![id_sql, horizon],
        )
        .map_err(|err| db_error(&err))?;
        let in_window: i64 = tx
            .query_row(
                "SELECT COUNT(1) FROM rate_limit_events WHERE principal_id = ?1",
                params![id_sql],
                |row| row.get(0),
            )
            .map_err(|err| db_error(&err))?;
        let admitted = in_window < i64::from(max_requests);
        if admitted {
            tx.execute(
                "INSERT INTO rate_limit_events (principal_id, requested_at) VALUES (?1, ?2)",
                params![id_sql, now_unix],
            )
            .map_err(|err| db_error(&err))?;
        }
        tx.commit().map_err(|err| db_error(&err))?;
        Ok(admitted)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a stored usage counter, rejecting negatives as corruption.
fn decode_counter(raw: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(raw)
        .map_err(|_| SqliteStoreError::Corrupt(format!("negative usage counter: {raw}")))
}

/// Converts a principal identifier into its `SQLite` integer form.
///
/// `SQLite` integers are signed 64-bit; identifiers beyond `i64::MAX`
/// cannot come out of `AUTOINCREMENT` and are rejected as invalid.
fn sql_id(id: PrincipalId) -> Result<i64, SqliteStoreError> {
    i64::try_from(id.get()).map_err(|_| {
        SqliteStoreError::Invalid("principal identifier exceeds sqlite integer range".to_string())
    })
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection =
        Connection::open_with_flags(&config.path, flags).map_err(|err| db_error(&err))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;").map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| db_error(&err))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| db_error(&err))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| db_error(&err))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| db_error(&err))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| db_error(&err))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| db_error(&err))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS principals (
                    principal_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    credential_hash TEXT NOT NULL,
                    token_digest TEXT UNIQUE,
                    tier TEXT NOT NULL,
                    subscription_status TEXT NOT NULL,
                    messages_used INTEGER NOT NULL DEFAULT 0,
                    messages_reset_period TEXT NOT NULL,
                    external_subscription_id TEXT
                );
                CREATE TABLE IF NOT EXISTS rate_limit_events (
                    principal_id INTEGER NOT NULL,
                    requested_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_rate_limit_events_principal
                    ON rate_limit_events (principal_id, requested_at);",
            )
            .map_err(|err| db_error(&err))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| db_error(&err))?;
    Ok(())
}
