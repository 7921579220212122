//! Pooled database connection utilities.

use chronicle_error::{StoreError, StoreErrorKind, StoreResult};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

/// Connection pool over PostgreSQL.
pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// A connection checked out from a [`PgPool`].
pub type PgPooledConn = PooledConnection<ConnectionManager<PgConnection>>;

/// Default maximum number of pooled connections.
pub const DEFAULT_POOL_SIZE: u32 = 8;

/// Build a connection pool for the given database URL.
///
/// # Errors
///
/// Returns an error if the pool cannot establish its initial connection.
pub fn build_pool(database_url: &str, max_size: u32) -> StoreResult<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| StoreError::new(StoreErrorKind::Pool(e.to_string())))
}

/// Build a connection pool from the environment.
///
/// Reads the `DATABASE_URL` environment variable to determine the connection
/// string.
///
/// # Errors
///
/// Returns an error if:
/// - `DATABASE_URL` environment variable is not set
/// - The pool cannot establish its initial connection
pub fn establish_pool() -> StoreResult<PgPool> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        StoreError::new(StoreErrorKind::Connection(
            "DATABASE_URL environment variable not set".to_string(),
        ))
    })?;

    build_pool(&database_url, DEFAULT_POOL_SIZE)
}

/// Check a connection out of the pool.
///
/// # Errors
///
/// Returns an error if the pool is exhausted or the backing connection
/// cannot be established.
pub fn checkout(pool: &PgPool) -> StoreResult<PgPooledConn> {
    pool.get()
        .map_err(|e| StoreError::new(StoreErrorKind::Pool(e.to_string())))
}
