//! Shared engine context.

use chronicle_database::{PgPool, PgPooledConn, checkout};
use chronicle_error::SyncResult;
use derive_new::new;

/// Handle to the resources every operation needs.
///
/// Passed explicitly into each operation rather than living in ambient
/// state, so tests can construct isolated instances. Cloning is cheap; the
/// pool is shared.
#[derive(Debug, Clone, new)]
pub struct SyncContext {
    pool: PgPool,
}

impl SyncContext {
    /// The underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check a connection out of the pool for a single unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is exhausted or the backing connection
    /// cannot be established.
    pub fn conn(&self) -> SyncResult<PgPooledConn> {
        Ok(checkout(&self.pool)?)
    }
}
