//! Manual transaction control.
//!
//! Operations that await the gateway mid-transaction cannot use Diesel's
//! closure-based `transaction()`; they drive the connection's transaction
//! manager directly. Nested `begin` calls become savepoints, so a channel
//! import can run as its own unit inside a guild import.

use chronicle_error::{StoreError, StoreResult};
use diesel::connection::TransactionManager;
use diesel::pg::PgConnection;
use diesel::prelude::*;

type Manager = <PgConnection as Connection>::TransactionManager;

pub(crate) fn begin(conn: &mut PgConnection) -> StoreResult<()> {
    Manager::begin_transaction(conn).map_err(StoreError::from)
}

pub(crate) fn commit(conn: &mut PgConnection) -> StoreResult<()> {
    Manager::commit_transaction(conn).map_err(StoreError::from)
}

/// Roll back the innermost transaction, swallowing secondary failures.
///
/// Called only on error paths where the original error is the one worth
/// surfacing; a rollback failure is logged and the connection is returned
/// to the pool, which discards broken connections on checkin.
pub(crate) fn rollback(conn: &mut PgConnection) {
    if let Err(e) = Manager::rollback_transaction(conn) {
        tracing::warn!(error = %e, "transaction rollback failed");
    }
}
