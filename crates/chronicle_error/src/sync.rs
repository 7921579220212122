//! Synchronization engine error types.

use crate::{GatewayError, StoreError};

/// Engine error conditions.
///
/// Wraps the store and gateway error families; most recoverable conditions
/// (missing parents, duplicate rows, ineligible messages) are handled inside
/// the engine's operations and never surface here.
#[derive(Debug, Clone, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum SyncErrorKind {
    /// Relational store failure
    #[from(StoreError)]
    Store(StoreError),
    /// Upstream platform failure
    #[from(GatewayError)]
    Gateway(GatewayError),
}

/// Synchronization error with kind discrimination.
///
/// # Examples
///
/// ```
/// use chronicle_error::{StoreError, StoreErrorKind, SyncError, SyncResult};
///
/// fn might_fail() -> SyncResult<()> {
///     Err(StoreError::new(StoreErrorKind::NotFound))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Sync Error: {}", _0)]
pub struct SyncError(Box<SyncErrorKind>);

impl SyncError {
    /// Create a new error from a kind.
    pub fn new(kind: SyncErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &SyncErrorKind {
        &self.0
    }
}

impl<T> From<T> for SyncError
where
    T: Into<SyncErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for engine operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
