//! Top-level error wrapper types.

use crate::{GatewayError, StoreError, SyncError};

/// This is the foundation error enum for the Chronicle workspace.
///
/// # Examples
///
/// ```
/// use chronicle_error::{ChronicleError, StoreError, StoreErrorKind};
///
/// let store_err = StoreError::new(StoreErrorKind::NotFound);
/// let err: ChronicleError = store_err.into();
/// assert!(format!("{}", err).contains("Store Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ChronicleErrorKind {
    /// Relational store error
    #[from(StoreError)]
    Store(StoreError),
    /// Chat gateway error
    #[from(GatewayError)]
    Gateway(GatewayError),
    /// Synchronization engine error
    #[from(SyncError)]
    Sync(SyncError),
}

/// Chronicle error with kind discrimination.
///
/// # Examples
///
/// ```
/// use chronicle_error::{ChronicleResult, GatewayError, GatewayErrorKind};
///
/// fn might_fail() -> ChronicleResult<()> {
///     Err(GatewayError::new(GatewayErrorKind::Transport(
///         "disconnected".to_string(),
///     )))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Chronicle Error: {}", _0)]
pub struct ChronicleError(Box<ChronicleErrorKind>);

impl ChronicleError {
    /// Create a new error from a kind.
    pub fn new(kind: ChronicleErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ChronicleErrorKind {
        &self.0
    }
}

impl<T> From<T> for ChronicleError
where
    T: Into<ChronicleErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Chronicle operations.
pub type ChronicleResult<T> = std::result::Result<T, ChronicleError>;
