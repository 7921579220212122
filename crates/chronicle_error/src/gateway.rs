//! Chat gateway error types.
//!
//! Failures of the upstream platform surface the engine reads from: history
//! pagination, member listings, channel listings.

/// Gateway error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GatewayErrorKind {
    /// Transport-level failure (HTTP error, gateway disconnect, rate limit)
    #[display("Gateway transport error: {}", _0)]
    Transport(String),
    /// The platform handed back an object the engine cannot represent
    #[display("Invalid gateway record: {}", _0)]
    InvalidRecord(String),
}

/// Gateway error with source location tracking.
///
/// # Examples
///
/// ```
/// use chronicle_error::{GatewayError, GatewayErrorKind};
///
/// let err = GatewayError::new(GatewayErrorKind::InvalidRecord(
///     "missing author".to_string(),
/// ));
/// assert!(format!("{}", err).contains("missing author"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Gateway Error: {} at line {} in {}", kind, line, file)]
pub struct GatewayError {
    /// The kind of error that occurred
    pub kind: GatewayErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GatewayError {
    /// Create a new GatewayError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GatewayErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
