// src/error.rs

//! Error types for recipe scaling and graph maintenance
//!
//! Every fallible operation in the crate returns [`Result`]. Callers that need
//! to decide what to do with a failure (retry, report, degrade) should match on
//! [`Error::kind`] rather than on individual variants.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure categories
///
/// These are stable and safe to expose to callers; the variants of [`Error`]
/// carry the details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No active recipe (or product) for the requested id
    NotFound,
    /// The caller supplied bad input
    InvalidInput,
    /// The computed scale factor is outside the configured window
    InvalidScaleFactor,
    /// A structural mutation was rejected by validation
    Validation,
    /// A structural mutation would have introduced a cycle
    CircularDependency,
    /// Hierarchy expansion exceeded the allowed depth
    MaxDepthExceeded,
    /// Too many ingredients in a recipe or calculation
    TooManyIngredients,
    /// A remote collaborator could not be reached or kept failing
    UpstreamUnavailable,
    /// A remote collaborator rejected the request (4xx)
    UpstreamRejected,
    /// Anything else; details are never shown to callers
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::InvalidScaleFactor => "invalid_scale_factor",
            ErrorKind::Validation => "validation",
            ErrorKind::CircularDependency => "circular_dependency",
            ErrorKind::MaxDepthExceeded => "max_depth_exceeded",
            ErrorKind::TooManyIngredients => "too_many_ingredients",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::UpstreamRejected => "upstream_rejected",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the store, the resolver, the engine and the clients
#[derive(Error, Debug)]
pub enum Error {
    /// No (active) recipe for the given product or recipe id
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    /// A referenced product does not exist
    #[error("Product {0} does not exist")]
    ProductNotFound(String),

    /// Bad request parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scale factor outside `[min, max]`
    #[error("Scale factor {factor} is outside the allowed range [{min}, {max}]")]
    InvalidScaleFactor { factor: f64, min: f64, max: f64 },

    /// Recipe failed business-rule validation
    #[error("Recipe validation failed: {0}")]
    Validation(String),

    /// Adding the edge set would close a cycle
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    /// Requested hierarchy depth is above the ceiling
    #[error("Recipe hierarchy depth exceeds maximum allowed depth of {0}")]
    MaxDepthExceeded(u32),

    /// Ingredient list is larger than allowed
    #[error("Too many ingredients: {count} (maximum allowed: {max})")]
    TooManyIngredients { count: usize, max: usize },

    /// Remote collaborator unreachable, timing out or returning 5xx
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Remote collaborator returned a client error
    #[error("Upstream rejected request with status {status}: {message}")]
    UpstreamRejected { status: u16, message: String },

    /// The stored graph violates an invariant it should never violate
    #[error("Inconsistent recipe graph: {0}")]
    InconsistentGraph(String),

    /// Result cache failure (never fatal for a calculation)
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// SQLite failure
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// JSON encoding or decoding failure
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Catch-all for unexpected states
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error onto the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RecipeNotFound(_) | Error::ProductNotFound(_) => ErrorKind::NotFound,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
            Error::InvalidScaleFactor { .. } => ErrorKind::InvalidScaleFactor,
            Error::Validation(_) => ErrorKind::Validation,
            Error::CircularDependency { .. } => ErrorKind::CircularDependency,
            Error::MaxDepthExceeded(_) => ErrorKind::MaxDepthExceeded,
            Error::TooManyIngredients { .. } => ErrorKind::TooManyIngredients,
            Error::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Error::UpstreamRejected { .. } => ErrorKind::UpstreamRejected,
            Error::InconsistentGraph(_)
            | Error::CacheError(_)
            | Error::ConfigError(_)
            | Error::DatabaseError(_)
            | Error::SerializationError(_)
            | Error::IoError(_)
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a remote call that failed with this error may be retried
    ///
    /// Only transport-level and server-side failures qualify; client errors,
    /// validation failures and "not found" are terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::UpstreamUnavailable(_))
    }

    /// Message that is safe to hand to an external caller
    ///
    /// Internal details (SQL, file paths, serializer output) are replaced by a
    /// generic message; the full error should be logged instead.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "internal error".to_string(),
            _ => self.to_string(),
        }
    }
}
