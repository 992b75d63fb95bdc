//! Error types.
//!
//! The rate limiting primitives themselves never fail; errors only come from
//! configuration and from the few operations that take an index or install
//! global state.

use thiserror::Error;

/// Configuration errors reported by `validate()` / `from_env()` / `try_build()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Name of the setting.
        key: &'static str,
        /// Raw value that was rejected.
        value: String,
    },

    /// Unrecognized time header name.
    #[error("unknown time header {0:?} (expected none, 4_3 or 5_6)")]
    UnknownTimeHeader(String),

    /// Interval outside the accepted range.
    #[error("interval {interval_ms}ms exceeds the maximum of {max_ms}ms")]
    IntervalTooLarge {
        /// Requested interval.
        interval_ms: u64,
        /// Largest accepted interval.
        max_ms: u64,
    },

    /// A registry or histogram was configured with no room.
    #[error("{0} must be greater than 0")]
    ZeroCapacity(&'static str),
}

/// Crate-level error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QpError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A histogram bucket index was outside the configured range.
    #[error("bucket {bucket} out of range (histogram has {len} buckets)")]
    BucketOutOfRange {
        /// Requested bucket.
        bucket: usize,
        /// Number of buckets.
        len: usize,
    },

    /// The process-wide printer was already installed.
    #[error("global printer already initialized")]
    GlobalAlreadySet,
}

/// Result alias using [`QpError`].
pub type Result<T, E = QpError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = QpError::BucketOutOfRange { bucket: 9, len: 4 };
        assert_eq!(
            err.to_string(),
            "bucket 9 out of range (histogram has 4 buckets)"
        );

        let err: QpError = ConfigError::ZeroCapacity("max_sites").into();
        assert_eq!(err.to_string(), "max_sites must be greater than 0");
    }
}
