use thiserror::Error;

/// Result type for the failing `DualKeyMap` operations.
pub type Result<T> = std::result::Result<T, DualKeyError>;

/// Errors returned by `DualKeyMap`. A failed call leaves the map unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DualKeyError {
    /// The (primary, secondary) pair is already present.
    #[error("an entry with this primary and secondary key already exists")]
    DuplicateKey,
    /// No entry matches the requested key.
    #[error("no entry matches the requested key")]
    KeyNotFound,
}
