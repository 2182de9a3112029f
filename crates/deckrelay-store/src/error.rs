//! Error types for the persistence layer.

/// Errors that can occur while reading or writing persisted state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage backend failed.
    #[error("storage backend failed: {0}")]
    Backend(String),
}
