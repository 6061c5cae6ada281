use flowdoc_editor::FlowError;

/// Failures of the sync layer.
///
/// Conflicts and exhausted retries are not errors: `sync` reports them as
/// `Ok(None)` and `trim` as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Blob store error: {0}")]
    Store(String),

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Flow(#[from] FlowError),

    #[error("Config error: {0}")]
    Config(String),
}

pub type SyncResult<T> = Result<T, SyncError>;
