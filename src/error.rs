pub type VerticutResult<T> = Result<T, VerticutError>;

/// Errors from fragment ingestion on the upload assembler.
///
/// A fragment error never invalidates the session it targets; the caller may
/// retry the same fragment.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FragmentError {
    #[error("fragment index {index} out of range for {total_chunks} chunks")]
    IndexOutOfRange { index: u32, total_chunks: u32 },

    #[error("fragment reports {got} total chunks, session expects {expected}")]
    TotalChunksMismatch { expected: u32, got: u32 },

    #[error("upload session '{upload_id}' is busy")]
    SessionBusy { upload_id: String },
}

#[derive(thiserror::Error, Debug)]
pub enum VerticutError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// The symmetric crop left no content rows.
    #[error("degenerate crop: cropped height {cropped_height} px leaves no content")]
    DegenerateCrop { cropped_height: i64 },

    #[error("unreadable source: {0}")]
    UnreadableSource(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Fragment(#[from] FragmentError),

    #[error("upload incomplete: {received} of {total} fragments received")]
    Incomplete { received: usize, total: u32 },

    #[error("transcode timed out after {limit_seconds}s")]
    Timeout { limit_seconds: u64 },

    /// Diagnostics are bounded at capture time, never the full transcoder log.
    #[error("transcode failed (exit status {status:?}): {diagnostics}")]
    TranscodeFailed {
        status: Option<i32>,
        diagnostics: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VerticutError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn unreadable_source(msg: impl Into<String>) -> Self {
        Self::UnreadableSource(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
