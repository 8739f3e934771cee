use thiserror::Error;

/// Failure of a single branch of the discovery graph.
///
/// A 404 is never an error here: it is reported as
/// [`FetchOutcome::NotFound`](crate::fetch::FetchOutcome::NotFound).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status}")]
    Protocol { status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("symbolic ref chain from {path} exceeds depth {depth}")]
    RecursionLimit { path: String, depth: usize },

    #[error("symbolic ref cycle at {path}")]
    RefCycle { path: String },
}

pub type Result<T> = std::result::Result<T, FetchError>;
