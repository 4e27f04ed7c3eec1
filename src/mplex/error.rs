use thiserror::Error;

/// Reasons multiplexer detection can fail. None of these are fatal: every
/// variant ends with auto-away disabled for the rest of the process.
#[derive(Debug, Error)]
pub enum MplexError {
    #[error("environment variable {0} is not set")]
    MissingVariable(&'static str),

    #[error("failed to launch session listing: {0}")]
    Launch(#[source] std::io::Error),

    #[error("session listing produced no output")]
    EmptyListing,

    #[error("session listing exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("no control socket found in session info")]
    SocketNotFound,

    #[error("failed to read session listing: {0}")]
    Io(#[from] std::io::Error),
}
