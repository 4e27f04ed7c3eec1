mod error;
mod locator;
mod parser;
mod sampler;

pub use error::MplexError;
pub use locator::{
    read_bounded, EnvSource, Locator, ProcessEnv, ScreenCommand, SessionLister,
    MAX_LISTING_BYTES, SCREEN_ENV, TMUX_ENV,
};
pub use parser::{extract_socket_dir, extract_tmux_socket};
pub use sampler::Sampler;

#[cfg(test)]
pub(crate) use locator::tests::{env as test_env, FakeLister};

use std::fmt;
use std::path::PathBuf;

/// Supported terminal multiplexer families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplexer {
    /// GNU screen
    Screen,
    Tmux,
}

impl fmt::Display for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Multiplexer::Screen => f.write_str("screen"),
            Multiplexer::Tmux => f.write_str("tmux"),
        }
    }
}

/// Outcome of multiplexer detection, computed once at startup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DetectionResult {
    /// Whether a multiplexer and its control socket were found
    pub supported: bool,
    /// Control socket whose mode bits track attachment
    pub socket_path: Option<PathBuf>,
    /// Which family owns the session
    pub multiplexer: Option<Multiplexer>,
}

impl DetectionResult {
    pub fn found(multiplexer: Multiplexer, socket_path: PathBuf) -> Self {
        Self {
            supported: true,
            socket_path: Some(socket_path),
            multiplexer: Some(multiplexer),
        }
    }

    pub fn unsupported() -> Self {
        Self::default()
    }
}
