use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use super::error::MplexError;
use super::parser::{extract_socket_dir, extract_tmux_socket};
use super::{DetectionResult, Multiplexer};

/// Variable GNU screen sets inside a session (`<pid>.<tty>.<host>`)
pub const SCREEN_ENV: &str = "STY";
/// Variable tmux sets inside a session (`<socket>,<pid>,<index>`)
pub const TMUX_ENV: &str = "TMUX";

/// Ceiling for the captured `screen -ls` output
pub const MAX_LISTING_BYTES: usize = 1 << 20;

/// Read-only view of environment variables
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Source of GNU screen's session listing
pub trait SessionLister: Send + Sync {
    fn list_sessions(&self) -> impl Future<Output = Result<String, MplexError>> + Send;
}

/// Runs `screen -ls` with a fixed locale so the output format is predictable
pub struct ScreenCommand {
    /// Path to screen binary
    screen_path: String,
    max_output: usize,
}

impl ScreenCommand {
    pub fn new() -> Self {
        Self {
            screen_path: "screen".to_string(),
            max_output: MAX_LISTING_BYTES,
        }
    }

    #[must_use]
    pub fn with_binary(mut self, path: impl Into<String>) -> Self {
        self.screen_path = path.into();
        self
    }
}

impl Default for ScreenCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLister for ScreenCommand {
    async fn list_sessions(&self) -> Result<String, MplexError> {
        let mut child = Command::new(&self.screen_path)
            .arg("-ls")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(MplexError::Launch)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MplexError::Launch(std::io::Error::other("stdout not captured")))?;

        let listing = read_bounded(BufReader::new(stdout), self.max_output).await?;

        // screen -ls exits non-zero even on a good listing, so only reap it
        if let Err(e) = child.wait().await {
            tracing::debug!("screen -ls did not exit cleanly: {}", e);
        }

        Ok(listing)
    }
}

/// Accumulate a stream line by line, failing once `limit` bytes are exceeded.
/// At most `limit + 1` bytes are ever read from `reader`.
pub async fn read_bounded<R>(reader: R, limit: usize) -> Result<String, MplexError>
where
    R: AsyncBufRead + Unpin,
{
    let mut reader = reader.take(limit as u64 + 1);
    let mut buffer = Vec::new();
    loop {
        let read = reader.read_until(b'\n', &mut buffer).await?;
        if read == 0 {
            break;
        }
        if buffer.len() > limit {
            return Err(MplexError::OutputTooLarge { limit });
        }
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Finds the control socket of the multiplexer that owns this process
pub struct Locator<E, L> {
    env: E,
    lister: L,
}

impl Locator<ProcessEnv, ScreenCommand> {
    /// Locator over the real environment and `screen` binary
    pub fn system() -> Self {
        Self::new(ProcessEnv, ScreenCommand::new())
    }
}

impl<E: EnvSource, L: SessionLister> Locator<E, L> {
    pub fn new(env: E, lister: L) -> Self {
        Self { env, lister }
    }

    /// Try GNU screen, then tmux.
    pub async fn detect(&self) -> DetectionResult {
        match self.detect_screen().await {
            Ok(path) => return DetectionResult::found(Multiplexer::Screen, path),
            Err(e) => tracing::debug!("screen not detected: {}", e),
        }

        match self.detect_tmux() {
            Ok(path) => DetectionResult::found(Multiplexer::Tmux, path),
            Err(e) => {
                tracing::debug!("tmux not detected: {}", e);
                DetectionResult::unsupported()
            }
        }
    }

    pub async fn detect_screen(&self) -> Result<PathBuf, MplexError> {
        let session = self
            .env
            .var(SCREEN_ENV)
            .ok_or(MplexError::MissingVariable(SCREEN_ENV))?;

        let listing = self.lister.list_sessions().await?;
        if listing.is_empty() {
            return Err(MplexError::EmptyListing);
        }

        let dir = extract_socket_dir(&listing).ok_or(MplexError::SocketNotFound)?;
        Ok(PathBuf::from(dir).join(session))
    }

    pub fn detect_tmux(&self) -> Result<PathBuf, MplexError> {
        let descriptor = self
            .env
            .var(TMUX_ENV)
            .ok_or(MplexError::MissingVariable(TMUX_ENV))?;

        match extract_tmux_socket(&descriptor) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Err(MplexError::SocketNotFound),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned listing that counts how often it was asked
    pub struct FakeLister {
        output: Option<String>,
        pub calls: AtomicUsize,
    }

    impl FakeLister {
        pub fn with_output(output: &str) -> Self {
            Self {
                output: Some(output.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                output: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl SessionLister for FakeLister {
        async fn list_sessions(&self) -> Result<String, MplexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.output.clone().ok_or_else(|| {
                MplexError::Launch(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "screen: not found",
                ))
            })
        }
    }

    pub fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    const LISTING: &str = "There is a screen on:\n\t4242.pts-3.devbox\t(Attached)\n1 Socket in /run/screen/S-elle.\n";

    #[tokio::test]
    async fn test_detect_screen() {
        let locator = Locator::new(
            env(&[("STY", "4242.pts-3.devbox")]),
            FakeLister::with_output(LISTING),
        );
        let result = locator.detect().await;
        assert!(result.supported);
        assert_eq!(result.multiplexer, Some(Multiplexer::Screen));
        assert_eq!(
            result.socket_path,
            Some(PathBuf::from("/run/screen/S-elle/4242.pts-3.devbox"))
        );
    }

    #[tokio::test]
    async fn test_screen_wins_over_tmux() {
        let locator = Locator::new(
            env(&[("STY", "4242.pts-3.devbox"), ("TMUX", "/tmp/tmux-1000/default,1,0")]),
            FakeLister::with_output(LISTING),
        );
        let result = locator.detect().await;
        assert_eq!(result.multiplexer, Some(Multiplexer::Screen));
    }

    #[tokio::test]
    async fn test_falls_back_to_tmux() {
        let locator = Locator::new(
            env(&[("STY", "4242.pts-3.devbox"), ("TMUX", "/tmp/tmux-1000/default,1234,0")]),
            FakeLister::failing(),
        );
        let result = locator.detect().await;
        assert!(result.supported);
        assert_eq!(result.multiplexer, Some(Multiplexer::Tmux));
        assert_eq!(
            result.socket_path,
            Some(PathBuf::from("/tmp/tmux-1000/default"))
        );
    }

    #[tokio::test]
    async fn test_no_session_variable_skips_subprocess() {
        let lister = FakeLister::with_output(LISTING);
        let locator = Locator::new(env(&[]), lister);
        let result = locator.detect().await;
        assert!(!result.supported);
        assert_eq!(result.socket_path, None);
        assert_eq!(result.multiplexer, None);
        assert_eq!(locator.lister.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_screen_failures() {
        let empty = Locator::new(env(&[("STY", "1.x")]), FakeLister::with_output(""));
        assert!(matches!(
            empty.detect_screen().await,
            Err(MplexError::EmptyListing)
        ));

        let garbled = Locator::new(
            env(&[("STY", "1.x")]),
            FakeLister::with_output("No Sockets found\n"),
        );
        assert!(matches!(
            garbled.detect_screen().await,
            Err(MplexError::SocketNotFound)
        ));

        let launch = Locator::new(env(&[("STY", "1.x")]), FakeLister::failing());
        assert!(matches!(
            launch.detect_screen().await,
            Err(MplexError::Launch(_))
        ));
        assert!(!launch.detect().await.supported);
    }

    #[test]
    fn test_tmux_failures() {
        let locator = Locator::new(env(&[("TMUX", "garbage")]), FakeLister::failing());
        assert!(matches!(
            locator.detect_tmux(),
            Err(MplexError::SocketNotFound)
        ));

        let locator = Locator::new(env(&[("TMUX", ",1,0")]), FakeLister::failing());
        assert!(matches!(
            locator.detect_tmux(),
            Err(MplexError::SocketNotFound)
        ));

        let locator = Locator::new(env(&[]), FakeLister::failing());
        assert!(matches!(
            locator.detect_tmux(),
            Err(MplexError::MissingVariable("TMUX"))
        ));
    }

    #[tokio::test]
    async fn test_read_bounded_accumulates_long_output() {
        let line = "x".repeat(4096) + "\n";
        let input = line.repeat(64);
        let output = read_bounded(input.as_bytes(), MAX_LISTING_BYTES)
            .await
            .unwrap();
        assert_eq!(output.len(), input.len());
    }

    #[tokio::test]
    async fn test_read_bounded_keeps_unterminated_tail() {
        let output = read_bounded(&b"first\nsecond"[..], 64).await.unwrap();
        assert_eq!(output, "first\nsecond");
    }

    #[tokio::test]
    async fn test_read_bounded_rejects_oversized_output() {
        let input = "line\n".repeat(100);
        let result = read_bounded(input.as_bytes(), 64).await;
        assert!(matches!(
            result,
            Err(MplexError::OutputTooLarge { limit: 64 })
        ));
    }

    #[tokio::test]
    async fn test_read_bounded_stops_inside_long_line() {
        let data = vec![b'x'; 4096];
        let mut rest = &data[..];
        let result = read_bounded(&mut rest, 64).await;
        assert!(matches!(
            result,
            Err(MplexError::OutputTooLarge { limit: 64 })
        ));
        assert_eq!(rest.len(), 4096 - 65);
    }

    #[tokio::test]
    async fn test_read_bounded_endless_stream() {
        let endless = BufReader::new(tokio::io::repeat(b'x'));
        let result = read_bounded(endless, 1024).await;
        assert!(matches!(
            result,
            Err(MplexError::OutputTooLarge { limit: 1024 })
        ));
    }

    #[tokio::test]
    async fn test_read_bounded_exact_limit_is_accepted() {
        let output = read_bounded(&b"abcd\n"[..], 5).await.unwrap();
        assert_eq!(output, "abcd\n");
    }

    #[tokio::test]
    async fn test_missing_screen_binary() {
        let lister = ScreenCommand::new().with_binary("/nonexistent/screen-binary");
        assert!(matches!(
            lister.list_sessions().await,
            Err(MplexError::Launch(_))
        ));
    }
}
