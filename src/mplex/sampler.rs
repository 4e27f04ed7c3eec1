use std::path::{Path, PathBuf};

use super::DetectionResult;

/// Owner-execute bit; screen and tmux set it on the socket while a client is attached
#[cfg(unix)]
const ATTACHED_BIT: u32 = 0o100;

/// Samples the attachment state of a located control socket
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    socket_path: Option<PathBuf>,
}

impl Sampler {
    pub fn new(socket_path: Option<PathBuf>) -> Self {
        Self { socket_path }
    }

    pub fn from_detection(detection: &DetectionResult) -> Self {
        if detection.supported {
            Self::new(detection.socket_path.clone())
        } else {
            Self::default()
        }
    }

    pub fn socket_path(&self) -> Option<&Path> {
        self.socket_path.as_deref()
    }

    /// Whether the session is detached. Anything short of positive evidence
    /// of detachment reads as attached.
    pub fn is_detached(&self) -> bool {
        match &self.socket_path {
            Some(path) => socket_detached(path),
            None => false,
        }
    }
}

#[cfg(unix)]
fn socket_detached(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => meta.permissions().mode() & ATTACHED_BIT == 0,
        Err(e) => {
            tracing::debug!(path = %path.display(), "cannot stat control socket: {}", e);
            false
        }
    }
}

#[cfg(not(unix))]
fn socket_detached(_path: &Path) -> bool {
    false
}
