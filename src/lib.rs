//! Automatic away status for chat clients running inside GNU screen or tmux.
//!
//! At startup the multiplexer owning the session is located along with its
//! control socket. While auto-away is armed, the socket's owner-execute bit is
//! sampled periodically: when the session is detached the status goes to away,
//! and it is restored when the session is attached again.

pub mod actions;
pub mod app;
pub mod away;
pub mod config;
pub mod mplex;
pub mod presence;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use away::AwayHandle;
pub use config::AutoAwayConfig;
pub use presence::{PresenceHost, StatusCommand, UserStatus};

use away::AwayTracker;
use mplex::{EnvSource, Locator, Sampler, SessionLister};

/// Detect the multiplexer from the real environment and arm auto-away.
///
/// Returns `None` when auto-away is disabled or no multiplexer was found; the
/// host's status is then never touched.
pub async fn enable_auto_away<H>(config: &AutoAwayConfig, host: Arc<Mutex<H>>) -> Option<AwayHandle>
where
    H: PresenceHost + 'static,
{
    enable_auto_away_with(config, host, &Locator::system()).await
}

/// Same as [`enable_auto_away`] with an explicit locator
pub async fn enable_auto_away_with<H, E, L>(
    config: &AutoAwayConfig,
    host: Arc<Mutex<H>>,
    locator: &Locator<E, L>,
) -> Option<AwayHandle>
where
    H: PresenceHost + 'static,
    E: EnvSource,
    L: SessionLister,
{
    if !config.enabled {
        tracing::debug!("auto-away disabled in settings");
        return None;
    }

    let detection = locator.detect().await;
    if !detection.supported {
        tracing::debug!("no terminal multiplexer found, auto-away off");
        return None;
    }

    let sampler = Sampler::from_detection(&detection);
    tracing::info!(
        multiplexer = ?detection.multiplexer,
        socket = ?sampler.socket_path(),
        "auto-away armed"
    );

    Some(AwayHandle::spawn(
        sampler,
        AwayTracker::new(config.away_note.clone()),
        host,
        config.poll_interval(),
    ))
}
