//! Auto-away state machine and the periodic task that drives it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::mplex::Sampler;
use crate::presence::{truncate_note, PresenceHost, StatusCommand, UserStatus};

/// Where an armed auto-away timer stands relative to the session. When no
/// multiplexer was found or the feature is off, no timer exists at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwayState {
    ArmedAttached,
    /// We set the status to away and hold the previous one
    ArmedAway,
}

/// Status that was in effect before auto-away kicked in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSnapshot {
    pub saved_status: UserStatus,
    pub saved_note: String,
}

impl Default for PresenceSnapshot {
    fn default() -> Self {
        Self {
            saved_status: UserStatus::Online,
            saved_note: String::new(),
        }
    }
}

/// Decides, one tick at a time, whether the live status needs to change
#[derive(Debug, Clone)]
pub struct AwayTracker {
    state: AwayState,
    snapshot: PresenceSnapshot,
    away_note: String,
}

impl AwayTracker {
    pub fn new(away_note: impl Into<String>) -> Self {
        Self {
            state: AwayState::ArmedAttached,
            snapshot: PresenceSnapshot::default(),
            away_note: truncate_note(&away_note.into()).to_string(),
        }
    }

    pub fn state(&self) -> AwayState {
        self.state
    }

    pub fn snapshot(&self) -> &PresenceSnapshot {
        &self.snapshot
    }

    /// Evaluate one sample. Returns the command to dispatch, if any.
    pub fn evaluate<H: PresenceHost + ?Sized>(
        &mut self,
        host: &H,
        detached: bool,
    ) -> Option<StatusCommand> {
        let live = host.status();

        match (live, detached) {
            (UserStatus::Away, false) if self.state == AwayState::ArmedAway => {
                self.state = AwayState::ArmedAttached;
                Some(StatusCommand::new(
                    self.snapshot.saved_status,
                    self.snapshot.saved_note.clone(),
                ))
            }
            (UserStatus::Away, _) => None,
            (_, true) if self.state == AwayState::ArmedAttached => {
                self.snapshot = PresenceSnapshot {
                    saved_status: live,
                    saved_note: truncate_note(&host.note()).to_string(),
                };
                self.state = AwayState::ArmedAway;
                Some(StatusCommand::new(UserStatus::Away, self.away_note.clone()))
            }
            // changed by hand after we set away; manual choices are left alone
            (_, true) => None,
            (_, false) => {
                // attached again without being away, so any snapshot is stale
                self.state = AwayState::ArmedAttached;
                None
            }
        }
    }
}

/// Handle to a running auto-away task
pub struct AwayHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl AwayHandle {
    /// Start sampling every `period`, first sample one period from now
    pub fn spawn<H>(
        sampler: Sampler,
        tracker: AwayTracker,
        host: Arc<Mutex<H>>,
        period: Duration,
    ) -> Self
    where
        H: PresenceHost + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(run_timer(sampler, tracker, host, period, token));
        Self { cancel, task }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the timer and wait for it to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("auto-away task ended abnormally: {}", e);
        }
    }
}

async fn run_timer<H>(
    sampler: Sampler,
    mut tracker: AwayTracker,
    host: Arc<Mutex<H>>,
    period: Duration,
    cancel: CancellationToken,
) where
    H: PresenceHost,
{
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("auto-away timer cancelled");
                break;
            }
            _ = ticker.tick() => {
                let detached = sampler.is_detached();
                let mut host = host.lock().await;
                if let Some(command) = tracker.evaluate(&*host, detached) {
                    tracing::info!(detached, "auto-away: {}", command);
                    host.run_status_command(&command);
                }
            }
        }
    }
}
