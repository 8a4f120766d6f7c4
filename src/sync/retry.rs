// Background retry controller for feed reconnection.
//
// An explicit per-league state machine (Idle -> Scheduled -> Retrying)
// driven by a single cancellable timer. The machine reacts only to
// success/failure signals; the event loop owns the actual network
// attempt behind the `FeedConnector` seam. Reconnection scheduling is
// fully independent of manual mode: nothing here knows or cares whether
// manual entry is currently authoritative.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{FeedConnector, FeedError};

// ---------------------------------------------------------------------------
// Policy and read model
// ---------------------------------------------------------------------------

/// Backoff tuning. The delay sequence from the defaults is
/// 5s, 10s, 20s, 30s, 30s, ...
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            initial_delay: Duration::from_millis(5000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

/// Where the machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPhase {
    Idle,
    /// A timer is pending; an attempt fires when it elapses.
    Scheduled,
    /// An attempt is in flight.
    Retrying,
}

/// Read model surfaced to the presentation layer (reconnection
/// countdowns and the like).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub retry_count: u32,
    pub current_delay: Duration,
    pub is_retrying: bool,
}

/// Message sent by the timer when a scheduled attempt comes due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryTick {
    pub league_id: String,
}

// ---------------------------------------------------------------------------
// Cancellable timer
// ---------------------------------------------------------------------------

/// One pending timer at most. Scheduling replaces any pending timer;
/// cancellation and drop abort the task, so no tick is delivered after
/// disposal.
#[derive(Debug, Default)]
struct RetryTimer {
    handle: Option<JoinHandle<()>>,
}

impl RetryTimer {
    fn schedule(&mut self, delay: Duration, tx: mpsc::Sender<RetryTick>, league_id: String) {
        self.cancel();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Receiver gone means the event loop shut down; nothing to do.
            let _ = tx.send(RetryTick { league_id }).await;
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Per-league reconnection state machine.
#[derive(Debug)]
pub struct RetryController {
    league_id: String,
    policy: RetryPolicy,
    enabled: bool,
    phase: RetryPhase,
    retry_count: u32,
    current_delay: Duration,
    timer: RetryTimer,
    tick_tx: mpsc::Sender<RetryTick>,
}

impl RetryController {
    pub fn new(league_id: &str, policy: RetryPolicy, tick_tx: mpsc::Sender<RetryTick>) -> Self {
        RetryController {
            league_id: league_id.to_string(),
            policy,
            enabled: true,
            phase: RetryPhase::Idle,
            retry_count: 0,
            current_delay: policy.initial_delay,
            timer: RetryTimer::default(),
            tick_tx,
        }
    }

    pub fn league_id(&self) -> &str {
        &self.league_id
    }

    pub fn phase(&self) -> RetryPhase {
        self.phase
    }

    pub fn state(&self) -> RetryState {
        RetryState {
            retry_count: self.retry_count,
            current_delay: self.current_delay,
            is_retrying: self.phase == RetryPhase::Retrying,
        }
    }

    /// Register a failure: bump the count, schedule the next attempt
    /// after the current delay, then double the delay (capped). After N
    /// consecutive failures `current_delay == min(initial * 2^N, max)`.
    pub fn on_failure(&mut self) {
        if !self.enabled {
            debug!(
                "Retry disabled for league {}, dropping failure signal",
                self.league_id
            );
            return;
        }

        self.retry_count += 1;
        let fire_in = self.current_delay;
        self.current_delay = (self.current_delay * 2).min(self.policy.max_delay);
        self.phase = RetryPhase::Scheduled;
        self.timer
            .schedule(fire_in, self.tick_tx.clone(), self.league_id.clone());

        info!(
            "League {}: retry #{} scheduled in {:?} (next delay {:?})",
            self.league_id, self.retry_count, fire_in, self.current_delay
        );
    }

    /// Transition into an in-flight attempt. Called when a scheduled
    /// tick arrives, or directly to force an immediate attempt.
    /// Returns `false` when retries are disabled.
    pub fn begin_attempt(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.timer.cancel();
        self.phase = RetryPhase::Retrying;
        true
    }

    /// Force an immediate attempt, bypassing any pending timer.
    pub fn retry(&mut self) -> bool {
        self.begin_attempt()
    }

    /// A reconnect succeeded: delay and count reset, machine goes idle.
    pub fn on_success(&mut self) {
        self.timer.cancel();
        self.retry_count = 0;
        self.current_delay = self.policy.initial_delay;
        self.phase = RetryPhase::Idle;
        info!("League {}: feed reconnected, backoff reset", self.league_id);
    }

    /// Stop retrying without resetting the backoff. Used for persistent
    /// failures that need explicit user action.
    pub fn abandon(&mut self) {
        self.timer.cancel();
        self.phase = RetryPhase::Idle;
    }

    /// Toggle scheduling. Disabling cancels any pending timer and blocks
    /// new scheduling; re-enabling does not itself fire an attempt.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.timer.cancel();
            self.phase = RetryPhase::Idle;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Drive one reconnect attempt through the connector seam.
///
/// Success resets the machine. A transient failure schedules the next
/// attempt; a persistent failure stops the machine and is returned to
/// the caller for explicit handling. Returns `Ok(false)` without doing
/// anything when retries are disabled.
pub async fn run_attempt(
    controller: &mut RetryController,
    connector: Arc<dyn FeedConnector>,
) -> Result<bool, FeedError> {
    if !controller.begin_attempt() {
        return Ok(false);
    }

    match connector.reconnect().await {
        Ok(()) => {
            controller.on_success();
            Ok(true)
        }
        Err(e) if e.is_transient() => {
            warn!(
                "League {}: reconnect attempt failed ({e}), backing off",
                controller.league_id()
            );
            controller.on_failure();
            Err(e)
        }
        Err(e) => {
            warn!(
                "League {}: persistent feed failure ({e}), retries stopped",
                controller.league_id()
            );
            controller.abandon();
            Err(e)
        }
    }
}
