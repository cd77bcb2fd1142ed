//! Advisory proctoring for quiz sessions.
//!
//! The monitor only nudges: it warns when the learner leaves fullscreen or
//! hides the tab, and ends the session if they stay away for the whole
//! warning window. It does not stop devtools, second devices or any other
//! bypass.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

pub const DEFAULT_WARNING_SECONDS: u32 = 5;
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LockdownState {
    Normal,
    #[serde(rename_all = "camelCase")]
    Warning {
        seconds_remaining: u32,
    },
    Terminated,
}

/// Fullscreen/visibility capability of the host the quiz runs in.
///
/// Loss and restoration of visibility are delivered to the monitor as
/// events ([`LockdownMonitor::visibility_lost`] and
/// [`LockdownMonitor::visibility_restored`]).
#[cfg_attr(test, mockall::automock)]
pub trait ProctorEnvironment: Send {
    fn is_supported(&self) -> bool;
    /// Returns `true` when the lock took effect immediately.
    fn request_lock(&mut self) -> bool;
    fn release_lock(&mut self);
    /// Whether the host currently reports the lock as held.
    fn is_locked(&self) -> bool;
}

/// Environment for a browser that drives its session over HTTP.
///
/// The server cannot enter fullscreen itself, so a lock request never takes
/// effect immediately; the monitor surfaces it to the client instead.
#[derive(Debug, Clone)]
pub struct RemoteProctor {
    supported: bool,
}

impl RemoteProctor {
    pub fn new(supported: bool) -> Self {
        Self { supported }
    }
}

impl ProctorEnvironment for RemoteProctor {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn request_lock(&mut self) -> bool {
        false
    }

    fn release_lock(&mut self) {}

    fn is_locked(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Owner handle of one running countdown. Cancelling or dropping it stops
/// the ticks.
#[derive(Debug)]
pub struct CountdownHandle {
    generation: u64,
    task: Option<JoinHandle<()>>,
    cancelled: Arc<AtomicBool>,
}

impl CountdownHandle {
    pub fn spawned(generation: u64, task: JoinHandle<()>) -> Self {
        Self {
            generation,
            task: Some(task),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn manual(generation: u64, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            generation,
            task: None,
            cancelled,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

pub trait CountdownScheduler: Send {
    fn start(&mut self, generation: u64) -> CountdownHandle;
}

/// Sends a [`Tick`] every `period` on a tokio interval until cancelled.
pub struct TokioCountdown {
    period: Duration,
    ticks: mpsc::UnboundedSender<Tick>,
}

impl TokioCountdown {
    pub fn new(period: Duration, ticks: mpsc::UnboundedSender<Tick>) -> Self {
        Self { period, ticks }
    }
}

impl CountdownScheduler for TokioCountdown {
    fn start(&mut self, generation: u64) -> CountdownHandle {
        let ticks = self.ticks.clone();
        let period = self.period;
        let task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                if ticks.send(Tick { generation }).is_err() {
                    break;
                }
            }
        });
        CountdownHandle::spawned(generation, task)
    }
}

/// Countdown whose ticks are delivered by the caller. Used by hosts without a
/// tokio runtime and by tests.
#[derive(Clone, Default)]
pub struct ManualCountdown {
    started: Arc<Mutex<Vec<(u64, Arc<AtomicBool>)>>>,
}

impl ManualCountdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started(&self) -> usize {
        self.started.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Whether the most recently started countdown is still live.
    pub fn is_running(&self) -> bool {
        self.started
            .lock()
            .ok()
            .and_then(|s| s.last().map(|(_, c)| !c.load(Ordering::SeqCst)))
            .unwrap_or(false)
    }

    pub fn last_generation(&self) -> Option<u64> {
        self.started
            .lock()
            .ok()
            .and_then(|s| s.last().map(|(g, _)| *g))
    }
}

impl CountdownScheduler for ManualCountdown {
    fn start(&mut self, generation: u64) -> CountdownHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        if let Ok(mut started) = self.started.lock() {
            started.push((generation, cancelled.clone()));
        }
        CountdownHandle::manual(generation, cancelled)
    }
}

fn unsupported() -> Error {
    Error::UnsupportedEnvironment(
        "fullscreen and visibility events are not available".to_string(),
    )
}

pub struct LockdownMonitor {
    env: Box<dyn ProctorEnvironment>,
    scheduler: Box<dyn CountdownScheduler>,
    warning_seconds: u32,
    state: LockdownState,
    countdown: Option<CountdownHandle>,
    generation: u64,
    degraded: bool,
    lock_held: bool,
    relock_requested: bool,
}

impl LockdownMonitor {
    pub fn new(
        env: Box<dyn ProctorEnvironment>,
        scheduler: Box<dyn CountdownScheduler>,
        warning_seconds: u32,
    ) -> Self {
        let degraded = !env.is_supported();
        if degraded {
            tracing::warn!(error = %unsupported(), "Lockdown disabled");
        }
        Self {
            env,
            scheduler,
            warning_seconds: warning_seconds.max(1),
            state: LockdownState::Normal,
            countdown: None,
            generation: 0,
            degraded,
            lock_held: false,
            relock_requested: false,
        }
    }

    /// A monitor that never warns. Stands in when the host reports no
    /// fullscreen or visibility support.
    pub fn disabled() -> Self {
        Self::new(
            Box::new(RemoteProctor::new(false)),
            Box::new(ManualCountdown::new()),
            DEFAULT_WARNING_SECONDS,
        )
    }

    pub fn state(&self) -> LockdownState {
        self.state
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Fails for hosts that cannot enforce the lockdown at all.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.degraded {
            return Err(unsupported());
        }
        Ok(())
    }

    pub fn is_terminated(&self) -> bool {
        self.state == LockdownState::Terminated
    }

    /// The host should re-enter fullscreen.
    pub fn relock_requested(&self) -> bool {
        self.relock_requested
    }

    /// Takes the initial lock when the session becomes active.
    pub fn engage(&mut self) {
        if self.degraded || self.is_terminated() {
            return;
        }
        self.try_lock();
    }

    /// Fullscreen exit or tab hidden. `armed` is false once the session no
    /// longer needs watching (fully answered, or not in progress).
    pub fn visibility_lost(&mut self, armed: bool) -> LockdownState {
        if self.degraded || self.is_terminated() {
            return self.state;
        }
        self.lock_held = false;
        if !armed || self.state != LockdownState::Normal {
            return self.state;
        }

        self.generation += 1;
        self.state = LockdownState::Warning {
            seconds_remaining: self.warning_seconds,
        };
        self.countdown = Some(self.scheduler.start(self.generation));
        tracing::info!(
            seconds = self.warning_seconds,
            "Lockdown warning started"
        );
        self.try_lock();
        self.state
    }

    pub fn visibility_restored(&mut self) -> LockdownState {
        if self.degraded || self.is_terminated() {
            return self.state;
        }
        self.lock_held = true;
        self.relock_requested = false;
        if let LockdownState::Warning { seconds_remaining } = self.state {
            self.cancel_countdown();
            self.state = LockdownState::Normal;
            tracing::info!(seconds_remaining, "Lockdown warning cleared");
        }
        self.state
    }

    pub fn on_tick(&mut self, tick: Tick) -> LockdownState {
        let LockdownState::Warning { seconds_remaining } = self.state else {
            return self.state;
        };
        if tick.generation != self.generation {
            tracing::debug!(tick = tick.generation, current = self.generation, "Stale tick ignored");
            return self.state;
        }

        let remaining = seconds_remaining.saturating_sub(1);
        if remaining == 0 {
            self.terminate();
        } else {
            self.state = LockdownState::Warning {
                seconds_remaining: remaining,
            };
            if !self.lock_held && !self.env.is_locked() {
                self.try_lock();
            }
        }
        self.state
    }

    /// One-way; calling it again is a no-op.
    pub fn terminate(&mut self) {
        if self.is_terminated() {
            return;
        }
        self.release();
        self.state = LockdownState::Terminated;
        tracing::warn!("Session terminated by lockdown");
    }

    /// Cancels any countdown and gives the lock back. Used on completion and
    /// when the host tears the session down.
    pub fn release(&mut self) {
        self.cancel_countdown();
        if self.lock_held || self.relock_requested {
            self.env.release_lock();
        }
        self.lock_held = false;
        self.relock_requested = false;
        if matches!(self.state, LockdownState::Warning { .. }) {
            self.state = LockdownState::Normal;
        }
    }

    fn try_lock(&mut self) {
        if self.env.request_lock() {
            self.lock_held = true;
            self.relock_requested = false;
            // a granted relock is a return to fullscreen
            if let LockdownState::Warning { seconds_remaining } = self.state {
                self.cancel_countdown();
                self.state = LockdownState::Normal;
                tracing::info!(seconds_remaining, "Lockdown warning cleared by relock");
            }
        } else {
            self.relock_requested = true;
        }
    }

    fn cancel_countdown(&mut self) {
        if let Some(mut countdown) = self.countdown.take() {
            countdown.cancel();
            tracing::debug!(generation = countdown.generation(), "Countdown cancelled");
        }
    }
}

impl Drop for LockdownMonitor {
    fn drop(&mut self) {
        if !self.is_terminated() {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A host that never grants the lock on request, like a remote browser.
    fn monitor(countdown: &ManualCountdown) -> LockdownMonitor {
        let mut env = MockProctorEnvironment::new();
        env.expect_is_supported().return_const(true);
        env.expect_request_lock().return_const(false);
        env.expect_is_locked().return_const(false);
        env.expect_release_lock().return_const(());
        LockdownMonitor::new(Box::new(env), Box::new(countdown.clone()), 5)
    }

    fn tick(monitor: &mut LockdownMonitor, countdown: &ManualCountdown, n: u32) {
        let generation = countdown.last_generation().unwrap();
        for _ in 0..n {
            monitor.on_tick(Tick { generation });
        }
    }

    #[test]
    fn countdown_expiry_terminates() {
        let countdown = ManualCountdown::new();
        let mut m = monitor(&countdown);
        m.engage();

        assert_eq!(
            m.visibility_lost(true),
            LockdownState::Warning {
                seconds_remaining: 5
            }
        );
        tick(&mut m, &countdown, 4);
        assert_eq!(
            m.state(),
            LockdownState::Warning {
                seconds_remaining: 1
            }
        );
        tick(&mut m, &countdown, 1);
        assert_eq!(m.state(), LockdownState::Terminated);
        assert!(!countdown.is_running());
    }

    #[test]
    fn returning_in_time_resets_to_normal() {
        let countdown = ManualCountdown::new();
        let mut m = monitor(&countdown);
        m.visibility_lost(true);
        tick(&mut m, &countdown, 3);

        assert_eq!(m.visibility_restored(), LockdownState::Normal);
        assert!(!countdown.is_running());

        // ticks from the cancelled countdown change nothing
        tick(&mut m, &countdown, 5);
        assert_eq!(m.state(), LockdownState::Normal);
    }

    #[test]
    fn repeated_loss_does_not_restart_countdown() {
        let countdown = ManualCountdown::new();
        let mut m = monitor(&countdown);
        m.visibility_lost(true);
        tick(&mut m, &countdown, 2);
        m.visibility_lost(true);
        assert_eq!(countdown.started(), 1);
        assert_eq!(
            m.state(),
            LockdownState::Warning {
                seconds_remaining: 3
            }
        );
    }

    #[test]
    fn unarmed_loss_is_ignored() {
        let countdown = ManualCountdown::new();
        let mut m = monitor(&countdown);
        assert_eq!(m.visibility_lost(false), LockdownState::Normal);
        assert_eq!(countdown.started(), 0);
    }

    #[test]
    fn terminate_is_idempotent() {
        let countdown = ManualCountdown::new();
        let mut env = MockProctorEnvironment::new();
        env.expect_is_supported().return_const(true);
        env.expect_request_lock().return_const(true);
        env.expect_release_lock().times(1).return_const(());
        let mut m = LockdownMonitor::new(Box::new(env), Box::new(countdown.clone()), 5);
        m.engage();

        m.terminate();
        m.terminate();
        assert_eq!(m.state(), LockdownState::Terminated);
        assert_eq!(m.visibility_restored(), LockdownState::Terminated);
    }

    #[test]
    fn unsupported_environment_degrades_to_noop() {
        let countdown = ManualCountdown::new();
        let mut env = MockProctorEnvironment::new();
        env.expect_is_supported().return_const(false);
        env.expect_request_lock().never();
        let mut m = LockdownMonitor::new(Box::new(env), Box::new(countdown.clone()), 5);

        m.engage();
        assert!(m.is_degraded());
        assert_eq!(m.ensure_supported().unwrap_err().status().as_u16(), 422);
        assert_eq!(m.visibility_lost(true), LockdownState::Normal);
        assert_eq!(countdown.started(), 0);
    }

    #[test]
    fn lock_is_retried_each_tick_until_granted() {
        let countdown = ManualCountdown::new();
        let mut env = MockProctorEnvironment::new();
        env.expect_is_supported().return_const(true);
        let mut seq = mockall::Sequence::new();
        env.expect_request_lock()
            .times(3)
            .in_sequence(&mut seq)
            .return_const(false);
        env.expect_request_lock()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(true);
        env.expect_is_locked().return_const(false);
        env.expect_release_lock().return_const(());
        let mut m = LockdownMonitor::new(Box::new(env), Box::new(countdown.clone()), 5);

        m.engage();
        assert!(m.relock_requested());
        m.visibility_lost(true);
        tick(&mut m, &countdown, 2);
        assert!(!m.relock_requested());
        assert_eq!(m.state(), LockdownState::Normal);
        assert!(!countdown.is_running());
        // granted: no further requests, and the countdown never expires
        tick(&mut m, &countdown, 5);
        assert_eq!(m.state(), LockdownState::Normal);
    }

    #[test]
    fn immediately_granted_relock_clears_warning() {
        let countdown = ManualCountdown::new();
        let mut env = MockProctorEnvironment::new();
        env.expect_is_supported().return_const(true);
        env.expect_request_lock().return_const(true);
        env.expect_is_locked().return_const(true);
        env.expect_release_lock().return_const(());
        let mut m = LockdownMonitor::new(Box::new(env), Box::new(countdown.clone()), 5);
        m.engage();

        assert_eq!(m.visibility_lost(true), LockdownState::Normal);
        assert_eq!(countdown.started(), 1);
        assert!(!countdown.is_running());
        tick(&mut m, &countdown, 5);
        assert_eq!(m.state(), LockdownState::Normal);
        assert!(!m.is_terminated());
    }

    #[test]
    fn host_reported_lock_suppresses_retries() {
        let countdown = ManualCountdown::new();
        let mut env = MockProctorEnvironment::new();
        env.expect_is_supported().return_const(true);
        // once on entering the warning, never again on ticks
        env.expect_request_lock().times(1).return_const(false);
        env.expect_is_locked().return_const(true);
        env.expect_release_lock().return_const(());
        let mut m = LockdownMonitor::new(Box::new(env), Box::new(countdown.clone()), 5);

        m.visibility_lost(true);
        tick(&mut m, &countdown, 3);
        assert_eq!(
            m.state(),
            LockdownState::Warning {
                seconds_remaining: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_countdown_ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioCountdown::new(Duration::from_secs(1), tx);
        let mut handle = scheduler.start(3);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(rx.recv().await, Some(Tick { generation: 3 }));
        assert_eq!(rx.recv().await, Some(Tick { generation: 3 }));

        handle.cancel();
        assert!(handle.is_cancelled());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
