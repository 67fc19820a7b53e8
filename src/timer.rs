//! Precision session timer.
//!
//! Ticks are best-effort; the reported value never is. Elapsed time is always
//! recomputed as `now - start - paused_offset` from a monotonic clock, so a
//! delayed or dropped tick can only delay *delivery*, never skew the value.
//! Warning and expiry each fire at most once per started session.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Snapshot of the countdown at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimerReading {
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
    pub total_secs: f64,
    pub progress_ratio: f64,
}

/// Time-based trigger sources emitted by the timer task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimerSignal {
    Tick(TimerReading),
    /// Progress crossed the warning threshold. At most once per session.
    Warning(TimerReading),
    /// Elapsed reached the session duration. At most once; the task stops.
    Expired(TimerReading),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Running,
    Paused,
    Stopped,
}

/// Timer configuration; threshold and cadence come from `Settings`.
#[derive(Debug, Clone, Copy)]
pub struct TimerConfig {
    pub tick_interval: Duration,
    pub warning_threshold: f64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            warning_threshold: 0.80,
        }
    }
}

/// Drives time-based triggers for the active session.
///
/// One handle exists per countdown; `start` replaces any previous handle.
pub struct SessionTimer {
    config: TimerConfig,
    active: Option<ActiveTimer>,
}

struct ActiveTimer {
    shared: Arc<TimerShared>,
    cancel: CancellationToken,
}

struct TimerShared {
    started: Instant,
    total: Duration,
    pause: Mutex<PauseBook>,
}

#[derive(Default)]
struct PauseBook {
    paused_at: Option<Instant>,
    accumulated: Duration,
}

impl TimerShared {
    fn reading(&self) -> TimerReading {
        let total = self.total.as_secs_f64();
        let elapsed = self.elapsed().as_secs_f64();
        let remaining = (total - elapsed).max(0.0);
        let progress = if total > 0.0 {
            (elapsed / total).min(1.0)
        } else {
            1.0
        };
        TimerReading {
            elapsed_secs: elapsed,
            remaining_secs: remaining,
            total_secs: total,
            progress_ratio: progress,
        }
    }

    fn elapsed(&self) -> Duration {
        let book = self.pause.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let frozen_now = book.paused_at.unwrap_or_else(Instant::now);
        frozen_now.saturating_duration_since(self.started) - book.accumulated
    }

    fn is_paused(&self) -> bool {
        self.pause
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .paused_at
            .is_some()
    }
}

impl SessionTimer {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            active: None,
        }
    }

    /// Start a fresh countdown, replacing any previous one. Events are
    /// delivered into the given mailbox so they serialize with every other
    /// trigger source.
    pub fn start<E>(&mut self, total: Duration, events: mpsc::Sender<E>)
    where
        E: From<TimerSignal> + Send + 'static,
    {
        self.stop();

        let shared = Arc::new(TimerShared {
            started: Instant::now(),
            total,
            pause: Mutex::new(PauseBook::default()),
        });
        let cancel = CancellationToken::new();
        tokio::spawn(run_timer(
            shared.clone(),
            cancel.clone(),
            self.config,
            events,
        ));
        self.active = Some(ActiveTimer { shared, cancel });
    }

    /// Cancel the periodic task immediately. Idempotent.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }

    /// Freeze the countdown. While paused, elapsed does not advance and no
    /// warning or expiry fires.
    pub fn pause(&mut self) {
        if let Some(active) = &self.active {
            let mut book = active
                .shared
                .pause
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if book.paused_at.is_none() {
                book.paused_at = Some(Instant::now());
            }
        }
    }

    /// Resume after a pause; the paused interval joins the accumulated offset.
    pub fn resume(&mut self) {
        if let Some(active) = &self.active {
            let mut book = active
                .shared
                .pause
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(paused_at) = book.paused_at.take() {
                book.accumulated += paused_at.elapsed();
            }
        }
    }

    #[allow(dead_code)] // surfaced in tests; snapshots use reading() directly
    pub fn status(&self) -> TimerStatus {
        match &self.active {
            None => TimerStatus::Stopped,
            Some(active) if active.shared.is_paused() => TimerStatus::Paused,
            Some(_) => TimerStatus::Running,
        }
    }

    /// Current countdown snapshot, if one is active.
    pub fn reading(&self) -> Option<TimerReading> {
        self.active.as_ref().map(|active| active.shared.reading())
    }
}

async fn run_timer<E>(
    shared: Arc<TimerShared>,
    cancel: CancellationToken,
    config: TimerConfig,
    events: mpsc::Sender<E>,
) where
    E: From<TimerSignal> + Send + 'static,
{
    let mut interval = tokio::time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick completes immediately; skip it so the first
    // delivered tick is one cadence in.
    interval.tick().await;

    let mut warned = false;
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            _ = interval.tick() => {}
        }

        if shared.is_paused() {
            continue;
        }

        let reading = shared.reading();
        if events.send(TimerSignal::Tick(reading).into()).await.is_err() {
            return; // mailbox gone, conference torn down
        }

        // Tolerates ticks that jump past the exact boundary: the comparison
        // is >=, the once-ness comes from the flag.
        if !warned && reading.progress_ratio >= config.warning_threshold && reading.remaining_secs > 0.0
        {
            warned = true;
            if events
                .send(TimerSignal::Warning(reading).into())
                .await
                .is_err()
            {
                return;
            }
        }

        if reading.elapsed_secs >= reading.total_secs {
            let _ = events.send(TimerSignal::Expired(reading).into()).await;
            return;
        }
    }
}
