use std::{pin::Pin, time::Duration};

use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep, interval_at, sleep_until};

const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
const MIN_PROGRESS_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Tick {
    /// The deferred save is due. All timers have already been released.
    Due,
    Countdown,
    Progress,
}

/// Owns the three timers that turn a pending change into a save attempt.
///
/// The timers only ever exist together: [`SaveScheduler::start`] replaces
/// all of them, [`SaveScheduler::cancel_all`] drops all of them.
#[derive(Debug)]
pub(super) struct SaveScheduler {
    interval: Duration,
    progress_tick: Duration,
    armed: Option<ArmedTimers>,
    remaining: Duration,
    progress: f64,
}

#[derive(Debug)]
struct ArmedTimers {
    started: Instant,
    due: Pin<Box<Sleep>>,
    countdown: Interval,
    progress: Interval,
}

impl SaveScheduler {
    pub fn new(interval: Duration, progress_tick: Duration) -> Self {
        Self {
            interval,
            progress_tick: progress_tick.max(MIN_PROGRESS_TICK),
            armed: None,
            remaining: Duration::ZERO,
            progress: 0.0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// (Re)starts the save window. Never stacks timers.
    pub fn start(&mut self) {
        self.cancel_all();
        let now = Instant::now();
        self.armed = Some(ArmedTimers {
            started: now,
            due: Box::pin(sleep_until(now + self.interval)),
            countdown: ticker(now, COUNTDOWN_STEP),
            progress: ticker(now, self.progress_tick),
        });
        self.remaining = self.interval;
        self.progress = 0.0;
    }

    /// Returns whether anything was armed.
    pub fn cancel_all(&mut self) -> bool {
        self.remaining = Duration::ZERO;
        self.progress = 0.0;
        self.armed.take().is_some()
    }

    /// Waits for the next timer. Never resolves while nothing is armed.
    ///
    /// Cancel-safe, so it can sit in a `select!` loop.
    pub async fn next_tick(&mut self) -> Tick {
        let Some(armed) = self.armed.as_mut() else {
            return std::future::pending().await;
        };
        let tick = tokio::select! {
            biased;
            _ = armed.due.as_mut() => Tick::Due,
            _ = armed.countdown.tick() => Tick::Countdown,
            _ = armed.progress.tick() => Tick::Progress,
        };
        match tick {
            Tick::Due => {
                self.cancel_all();
            }
            Tick::Countdown => {
                self.remaining = self.remaining.saturating_sub(COUNTDOWN_STEP);
            }
            Tick::Progress => {
                self.progress = fraction(armed.started.elapsed(), self.interval);
            }
        }
        tick
    }
}

fn ticker(start: Instant, period: Duration) -> Interval {
    let mut interval = interval_at(start + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn fraction(elapsed: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / total.as_secs_f64()).min(1.0)
}
