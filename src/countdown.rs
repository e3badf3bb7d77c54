//! Tick-driven countdown for the inter-question period
//!
//! The countdown itself is a plain counter advanced by `tick()`. A separate ticker
//! task (see [`spawn_ticker`]) posts one tick event per second into the engine queue,
//! so the counter is the only thing that decides when the callback fires.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{QuizError, QuizResult};

/// Callback invoked each time the countdown reaches zero
pub type ExpiryCallback = Box<dyn FnMut() + Send>;

pub struct Countdown {
    period_seconds: u32,
    remaining: u32,
    active: bool,
    on_expiry: ExpiryCallback,
}

impl Countdown {
    pub fn new(period_seconds: u32, on_expiry: ExpiryCallback) -> QuizResult<Self> {
        if period_seconds == 0 {
            return Err(QuizError::InvalidConfiguration(
                "Question interval must be at least one second".to_string(),
            ));
        }

        tracing::debug!("Creating countdown with period of {}s", period_seconds);
        Ok(Self {
            period_seconds,
            remaining: period_seconds,
            active: true,
            on_expiry,
        })
    }

    /// Advance by one second. Returns true if the callback fired on this tick.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }

        self.remaining = self.remaining.saturating_sub(1);
        tracing::trace!("Countdown tick, {}s remaining", self.remaining);

        if self.remaining == 0 {
            tracing::debug!("Countdown reached zero, firing callback");
            (self.on_expiry)();
            self.remaining = self.period_seconds;
            return true;
        }
        false
    }

    /// Seconds until the next callback.
    ///
    /// The current second is already running, so it is not counted.
    pub fn seconds_remaining(&self) -> u32 {
        if self.remaining == 0 {
            return self.period_seconds - 1;
        }
        self.remaining - 1
    }

    pub fn period_seconds(&self) -> u32 {
        self.period_seconds
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Stop the countdown. Further ticks are no-ops.
    pub fn clear(&mut self) {
        if self.active {
            tracing::debug!("Clearing countdown");
        }
        self.active = false;
    }
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("period_seconds", &self.period_seconds)
            .field("remaining", &self.remaining)
            .field("active", &self.active)
            .finish()
    }
}

/// Spawn a background task that sends `make_event()` into `tx` once per `every`.
///
/// The first event is sent one full interval after spawning. The task ends on its
/// own once the receiving side is dropped.
pub fn spawn_ticker<E, F>(tx: mpsc::UnboundedSender<E>, every: Duration, make_event: F) -> JoinHandle<()>
where
    E: Send + 'static,
    F: Fn() -> E + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // Consume the immediate first tick
        interval.tick().await;

        loop {
            interval.tick().await;
            if tx.send(make_event()).is_err() {
                tracing::debug!("Ticker receiver dropped, stopping");
                break;
            }
        }
    })
}
