use std::future;

use tokio::time::{Duration, Instant, sleep_until};

const TICK: Duration = Duration::from_secs(1);

/// What a running countdown produced when polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// One more second elapsed; `remaining` is still above zero.
    Tick { remaining: u32 },
    /// Remaining reached zero. Emitted once per run, after which the countdown is idle.
    Expired,
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    remaining: u32,
    next_at: Instant,
}

/// Per-question timer owned by a single session.
///
/// Events are pulled: the owner awaits [`Countdown::tick`] on its own task, so once
/// [`Countdown::cancel`] returns there is nothing left that could produce a tick or an
/// expiry for the cancelled run.
#[derive(Debug, Default)]
pub struct Countdown {
    armed: Option<Armed>,
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the countdown for `duration_secs`, replacing any run in progress.
    pub fn start(&mut self, duration_secs: u32) {
        self.cancel();
        self.armed = Some(Armed {
            remaining: duration_secs,
            next_at: Instant::now() + TICK,
        });
    }

    /// Stop the current run. Idempotent.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.armed.is_some()
    }

    /// Seconds left in the current run, or 0 when idle.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.armed.map_or(0, |armed| armed.remaining)
    }

    /// Wait for the next elapsed second.
    ///
    /// Never resolves while idle. Cancel safe: dropping the future before it resolves
    /// leaves the countdown untouched.
    pub async fn tick(&mut self) -> CountdownEvent {
        let Some(armed) = self.armed else {
            return future::pending().await;
        };

        sleep_until(armed.next_at).await;

        let remaining = armed.remaining.saturating_sub(1);
        if remaining == 0 {
            self.armed = None;
            return CountdownEvent::Expired;
        }
        self.armed = Some(Armed {
            remaining,
            next_at: armed.next_at + TICK,
        });
        CountdownEvent::Tick { remaining }
    }
}
