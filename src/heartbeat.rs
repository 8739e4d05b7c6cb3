//! Client-side liveness watchdog.
//!
//! Layered on WebSocket ping/pong. Each tick either pings the peer or, if
//! the previous ping was never answered, reports the peer as stalled so the
//! connection can be terminated. The monitor never reconnects by itself.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// What the connection should do on a heartbeat tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Beat {
    /// Send a new ping.
    Ping,
    /// The last ping went unanswered; terminate the transport.
    Stalled,
}

#[derive(Debug)]
pub struct Heartbeat {
    period: Duration,
    alive: bool,
}

impl Heartbeat {
    /// Arm a monitor for a freshly opened transport. The peer starts alive.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self { period, alive: true }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Advance one period.
    pub fn tick(&mut self) -> Beat {
        if !self.alive {
            return Beat::Stalled;
        }
        self.alive = false;
        Beat::Ping
    }

    /// Record a ping acknowledgment (pong or gateway KEEPALIVE).
    pub fn acknowledge(&mut self) {
        self.alive = true;
    }

    /// Timer whose first tick fires one full period after arming.
    #[must_use]
    pub fn interval(&self) -> Interval {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }
}

#[cfg(test)]
#[path = "heartbeat_test.rs"]
mod tests;
