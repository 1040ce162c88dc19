use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Ping request to the peer
    KeepAlive,
    /// End of the frame-rate counting window
    FrameRateSample,
    /// Inbound throughput snapshot
    ThroughputSample,
}

/// Handle for cancelling one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

#[derive(Debug)]
struct Timer {
    kind: TimerKind,
    deadline: Instant,
    period: Option<Duration>,
}

/// Deadlines owned by one session. Nothing here sleeps; the driver asks
/// for [`next_deadline`](Self::next_deadline) and hands the current time
/// back to [`expired`](Self::expired).
#[derive(Debug, Default)]
pub struct SessionTimers {
    timers: BTreeMap<TimerToken, Timer>,
    next_token: u64,
}

impl SessionTimers {
    pub fn new() -> Self {
        SessionTimers::default()
    }

    /// Fire once after `delay`
    pub fn schedule_once(&mut self, kind: TimerKind, delay: Duration, now: Instant) -> TimerToken {
        self.insert(kind, now + delay, None)
    }

    /// Fire every `period`, first after one period
    pub fn schedule_periodic(&mut self, kind: TimerKind, period: Duration, now: Instant) -> TimerToken {
        self.insert(kind, now + period, Some(period))
    }

    fn insert(&mut self, kind: TimerKind, deadline: Instant, period: Option<Duration>) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.timers.insert(token, Timer { kind, deadline, period });
        token
    }

    pub fn cancel(&mut self, token: TimerToken) -> bool {
        self.timers.remove(&token).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.timers.values().any(|t| t.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Timers due at `now`, in scheduling order. One-shot timers are removed,
    /// periodic ones move to their next deadline after `now`.
    pub fn expired(&mut self, now: Instant) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        let mut finished = Vec::new();

        for (token, timer) in self.timers.iter_mut() {
            if timer.deadline > now {
                continue;
            }
            fired.push(timer.kind);
            match timer.period {
                Some(period) if !period.is_zero() => {
                    while timer.deadline <= now {
                        timer.deadline += period;
                    }
                }
                _ => finished.push(*token),
            }
        }

        for token in finished {
            self.timers.remove(&token);
        }
        fired
    }
}
