use chrono::{DateTime, Utc};
use serde::Serialize;

/// Client-facing countdown state. The server never runs its own timer;
/// every poller derives "time remaining" from the shared `next_start_time`
/// and duration, and the instructor (or an eager client) issues
/// `end_question` once expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownPhase {
    /// Announcement delay before the timer visibly starts.
    Waiting,
    /// Question is open; `seconds_remaining` counts down if timed.
    Open,
    /// A timed question whose duration has elapsed.
    Expired,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Countdown {
    pub phase: CountdownPhase,
    pub seconds_until_start: u32,
    /// `None` for untimed questions (duration 0).
    pub seconds_remaining: Option<u32>,
}

/// Pure function of (now, next_start_time, duration).
pub fn countdown(
    now: DateTime<Utc>,
    next_start_time: DateTime<Utc>,
    question_time: u32,
) -> Countdown {
    let until_start = (next_start_time - now).num_seconds();
    if until_start > 0 {
        return Countdown {
            phase: CountdownPhase::Waiting,
            seconds_until_start: until_start as u32,
            seconds_remaining: (question_time > 0).then_some(question_time),
        };
    }
    if question_time == 0 {
        // Untimed: open until the instructor explicitly ends it.
        return Countdown {
            phase: CountdownPhase::Open,
            seconds_until_start: 0,
            seconds_remaining: None,
        };
    }
    let elapsed = -until_start;
    let remaining = i64::from(question_time) - elapsed;
    if remaining > 0 {
        Countdown {
            phase: CountdownPhase::Open,
            seconds_until_start: 0,
            seconds_remaining: Some(remaining as u32),
        }
    } else {
        Countdown {
            phase: CountdownPhase::Expired,
            seconds_until_start: 0,
            seconds_remaining: Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn waits_before_the_start_timestamp() {
        let now = Utc::now();
        let c = countdown(now, now + Duration::seconds(5), 30);
        assert_eq!(c.phase, CountdownPhase::Waiting);
        assert_eq!(c.seconds_until_start, 5);
        assert_eq!(c.seconds_remaining, Some(30));
    }

    #[test]
    fn counts_down_while_open() {
        let now = Utc::now();
        let c = countdown(now, now - Duration::seconds(10), 30);
        assert_eq!(c.phase, CountdownPhase::Open);
        assert_eq!(c.seconds_remaining, Some(20));
    }

    #[test]
    fn expires_after_the_duration() {
        let now = Utc::now();
        let c = countdown(now, now - Duration::seconds(31), 30);
        assert_eq!(c.phase, CountdownPhase::Expired);
        assert_eq!(c.seconds_remaining, Some(0));
    }

    #[test]
    fn zero_duration_never_expires() {
        let now = Utc::now();
        let c = countdown(now, now - Duration::seconds(3600), 0);
        assert_eq!(c.phase, CountdownPhase::Open);
        assert_eq!(c.seconds_remaining, None);
    }
}
