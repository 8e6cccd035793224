//! Abandoned-cart reminder schedule.
//!
//! Three reminders go out at 1h, 24h and 72h after a cart is abandoned.
//! A processing run sends at most one reminder per cart, so a cart that
//! sat unprocessed for four days still gets its reminders in order.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Which reminder to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReminderStep {
    First,
    Second,
    Third,
}

impl ReminderStep {
    /// 1-based position in the sequence.
    #[must_use]
    pub const fn sequence(&self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
        }
    }

    /// Minimum cart age before this reminder may go out.
    #[must_use]
    pub fn delay(&self) -> Duration {
        match self {
            Self::First => Duration::hours(1),
            Self::Second => Duration::hours(24),
            Self::Third => Duration::hours(72),
        }
    }
}

/// Reminder progress for one cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderState {
    pub recovered: bool,
    pub first_sent: bool,
    pub second_sent: bool,
    pub third_sent: bool,
}

/// The reminder due for a cart abandoned at `abandoned_at`, if any.
#[must_use]
pub fn due_step(
    state: ReminderState,
    abandoned_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Option<ReminderStep> {
    if state.recovered {
        return None;
    }

    let age = now - abandoned_at;

    if !state.first_sent {
        (age >= ReminderStep::First.delay()).then_some(ReminderStep::First)
    } else if !state.second_sent {
        (age >= ReminderStep::Second.delay()).then_some(ReminderStep::Second)
    } else if !state.third_sent {
        (age >= ReminderStep::Third.delay()).then_some(ReminderStep::Third)
    } else {
        None
    }
}

/// Counts from one processing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub email_1: u32,
    pub email_2: u32,
    pub email_3: u32,
    pub failed: u32,
    /// Due reminders not retried because an earlier failure is unresolved.
    pub held: u32,
}

impl ProcessSummary {
    /// Count a delivered reminder.
    pub const fn record(&mut self, step: ReminderStep) {
        match step {
            ReminderStep::First => self.email_1 += 1,
            ReminderStep::Second => self.email_2 += 1,
            ReminderStep::Third => self.email_3 += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours_ago(h: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::hours(h), now)
    }

    #[test]
    fn test_nothing_due_before_an_hour() {
        let (at, now) = hours_ago(0);
        assert_eq!(due_step(ReminderState::default(), at, now), None);
    }

    #[test]
    fn test_first_then_second_then_third() {
        let (at, now) = hours_ago(100);
        let mut state = ReminderState::default();

        assert_eq!(due_step(state, at, now), Some(ReminderStep::First));
        state.first_sent = true;
        assert_eq!(due_step(state, at, now), Some(ReminderStep::Second));
        state.second_sent = true;
        assert_eq!(due_step(state, at, now), Some(ReminderStep::Third));
        state.third_sent = true;
        assert_eq!(due_step(state, at, now), None);
    }

    #[test]
    fn test_second_waits_for_a_day() {
        let (at, now) = hours_ago(5);
        let state = ReminderState {
            first_sent: true,
            ..ReminderState::default()
        };
        assert_eq!(due_step(state, at, now), None);
    }

    #[test]
    fn test_recovered_never_due() {
        let (at, now) = hours_ago(100);
        let state = ReminderState {
            recovered: true,
            ..ReminderState::default()
        };
        assert_eq!(due_step(state, at, now), None);
    }

    #[test]
    fn test_summary_record() {
        let mut summary = ProcessSummary::default();
        summary.record(ReminderStep::First);
        summary.record(ReminderStep::Third);
        assert_eq!(summary.email_1, 1);
        assert_eq!(summary.email_2, 0);
        assert_eq!(summary.email_3, 1);
    }
}
