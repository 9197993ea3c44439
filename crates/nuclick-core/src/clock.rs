//! Round clock: derives the current round from wall-clock time.
//!
//! Rounds are never stored. The round index is a pure function of the game
//! start date, the daily trigger time-of-day (UTC), and "now".
//!
//! # Round arithmetic
//!
//! A round boundary is the daily trigger instant on every UTC calendar day
//! strictly after the start date's day. The round index is the number of
//! boundaries at or before `now`:
//!
//! ```text
//! days  = now.date - start.date            (whole UTC days)
//! index = days - (now.time < trigger ? 1 : 0)
//! index = max(index, 0)                    (0 also means "not started")
//! ```
//!
//! With `start = 2024-01-01T00:00:00Z` and a 14:00 trigger,
//! `2024-01-02T13:59:59Z` is round 0 and `2024-01-02T14:00:01Z` is round 1.
//! Player-facing rounds are 1-based: `displayed = index + 1`.

use chrono::{DateTime, Days, NaiveTime, Utc};

/// Errors that can occur while building or querying the round clock.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The trigger time-of-day is not a valid UTC time.
    #[error("invalid daily trigger time {hour:02}:{minute:02} UTC")]
    InvalidTrigger {
        /// Configured hour.
        hour: u32,
        /// Configured minute.
        minute: u32,
    },

    /// A derived instant fell outside the range chrono can represent.
    #[error("date out of range while computing the next trigger after {0}")]
    OutOfRange(DateTime<Utc>),
}

/// Derives round indices and trigger instants from a fixed start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundClock {
    start_date: DateTime<Utc>,
    trigger: NaiveTime,
}

impl RoundClock {
    /// Create a clock whose daily boundary is `hour:minute` UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTrigger`] when `hour > 23` or
    /// `minute > 59`.
    pub fn new(start_date: DateTime<Utc>, hour: u32, minute: u32) -> Result<Self, ClockError> {
        let trigger = NaiveTime::from_hms_opt(hour, minute, 0)
            .ok_or(ClockError::InvalidTrigger { hour, minute })?;
        Ok(Self {
            start_date,
            trigger,
        })
    }

    /// The configured game start date.
    pub const fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    /// The configured daily trigger time-of-day (UTC).
    pub const fn trigger_time(&self) -> NaiveTime {
        self.trigger
    }

    /// Whether the game has started at `now`.
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_date
    }

    /// 0-based round index at `now`. Clamped to 0 before the start date.
    pub fn round_index_at(&self, now: DateTime<Utc>) -> u32 {
        if !self.has_started(now) {
            return 0;
        }
        let mut days = now
            .date_naive()
            .signed_duration_since(self.start_date.date_naive())
            .num_days();
        if now.time() < self.trigger {
            days = days.saturating_sub(1);
        }
        u32::try_from(days.max(0)).unwrap_or(u32::MAX)
    }

    /// 1-based round number shown to players at `now`.
    pub fn displayed_round_at(&self, now: DateTime<Utc>) -> u32 {
        self.round_index_at(now).saturating_add(1)
    }

    /// 0-based round index right now.
    pub fn current_round_index(&self) -> u32 {
        self.round_index_at(Utc::now())
    }

    /// Whether at least one round boundary lies in `(since, now]`.
    pub fn boundary_crossed(&self, since: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.round_index_at(now) > self.round_index_at(since)
    }

    /// The first trigger instant strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::OutOfRange`] if the next day cannot be
    /// represented.
    pub fn next_trigger_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, ClockError> {
        let today = now.date_naive().and_time(self.trigger).and_utc();
        if today > now {
            return Ok(today);
        }
        today
            .checked_add_days(Days::new(1))
            .ok_or(ClockError::OutOfRange(now))
    }
}

/// Round index for an explicit trigger hour, without building a clock.
///
/// Equivalent to `RoundClock::new(start_date, hour, 0)?.round_index_at(now)`.
/// Hours above 23 are clamped to 23.
pub fn current_round_index(
    now: DateTime<Utc>,
    start_date: DateTime<Utc>,
    daily_trigger_hour_utc: u32,
) -> u32 {
    let hour = daily_trigger_hour_utc.min(23);
    RoundClock::new(start_date, hour, 0).map_or(0, |clock| clock.round_index_at(now))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    fn clock() -> RoundClock {
        RoundClock::new(at(2024, 1, 1, 0, 0, 0), 14, 0).unwrap()
    }

    #[test]
    fn boundary_one_second_either_side_of_trigger() {
        let c = clock();
        assert_eq!(c.round_index_at(at(2024, 1, 2, 13, 59, 59)), 0);
        assert_eq!(c.displayed_round_at(at(2024, 1, 2, 13, 59, 59)), 1);
        assert_eq!(c.round_index_at(at(2024, 1, 2, 14, 0, 1)), 1);
        assert_eq!(c.displayed_round_at(at(2024, 1, 2, 14, 0, 1)), 2);
    }

    #[test]
    fn trigger_instant_itself_starts_the_new_round() {
        let c = clock();
        assert_eq!(c.round_index_at(at(2024, 1, 2, 14, 0, 0)), 1);
    }

    #[test]
    fn start_day_is_round_zero_all_day() {
        let c = clock();
        assert_eq!(c.round_index_at(at(2024, 1, 1, 0, 0, 0)), 0);
        assert_eq!(c.round_index_at(at(2024, 1, 1, 13, 0, 0)), 0);
        assert_eq!(c.round_index_at(at(2024, 1, 1, 23, 59, 59)), 0);
    }

    #[test]
    fn before_start_clamps_to_zero() {
        let c = clock();
        assert!(!c.has_started(at(2023, 12, 31, 15, 0, 0)));
        assert_eq!(c.round_index_at(at(2023, 12, 31, 15, 0, 0)), 0);
        assert_eq!(c.round_index_at(at(2020, 6, 1, 0, 0, 0)), 0);
    }

    #[test]
    fn later_days_count_up() {
        let c = clock();
        assert_eq!(c.round_index_at(at(2024, 1, 8, 14, 0, 0)), 7);
        assert_eq!(c.round_index_at(at(2024, 1, 9, 9, 30, 0)), 7);
    }

    #[test]
    fn next_trigger_is_today_or_tomorrow() {
        let c = clock();
        assert_eq!(
            c.next_trigger_after(at(2024, 3, 5, 9, 0, 0)).unwrap(),
            at(2024, 3, 5, 14, 0, 0)
        );
        assert_eq!(
            c.next_trigger_after(at(2024, 3, 5, 14, 0, 0)).unwrap(),
            at(2024, 3, 6, 14, 0, 0)
        );
    }

    #[test]
    fn boundary_crossed_detects_trigger() {
        let c = clock();
        assert!(c.boundary_crossed(at(2024, 1, 3, 13, 0, 0), at(2024, 1, 3, 14, 0, 0)));
        assert!(!c.boundary_crossed(at(2024, 1, 3, 14, 0, 0), at(2024, 1, 4, 13, 0, 0)));
    }

    #[test]
    fn invalid_trigger_rejected() {
        assert!(RoundClock::new(at(2024, 1, 1, 0, 0, 0), 24, 0).is_err());
        assert!(RoundClock::new(at(2024, 1, 1, 0, 0, 0), 10, 60).is_err());
    }

    #[test]
    fn free_function_matches_clock() {
        let start = at(2024, 1, 1, 0, 0, 0);
        let now = at(2024, 1, 2, 14, 0, 1);
        assert_eq!(current_round_index(now, start, 14), 1);
        assert_eq!(current_round_index(now, start, 15), 0);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn round_index_never_decreases(a in 0i64..400_000_000, delta in 0i64..10_000_000) {
                let c = clock();
                let base = at(2023, 6, 1, 0, 0, 0).timestamp();
                let t1 = DateTime::from_timestamp(base.saturating_add(a), 0).unwrap();
                let t2 = DateTime::from_timestamp(base.saturating_add(a).saturating_add(delta), 0).unwrap();
                prop_assert!(c.round_index_at(t1) <= c.round_index_at(t2));
            }
        }
    }
}
