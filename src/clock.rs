//! UTC time source used when no explicit hour is given.

use chrono::{DateTime, Timelike, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Fractional hour of the day for `time`. Seconds are ignored.
pub fn hour_of_day(time: DateTime<Utc>) -> f64 {
    f64::from(time.hour()) + f64::from(time.minute()) / 60.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hour_of_day_includes_minutes() {
        let time = Utc.with_ymd_and_hms(2024, 3, 20, 18, 45, 59).unwrap();
        assert_eq!(hour_of_day(time), 18.75);
    }

    #[test]
    fn midnight_is_zero() {
        let time = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
        assert_eq!(hour_of_day(time), 0.0);
    }

    #[test]
    fn fixed_clock_returns_its_instant() {
        let time = Utc.with_ymd_and_hms(2021, 6, 1, 12, 30, 0).unwrap();
        assert_eq!(FixedClock(time).now_utc(), time);
    }
}
