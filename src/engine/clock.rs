use chrono::{DateTime, FixedOffset, Offset, Timelike, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for tests and replays.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The business's wall-clock offset; falls back to UTC for out-of-range values.
pub fn local_offset(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

/// Minutes since local midnight.
pub fn minutes_of_day(now: DateTime<Utc>, offset: FixedOffset) -> u16 {
    let local = now.with_timezone(&offset);
    (local.hour() * 60 + local.minute()) as u16
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{local_offset, minutes_of_day};

    #[test]
    fn minutes_follow_the_local_offset() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
        assert_eq!(minutes_of_day(now, local_offset(0)), 18 * 60);
        // 18:00 UTC is 23:30 in UTC+05:30
        assert_eq!(minutes_of_day(now, local_offset(330)), 23 * 60 + 30);
    }

    #[test]
    fn unrepresentable_offsets_fall_back_to_utc() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
        assert_eq!(minutes_of_day(now, local_offset(1440)), 18 * 60);
        assert_eq!(minutes_of_day(now, local_offset(i32::MAX)), 18 * 60);
        assert_eq!(minutes_of_day(now, local_offset(i32::MIN)), 18 * 60);
    }
}
