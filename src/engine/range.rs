use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Value};

/// Dashboard period selector, as carried in `?range=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateRange {
    Last7Days,
    Last30Days,
    ThisMonth,
    LastMonth,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// `{start_date, end_date}` as the aggregate procedures expect them.
    pub fn rpc_args(&self) -> Value {
        json!({
            "start_date": self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            "end_date": self.end.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

impl DateRange {
    pub const ALL: [DateRange; 5] = [
        DateRange::Last7Days,
        DateRange::Last30Days,
        DateRange::ThisMonth,
        DateRange::LastMonth,
        DateRange::All,
    ];

    /// Unknown or missing selectors fall back to the last 30 days.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| Self::ALL.into_iter().find(|range| range.as_str() == value))
            .unwrap_or(DateRange::Last30Days)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DateRange::Last7Days => "7d",
            DateRange::Last30Days => "30d",
            DateRange::ThisMonth => "this_month",
            DateRange::LastMonth => "last_month",
            DateRange::All => "all",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateRange::Last7Days => "Last 7 days",
            DateRange::Last30Days => "Last 30 days",
            DateRange::ThisMonth => "This month",
            DateRange::LastMonth => "Last month",
            DateRange::All => "All time",
        }
    }

    pub fn resolve(self, now: DateTime<Utc>, offset: FixedOffset) -> Window {
        let local = now.with_timezone(&offset);
        let this_month = month_start(local.year(), local.month(), offset).unwrap_or(now);

        match self {
            DateRange::Last7Days => Window {
                start: now - Duration::days(7),
                end: now,
            },
            DateRange::Last30Days => Window {
                start: now - Duration::days(30),
                end: now,
            },
            DateRange::ThisMonth => Window {
                start: this_month,
                end: now,
            },
            DateRange::LastMonth => {
                let (year, month) = if local.month() == 1 {
                    (local.year() - 1, 12)
                } else {
                    (local.year(), local.month() - 1)
                };
                Window {
                    start: month_start(year, month, offset).unwrap_or(this_month),
                    end: this_month,
                }
            }
            DateRange::All => Window {
                start: DateTime::<Utc>::UNIX_EPOCH,
                end: now,
            },
        }
    }
}

fn month_start(year: i32, month: u32, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|local| local.with_timezone(&Utc))
}
