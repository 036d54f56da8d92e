use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub shift_start: Option<String>,
    #[serde(default)]
    pub shift_end: Option<String>,
    #[serde(default)]
    pub vehicle_type_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverPresence {
    Online,
    Offline,
    Inactive,
}

impl DriverPresence {
    pub fn label(self) -> &'static str {
        match self {
            DriverPresence::Online => "Online",
            DriverPresence::Offline => "Offline",
            DriverPresence::Inactive => "Inactive",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            DriverPresence::Online => "badge-green",
            DriverPresence::Offline => "badge-gray",
            DriverPresence::Inactive => "badge-red",
        }
    }
}

impl Driver {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed driver")
    }

    pub fn is_online(&self, now_minutes: u16) -> bool {
        is_online(
            self.is_active,
            self.shift_start.as_deref(),
            self.shift_end.as_deref(),
            now_minutes,
        )
    }

    pub fn presence(&self, now_minutes: u16) -> DriverPresence {
        if self.is_online(now_minutes) {
            DriverPresence::Online
        } else if self.is_active {
            DriverPresence::Offline
        } else {
            DriverPresence::Inactive
        }
    }

    /// "9:00 PM - 6:00 AM", or `None` when either bound is missing.
    pub fn shift_label(&self) -> Option<String> {
        let start = parse_time_of_day(self.shift_start.as_deref()?)?;
        let end = parse_time_of_day(self.shift_end.as_deref()?)?;
        Some(format!("{} - {}", format_12h(start), format_12h(end)))
    }
}

/// Minutes since midnight for `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(raw: &str) -> Option<u16> {
    let mut parts = raw.trim().split(':');
    let hours: u16 = parts.next()?.trim().parse().ok()?;
    let minutes: u16 = match parts.next() {
        Some(part) => part.trim().parse().ok()?,
        None => 0,
    };
    if let Some(seconds) = parts.next() {
        let seconds: f32 = seconds.trim().parse().ok()?;
        if !(0.0..60.0).contains(&seconds) {
            return None;
        }
    }
    if parts.next().is_some() || hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

pub fn format_12h(minutes: u16) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    let hours = minutes / 60;
    let period = if hours >= 12 { "PM" } else { "AM" };
    let display_hour = match hours % 12 {
        0 => 12,
        h => h,
    };
    format!("{display_hour}:{:02} {period}", minutes % 60)
}

/// Whether a driver counts as online at `now_minutes` (minutes since local
/// midnight). Shifts whose end is earlier than their start wrap past midnight.
pub fn is_online(
    is_active: bool,
    shift_start: Option<&str>,
    shift_end: Option<&str>,
    now_minutes: u16,
) -> bool {
    if !is_active {
        return false;
    }

    let (Some(start), Some(end)) = (
        shift_start.and_then(parse_time_of_day),
        shift_end.and_then(parse_time_of_day),
    ) else {
        return false;
    };

    if end < start {
        now_minutes >= start || now_minutes <= end
    } else {
        start <= now_minutes && now_minutes <= end
    }
}

/// Validated create/update payload for the `drivers` table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DriverDraft {
    pub name: String,
    pub shift_start: Option<String>,
    pub shift_end: Option<String>,
    pub vehicle_type_name: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VehicleType {
    pub name: String,
}
