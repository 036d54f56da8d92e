pub mod bookings;
pub mod dashboard;
pub mod drivers;
pub mod fallback;
pub mod pricing;
pub mod profiles;
pub mod push;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppResult;

pub use bookings::BookingRepository;
pub use dashboard::DashboardRepository;
pub use drivers::DriverRepository;
pub use fallback::{with_fallback, Fallback};
pub use pricing::PricingRepository;
pub use profiles::ProfileRepository;
pub use push::PushSubscriptionRepository;

fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> AppResult<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Empty form fields mean "not set".
pub(crate) fn blank_to_none(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
