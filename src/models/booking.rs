use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::numeric;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    DriverAssigned,
    DriverEnroute,
    Arrived,
    InProgress,
    Completed,
    CancelledByUser,
    CancelledByDriver,
    CancelledByAdmin,
    NoShow,
    Expired,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 12] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::DriverAssigned,
        BookingStatus::DriverEnroute,
        BookingStatus::Arrived,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::CancelledByUser,
        BookingStatus::CancelledByDriver,
        BookingStatus::CancelledByAdmin,
        BookingStatus::NoShow,
        BookingStatus::Expired,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::DriverAssigned => "driver_assigned",
            BookingStatus::DriverEnroute => "driver_enroute",
            BookingStatus::Arrived => "arrived",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::CancelledByUser => "cancelled_by_user",
            BookingStatus::CancelledByDriver => "cancelled_by_driver",
            BookingStatus::CancelledByAdmin => "cancelled_by_admin",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Expired => "expired",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "Pending",
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::DriverAssigned => "Driver Assigned",
            BookingStatus::DriverEnroute => "Driver Enroute",
            BookingStatus::Arrived => "Arrived",
            BookingStatus::InProgress => "In Progress",
            BookingStatus::Completed => "Completed",
            BookingStatus::CancelledByUser => "Cancelled by User",
            BookingStatus::CancelledByDriver => "Cancelled by Driver",
            BookingStatus::CancelledByAdmin => "Cancelled by Admin",
            BookingStatus::NoShow => "No Show",
            BookingStatus::Expired => "Expired",
        }
    }

    /// Badge classes for the status pill.
    pub fn badge_class(self) -> &'static str {
        match self {
            BookingStatus::Pending => "badge-yellow",
            BookingStatus::Confirmed => "badge-blue",
            BookingStatus::DriverAssigned => "badge-purple",
            BookingStatus::DriverEnroute => "badge-red",
            BookingStatus::Arrived => "badge-cyan",
            BookingStatus::InProgress => "badge-green",
            BookingStatus::Completed => "badge-green-strong",
            BookingStatus::CancelledByUser
            | BookingStatus::CancelledByDriver
            | BookingStatus::CancelledByAdmin => "badge-red",
            BookingStatus::NoShow | BookingStatus::Expired => "badge-gray",
        }
    }

    /// Statuses the new-booking poller watches.
    pub fn is_awaiting_dispatch(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == raw)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverSummary {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TripOption {
    pub cab_type: Option<String>,
    pub trip_type: Option<String>,
    pub number_of_nights: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub booking_ref: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_first_name: Option<String>,
    #[serde(default)]
    pub user_mobile: Option<String>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub pickup_lat: Option<f64>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub pickup_lng: Option<f64>,
    #[serde(default)]
    pub pickup_digipin: Option<String>,
    #[serde(default)]
    pub pickup_address: Option<String>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub drop_lat: Option<f64>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub drop_lng: Option<f64>,
    #[serde(default)]
    pub drop_address: Option<String>,
    #[serde(default)]
    pub drop_digipin: Option<String>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub distance_km: Option<f64>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub toll: Option<f64>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub price_total: Option<f64>,
    pub status: BookingStatus,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub driver_id: Option<String>,
    #[serde(default)]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub actual_pickup_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_drop_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present only when the enriched query succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drivers: Option<DriverSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking_options: Option<Vec<TripOption>>,
}

impl Booking {
    pub fn primary_option(&self) -> Option<&TripOption> {
        self.booking_options.as_ref().and_then(|options| options.first())
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.to_lowercase();
        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&needle))
        };

        self.booking_ref.to_lowercase().contains(&needle)
            || contains(&self.user_first_name)
            || self
                .user_mobile
                .as_deref()
                .is_some_and(|mobile| mobile.contains(term))
            || contains(&self.pickup_address)
            || contains(&self.drop_address)
    }
}

/// Row shape read by the new-booking poller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingHeadline {
    pub id: String,
    pub booking_ref: String,
    #[serde(default)]
    pub user_first_name: Option<String>,
    #[serde(default)]
    pub pickup_address: Option<String>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub price_total: Option<f64>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied from the edit surface.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toll: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Booking, BookingStatus};

    #[test]
    fn every_status_round_trips_through_its_wire_name() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
            let encoded = serde_json::to_value(status).unwrap();
            assert_eq!(encoded, json!(status.as_str()));
        }
        assert_eq!(BookingStatus::parse("teleported"), None);
    }

    #[test]
    fn numeric_columns_accept_strings() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "b-1",
            "booking_ref": "BC-1001",
            "price_total": "500.50",
            "toll": 20,
            "status": "pending",
            "created_at": "2025-01-10T08:00:00+00:00",
            "updated_at": "2025-01-10T08:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(booking.price_total, Some(500.5));
        assert_eq!(booking.toll, Some(20.0));
        assert!(booking.drivers.is_none());
        assert!(booking.booking_options.is_none());
    }

    #[test]
    fn search_matches_ref_name_phone_and_addresses() {
        let booking: Booking = serde_json::from_value(json!({
            "id": "b-1",
            "booking_ref": "BC-1001",
            "user_first_name": "Asha",
            "user_mobile": "9876543210",
            "pickup_address": "MG Road, Pune",
            "drop_address": "Airport",
            "status": "confirmed",
            "created_at": "2025-01-10T08:00:00+00:00",
            "updated_at": "2025-01-10T08:00:00+00:00"
        }))
        .unwrap();

        assert!(booking.matches_search("bc-10"));
        assert!(booking.matches_search("asha"));
        assert!(booking.matches_search("98765"));
        assert!(booking.matches_search("pune"));
        assert!(booking.matches_search("AIRPORT"));
        assert!(!booking.matches_search("mumbai"));
    }
}
