use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::engine::notifier::AlertSink;
use crate::models::booking::BookingHeadline;
use crate::observability::metrics::Metrics;
use crate::store::{Bearer, DataStore};

/// What connected admin browsers receive over `/ws`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingAlert {
    pub id: String,
    pub booking_ref: String,
    pub title: String,
    pub body: String,
    pub url: String,
    pub tag: String,
}

impl From<&BookingHeadline> for BookingAlert {
    fn from(booking: &BookingHeadline) -> Self {
        let name = booking.user_first_name.as_deref().unwrap_or("Customer");
        let pickup = booking
            .pickup_address
            .as_deref()
            .unwrap_or("Location not specified");
        let fare = booking
            .price_total
            .map(|total| format!("₹{total:.2}"))
            .unwrap_or_else(|| "Price TBD".to_string());

        Self {
            id: booking.id.clone(),
            booking_ref: booking.booking_ref.clone(),
            title: format!("New Booking: {}", booking.booking_ref),
            body: format!("{name} - {pickup}\nFare: {fare}"),
            url: format!("/bookings?open={}", booking.id),
            tag: format!("booking-{}", booking.id),
        }
    }
}

/// Raises each alert locally on the broadcast channel, then asks the edge
/// function to fan it out as a push notification.
pub struct AlertDispatcher {
    local: broadcast::Sender<BookingAlert>,
    store: Arc<dyn DataStore>,
    push_function: String,
    metrics: Metrics,
}

impl AlertDispatcher {
    pub fn new(
        local: broadcast::Sender<BookingAlert>,
        store: Arc<dyn DataStore>,
        push_function: impl Into<String>,
        metrics: Metrics,
    ) -> Self {
        Self {
            local,
            store,
            push_function: push_function.into(),
            metrics,
        }
    }
}

#[async_trait]
impl AlertSink for AlertDispatcher {
    async fn raise(&self, booking: &BookingHeadline) {
        let alert = BookingAlert::from(booking);
        // no connected browsers is not an error
        let receivers = self.local.send(alert).unwrap_or(0);
        self.metrics.booking_alerts_total.inc();

        info!(
            booking_id = %booking.id,
            booking_ref = %booking.booking_ref,
            receivers,
            "new booking alert raised"
        );

        let payload = json!({
            "booking": {
                "id": booking.id,
                "booking_ref": booking.booking_ref,
                "user_first_name": booking.user_first_name,
                "pickup_address": booking.pickup_address,
                "price_total": booking.price_total,
                "status": booking.status,
            }
        });

        if let Err(err) = self
            .store
            .invoke(&Bearer::Service, &self.push_function, payload)
            .await
        {
            self.metrics.push_dispatch_failures_total.inc();
            warn!(
                booking_id = %booking.id,
                error = %err,
                "push dispatch failed"
            );
        }
    }
}
