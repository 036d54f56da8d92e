use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::engine::alerts::BookingAlert;
use crate::engine::clock::{local_offset, Clock};
use crate::observability::metrics::Metrics;
use crate::repository::{
    BookingRepository, DashboardRepository, DriverRepository, PricingRepository,
    ProfileRepository, PushSubscriptionRepository,
};
use crate::store::{AuthProvider, DataStore};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DataStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub clock: Arc<dyn Clock>,
    pub bookings: BookingRepository,
    pub drivers: DriverRepository,
    pub pricing: PricingRepository,
    pub profiles: ProfileRepository,
    pub push_subscriptions: PushSubscriptionRepository,
    pub dashboard: DashboardRepository,
    pub alerts_tx: broadcast::Sender<BookingAlert>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DataStore>,
        auth: Arc<dyn AuthProvider>,
        clock: Arc<dyn Clock>,
        metrics: Metrics,
    ) -> Self {
        let (alerts_tx, _unused_rx) = broadcast::channel(config.alert_buffer_size.max(1));

        Self {
            bookings: BookingRepository::new(store.clone(), metrics.clone()),
            drivers: DriverRepository::new(store.clone()),
            pricing: PricingRepository::new(store.clone(), config.pricing_schema),
            profiles: ProfileRepository::new(store.clone()),
            push_subscriptions: PushSubscriptionRepository::new(store.clone()),
            dashboard: DashboardRepository::new(
                store.clone(),
                Duration::from_secs(config.dashboard_cache_secs),
                metrics.clone(),
            ),
            config,
            store,
            auth,
            clock,
            alerts_tx,
            metrics,
        }
    }

    pub fn local_offset(&self) -> FixedOffset {
        local_offset(self.config.local_utc_offset_minutes)
    }
}
