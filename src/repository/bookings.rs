use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::engine::notifier::RecentBookings;
use crate::error::{AppError, AppResult};
use crate::models::booking::{Booking, BookingHeadline, BookingPatch, BookingStatus};
use crate::observability::metrics::Metrics;
use crate::repository::{decode_rows, with_fallback, Fallback};
use crate::store::{Bearer, DataStore, Query};

const TABLE: &str = "bookings";
const ENRICHED_COLUMNS: &str =
    "*, drivers(id,name,mobile), booking_options(cab_type,trip_type,number_of_nights)";
const HEADLINE_COLUMNS: &str =
    "id, booking_ref, user_first_name, pickup_address, price_total, status, created_at";

#[derive(Clone)]
pub struct BookingRepository {
    store: Arc<dyn DataStore>,
    metrics: Metrics,
}

impl BookingRepository {
    pub fn new(store: Arc<dyn DataStore>, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    fn newest_first(columns: &str, limit: usize) -> Query {
        Query::table(TABLE)
            .select(columns)
            .order("created_at", false)
            .limit(limit)
    }

    async fn fetch(&self, bearer: &Bearer, query: Query) -> AppResult<Vec<Booking>> {
        let rows = self.store.select(bearer, &query).await?;
        decode_rows(rows)
    }

    /// Newest bookings first. With relations, a failed joined read degrades to
    /// the flat row set.
    pub async fn list_recent(
        &self,
        bearer: &Bearer,
        limit: usize,
        with_relations: bool,
    ) -> Fallback<Vec<Booking>> {
        let flat = || self.fetch(bearer, Self::newest_first("*", limit));

        if !with_relations {
            return match flat().await {
                Ok(bookings) => Fallback::Primary(bookings),
                Err(err) => Fallback::Failed(err),
            };
        }

        let outcome = with_fallback(
            "bookings",
            self.fetch(bearer, Self::newest_first(ENRICHED_COLUMNS, limit)),
            flat,
        )
        .await;

        if outcome.is_degraded() {
            self.metrics.fallback_queries_total.inc();
        }
        outcome
    }

    pub async fn get(&self, bearer: &Bearer, id: &str) -> AppResult<Option<Booking>> {
        let query = Query::table(TABLE).eq("id", id).limit(1);
        Ok(self.fetch(bearer, query).await?.into_iter().next())
    }

    /// Applies a partial update and bumps `updated_at`.
    pub async fn update_fields(
        &self,
        bearer: &Bearer,
        id: &str,
        mut patch: BookingPatch,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        patch.updated_at = Some(now);
        let changes = serde_json::to_value(&patch)?;

        let updated = self
            .store
            .update(bearer, &Query::table(TABLE).eq("id", id), changes)
            .await?;

        if updated.is_empty() {
            return Err(AppError::NotFound(
                "Booking not found or could not be updated".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn recent_for_alerts(
        &self,
        bearer: &Bearer,
        limit: usize,
    ) -> AppResult<Vec<BookingHeadline>> {
        let query = Self::newest_first(HEADLINE_COLUMNS, limit).in_list(
            "status",
            [BookingStatus::Pending, BookingStatus::Confirmed],
        );
        let rows = self.store.select(bearer, &query).await?;
        decode_rows(rows)
    }
}

#[async_trait]
impl RecentBookings for BookingRepository {
    async fn recent_awaiting_dispatch(&self, limit: usize) -> AppResult<Vec<BookingHeadline>> {
        self.recent_for_alerts(&Bearer::Service, limit).await
    }
}
