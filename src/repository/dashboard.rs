use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::engine::cache::TtlCache;
use crate::engine::range::{DateRange, Window};
use crate::error::AppResult;
use crate::models::stats::{DashboardData, DashboardStats};
use crate::observability::metrics::Metrics;
use crate::store::{Bearer, DataStore};

const STATS_RPC: &str = "get_dashboard_stats";
const USER_GROWTH_RPC: &str = "get_user_growth";
const BOOKINGS_RPC: &str = "get_bookings_timeseries";
const REVENUE_RPC: &str = "get_revenue_timeseries";

pub struct DashboardRepository {
    store: Arc<dyn DataStore>,
    cache: TtlCache<DateRange, DashboardData>,
    metrics: Metrics,
}

impl DashboardRepository {
    pub fn new(store: Arc<dyn DataStore>, cache_ttl: Duration, metrics: Metrics) -> Self {
        Self {
            store,
            cache: TtlCache::new(cache_ttl),
            metrics,
        }
    }

    /// Aggregates for `range`, served from cache within the TTL. Each failing
    /// procedure contributes its zero/empty default instead.
    pub async fn load(&self, bearer: &Bearer, range: DateRange, window: Window) -> DashboardData {
        if let Some(cached) = self.cache.get(&range) {
            self.metrics
                .dashboard_cache_total
                .with_label_values(&["hit"])
                .inc();
            return cached;
        }
        self.metrics
            .dashboard_cache_total
            .with_label_values(&["miss"])
            .inc();

        let args = window.rpc_args();
        let (stats, user_growth, bookings, revenue) = futures::join!(
            self.store.rpc(bearer, STATS_RPC, args.clone()),
            self.store.rpc(bearer, USER_GROWTH_RPC, args.clone()),
            self.store.rpc(bearer, BOOKINGS_RPC, args.clone()),
            self.store.rpc(bearer, REVENUE_RPC, args),
        );

        let data = DashboardData {
            stats: or_default(STATS_RPC, stats.and_then(decode_stats)),
            user_growth: or_default(USER_GROWTH_RPC, user_growth.and_then(decode_series)),
            bookings_series: or_default(BOOKINGS_RPC, bookings.and_then(decode_series)),
            revenue_series: or_default(REVENUE_RPC, revenue.and_then(decode_series)),
        };

        debug!(range = range.as_str(), "dashboard aggregates refreshed");
        self.cache.insert(range, data.clone());
        data
    }
}

/// Stats come back either as an object or as a one-row array.
fn decode_stats(value: Value) -> AppResult<DashboardStats> {
    match value {
        Value::Null => Ok(DashboardStats::default()),
        Value::Array(rows) => match rows.into_iter().next() {
            Some(row) => Ok(serde_json::from_value(row)?),
            None => Ok(DashboardStats::default()),
        },
        row => Ok(serde_json::from_value(row)?),
    }
}

fn decode_series<T: DeserializeOwned>(value: Value) -> AppResult<Vec<T>> {
    match value {
        Value::Null => Ok(Vec::new()),
        rows => Ok(serde_json::from_value(rows)?),
    }
}

fn or_default<T: Default>(rpc: &str, result: AppResult<T>) -> T {
    result.unwrap_or_else(|err| {
        error!(rpc, error = %err, "dashboard aggregate failed, using defaults");
        T::default()
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode_series, decode_stats};
    use crate::models::stats::{CountPoint, DashboardStats, RevenuePoint};

    #[test]
    fn stats_accept_object_or_single_row_array() {
        let expected = DashboardStats {
            total_users: 12,
            total_bookings: 40,
            active_drivers: 3,
            total_revenue: 15250.5,
        };
        let object = json!({
            "total_users": 12,
            "total_bookings": 40,
            "active_drivers": 3,
            "total_revenue": "15250.50"
        });

        assert_eq!(decode_stats(object.clone()).unwrap(), expected);
        assert_eq!(decode_stats(json!([object])).unwrap(), expected);
        assert_eq!(decode_stats(json!([])).unwrap(), DashboardStats::default());
    }

    #[test]
    fn series_decode_and_null_is_empty() {
        let counts: Vec<CountPoint> =
            decode_series(json!([{ "date": "2025-01-01", "count": 4 }])).unwrap();
        assert_eq!(counts[0].count, 4);

        let revenue: Vec<RevenuePoint> = decode_series(json!(null)).unwrap();
        assert!(revenue.is_empty());
    }
}
