use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub backend_requests_total: IntCounterVec,
    pub fallback_queries_total: IntCounter,
    pub booking_polls_total: IntCounterVec,
    pub booking_alerts_total: IntCounter,
    pub push_dispatch_failures_total: IntCounter,
    pub dashboard_cache_total: IntCounterVec,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let backend_requests_total = IntCounterVec::new(
            Opts::new(
                "backend_requests_total",
                "Backend calls by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid backend_requests_total metric");

        let fallback_queries_total = IntCounter::new(
            "booking_fallback_queries_total",
            "Booking listings served by the flat query after the joined query failed",
        )
        .expect("valid booking_fallback_queries_total metric");

        let booking_polls_total = IntCounterVec::new(
            Opts::new("booking_polls_total", "New-booking poll ticks by outcome"),
            &["outcome"],
        )
        .expect("valid booking_polls_total metric");

        let booking_alerts_total = IntCounter::new(
            "booking_alerts_total",
            "New-booking alerts raised",
        )
        .expect("valid booking_alerts_total metric");

        let push_dispatch_failures_total = IntCounter::new(
            "push_dispatch_failures_total",
            "Remote push dispatch calls that failed",
        )
        .expect("valid push_dispatch_failures_total metric");

        let dashboard_cache_total = IntCounterVec::new(
            Opts::new("dashboard_cache_total", "Dashboard cache lookups by result"),
            &["result"],
        )
        .expect("valid dashboard_cache_total metric");

        registry
            .register(Box::new(backend_requests_total.clone()))
            .expect("register backend_requests_total");
        registry
            .register(Box::new(fallback_queries_total.clone()))
            .expect("register booking_fallback_queries_total");
        registry
            .register(Box::new(booking_polls_total.clone()))
            .expect("register booking_polls_total");
        registry
            .register(Box::new(booking_alerts_total.clone()))
            .expect("register booking_alerts_total");
        registry
            .register(Box::new(push_dispatch_failures_total.clone()))
            .expect("register push_dispatch_failures_total");
        registry
            .register(Box::new(dashboard_cache_total.clone()))
            .expect("register dashboard_cache_total");

        Self {
            registry,
            backend_requests_total,
            fallback_queries_total,
            booking_polls_total,
            booking_alerts_total,
            push_dispatch_failures_total,
            dashboard_cache_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
