use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cab_admin::api::rest::router;
use cab_admin::config::Config;
use cab_admin::engine::clock::FixedClock;
use cab_admin::error::{AppError, AppResult};
use cab_admin::models::profile::{AuthSession, AuthUser, SignUp};
use cab_admin::observability::metrics::Metrics;
use cab_admin::state::AppState;
use cab_admin::store::{AuthProvider, Bearer, DataStore, Filter, Query};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_COOKIE: &str = "cab_admin_session=admin-token";
const RIDER_COOKIE: &str = "cab_admin_session=rider-token";

/// In-memory stand-in for the hosted backend: tables of JSON rows plus a
/// token table for the auth API.
#[derive(Default)]
struct FakeBackend {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    tokens: Mutex<HashMap<String, AuthUser>>,
    rpc_results: Mutex<HashMap<String, Value>>,
    fail_joins: AtomicBool,
    fail_rpcs: AtomicBool,
    confirm_email: AtomicBool,
    inserts: AtomicUsize,
    rpc_calls: AtomicUsize,
}

impl FakeBackend {
    fn with_accounts() -> Arc<Self> {
        let backend = Arc::new(Self::default());
        backend.add_user("admin-token", "admin-1", "admin@budgetcab.test", "admin");
        backend.add_user("rider-token", "user-1", "rider@budgetcab.test", "user");
        backend
    }

    fn add_user(&self, token: &str, id: &str, email: &str, role: &str) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            AuthUser {
                id: id.to_string(),
                email: Some(email.to_string()),
            },
        );
        self.seed("profiles", json!({ "id": id, "role": role }));
    }

    fn seed(&self, table: &str, row: Value) {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row);
    }

    fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn matches(row: &Value, query: &Query) -> bool {
    query.filters.iter().all(|filter| match filter {
        Filter::Eq(column, expected) => cell(&row[column.as_str()]) == *expected,
        Filter::In(column, allowed) => allowed.contains(&cell(&row[column.as_str()])),
    })
}

#[async_trait]
impl DataStore for FakeBackend {
    async fn select(&self, _bearer: &Bearer, query: &Query) -> AppResult<Vec<Value>> {
        if query.columns.contains('(') && self.fail_joins.load(Ordering::SeqCst) {
            return Err(AppError::Backend {
                status: 400,
                message: "Could not find a relationship between 'bookings' and 'drivers'"
                    .to_string(),
            });
        }

        let rows = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| matches(row, query))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();
        Ok(rows)
    }

    async fn insert(&self, _bearer: &Bearer, table: &str, mut row: Value) -> AppResult<Value> {
        let next = self.inserts.fetch_add(1, Ordering::SeqCst) + 100;
        if row.get("id").is_none() {
            row["id"] = json!(next);
        }
        self.seed(table, row.clone());
        Ok(row)
    }

    async fn upsert(
        &self,
        _bearer: &Bearer,
        table: &str,
        row: Value,
        on_conflict: &[&str],
    ) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let existing = rows.iter_mut().find(|stored| {
            !on_conflict.is_empty()
                && on_conflict
                    .iter()
                    .all(|column| stored[*column] == row[*column])
        });
        match existing {
            Some(stored) => *stored = row,
            None => rows.push(row),
        }
        Ok(())
    }

    async fn update(
        &self,
        _bearer: &Bearer,
        filter: &Query,
        changes: Value,
    ) -> AppResult<Vec<Value>> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(filter.table.clone()).or_default();
        let mut updated = Vec::new();

        for row in rows.iter_mut().filter(|row| matches(row, filter)) {
            if let (Some(target), Some(patch)) = (row.as_object_mut(), changes.as_object()) {
                for (key, value) in patch {
                    target.insert(key.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, _bearer: &Bearer, filter: &Query) -> AppResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(&filter.table) {
            rows.retain(|row| !matches(row, filter));
        }
        Ok(())
    }

    async fn rpc(&self, _bearer: &Bearer, function: &str, _args: Value) -> AppResult<Value> {
        self.rpc_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_rpcs.load(Ordering::SeqCst) {
            return Err(AppError::Backend {
                status: 404,
                message: format!("function {function} does not exist"),
            });
        }
        Ok(self
            .rpc_results
            .lock()
            .unwrap()
            .get(function)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn invoke(&self, _bearer: &Bearer, _function: &str, _body: Value) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for FakeBackend {
    async fn user_for_token(&self, access_token: &str) -> AppResult<Option<AuthUser>> {
        Ok(self.tokens.lock().unwrap().get(access_token).cloned())
    }

    async fn sign_in(&self, email: &str, _password: &str) -> AppResult<AuthSession> {
        let tokens = self.tokens.lock().unwrap();
        tokens
            .iter()
            .find(|(_, user)| user.email.as_deref() == Some(email))
            .map(|(token, user)| AuthSession {
                access_token: token.clone(),
                user: user.clone(),
            })
            .ok_or_else(|| AppError::Backend {
                status: 400,
                message: "Invalid login credentials".to_string(),
            })
    }

    /// Never issues a session directly. Unless email confirmation is on, the
    /// account can sign in straight away.
    async fn sign_up(&self, request: &SignUp) -> AppResult<Option<AuthSession>> {
        if !self.confirm_email.load(Ordering::SeqCst) {
            self.add_user("signup-token", "admin-2", &request.email, "admin");
        }
        Ok(None)
    }

    async fn sign_out(&self, _access_token: &str) -> AppResult<()> {
        Ok(())
    }
}

fn setup(backend: Arc<FakeBackend>) -> axum::Router {
    let config = Config::for_backend("http://backend.test", "anon-key");
    // 12:00 in UTC+05:30
    let clock = FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 6, 30, 0).unwrap());
    let state = AppState::new(
        config,
        backend.clone(),
        backend,
        Arc::new(clock),
        Metrics::new(),
    );
    router(Arc::new(state))
}

fn booking_row(id: &str, booking_ref: &str) -> Value {
    json!({
        "id": id,
        "booking_ref": booking_ref,
        "user_first_name": "Asha",
        "user_mobile": "9876543210",
        "pickup_address": "MG Road, Bengaluru",
        "drop_address": "Kempegowda Airport",
        "pickup_lat": 12.9756,
        "pickup_lng": 77.6050,
        "toll": 0,
        "price_total": "500.00",
        "status": "pending",
        "created_at": "2025-03-01T05:00:00Z",
        "updated_at": "2025-03-01T05:00:00Z"
    })
}

fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn form_request(uri: &str, cookie: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("cookie", cookie)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn location(response: &axum::response::Response) -> String {
    response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup(FakeBackend::with_accounts());
    let response = app.oneshot(get_request("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["notifier"], false);
    assert_eq!(body["pricing_schema"], "pricing");
    assert_eq!(body["alert_subscribers"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup(FakeBackend::with_accounts());
    let response = app.oneshot(get_request("/metrics", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("booking_alerts_total"));
}

#[tokio::test]
async fn protected_pages_redirect_without_a_session() {
    let backend = FakeBackend::with_accounts();

    for uri in ["/bookings", "/dashboard", "/drivers", "/pricing", "/settings", "/ws"] {
        let response = setup(backend.clone())
            .oneshot(get_request(uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/login", "{uri}");
    }
}

#[tokio::test]
async fn non_admin_session_is_turned_away_without_looping() {
    let backend = FakeBackend::with_accounts();

    let response = setup(backend.clone())
        .oneshot(get_request("/bookings", Some(RIDER_COOKIE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    // the login page itself must render rather than bounce back
    let response = setup(backend)
        .oneshot(get_request("/login", Some(RIDER_COOKIE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_is_sent_from_public_pages_to_bookings() {
    let backend = FakeBackend::with_accounts();

    for uri in ["/", "/login", "/register"] {
        let response = setup(backend.clone())
            .oneshot(get_request(uri, Some(ADMIN_COOKIE)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), "/bookings", "{uri}");
    }
}

#[tokio::test]
async fn login_sets_session_cookie() {
    let app = setup(FakeBackend::with_accounts());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("email=admin%40budgetcab.test&password=secret"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard");
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("cab_admin_session=admin-token"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn bookings_fall_back_to_flat_rows_when_join_fails() {
    let backend = FakeBackend::with_accounts();
    backend.seed("bookings", booking_row("b-1", "BC-1001"));
    backend.fail_joins.store(true, Ordering::SeqCst);

    let response = setup(backend)
        .oneshot(get_request("/bookings", Some(ADMIN_COOKIE)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("BC-1001"));
    assert!(body.contains("showing basic booking rows"));
    assert!(!body.contains("No bookings found"));
}

#[tokio::test]
async fn booking_search_filters_loaded_rows() {
    let backend = FakeBackend::with_accounts();
    backend.seed("bookings", booking_row("b-1", "BC-1001"));
    backend.seed("bookings", booking_row("b-2", "BC-2002"));

    let response = setup(backend)
        .oneshot(get_request("/bookings?q=bc-2002", Some(ADMIN_COOKIE)))
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("BC-2002"));
    assert!(!body.contains("BC-1001"));
}

#[tokio::test]
async fn toll_change_reprices_the_booking() {
    let backend = FakeBackend::with_accounts();
    backend.seed("bookings", booking_row("b-1", "BC-1001"));

    let response = setup(backend.clone())
        .oneshot(form_request(
            "/bookings/b-1",
            ADMIN_COOKIE,
            "status=confirmed&driver_id=&toll=50&price_total=500&return_to=%2Fbookings",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bookings");

    let stored = &backend.rows("bookings")[0];
    assert_eq!(stored["status"], "confirmed");
    assert_eq!(stored["toll"], 50.0);
    assert_eq!(stored["price_total"], 550.0);
    assert!(stored.get("driver_id").is_none());
}

#[tokio::test]
async fn invalid_booking_edit_keeps_the_panel_open() {
    let backend = FakeBackend::with_accounts();
    backend.seed("bookings", booking_row("b-1", "BC-1001"));

    let response = setup(backend.clone())
        .oneshot(form_request(
            "/bookings/b-1",
            ADMIN_COOKIE,
            "status=confirmed&toll=-5&price_total=500",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Toll cannot be negative"));
    assert_eq!(backend.rows("bookings")[0]["status"], "pending");
}

#[tokio::test]
async fn duplicate_pricing_rule_is_rejected_before_insert() {
    let backend = FakeBackend::with_accounts();
    backend.seed(
        "pricing",
        json!({
            "id": 1,
            "cab_type": "Maruti Ertiga Or Similar",
            "trip_type": "Local",
            "base_fare": 2500
        }),
    );

    let response = setup(backend.clone())
        .oneshot(form_request(
            "/pricing",
            ADMIN_COOKIE,
            "cab_type=Maruti+Ertiga+Or+Similar&trip_type=Local&base_fare=2700",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("combination already exists"));
    assert_eq!(backend.inserts.load(Ordering::SeqCst), 0);
    assert_eq!(backend.rows("pricing").len(), 1);
}

#[tokio::test]
async fn new_pricing_rule_is_saved() {
    let backend = FakeBackend::with_accounts();

    let response = setup(backend.clone())
        .oneshot(form_request(
            "/pricing",
            ADMIN_COOKIE,
            "cab_type=Toyota+Innova&trip_type=Round+Trip&base_fare=3200",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/pricing");
    assert_eq!(backend.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(backend.rows("pricing")[0]["base_fare"], 3200.0);
}

#[tokio::test]
async fn dashboard_renders_defaults_and_caches_per_range() {
    let backend = FakeBackend::with_accounts();
    backend.fail_rpcs.store(true, Ordering::SeqCst);

    let app = setup(backend.clone());
    let response = app
        .clone()
        .oneshot(get_request("/dashboard?range=7d", Some(ADMIN_COOKIE)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Total Users"));
    assert!(body.contains("No data for this period"));
    assert_eq!(backend.rpc_calls.load(Ordering::SeqCst), 4);

    let response = app
        .oneshot(get_request("/dashboard?range=7d", Some(ADMIN_COOKIE)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(backend.rpc_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn dashboard_shows_revenue_in_indian_grouping() {
    let backend = FakeBackend::with_accounts();
    backend.rpc_results.lock().unwrap().insert(
        "get_dashboard_stats".to_string(),
        json!([{ "total_users": 42, "total_bookings": 7, "active_drivers": 3, "total_revenue": "1234567" }]),
    );

    let response = setup(backend)
        .oneshot(get_request("/dashboard", Some(ADMIN_COOKIE)))
        .await
        .unwrap();

    let body = body_string(response).await;
    assert!(body.contains("12,34,567"));
}

#[tokio::test]
async fn driver_deactivation_goes_through_confirmation() {
    let backend = FakeBackend::with_accounts();
    backend.seed(
        "drivers",
        json!({
            "id": "d-1",
            "name": "Ravi",
            "mobile": "9000000001",
            "is_active": true,
            "shift_start": "09:00:00",
            "shift_end": "18:00:00",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }),
    );

    let response = setup(backend.clone())
        .oneshot(get_request("/drivers?confirm_deactivate=d-1", Some(ADMIN_COOKIE)))
        .await
        .unwrap();
    let body = body_string(response).await;
    assert!(body.contains("Deactivate Ravi?"));
    assert_eq!(backend.rows("drivers")[0]["is_active"], true);

    let response = setup(backend.clone())
        .oneshot(form_request(
            "/drivers/d-1/active",
            ADMIN_COOKIE,
            "active=false&confirmed=true",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(backend.rows("drivers")[0]["is_active"], false);
}

#[tokio::test]
async fn push_subscription_is_saved_and_removed() {
    let backend = FakeBackend::with_accounts();

    let response = setup(backend.clone())
        .oneshot(form_request(
            "/settings/push",
            ADMIN_COOKIE,
            "subscription=%7B%22endpoint%22%3A%22https%3A%2F%2Fpush.test%2F1%22%7D",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(backend.rows("push_subscriptions")[0]["user_id"], "admin-1");

    let response = setup(backend.clone())
        .oneshot(form_request("/settings/push/delete", ADMIN_COOKIE, ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(backend.rows("push_subscriptions").is_empty());
}

#[tokio::test]
async fn saving_the_same_subscription_twice_keeps_one_row() {
    let backend = FakeBackend::with_accounts();
    let body = "subscription=%7B%22endpoint%22%3A%22https%3A%2F%2Fpush.test%2F1%22%7D";

    for _ in 0..2 {
        let response = setup(backend.clone())
            .oneshot(form_request("/settings/push", ADMIN_COOKIE, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    assert_eq!(backend.rows("push_subscriptions").len(), 1);
}

fn register_request(email: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/register")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "first_name=Meera&last_name=Nair&email={email}&mobile=9000000002&password=secret123"
        )))
        .unwrap()
}

#[tokio::test]
async fn registration_signs_in_when_no_session_is_issued() {
    let backend = FakeBackend::with_accounts();

    let response = setup(backend)
        .oneshot(register_request("meera%40budgetcab.test"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/bookings");
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("cab_admin_session=signup-token"));
}

#[tokio::test]
async fn registration_reports_failed_auto_login() {
    let backend = FakeBackend::with_accounts();
    backend.confirm_email.store(true, Ordering::SeqCst);

    let response = setup(backend)
        .oneshot(register_request("meera%40budgetcab.test"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("set-cookie").is_none());
    let body = body_string(response).await;
    assert!(body.contains("Registration successful but auto-login failed"));
    assert!(body.contains("Please log in manually."));
    assert!(body.contains("meera@budgetcab.test"));
}

#[tokio::test]
async fn root_without_session_goes_to_login() {
    let response = setup(FakeBackend::with_accounts())
        .oneshot(get_request("/", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let response = setup(FakeBackend::with_accounts())
        .oneshot(form_request("/logout", ADMIN_COOKIE, ""))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    let cookie = response
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cookie.starts_with("cab_admin_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn unconfirmed_deactivation_shows_the_confirmation_instead() {
    let backend = FakeBackend::with_accounts();
    backend.seed(
        "drivers",
        json!({
            "id": "d-1",
            "name": "Ravi",
            "mobile": "9000000001",
            "is_active": true,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }),
    );

    let response = setup(backend.clone())
        .oneshot(form_request("/drivers/d-1/active", ADMIN_COOKIE, "active=false"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Deactivate Ravi?"));
    assert_eq!(backend.rows("drivers")[0]["is_active"], true);
}
