use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::AdminSession;
use crate::engine::fare::resolve_fare_edit;
use crate::error::{AppError, AppResult};
use crate::models::booking::{Booking, BookingPatch, BookingStatus};
use crate::repository::blank_to_none;
use crate::state::AppState;
use crate::views::bookings::{bookings_page, filter_bookings, BookingEditor, BookingsPage};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", get(list_bookings))
        .route("/bookings/:id", post(update_booking))
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingsQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    pub open: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookingEditForm {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub driver_id: String,
    #[serde(default)]
    pub toll: String,
    #[serde(default)]
    pub price_total: String,
    #[serde(default)]
    pub return_to: String,
}

async fn list_bookings(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<BookingsQuery>,
) -> Html<String> {
    render(&state, &admin, &params, None).await
}

async fn render(
    state: &AppState,
    admin: &AdminSession,
    params: &BookingsQuery,
    edit_error: Option<&str>,
) -> Html<String> {
    let bearer = admin.bearer();

    let outcome = state
        .bookings
        .list_recent(&bearer, state.config.bookings_page_limit, true)
        .await;
    let degraded = outcome.is_degraded();
    let (bookings, load_error) = match outcome.into_result() {
        Ok(bookings) => (bookings, None),
        Err(err) => (Vec::new(), Some(err.user_message())),
    };

    let open_id = params.open.as_deref().filter(|id| !id.trim().is_empty());

    // the open booking may be older than the loaded page
    let fetched: Option<Booking> = match open_id {
        Some(id) if !bookings.iter().any(|b| b.id == id) => {
            match state.bookings.get(&bearer, id).await {
                Ok(found) => found,
                Err(err) => {
                    warn!(booking_id = %id, error = %err, "failed to load booking for editing");
                    None
                }
            }
        }
        _ => None,
    };
    let open = open_id.and_then(|id| {
        bookings
            .iter()
            .find(|b| b.id == id)
            .or(fetched.as_ref())
    });

    let drivers = match open {
        Some(_) => state.drivers.list(&bearer).await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to load drivers for assignment");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let search = params.q.as_deref().unwrap_or_default();
    let status = params.status.as_deref().and_then(BookingStatus::parse);

    bookings_page(&BookingsPage {
        admin_email: admin.user.email.as_deref(),
        bookings: filter_bookings(&bookings, search, status),
        loaded: bookings.len(),
        search,
        status,
        degraded,
        load_error: load_error.as_deref(),
        editor: open.map(|booking| BookingEditor {
            booking,
            drivers: &drivers,
            error: edit_error,
        }),
        offset: state.local_offset(),
    })
}

async fn apply_edit(
    state: &AppState,
    admin: &AdminSession,
    id: &str,
    form: &BookingEditForm,
) -> AppResult<()> {
    let bearer = admin.bearer();

    let status = BookingStatus::parse(form.status.trim())
        .ok_or_else(|| AppError::Validation("Please choose a valid status".to_string()))?;

    let stored = state
        .bookings
        .get(&bearer, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let fare = resolve_fare_edit(stored.toll, stored.price_total, &form.toll, &form.price_total)?;

    let patch = BookingPatch {
        status: Some(status),
        // an empty selection leaves the current assignment alone
        driver_id: blank_to_none(&form.driver_id),
        toll: fare.toll,
        price_total: fare.price_total,
        updated_at: None,
    };

    state
        .bookings
        .update_fields(&bearer, id, patch, state.clock.now())
        .await?;

    info!(booking_id = %id, status = %status, "booking updated");
    Ok(())
}

async fn update_booking(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<BookingEditForm>,
) -> Response {
    match apply_edit(&state, &admin, &id, &form).await {
        Ok(()) => {
            let back = if form.return_to.starts_with("/bookings") {
                form.return_to.as_str()
            } else {
                "/bookings"
            };
            Redirect::to(back).into_response()
        }
        Err(err) => {
            warn!(booking_id = %id, error = %err, "booking update rejected");
            let params = BookingsQuery {
                open: Some(id.clone()),
                ..BookingsQuery::default()
            };
            render(&state, &admin, &params, Some(&err.user_message()))
                .await
                .into_response()
        }
    }
}
