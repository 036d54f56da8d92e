use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::AdminSession;
use crate::engine::clock::minutes_of_day;
use crate::repository::drivers::DriverInput;
use crate::state::AppState;
use crate::views::drivers::{drivers_page, DriverPanel, DriversPage};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create_driver))
        .route("/drivers/:id", post(update_driver))
        .route("/drivers/:id/active", post(set_active))
}

#[derive(Debug, Default, Deserialize)]
pub struct DriversQuery {
    pub edit: Option<String>,
    pub new: Option<String>,
    pub confirm_deactivate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveForm {
    pub active: bool,
    #[serde(default)]
    pub confirmed: bool,
}

enum Panel {
    None,
    Create(DriverInput, Option<String>),
    Edit(String, Option<DriverInput>, Option<String>),
    ConfirmDeactivate(String),
}

async fn render(
    state: &AppState,
    admin: &AdminSession,
    panel: Panel,
    failure: Option<String>,
) -> Html<String> {
    let bearer = admin.bearer();

    let (drivers, load_error) = match state.drivers.list(&bearer).await {
        Ok(drivers) => (drivers, None),
        Err(err) => {
            warn!(error = %err, "failed to load drivers");
            (Vec::new(), Some(err.user_message()))
        }
    };
    let page_error = failure.or(load_error);

    let needs_vehicles = matches!(panel, Panel::Create(..) | Panel::Edit(..));
    let vehicle_types = if needs_vehicles {
        state.drivers.vehicle_types(&bearer).await.unwrap_or_else(|err| {
            warn!(error = %err, "failed to load vehicle types");
            Vec::new()
        })
    } else {
        Vec::new()
    };

    let stored_input;
    let view_panel = match &panel {
        Panel::None => DriverPanel::None,
        Panel::Create(input, error) => DriverPanel::Create {
            input,
            error: error.as_deref(),
        },
        Panel::Edit(id, input, error) => match drivers.iter().find(|d| &d.id == id) {
            Some(driver) => {
                let input = match input {
                    Some(input) => input,
                    None => {
                        stored_input = DriverInput::from_driver(driver);
                        &stored_input
                    }
                };
                DriverPanel::Edit {
                    driver,
                    input,
                    error: error.as_deref(),
                }
            }
            None => DriverPanel::None,
        },
        Panel::ConfirmDeactivate(id) => drivers
            .iter()
            .find(|d| &d.id == id && d.is_active)
            .map(DriverPanel::ConfirmDeactivate)
            .unwrap_or(DriverPanel::None),
    };

    drivers_page(&DriversPage {
        admin_email: admin.user.email.as_deref(),
        drivers: &drivers,
        vehicle_types: &vehicle_types,
        now_minutes: minutes_of_day(state.clock.now(), state.local_offset()),
        panel: view_panel,
        error: page_error.as_deref(),
    })
}

async fn list_drivers(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DriversQuery>,
) -> Html<String> {
    let panel = if let Some(id) = params.confirm_deactivate {
        Panel::ConfirmDeactivate(id)
    } else if let Some(id) = params.edit {
        Panel::Edit(id, None, None)
    } else if params.new.is_some() {
        Panel::Create(DriverInput::blank(), None)
    } else {
        Panel::None
    };

    render(&state, &admin, panel, None).await
}

async fn create_driver(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Form(input): Form<DriverInput>,
) -> Response {
    let result = match input.validate() {
        Ok(draft) => state.drivers.create(&admin.bearer(), &draft).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(driver) => {
            info!(driver_id = %driver.id, "driver created");
            Redirect::to("/drivers").into_response()
        }
        Err(err) => {
            warn!(error = %err, "driver create rejected");
            render(&state, &admin, Panel::Create(input, Some(err.user_message())), None)
                .await
                .into_response()
        }
    }
}

async fn update_driver(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(input): Form<DriverInput>,
) -> Response {
    let result = match input.validate() {
        Ok(draft) => {
            state
                .drivers
                .update(&admin.bearer(), &id, &draft, state.clock.now())
                .await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            info!(driver_id = %id, "driver updated");
            Redirect::to("/drivers").into_response()
        }
        Err(err) => {
            warn!(driver_id = %id, error = %err, "driver update rejected");
            render(&state, &admin, Panel::Edit(id, Some(input), Some(err.user_message())), None)
                .await
                .into_response()
        }
    }
}

/// Deactivation needs `confirmed=true` from the confirmation surface, and
/// without it the surface is shown instead. Reactivation is immediate.
async fn set_active(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<ActiveForm>,
) -> Response {
    if !form.active && !form.confirmed {
        return render(&state, &admin, Panel::ConfirmDeactivate(id), None)
            .await
            .into_response();
    }

    match state
        .drivers
        .set_active(&admin.bearer(), &id, form.active, state.clock.now())
        .await
    {
        Ok(()) => {
            info!(driver_id = %id, active = form.active, "driver availability changed");
            Redirect::to("/drivers").into_response()
        }
        Err(err) => {
            warn!(driver_id = %id, error = %err, "driver availability change failed");
            render(&state, &admin, Panel::None, Some(err.user_message()))
                .await
                .into_response()
        }
    }
}
