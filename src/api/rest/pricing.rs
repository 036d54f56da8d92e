use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::AdminSession;
use crate::repository::pricing::PricingInput;
use crate::state::AppState;
use crate::views::pricing::{pricing_page, PricingPage, PricingPanel};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pricing", get(list_rules).post(create_rule))
        .route("/pricing/:id", post(update_rule))
}

#[derive(Debug, Default, Deserialize)]
pub struct PricingQuery {
    pub edit: Option<i64>,
    pub new: Option<String>,
}

enum Panel {
    None,
    Create(PricingInput, Option<String>),
    Edit(i64, Option<PricingInput>, Option<String>),
}

async fn render(state: &AppState, admin: &AdminSession, panel: Panel) -> Html<String> {
    let (rules, load_error) = match state.pricing.list(&admin.bearer()).await {
        Ok(rules) => (rules, None),
        Err(err) => {
            warn!(error = %err, "failed to load pricing rules");
            (Vec::new(), Some(err.user_message()))
        }
    };

    let stored_input;
    let view_panel = match &panel {
        Panel::None => PricingPanel::None,
        Panel::Create(input, error) => PricingPanel::Create {
            input,
            error: error.as_deref(),
        },
        Panel::Edit(id, Some(input), error) => PricingPanel::Edit {
            id: *id,
            input,
            error: error.as_deref(),
        },
        Panel::Edit(id, None, error) => match rules.iter().find(|rule| rule.id() == *id) {
            Some(rule) => {
                stored_input = PricingInput::from_rule(rule);
                PricingPanel::Edit {
                    id: *id,
                    input: &stored_input,
                    error: error.as_deref(),
                }
            }
            None => PricingPanel::None,
        },
    };

    pricing_page(&PricingPage {
        admin_email: admin.user.email.as_deref(),
        schema: state.pricing.schema(),
        rules: &rules,
        panel: view_panel,
        load_error: load_error.as_deref(),
    })
}

async fn list_rules(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PricingQuery>,
) -> Html<String> {
    let panel = match (params.edit, params.new) {
        (Some(id), _) => Panel::Edit(id, None, None),
        (None, Some(_)) => Panel::Create(PricingInput::default(), None),
        (None, None) => Panel::None,
    };
    render(&state, &admin, panel).await
}

async fn create_rule(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Form(input): Form<PricingInput>,
) -> Response {
    let result = match input.validate(state.pricing.schema()) {
        Ok(draft) => state.pricing.create(&admin.bearer(), &draft).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            info!(table = state.pricing.schema().table(), "pricing rule created");
            Redirect::to("/pricing").into_response()
        }
        Err(err) => {
            warn!(error = %err, "pricing rule create rejected");
            render(&state, &admin, Panel::Create(input, Some(err.user_message())))
                .await
                .into_response()
        }
    }
}

async fn update_rule(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(input): Form<PricingInput>,
) -> Response {
    let result = match input.validate(state.pricing.schema()) {
        Ok(draft) => {
            state
                .pricing
                .update(&admin.bearer(), id, &draft, state.clock.now())
                .await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            info!(rule_id = id, "pricing rule updated");
            Redirect::to("/pricing").into_response()
        }
        Err(err) => {
            warn!(rule_id = id, error = %err, "pricing rule update rejected");
            render(&state, &admin, Panel::Edit(id, Some(input), Some(err.user_message())))
                .await
                .into_response()
        }
    }
}
