use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::auth::AdminSession;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::views::settings::{settings_page, SettingsPage};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings", get(settings))
        .route("/settings/push", post(save_subscription))
        .route("/settings/push/delete", post(remove_subscription))
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionForm {
    #[serde(default)]
    pub subscription: String,
}

async fn render(
    state: &AppState,
    admin: &AdminSession,
    notice: Option<&str>,
    error: Option<&str>,
) -> Html<String> {
    let subscribed = match state
        .push_subscriptions
        .exists(&admin.bearer(), &admin.user.id)
        .await
    {
        Ok(found) => Some(found),
        Err(err) => {
            warn!(error = %err, "failed to check push subscription");
            None
        }
    };

    settings_page(&SettingsPage {
        admin_email: admin.user.email.as_deref(),
        subscribed,
        notice,
        error,
    })
}

async fn settings(admin: AdminSession, State(state): State<Arc<AppState>>) -> Html<String> {
    render(&state, &admin, None, None).await
}

fn parse_subscription(raw: &str) -> AppResult<Value> {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value @ Value::Object(_)) => Ok(value),
        _ => Err(AppError::Validation(
            "Push subscription must be a JSON object from the browser".to_string(),
        )),
    }
}

async fn save_subscription(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubscriptionForm>,
) -> Response {
    let result = match parse_subscription(&form.subscription) {
        Ok(subscription) => {
            state
                .push_subscriptions
                .save(&admin.bearer(), &admin.user.id, subscription)
                .await
        }
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            info!(user_id = %admin.user.id, "push subscription saved");
            Redirect::to("/settings").into_response()
        }
        Err(err) => {
            warn!(user_id = %admin.user.id, error = %err, "push subscription not saved");
            render(&state, &admin, None, Some(&err.user_message()))
                .await
                .into_response()
        }
    }
}

async fn remove_subscription(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state
        .push_subscriptions
        .remove(&admin.bearer(), &admin.user.id)
        .await
    {
        Ok(()) => {
            info!(user_id = %admin.user.id, "push subscriptions removed");
            render(&state, &admin, Some("Push subscriptions removed"), None)
                .await
                .into_response()
        }
        Err(err) => {
            warn!(user_id = %admin.user.id, error = %err, "push subscription removal failed");
            render(&state, &admin, None, Some(&err.user_message()))
                .await
                .into_response()
        }
    }
}
