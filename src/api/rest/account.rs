use std::sync::Arc;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::auth::{cleared_cookie, resolve_admin, session_cookie, session_token};
use crate::models::profile::{AuthSession, SignUp};
use crate::state::AppState;
use crate::views::auth::{login_page, register_page, RegisterValues};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/login", get(login_form).post(login))
        .route("/register", get(register_form).post(register))
        .route("/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub password: String,
}

async fn has_admin_session(state: &AppState, headers: &HeaderMap) -> bool {
    let token = session_token(headers, &state.config.session_cookie);
    resolve_admin(state, token).await.is_some()
}

async fn root(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Redirect {
    if has_admin_session(&state, &headers).await {
        Redirect::to("/bookings")
    } else {
        Redirect::to("/login")
    }
}

async fn login_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if has_admin_session(&state, &headers).await {
        return Redirect::to("/bookings").into_response();
    }
    login_page("", None).into_response()
}

async fn register_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if has_admin_session(&state, &headers).await {
        return Redirect::to("/bookings").into_response();
    }
    register_page(&RegisterValues::default(), None).into_response()
}

fn signed_in(state: &AppState, session: &AuthSession, to: &str) -> Response {
    (
        [(SET_COOKIE, session_cookie(&state.config.session_cookie, &session.access_token))],
        Redirect::to(to),
    )
        .into_response()
}

async fn login(State(state): State<Arc<AppState>>, Form(form): Form<LoginRequest>) -> Response {
    let email = form.email.trim();
    match state.auth.sign_in(email, &form.password).await {
        Ok(session) => {
            info!(user_id = %session.user.id, "admin signed in");
            signed_in(&state, &session, "/dashboard")
        }
        Err(err) => {
            warn!(error = %err, "sign in failed");
            login_page(email, Some(&err.user_message())).into_response()
        }
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterRequest>,
) -> Response {
    let values = RegisterValues {
        first_name: form.first_name.trim(),
        last_name: form.last_name.trim(),
        email: form.email.trim(),
        mobile: form.mobile.trim(),
    };
    let fail = |message: &str| register_page(&values, Some(message)).into_response();

    let request = SignUp {
        email: values.email.to_string(),
        password: form.password.clone(),
        first_name: values.first_name.to_string(),
        last_name: values.last_name.to_string(),
        mobile: values.mobile.to_string(),
    };

    let session = match state.auth.sign_up(&request).await {
        Ok(Some(session)) => session,
        Ok(None) => match state.auth.sign_in(&request.email, &request.password).await {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "sign in after registration failed");
                return fail(&format!(
                    "Registration successful but auto-login failed: {}. Please log in manually.",
                    err.user_message()
                ));
            }
        },
        Err(err) => {
            warn!(error = %err, "registration failed");
            return fail(&err.user_message());
        }
    };

    if session.access_token.is_empty() {
        return fail("Registration successful but session not established. Please log in manually.");
    }

    info!(user_id = %session.user.id, "admin registered");
    signed_in(&state, &session, "/bookings")
}

async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers, &state.config.session_cookie) {
        if let Err(err) = state.auth.sign_out(&token).await {
            warn!(error = %err, "token revocation failed");
        }
    }

    (
        [(SET_COOKIE, cleared_cookie(&state.config.session_cookie))],
        Redirect::to("/login"),
    )
        .into_response()
}
