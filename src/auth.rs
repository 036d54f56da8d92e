use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::Redirect;
use tracing::{debug, info, warn};

use crate::models::profile::{AuthUser, Role};
use crate::state::AppState;
use crate::store::Bearer;

const SESSION_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

/// A caller whose token is valid and whose profile role is `admin`.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub token: String,
    pub user: AuthUser,
}

impl AdminSession {
    pub fn bearer(&self) -> Bearer {
        Bearer::User(self.token.clone())
    }
}

pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(cookie_name: &str, token: &str) -> String {
    format!("{cookie_name}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_MAX_AGE_SECS}")
}

pub fn cleared_cookie(cookie_name: &str) -> String {
    format!("{cookie_name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Every failure along the way means "not an admin"; nothing is retried.
pub async fn resolve_admin(state: &AppState, token: Option<String>) -> Option<AdminSession> {
    let token = token?;

    let user = match state.auth.user_for_token(&token).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("session token rejected by auth api");
            return None;
        }
        Err(err) => {
            warn!(error = %err, "session lookup failed");
            return None;
        }
    };

    let bearer = Bearer::User(token.clone());
    match state.profiles.role(&bearer, &user.id).await {
        Ok(Some(Role::Admin)) => Some(AdminSession { token, user }),
        Ok(Some(role)) => {
            info!(user_id = %user.id, ?role, "non-admin session turned away");
            None
        }
        Ok(None) => {
            info!(user_id = %user.id, "session has no profile");
            None
        }
        Err(err) => {
            warn!(user_id = %user.id, error = %err, "profile lookup failed");
            None
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.config.session_cookie);
        resolve_admin(state, token)
            .await
            .ok_or_else(|| Redirect::to("/login"))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::COOKIE;
    use axum::http::{HeaderMap, HeaderValue};

    use super::{cleared_cookie, session_cookie, session_token};

    #[test]
    fn finds_the_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; cab_admin_session=tok-123; lang=en"),
        );
        assert_eq!(
            session_token(&headers, "cab_admin_session").as_deref(),
            Some("tok-123")
        );
        assert_eq!(session_token(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_value_is_no_session() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("cab_admin_session="));
        assert_eq!(session_token(&headers, "cab_admin_session"), None);
    }

    #[test]
    fn cookies_are_http_only() {
        assert!(session_cookie("s", "t").starts_with("s=t; Path=/; HttpOnly"));
        assert!(cleared_cookie("s").ends_with("Max-Age=0"));
    }
}
