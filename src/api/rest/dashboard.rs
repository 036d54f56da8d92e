use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::auth::AdminSession;
use crate::engine::range::DateRange;
use crate::state::AppState;
use crate::views::dashboard::{dashboard_page, DashboardPage};

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/dashboard", get(dashboard))
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub range: Option<String>,
}

async fn dashboard(
    admin: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<DashboardQuery>,
) -> Html<String> {
    let range = DateRange::parse(params.range.as_deref());
    let window = range.resolve(state.clock.now(), state.local_offset());
    let data = state.dashboard.load(&admin.bearer(), range, window).await;

    dashboard_page(&DashboardPage {
        admin_email: admin.user.email.as_deref(),
        range,
        data: &data,
    })
}
