use std::fmt::Write;

use axum::response::Html;

use crate::engine::range::DateRange;
use crate::models::stats::DashboardData;
use crate::views::{escape, indian_grouping, layout};

pub struct DashboardPage<'a> {
    pub admin_email: Option<&'a str>,
    pub range: DateRange,
    pub data: &'a DashboardData,
}

pub fn dashboard_page(page: &DashboardPage<'_>) -> Html<String> {
    let stats = &page.data.stats;

    let mut ranges = String::new();
    for range in DateRange::ALL {
        let class = if range == page.range { " class=\"active\"" } else { "" };
        let _ = write!(
            ranges,
            r#"<a href="/dashboard?range={}"{class}>{}</a>"#,
            range.as_str(),
            range.label()
        );
    }

    let cards = [
        ("Total Users", stats.total_users.to_string()),
        ("Bookings Received", stats.total_bookings.to_string()),
        ("Online Drivers", stats.active_drivers.to_string()),
        ("Total Revenue", format!("₹{}", indian_grouping(stats.total_revenue))),
    ];
    let mut card_html = String::new();
    for (label, value) in cards {
        let _ = write!(
            card_html,
            r#"<div class="stat"><span class="label">{label}</span><span class="value">{value}</span></div>"#
        );
    }

    let user_growth = page
        .data
        .user_growth
        .iter()
        .map(|point| (point.date.as_str(), point.count as f64, point.count.to_string()));
    let bookings = page
        .data
        .bookings_series
        .iter()
        .map(|point| (point.date.as_str(), point.count as f64, point.count.to_string()));
    let revenue = page.data.revenue_series.iter().map(|point| {
        (
            point.date.as_str(),
            point.revenue,
            format!("₹{}", indian_grouping(point.revenue)),
        )
    });

    let body = format!(
        r#"<nav class="ranges">{ranges}</nav>
<p class="muted">{label}</p>
<div class="stats">{card_html}</div>
<div class="grid three">
{growth}
{bookings}
{revenue}
</div>"#,
        label = page.range.label(),
        growth = bar_list("User Growth", user_growth),
        bookings = bar_list("Bookings", bookings),
        revenue = bar_list("Revenue", revenue),
    );

    layout("Dashboard", "/dashboard", page.admin_email, &body)
}

/// One row per point with a bar scaled against the largest value.
fn bar_list<'a>(title: &str, points: impl Iterator<Item = (&'a str, f64, String)>) -> String {
    let points: Vec<_> = points.collect();
    if points.is_empty() {
        return format!(
            r#"<section class="panel"><h2>{title}</h2><div class="empty">No data for this period</div></section>"#
        );
    }

    let max = points
        .iter()
        .map(|(_, value, _)| *value)
        .fold(0.0_f64, f64::max);

    let mut rows = String::new();
    for (date, value, shown) in &points {
        let width = if max > 0.0 { (value / max * 100.0).round() } else { 0.0 };
        let _ = write!(
            rows,
            r#"<li><span class="date">{date}</span><span class="bar" style="width:{width}%"></span><span class="amount">{shown}</span></li>"#,
            date = escape(date),
        );
    }

    format!(r#"<section class="panel"><h2>{title}</h2><ul class="bars">{rows}</ul></section>"#)
}
