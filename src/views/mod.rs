pub mod auth;
pub mod bookings;
pub mod dashboard;
pub mod drivers;
pub mod pricing;
pub mod settings;
pub mod share;

use std::fmt::Write;

use axum::response::Html;
use chrono::{DateTime, FixedOffset, Utc};

const NAV: [(&str, &str); 5] = [
    ("Dashboard", "/dashboard"),
    ("Bookings", "/bookings"),
    ("Drivers", "/drivers"),
    ("Pricing", "/pricing"),
    ("Settings", "/settings"),
];

/// Browser side of the alert stream: each message becomes a toast and, when
/// permitted, a system notification.
const ALERT_SCRIPT: &str = r#"<script>
(function () {
  var status = document.getElementById("alert-status");
  function connect() {
    var scheme = location.protocol === "https:" ? "wss://" : "ws://";
    var socket = new WebSocket(scheme + location.host + "/ws");
    socket.onopen = function () { if (status) status.textContent = "Live alerts connected"; };
    socket.onclose = function () {
      if (status) status.textContent = "Live alerts disconnected, retrying";
      setTimeout(connect, 5000);
    };
    socket.onmessage = function (event) {
      var alert = JSON.parse(event.data);
      var toast = document.createElement("a");
      toast.className = "toast";
      toast.href = alert.url;
      toast.textContent = alert.title + " | " + alert.body.replace("\n", " | ");
      document.getElementById("toasts").appendChild(toast);
      setTimeout(function () { toast.remove(); }, 15000);
      if ("Notification" in window && Notification.permission === "granted") {
        var n = new Notification(alert.title, { body: alert.body, tag: alert.tag });
        n.onclick = function () { window.focus(); location.href = alert.url; };
      }
    };
  }
  connect();
})();
</script>"#;

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Escaped value or "N/A".
pub fn or_na(value: Option<&str>) -> String {
    value.map(escape).unwrap_or_else(|| "N/A".to_string())
}

pub fn rupees(amount: f64) -> String {
    format!("₹{amount:.2}")
}

/// Indian digit grouping: 12,34,567.5
pub fn indian_grouping(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let grouped = if whole.len() <= 3 {
        whole
    } else {
        let (head, tail) = whole.split_at(whole.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(2);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        format!("{},{tail}", groups.join(","))
    };

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    match fraction {
        0 => format!("{sign}{grouped}"),
        f if f % 10 == 0 => format!("{sign}{grouped}.{}", f / 10),
        f => format!("{sign}{grouped}.{f:02}"),
    }
}

pub fn timestamp(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset)
        .format("%-d %b %Y, %-I:%M %p")
        .to_string()
}

pub fn selected(is: bool) -> &'static str {
    if is { " selected" } else { "" }
}

pub fn checked(is: bool) -> &'static str {
    if is { " checked" } else { "" }
}

pub fn error_banner(message: Option<&str>) -> String {
    message
        .map(|msg| format!(r#"<div class="error">{}</div>"#, escape(msg)))
        .unwrap_or_default()
}

/// Admin page chrome: navbar, alert toasts and the alert socket script.
pub fn layout(title: &str, active: &str, admin_email: Option<&str>, body: &str) -> Html<String> {
    let mut nav = String::new();
    for (label, href) in NAV {
        let class = if href == active { " class=\"active\"" } else { "" };
        let _ = write!(nav, r#"<a href="{href}"{class}>{label}</a>"#);
    }

    let who = admin_email
        .map(|email| format!(r#"<span class="who">{}</span>"#, escape(email)))
        .unwrap_or_default();

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | BudgetCab Admin</title>
<link rel="stylesheet" href="/admin.css">
</head>
<body>
<nav class="navbar">
<span class="brand">BudgetCab Admin</span>
{nav}
<span class="spacer"></span>
{who}
<form method="post" action="/logout" class="inline"><button type="submit">Logout</button></form>
</nav>
<div id="toasts"></div>
<main>
<h1>{title}</h1>
{body}
</main>
{ALERT_SCRIPT}
</body>
</html>"#,
        title = escape(title),
    ))
}

/// Chrome for the signed-out pages.
pub fn bare_layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | BudgetCab Admin</title>
<link rel="stylesheet" href="/admin.css">
</head>
<body class="auth">
<main class="card narrow">
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}
