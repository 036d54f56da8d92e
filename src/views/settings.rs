use axum::response::Html;

use crate::views::{error_banner, escape, layout};

pub struct SettingsPage<'a> {
    pub admin_email: Option<&'a str>,
    /// `None` when the lookup failed.
    pub subscribed: Option<bool>,
    pub notice: Option<&'a str>,
    pub error: Option<&'a str>,
}

/// Fills the subscription field from the service worker's push manager, if any.
const SUBSCRIPTION_SCRIPT: &str = r#"<script>
(function () {
  var state = document.getElementById("permission-state");
  var ask = document.getElementById("ask-permission");
  function show() { if (state) state.textContent = ("Notification" in window) ? Notification.permission : "unsupported"; }
  show();
  if (ask) ask.onclick = function () {
    if ("Notification" in window) Notification.requestPermission().then(show);
  };
  if (!("serviceWorker" in navigator) || !("PushManager" in window)) return;
  navigator.serviceWorker.getRegistration().then(function (registration) {
    if (!registration) return null;
    return registration.pushManager.getSubscription();
  }).then(function (subscription) {
    if (!subscription) return;
    document.getElementById("subscription-json").value = JSON.stringify(subscription);
    document.getElementById("save-subscription").disabled = false;
  });
})();
</script>"#;

pub fn settings_page(page: &SettingsPage<'_>) -> Html<String> {
    let stored = match page.subscribed {
        Some(true) => r#"<span class="badge badge-green">Push subscription saved</span>"#,
        Some(false) => r#"<span class="badge badge-gray">No push subscription saved</span>"#,
        None => r#"<span class="badge badge-red">Could not check push subscription</span>"#,
    };

    let notice = page
        .notice
        .map(|msg| format!(r#"<div class="notice">{}</div>"#, escape(msg)))
        .unwrap_or_default();

    let body = format!(
        r#"{notice}{error}
<div class="grid two">
<section class="panel">
<header><h2>Notifications</h2></header>
<p>New pending or confirmed bookings are announced here while this dashboard is open, and pushed to subscribed devices when it is not.</p>
<p id="alert-status" class="muted">Live alerts connecting</p>
<p>Browser permission: <span id="permission-state">unknown</span>
<button type="button" id="ask-permission">Enable browser notifications</button></p>
<p>{stored}</p>
<form method="post" action="/settings/push" class="stack">
<input type="hidden" name="subscription" id="subscription-json">
<button type="submit" id="save-subscription" disabled>Save this device for push</button>
</form>
<form method="post" action="/settings/push/delete" class="inline">
<button type="submit">Remove push subscriptions</button>
</form>
</section>
<section class="panel muted">
<header><h2>Account Profile</h2></header>
<p>Profile management is not available yet.</p>
</section>
</div>
{SUBSCRIPTION_SCRIPT}"#,
        error = error_banner(page.error),
    );

    layout("Settings", "/settings", page.admin_email, &body)
}
