use axum::response::Html;

use crate::views::{bare_layout, error_banner, escape};

pub fn login_page(email: &str, error: Option<&str>) -> Html<String> {
    let body = format!(
        r#"{error}
<form method="post" action="/login" class="stack">
<label>Email <input type="email" name="email" value="{email}" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit" class="primary">Sign in</button>
</form>
<p class="muted">No account yet? <a href="/register">Register</a></p>"#,
        error = error_banner(error),
        email = escape(email),
    );
    bare_layout("Admin Login", &body)
}

#[derive(Debug, Clone, Default)]
pub struct RegisterValues<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub mobile: &'a str,
}

pub fn register_page(values: &RegisterValues<'_>, error: Option<&str>) -> Html<String> {
    let body = format!(
        r#"{error}
<form method="post" action="/register" class="stack">
<label>First name <input name="first_name" value="{first_name}" required></label>
<label>Last name <input name="last_name" value="{last_name}" required></label>
<label>Email <input type="email" name="email" value="{email}" required></label>
<label>Mobile <input type="tel" name="mobile" value="{mobile}" required></label>
<label>Password <input type="password" name="password" minlength="6" required></label>
<button type="submit" class="primary">Create admin account</button>
</form>
<p class="muted">Already registered? <a href="/login">Sign in</a></p>"#,
        error = error_banner(error),
        first_name = escape(values.first_name),
        last_name = escape(values.last_name),
        email = escape(values.email),
        mobile = escape(values.mobile),
    );
    bare_layout("Admin Registration", &body)
}
