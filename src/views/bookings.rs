use std::fmt::Write;

use axum::response::Html;
use chrono::FixedOffset;

use crate::models::booking::{Booking, BookingStatus};
use crate::models::driver::Driver;
use crate::views::share::{directions_url, whatsapp_url};
use crate::views::{error_banner, escape, layout, or_na, rupees, selected, timestamp};

/// Search and status filter for the loaded working set. An empty search or a
/// missing status matches everything.
pub fn filter_bookings<'a>(
    bookings: &'a [Booking],
    search: &str,
    status: Option<BookingStatus>,
) -> Vec<&'a Booking> {
    let search = search.trim();
    bookings
        .iter()
        .filter(|booking| search.is_empty() || booking.matches_search(search))
        .filter(|booking| status.is_none_or(|wanted| booking.status == wanted))
        .collect()
}

pub struct BookingEditor<'a> {
    pub booking: &'a Booking,
    pub drivers: &'a [Driver],
    pub error: Option<&'a str>,
}

pub struct BookingsPage<'a> {
    pub admin_email: Option<&'a str>,
    pub bookings: Vec<&'a Booking>,
    pub loaded: usize,
    pub search: &'a str,
    pub status: Option<BookingStatus>,
    pub degraded: bool,
    pub load_error: Option<&'a str>,
    pub editor: Option<BookingEditor<'a>>,
    pub offset: FixedOffset,
}

pub fn bookings_page(page: &BookingsPage<'_>) -> Html<String> {
    let mut body = String::new();

    if let Some(editor) = page.editor.as_ref() {
        body.push_str(&edit_panel(editor, page));
    }

    body.push_str(&filter_bar(page));

    if page.degraded {
        body.push_str(
            r#"<div class="notice">Driver and trip details are unavailable right now; showing basic booking rows.</div>"#,
        );
    }
    if let Some(err) = page.load_error {
        body.push_str(&error_banner(Some(&format!("Could not load bookings: {err}"))));
    }

    let _ = write!(
        body,
        r#"<p class="muted">Showing {} of {} bookings</p>"#,
        page.bookings.len(),
        page.loaded
    );

    if page.bookings.is_empty() {
        body.push_str(r#"<div class="empty">No bookings found</div>"#);
    } else {
        body.push_str(&table(page));
    }

    layout("Bookings", "/bookings", page.admin_email, &body)
}

fn filter_bar(page: &BookingsPage<'_>) -> String {
    let mut options = format!(
        r#"<option value="all"{}>All statuses</option>"#,
        selected(page.status.is_none())
    );
    for status in BookingStatus::ALL {
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            status.as_str(),
            selected(page.status == Some(status)),
            status.label()
        );
    }

    format!(
        r#"<form method="get" action="/bookings" class="filters">
<input type="search" name="q" value="{search}" placeholder="Search by ref, name, mobile or address">
<select name="status">{options}</select>
<button type="submit">Filter</button>
</form>"#,
        search = escape(page.search),
    )
}

fn list_query(page: &BookingsPage<'_>) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if !page.search.trim().is_empty() {
        query.append_pair("q", page.search.trim());
    }
    if let Some(status) = page.status {
        query.append_pair("status", status.as_str());
    }
    query.finish()
}

fn table(page: &BookingsPage<'_>) -> String {
    let filters = list_query(page);
    let mut rows = String::new();

    for booking in &page.bookings {
        let open_href = if filters.is_empty() {
            format!("/bookings?open={}", escape(&booking.id))
        } else {
            format!("/bookings?{}&amp;open={}", escape(&filters), escape(&booking.id))
        };

        let trip = booking
            .primary_option()
            .map(|option| {
                format!(
                    "{}<br><span class=\"muted\">{}</span>",
                    or_na(option.cab_type.as_deref()),
                    or_na(option.trip_type.as_deref())
                )
            })
            .unwrap_or_else(|| "-".to_string());

        let scheduled = booking
            .scheduled_time
            .map(|at| timestamp(at, page.offset))
            .unwrap_or_else(|| "ASAP".to_string());

        let driver = booking
            .drivers
            .as_ref()
            .and_then(|driver| driver.name.as_deref())
            .map(escape)
            .unwrap_or_else(|| "Unassigned".to_string());

        let directions = directions_url(booking)
            .map(|href| {
                format!(
                    r#"<a href="{}" target="_blank" rel="noopener">Directions</a>"#,
                    escape(&href)
                )
            })
            .unwrap_or_default();

        let _ = write!(
            rows,
            r#"<tr>
<td><strong>{booking_ref}</strong><br><span class="muted">{created}</span></td>
<td>{name}<br><span class="muted">{mobile}</span></td>
<td>{pickup}<br><span class="muted">to {drop}</span></td>
<td>{trip}</td>
<td>{scheduled}</td>
<td>{fare}</td>
<td><span class="badge {badge}">{label}</span></td>
<td>{driver}</td>
<td class="actions"><a href="{open_href}">Edit</a> <a href="{share}" target="_blank" rel="noopener">WhatsApp</a> {directions}</td>
</tr>"#,
            booking_ref = escape(&booking.booking_ref),
            created = timestamp(booking.created_at, page.offset),
            name = or_na(booking.user_first_name.as_deref()),
            mobile = or_na(booking.user_mobile.as_deref()),
            pickup = or_na(booking.pickup_address.as_deref()),
            drop = or_na(booking.drop_address.as_deref()),
            fare = booking.price_total.map(rupees).unwrap_or_else(|| "-".to_string()),
            badge = booking.status.badge_class(),
            label = booking.status.label(),
            share = escape(&whatsapp_url(booking, page.offset)),
        );
    }

    format!(
        r#"<table class="bookings">
<thead><tr><th>Booking</th><th>Customer</th><th>Route</th><th>Trip</th><th>Scheduled</th><th>Fare</th><th>Status</th><th>Driver</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>"#
    )
}

fn edit_panel(editor: &BookingEditor<'_>, page: &BookingsPage<'_>) -> String {
    let booking = editor.booking;
    let filters = list_query(page);
    let close_href = if filters.is_empty() {
        "/bookings".to_string()
    } else {
        format!("/bookings?{}", escape(&filters))
    };

    let mut status_options = String::new();
    for status in BookingStatus::ALL {
        let _ = write!(
            status_options,
            r#"<option value="{}"{}>{}</option>"#,
            status.as_str(),
            selected(booking.status == status),
            status.label()
        );
    }

    let current_driver = booking.driver_id.as_deref();
    let mut driver_options = format!(
        r#"<option value=""{}>No driver assigned</option>"#,
        selected(current_driver.is_none())
    );
    for driver in editor.drivers {
        let _ = write!(
            driver_options,
            r#"<option value="{}"{}>{} {}</option>"#,
            escape(&driver.id),
            selected(current_driver == Some(driver.id.as_str())),
            escape(driver.display_name()),
            if driver.is_active { "(Active)" } else { "(Inactive)" }
        );
    }

    let scheduled = booking
        .scheduled_time
        .map(|at| format!("<p><strong>Scheduled:</strong> {}</p>", timestamp(at, page.offset)))
        .unwrap_or_default();

    format!(
        r#"<section class="panel" id="edit">
<header><h2>Booking {booking_ref}</h2><a href="{close_href}">Close</a></header>
{error}
<div class="grid two">
<p><strong>Customer:</strong> {name}</p>
<p><strong>Mobile:</strong> {mobile}</p>
<p><strong>Pickup:</strong> {pickup}{pickup_pin}</p>
<p><strong>Drop:</strong> {drop}{drop_pin}</p>
</div>
{scheduled}
<form method="post" action="/bookings/{id}" class="stack">
<input type="hidden" name="return_to" value="{close_href}">
<label>Status <select name="status">{status_options}</select></label>
<label>Assign driver <select name="driver_id">{driver_options}</select></label>
<div class="grid two">
<label>Toll (₹) <input type="number" step="0.01" min="0" name="toll" value="{toll}"></label>
<label>Total price (₹) <input type="number" step="0.01" name="price_total" value="{total}"></label>
</div>
<p class="muted">Changing the toll adjusts the total unless you also change the total. Distance: {distance:.2} km</p>
<p class="muted">Created {created} | Updated {updated}</p>
<button type="submit" class="primary">Save Changes</button>
</form>
</section>"#,
        booking_ref = escape(&booking.booking_ref),
        error = error_banner(editor.error),
        name = or_na(booking.user_first_name.as_deref()),
        mobile = or_na(booking.user_mobile.as_deref()),
        pickup = or_na(booking.pickup_address.as_deref()),
        pickup_pin = digipin(booking.pickup_digipin.as_deref()),
        drop = or_na(booking.drop_address.as_deref()),
        drop_pin = digipin(booking.drop_digipin.as_deref()),
        id = escape(&booking.id),
        toll = booking.toll.map(|t| format!("{t:.2}")).unwrap_or_else(|| "0".to_string()),
        total = booking.price_total.map(|t| format!("{t:.2}")).unwrap_or_default(),
        distance = booking.distance_km.unwrap_or(0.0),
        created = timestamp(booking.created_at, page.offset),
        updated = timestamp(booking.updated_at, page.offset),
    )
}

fn digipin(pin: Option<&str>) -> String {
    pin.map(|pin| format!(r#"<br><span class="muted">DigiPin: {}</span>"#, escape(pin)))
        .unwrap_or_default()
}
