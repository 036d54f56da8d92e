use std::fmt::Write;

use axum::response::Html;

use crate::models::driver::{Driver, VehicleType};
use crate::repository::drivers::DriverInput;
use crate::views::{checked, error_banner, escape, layout, or_na, selected};

pub enum DriverPanel<'a> {
    None,
    Create {
        input: &'a DriverInput,
        error: Option<&'a str>,
    },
    Edit {
        driver: &'a Driver,
        input: &'a DriverInput,
        error: Option<&'a str>,
    },
    ConfirmDeactivate(&'a Driver),
}

pub struct DriversPage<'a> {
    pub admin_email: Option<&'a str>,
    pub drivers: &'a [Driver],
    pub vehicle_types: &'a [VehicleType],
    pub now_minutes: u16,
    pub panel: DriverPanel<'a>,
    pub error: Option<&'a str>,
}

pub fn drivers_page(page: &DriversPage<'_>) -> Html<String> {
    let mut body = String::new();

    match &page.panel {
        DriverPanel::None => {}
        DriverPanel::Create { input, error } => {
            body.push_str(&driver_form("Add Driver", "/drivers", input, *error, page.vehicle_types));
        }
        DriverPanel::Edit {
            driver,
            input,
            error,
        } => {
            let action = format!("/drivers/{}", escape(&driver.id));
            body.push_str(&driver_form("Edit Driver", &action, input, *error, page.vehicle_types));
        }
        DriverPanel::ConfirmDeactivate(driver) => {
            let _ = write!(
                body,
                r#"<section class="panel confirm">
<h2>Deactivate {name}?</h2>
<p>The driver will show as inactive and cannot be counted as online. Existing bookings are not changed.</p>
<form method="post" action="/drivers/{id}/active" class="inline">
<input type="hidden" name="active" value="false">
<input type="hidden" name="confirmed" value="true">
<button type="submit" class="danger">Deactivate</button>
</form>
<a href="/drivers">Cancel</a>
</section>"#,
                name = escape(driver.display_name()),
                id = escape(&driver.id),
            );
        }
    }

    body.push_str(r#"<p><a href="/drivers?new=1" class="button primary">Add Driver</a></p>"#);
    body.push_str(&error_banner(page.error));

    if page.drivers.is_empty() {
        body.push_str(r#"<div class="empty">No drivers yet</div>"#);
    } else {
        let mut rows = String::new();
        for driver in page.drivers {
            let presence = driver.presence(page.now_minutes);
            let shift = driver
                .shift_label()
                .unwrap_or_else(|| "No shift time set".to_string());
            let toggle = if driver.is_active {
                format!(
                    r#"<a href="/drivers?confirm_deactivate={}">Deactivate</a>"#,
                    escape(&driver.id)
                )
            } else {
                format!(
                    r#"<form method="post" action="/drivers/{}/active" class="inline"><input type="hidden" name="active" value="true"><button type="submit">Activate</button></form>"#,
                    escape(&driver.id)
                )
            };

            let _ = write!(
                rows,
                r#"<tr>
<td>{name}</td>
<td>{mobile}</td>
<td>{vehicle}</td>
<td>{shift}</td>
<td><span class="badge {badge}">{label}</span></td>
<td class="actions"><a href="/drivers?edit={id}">Edit</a> {toggle}</td>
</tr>"#,
                name = escape(driver.display_name()),
                mobile = or_na(driver.mobile.as_deref()),
                vehicle = or_na(driver.vehicle_type_name.as_deref()),
                badge = presence.badge_class(),
                label = presence.label(),
                id = escape(&driver.id),
            );
        }

        let _ = write!(
            body,
            r#"<table>
<thead><tr><th>Name</th><th>Mobile</th><th>Vehicle</th><th>Shift</th><th>Status</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>"#
        );
    }

    layout("Drivers", "/drivers", page.admin_email, &body)
}

fn driver_form(
    heading: &str,
    action: &str,
    input: &DriverInput,
    error: Option<&str>,
    vehicle_types: &[VehicleType],
) -> String {
    let current = input.vehicle_type_name.trim();
    let mut vehicles = format!(
        r#"<option value=""{}>Not set</option>"#,
        selected(current.is_empty())
    );
    let mut listed = false;
    for vehicle in vehicle_types {
        listed |= vehicle.name == current;
        let _ = write!(
            vehicles,
            r#"<option value="{name}"{sel}>{name}</option>"#,
            name = escape(&vehicle.name),
            sel = selected(vehicle.name == current),
        );
    }
    if !current.is_empty() && !listed {
        let _ = write!(
            vehicles,
            r#"<option value="{name}" selected>{name}</option>"#,
            name = escape(current)
        );
    }

    format!(
        r#"<section class="panel">
<header><h2>{heading}</h2><a href="/drivers">Close</a></header>
{error}
<form method="post" action="{action}" class="stack">
<label>Name <input name="name" value="{name}" required></label>
<label>Vehicle type <select name="vehicle_type_name">{vehicles}</select></label>
<div class="grid two">
<label>Shift start <input type="time" name="shift_start" value="{start}"></label>
<label>Shift end <input type="time" name="shift_end" value="{end}"></label>
</div>
<label class="check"><input type="checkbox" name="is_active"{active}> Active</label>
<button type="submit" class="primary">Save</button>
</form>
</section>"#,
        error = error_banner(error),
        name = escape(&input.name),
        start = escape(short_time(&input.shift_start)),
        end = escape(short_time(&input.shift_end)),
        active = checked(input.is_active.is_some()),
    )
}

/// `HH:MM:SS` as stored becomes `HH:MM` for the time input.
fn short_time(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.match_indices(':').nth(1) {
        Some((index, _)) => &raw[..index],
        None => raw,
    }
}
