use std::fmt::Write;

use axum::response::Html;

use crate::models::driver::{format_12h, parse_time_of_day};
use crate::models::pricing::{
    trip_type_badge, PricingRule, PricingSchema, TimeSlotType, CAB_TYPES, TRIP_TYPES,
};
use crate::repository::pricing::PricingInput;
use crate::views::{error_banner, escape, layout, rupees, selected};

pub enum PricingPanel<'a> {
    None,
    Create {
        input: &'a PricingInput,
        error: Option<&'a str>,
    },
    Edit {
        id: i64,
        input: &'a PricingInput,
        error: Option<&'a str>,
    },
}

pub struct PricingPage<'a> {
    pub admin_email: Option<&'a str>,
    pub schema: PricingSchema,
    pub rules: &'a [PricingRule],
    pub panel: PricingPanel<'a>,
    pub load_error: Option<&'a str>,
}

pub fn pricing_page(page: &PricingPage<'_>) -> Html<String> {
    let mut body = String::new();

    match &page.panel {
        PricingPanel::None => {}
        PricingPanel::Create { input, error } => {
            body.push_str(&rule_form(page.schema, "Add Pricing Rule", "/pricing", input, *error, true));
        }
        PricingPanel::Edit { id, input, error } => {
            let action = format!("/pricing/{id}");
            body.push_str(&rule_form(page.schema, "Edit Pricing Rule", &action, input, *error, false));
        }
    }

    body.push_str(r#"<p><a href="/pricing?new=1" class="button primary">Add Pricing Rule</a></p>"#);
    body.push_str(&error_banner(page.load_error));

    if page.rules.is_empty() {
        body.push_str(r#"<div class="empty">No pricing rules configured</div>"#);
    } else {
        body.push_str(&match page.schema {
            PricingSchema::Categorical => categorical_table(page.rules),
            PricingSchema::TimeSliced => time_sliced_table(page.rules),
        });
    }

    layout("Pricing", "/pricing", page.admin_email, &body)
}

fn categorical_table(rules: &[PricingRule]) -> String {
    let mut rows = String::new();
    for rule in rules {
        let PricingRule::Categorical(rule) = rule else {
            continue;
        };
        let _ = write!(
            rows,
            r#"<tr><td>{cab}</td><td><span class="badge {badge}">{trip}</span></td><td>{fare}</td><td><a href="/pricing?edit={id}">Edit</a></td></tr>"#,
            cab = escape(&rule.cab_type),
            badge = trip_type_badge(&rule.trip_type),
            trip = escape(&rule.trip_type),
            fare = rupees(rule.base_fare.unwrap_or(0.0)),
            id = rule.id,
        );
    }
    format!(
        r#"<table>
<thead><tr><th>Cab type</th><th>Trip type</th><th>Base fare</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>"#
    )
}

fn time_sliced_table(rules: &[PricingRule]) -> String {
    let mut rows = String::new();
    for rule in rules {
        let PricingRule::TimeSliced(rule) = rule else {
            continue;
        };
        let window = match (
            rule.start_time.as_deref().and_then(parse_time_of_day),
            rule.end_time.as_deref().and_then(parse_time_of_day),
        ) {
            (Some(start), Some(end)) => format!("{} - {}", format_12h(start), format_12h(end)),
            _ => "All day".to_string(),
        };
        let _ = write!(
            rows,
            r#"<tr><td>{slot}</td><td>{window}</td><td>{fare}</td><td>{per_km}/km</td><td>{priority}</td><td><a href="/pricing?edit={id}">Edit</a></td></tr>"#,
            slot = rule.time_slot_type.label(),
            fare = rupees(rule.base_fare.unwrap_or(0.0)),
            per_km = rupees(rule.per_km_rate.unwrap_or(0.0)),
            priority = rule.priority.unwrap_or(0),
            id = rule.id,
        );
    }
    format!(
        r#"<table>
<thead><tr><th>Time slot</th><th>Window</th><th>Base fare</th><th>Per km</th><th>Priority</th><th></th></tr></thead>
<tbody>{rows}</tbody>
</table>"#
    )
}

fn options<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>, current: &str) -> String {
    let mut out = format!(
        r#"<option value=""{}>Select</option>"#,
        selected(current.is_empty())
    );
    for (value, label) in values {
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            escape(value),
            selected(value == current),
            escape(label)
        );
    }
    out
}

fn rule_form(
    schema: PricingSchema,
    heading: &str,
    action: &str,
    input: &PricingInput,
    error: Option<&str>,
    creating: bool,
) -> String {
    let fields = match schema {
        PricingSchema::Categorical => {
            // cab and trip type identify the rule, so they are fixed once created
            let locked = if creating { "" } else { " disabled" };
            let hidden = if creating {
                String::new()
            } else {
                format!(
                    r#"<input type="hidden" name="cab_type" value="{}"><input type="hidden" name="trip_type" value="{}">"#,
                    escape(&input.cab_type),
                    escape(&input.trip_type)
                )
            };
            format!(
                r#"{hidden}<label>Cab type <select name="cab_type"{locked}>{cabs}</select></label>
<label>Trip type <select name="trip_type"{locked}>{trips}</select></label>
<label>Base fare (₹) <input type="number" step="0.01" min="0" name="base_fare" value="{fare}"></label>"#,
                cabs = options(CAB_TYPES.iter().map(|c| (*c, *c)), input.cab_type.trim()),
                trips = options(TRIP_TYPES.iter().map(|t| (*t, *t)), input.trip_type.trim()),
                fare = escape(&input.base_fare),
            )
        }
        PricingSchema::TimeSliced => format!(
            r#"<label>Time slot <select name="time_slot_type">{slots}</select></label>
<div class="grid two">
<label>Base fare (₹) <input type="number" step="0.01" min="0" name="base_fare" value="{fare}"></label>
<label>Per km rate (₹) <input type="number" step="0.01" min="0" name="per_km_rate" value="{per_km}"></label>
<label>Start time <input type="time" name="start_time" value="{start}"></label>
<label>End time <input type="time" name="end_time" value="{end}"></label>
</div>
<label>Priority <input type="number" step="1" name="priority" value="{priority}"></label>"#,
            slots = options(
                TimeSlotType::ALL.iter().map(|s| (s.as_str(), s.label())),
                input.time_slot_type.trim()
            ),
            fare = escape(&input.base_fare),
            per_km = escape(&input.per_km_rate),
            start = escape(input.start_time.get(..5).unwrap_or(&input.start_time)),
            end = escape(input.end_time.get(..5).unwrap_or(&input.end_time)),
            priority = escape(&input.priority),
        ),
    };

    format!(
        r#"<section class="panel">
<header><h2>{heading}</h2><a href="/pricing">Close</a></header>
{error}
<form method="post" action="{action}" class="stack">
{fields}
<button type="submit" class="primary">Save</button>
</form>
</section>"#,
        error = error_banner(error),
    )
}
