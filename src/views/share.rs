use chrono::FixedOffset;
use url::form_urlencoded;

use crate::models::booking::Booking;

const WHATSAPP_BASE: &str = "https://wa.me/";

/// Plain-text trip sheet sent to a driver over WhatsApp.
pub fn whatsapp_message(booking: &Booking, offset: FixedOffset) -> String {
    let mut lines: Vec<String> = vec![
        "🚗 *BudgetCab Booking Details*".to_string(),
        String::new(),
        format!("📋 *Booking Ref:* {}", booking.booking_ref),
        String::new(),
    ];

    push_place(
        &mut lines,
        "📍 *Pickup Location:*",
        booking.pickup_address.as_deref(),
        booking.pickup_lat.zip(booking.pickup_lng),
        booking.pickup_digipin.as_deref(),
    );
    push_place(
        &mut lines,
        "🎯 *Drop Location:*",
        booking.drop_address.as_deref(),
        booking.drop_lat.zip(booking.drop_lng),
        booking.drop_digipin.as_deref(),
    );

    if let Some(option) = booking.primary_option() {
        lines.push("🚕 *Trip Details:*".to_string());
        if let Some(cab_type) = option.cab_type.as_deref() {
            lines.push(format!("• Cab Type: {cab_type}"));
        }
        if let Some(trip_type) = option.trip_type.as_deref() {
            lines.push(format!("• Trip Type: {trip_type}"));
        }
        if let Some(nights) = option.number_of_nights.filter(|n| *n > 0) {
            lines.push(format!("• Nights: {nights}"));
        }
        lines.push(String::new());
    }

    if let Some(distance) = booking.distance_km.filter(|d| *d > 0.0) {
        lines.push(format!("📏 *Distance:* {distance:.2} km"));
        lines.push(String::new());
    }

    lines.push("💰 *Pricing:*".to_string());
    if let Some(total) = booking.price_total.filter(|t| *t != 0.0) {
        lines.push(format!("• Total Fare: ₹{total:.2}"));
    }
    match booking.toll.filter(|t| *t > 0.0) {
        Some(toll) => lines.push(format!("• Toll: ₹{toll:.2}")),
        None => lines.push("• Toll: Not added".to_string()),
    }
    lines.push(String::new());

    if booking.user_first_name.is_some() || booking.user_mobile.is_some() {
        lines.push("👤 *Customer Details:*".to_string());
        if let Some(name) = booking.user_first_name.as_deref() {
            lines.push(format!("• Name: {name}"));
        }
        if let Some(mobile) = booking.user_mobile.as_deref() {
            lines.push(format!("• Mobile: {mobile}"));
        }
        lines.push(String::new());
    }

    if let Some(scheduled) = booking.scheduled_time {
        let local = scheduled.with_timezone(&offset);
        lines.push(format!(
            "📅 *Scheduled Time:* {}",
            local.format("%A, %-d %B %Y at %-I:%M %p")
        ));
        lines.push(String::new());
    }

    lines.push(format!(
        "📊 *Status:* {}",
        booking.status.as_str().replace('_', " ").to_uppercase()
    ));

    if let Some(driver) = booking.drivers.as_ref() {
        if let Some(name) = driver.name.as_deref() {
            lines.push(String::new());
            lines.push(format!("👨‍✈️ *Assigned Driver:* {name}"));
            if let Some(mobile) = driver.mobile.as_deref() {
                lines.push(format!("📱 Driver Mobile: {mobile}"));
            }
        }
    }

    lines.join("\n")
}

fn push_place(
    lines: &mut Vec<String>,
    heading: &str,
    address: Option<&str>,
    coordinates: Option<(f64, f64)>,
    digipin: Option<&str>,
) {
    let Some(address) = address else {
        return;
    };

    lines.push(heading.to_string());
    lines.push(address.to_string());
    if let Some((lat, lng)) = coordinates {
        lines.push(format!("🗺️ https://www.google.com/maps?q={lat},{lng}"));
    }
    if let Some(digipin) = digipin {
        lines.push(format!("📍 DigiPin: {digipin}"));
    }
    lines.push(String::new());
}

/// Targets the assigned driver's number when known, else lets the sender pick.
pub fn whatsapp_url(booking: &Booking, offset: FixedOffset) -> String {
    let text = encode_component(&whatsapp_message(booking, offset));
    let phone: String = booking
        .drivers
        .as_ref()
        .and_then(|driver| driver.mobile.as_deref())
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    if phone.is_empty() {
        format!("{WHATSAPP_BASE}?text={text}")
    } else {
        format!("{WHATSAPP_BASE}{phone}?text={text}")
    }
}

/// Google Maps directions from pickup to drop; needs all four coordinates.
pub fn directions_url(booking: &Booking) -> Option<String> {
    let (pickup_lat, pickup_lng) = booking.pickup_lat.zip(booking.pickup_lng)?;
    let (drop_lat, drop_lng) = booking.drop_lat.zip(booking.drop_lng)?;
    Some(format!(
        "https://www.google.com/maps/dir/?api=1&origin={pickup_lat},{pickup_lng}&destination={drop_lat},{drop_lng}"
    ))
}

/// Percent-encodes like a URI component; spaces become `%20`, not `+`.
fn encode_component(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{directions_url, whatsapp_message, whatsapp_url};
    use crate::engine::clock::local_offset;
    use crate::models::booking::Booking;

    fn booking() -> Booking {
        serde_json::from_value(json!({
            "id": "b-7",
            "booking_ref": "BC-7007",
            "user_first_name": "Meera",
            "user_mobile": "9000000001",
            "pickup_address": "Baner",
            "pickup_lat": 18.559,
            "pickup_lng": 73.786,
            "pickup_digipin": "4P3-JK8-52C9",
            "drop_address": "Pune Airport",
            "drop_lat": "18.582",
            "drop_lng": "73.919",
            "distance_km": 21.456,
            "price_total": 640,
            "toll": 0,
            "status": "driver_assigned",
            "created_at": "2025-03-01T04:00:00+00:00",
            "updated_at": "2025-03-01T04:00:00+00:00",
            "drivers": { "id": "d-1", "name": "Imran", "mobile": "+91 98220 12345" },
            "booking_options": [
                { "cab_type": "Maruti Ertiga Or Similar", "trip_type": "Airport Transfer", "number_of_nights": null }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn message_covers_trip_pricing_and_driver() {
        let message = whatsapp_message(&booking(), local_offset(330));

        assert!(message.starts_with("🚗 *BudgetCab Booking Details*\n\n📋 *Booking Ref:* BC-7007"));
        assert!(message.contains("📍 *Pickup Location:*\nBaner\n🗺️ https://www.google.com/maps?q=18.559,73.786\n📍 DigiPin: 4P3-JK8-52C9"));
        assert!(message.contains("• Trip Type: Airport Transfer"));
        assert!(!message.contains("Nights"));
        assert!(message.contains("📏 *Distance:* 21.46 km"));
        assert!(message.contains("• Total Fare: ₹640.00\n• Toll: Not added"));
        assert!(message.contains("📊 *Status:* DRIVER ASSIGNED"));
        assert!(message.ends_with("👨‍✈️ *Assigned Driver:* Imran\n📱 Driver Mobile: +91 98220 12345"));
    }

    #[test]
    fn url_targets_driver_digits() {
        let url = whatsapp_url(&booking(), local_offset(330));
        assert!(url.starts_with("https://wa.me/919822012345?text="));
        assert!(!url.contains('+'));
        assert!(url.contains("Booking%20Ref"));
    }

    #[test]
    fn url_without_driver_lets_sender_choose() {
        let mut booking = booking();
        booking.drivers = None;
        assert!(whatsapp_url(&booking, local_offset(0)).starts_with("https://wa.me/?text="));
    }

    #[test]
    fn directions_need_both_ends() {
        let mut booking = booking();
        assert_eq!(
            directions_url(&booking).as_deref(),
            Some("https://www.google.com/maps/dir/?api=1&origin=18.559,73.786&destination=18.582,73.919")
        );

        booking.drop_lng = None;
        assert_eq!(directions_url(&booking), None);
    }
}
