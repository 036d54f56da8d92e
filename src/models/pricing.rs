use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::numeric;

pub const CAB_TYPES: [&str; 5] = [
    "Maruti Ertiga Or Similar",
    "Maruti Swift Dzire Or Similar CNG",
    "Maruti Swift Dzire Or Similar Diesel",
    "Tempo Traveller 17 Seater",
    "Tempo Traveller 26 Seater",
];

pub const TRIP_TYPES: [&str; 4] = ["Local", "One Way", "Outstation", "Airport Transfer"];

pub fn trip_type_badge(trip_type: &str) -> &'static str {
    match trip_type {
        "Local" => "badge-blue",
        "One Way" => "badge-green",
        "Outstation" => "badge-purple",
        "Airport Transfer" => "badge-amber",
        _ => "badge-gray",
    }
}

/// Which of the two fare tables the dashboard manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingSchema {
    Categorical,
    TimeSliced,
}

impl PricingSchema {
    pub fn table(self) -> &'static str {
        match self {
            PricingSchema::Categorical => "pricing",
            PricingSchema::TimeSliced => "pricing_rules",
        }
    }
}

impl FromStr for PricingSchema {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "categorical" => Ok(PricingSchema::Categorical),
            "time_sliced" => Ok(PricingSchema::TimeSliced),
            other => Err(format!(
                "unknown pricing schema: {other}, expected categorical/time_sliced"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlotType {
    RegularTime,
    OfficeHours,
    NightHours,
}

impl TimeSlotType {
    pub const ALL: [TimeSlotType; 3] = [
        TimeSlotType::RegularTime,
        TimeSlotType::OfficeHours,
        TimeSlotType::NightHours,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeSlotType::RegularTime => "regular_time",
            TimeSlotType::OfficeHours => "office_hours",
            TimeSlotType::NightHours => "night_hours",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeSlotType::RegularTime => "Regular Time",
            TimeSlotType::OfficeHours => "Office Hours",
            TimeSlotType::NightHours => "Night Hours",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.as_str() == raw)
    }
}

/// Fare keyed by vehicle class and trip type (`pricing` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoricalRule {
    pub id: i64,
    pub cab_type: String,
    pub trip_type: String,
    #[serde(default, deserialize_with = "numeric::option")]
    pub base_fare: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fare with a time-of-day slot and tie-break priority (`pricing_rules` table).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlicedRule {
    pub id: i64,
    #[serde(default, deserialize_with = "numeric::option")]
    pub base_fare: Option<f64>,
    #[serde(default, deserialize_with = "numeric::option")]
    pub per_km_rate: Option<f64>,
    pub time_slot_type: TimeSlotType,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PricingRule {
    Categorical(CategoricalRule),
    TimeSliced(TimeSlicedRule),
}

impl PricingRule {
    pub fn id(&self) -> i64 {
        match self {
            PricingRule::Categorical(rule) => rule.id,
            PricingRule::TimeSliced(rule) => rule.id,
        }
    }

    pub fn base_fare(&self) -> f64 {
        match self {
            PricingRule::Categorical(rule) => rule.base_fare.unwrap_or(0.0),
            PricingRule::TimeSliced(rule) => rule.base_fare.unwrap_or(0.0),
        }
    }
}

/// Validated payload for creating or editing a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingDraft {
    Categorical {
        cab_type: String,
        trip_type: String,
        base_fare: f64,
    },
    TimeSliced {
        base_fare: f64,
        per_km_rate: f64,
        time_slot_type: TimeSlotType,
        start_time: Option<String>,
        end_time: Option<String>,
        priority: i32,
    },
}

impl PricingDraft {
    pub fn schema(&self) -> PricingSchema {
        match self {
            PricingDraft::Categorical { .. } => PricingSchema::Categorical,
            PricingDraft::TimeSliced { .. } => PricingSchema::TimeSliced,
        }
    }

    pub fn to_row(&self) -> serde_json::Value {
        match self {
            PricingDraft::Categorical {
                cab_type,
                trip_type,
                base_fare,
            } => serde_json::json!({
                "cab_type": cab_type,
                "trip_type": trip_type,
                "base_fare": base_fare,
            }),
            PricingDraft::TimeSliced {
                base_fare,
                per_km_rate,
                time_slot_type,
                start_time,
                end_time,
                priority,
            } => serde_json::json!({
                "base_fare": base_fare,
                "per_km_rate": per_km_rate,
                "time_slot_type": time_slot_type,
                "start_time": start_time,
                "end_time": end_time,
                "priority": priority,
            }),
        }
    }
}
