use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::driver::parse_time_of_day;
use crate::models::pricing::{
    CategoricalRule, PricingDraft, PricingRule, PricingSchema, TimeSlicedRule, TimeSlotType,
};
use crate::repository::{blank_to_none, decode_rows};
use crate::store::{Bearer, DataStore, Query};

pub const DUPLICATE_RULE: &str =
    "A pricing rule for this cab type and trip type combination already exists";

/// Raw pricing form fields; which ones matter depends on the schema.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PricingInput {
    #[serde(default)]
    pub cab_type: String,
    #[serde(default)]
    pub trip_type: String,
    #[serde(default)]
    pub base_fare: String,
    #[serde(default)]
    pub per_km_rate: String,
    #[serde(default)]
    pub time_slot_type: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
    #[serde(default)]
    pub priority: String,
}

impl PricingInput {
    pub fn validate(&self, schema: PricingSchema) -> AppResult<PricingDraft> {
        match schema {
            PricingSchema::Categorical => {
                let cab_type = self.cab_type.trim();
                let trip_type = self.trip_type.trim();
                if cab_type.is_empty() || trip_type.is_empty() {
                    return Err(AppError::Validation(
                        "Cab type and trip type are required".to_string(),
                    ));
                }

                Ok(PricingDraft::Categorical {
                    cab_type: cab_type.to_string(),
                    trip_type: trip_type.to_string(),
                    base_fare: fare("Base fare", &self.base_fare)?,
                })
            }
            PricingSchema::TimeSliced => {
                let time_slot_type = TimeSlotType::parse(self.time_slot_type.trim())
                    .ok_or_else(|| AppError::Validation("Time slot type is required".to_string()))?;

                let priority = match self.priority.trim() {
                    "" => 0,
                    raw => raw.parse::<i32>().map_err(|_| {
                        AppError::Validation("Priority must be a whole number".to_string())
                    })?,
                };

                Ok(PricingDraft::TimeSliced {
                    base_fare: fare("Base fare", &self.base_fare)?,
                    per_km_rate: fare("Per km rate", &self.per_km_rate)?,
                    time_slot_type,
                    start_time: slot_bound("Start time", &self.start_time)?,
                    end_time: slot_bound("End time", &self.end_time)?,
                    priority,
                })
            }
        }
    }

    pub fn from_rule(rule: &PricingRule) -> Self {
        match rule {
            PricingRule::Categorical(rule) => Self {
                cab_type: rule.cab_type.clone(),
                trip_type: rule.trip_type.clone(),
                base_fare: amount_field(rule.base_fare),
                ..Self::default()
            },
            PricingRule::TimeSliced(rule) => Self {
                base_fare: amount_field(rule.base_fare),
                per_km_rate: amount_field(rule.per_km_rate),
                time_slot_type: rule.time_slot_type.as_str().to_string(),
                start_time: rule.start_time.clone().unwrap_or_default(),
                end_time: rule.end_time.clone().unwrap_or_default(),
                priority: rule.priority.unwrap_or(0).to_string(),
                ..Self::default()
            },
        }
    }
}

fn amount_field(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_default()
}

/// Non-negative amount; an empty field counts as zero.
fn fare(field: &str, raw: &str) -> AppResult<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(AppError::Validation(format!(
            "{field} must be a valid positive number"
        ))),
    }
}

fn slot_bound(field: &str, raw: &str) -> AppResult<Option<String>> {
    let Some(value) = blank_to_none(raw) else {
        return Ok(None);
    };
    let minutes = parse_time_of_day(&value)
        .ok_or_else(|| AppError::Validation(format!("{field} must be a time like 18:00")))?;
    Ok(Some(format!("{:02}:{:02}:00", minutes / 60, minutes % 60)))
}

#[derive(Clone)]
pub struct PricingRepository {
    store: Arc<dyn DataStore>,
    schema: PricingSchema,
}

impl PricingRepository {
    pub fn new(store: Arc<dyn DataStore>, schema: PricingSchema) -> Self {
        Self { store, schema }
    }

    pub fn schema(&self) -> PricingSchema {
        self.schema
    }

    pub async fn list(&self, bearer: &Bearer) -> AppResult<Vec<PricingRule>> {
        let table = Query::table(self.schema.table());
        match self.schema {
            PricingSchema::Categorical => {
                let query = table.order("cab_type", true).order("trip_type", true);
                let rows: Vec<CategoricalRule> = decode_rows(self.store.select(bearer, &query).await?)?;
                Ok(rows.into_iter().map(PricingRule::Categorical).collect())
            }
            PricingSchema::TimeSliced => {
                let query = table.order("priority", false).order("start_time", true);
                let rows: Vec<TimeSlicedRule> = decode_rows(self.store.select(bearer, &query).await?)?;
                Ok(rows.into_iter().map(PricingRule::TimeSliced).collect())
            }
        }
    }

    pub async fn create(&self, bearer: &Bearer, draft: &PricingDraft) -> AppResult<()> {
        self.check_schema(draft)?;

        if let PricingDraft::Categorical {
            cab_type,
            trip_type,
            ..
        } = draft
        {
            let existing = Query::table(self.schema.table())
                .select("id")
                .eq("cab_type", cab_type)
                .eq("trip_type", trip_type)
                .limit(1);
            if !self.store.select(bearer, &existing).await?.is_empty() {
                return Err(AppError::Validation(DUPLICATE_RULE.to_string()));
            }
        }

        self.store
            .insert(bearer, self.schema.table(), draft.to_row())
            .await?;
        Ok(())
    }

    pub async fn update(
        &self,
        bearer: &Bearer,
        id: i64,
        draft: &PricingDraft,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.check_schema(draft)?;

        let mut changes = draft.to_row();
        changes["updated_at"] = json!(now);

        let updated = self
            .store
            .update(bearer, &Query::table(self.schema.table()).eq("id", id), changes)
            .await?;

        if updated.is_empty() {
            return Err(AppError::Validation(
                "Pricing rule not found or could not be updated".to_string(),
            ));
        }
        Ok(())
    }

    fn check_schema(&self, draft: &PricingDraft) -> AppResult<()> {
        if draft.schema() != self.schema {
            return Err(AppError::BadRequest(format!(
                "pricing draft does not match the {} table",
                self.schema.table()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::PricingInput;
    use crate::models::pricing::{PricingDraft, PricingSchema, TimeSlotType};

    #[test]
    fn categorical_requires_both_types() {
        let input = PricingInput {
            cab_type: "Maruti Ertiga Or Similar".to_string(),
            ..Default::default()
        };
        let err = input.validate(PricingSchema::Categorical).unwrap_err();
        assert_eq!(err.to_string(), "Cab type and trip type are required");
    }

    #[test]
    fn base_fare_must_be_a_non_negative_number() {
        for bad in ["-10", "abc", "NaN"] {
            let input = PricingInput {
                cab_type: "Maruti Ertiga Or Similar".to_string(),
                trip_type: "Local".to_string(),
                base_fare: bad.to_string(),
                ..Default::default()
            };
            let err = input.validate(PricingSchema::Categorical).unwrap_err();
            assert_eq!(err.to_string(), "Base fare must be a valid positive number");
        }
    }

    #[test]
    fn empty_base_fare_is_zero() {
        let input = PricingInput {
            cab_type: "Tempo Traveller 17 Seater".to_string(),
            trip_type: "Outstation".to_string(),
            ..Default::default()
        };
        assert_eq!(
            input.validate(PricingSchema::Categorical).unwrap(),
            PricingDraft::Categorical {
                cab_type: "Tempo Traveller 17 Seater".to_string(),
                trip_type: "Outstation".to_string(),
                base_fare: 0.0,
            }
        );
    }

    #[test]
    fn time_sliced_rule_parses_slot_times_and_priority() {
        let input = PricingInput {
            base_fare: "150".to_string(),
            per_km_rate: "13.5".to_string(),
            time_slot_type: "night_hours".to_string(),
            start_time: "22:00".to_string(),
            end_time: "06:00".to_string(),
            priority: "5".to_string(),
            ..Default::default()
        };

        assert_eq!(
            input.validate(PricingSchema::TimeSliced).unwrap(),
            PricingDraft::TimeSliced {
                base_fare: 150.0,
                per_km_rate: 13.5,
                time_slot_type: TimeSlotType::NightHours,
                start_time: Some("22:00:00".to_string()),
                end_time: Some("06:00:00".to_string()),
                priority: 5,
            }
        );
    }

    #[test]
    fn time_sliced_rejects_fractional_priority() {
        let input = PricingInput {
            time_slot_type: "regular_time".to_string(),
            priority: "1.5".to_string(),
            ..Default::default()
        };
        let err = input.validate(PricingSchema::TimeSliced).unwrap_err();
        assert_eq!(err.to_string(), "Priority must be a whole number");
    }
}
