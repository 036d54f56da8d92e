use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::models::driver::{parse_time_of_day, Driver, DriverDraft, VehicleType};
use crate::repository::{blank_to_none, decode_rows};
use crate::store::{Bearer, DataStore, Query};

const TABLE: &str = "drivers";

/// Raw driver form fields. An unchecked `is_active` box is simply absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub shift_start: String,
    #[serde(default)]
    pub shift_end: String,
    #[serde(default)]
    pub vehicle_type_name: String,
    #[serde(default)]
    pub is_active: Option<String>,
}

impl DriverInput {
    /// Form values for editing an existing driver.
    pub fn from_driver(driver: &Driver) -> Self {
        Self {
            name: driver.name.clone().unwrap_or_default(),
            shift_start: driver.shift_start.clone().unwrap_or_default(),
            shift_end: driver.shift_end.clone().unwrap_or_default(),
            vehicle_type_name: driver.vehicle_type_name.clone().unwrap_or_default(),
            is_active: driver.is_active.then(|| "on".to_string()),
        }
    }

    /// Blank form for a new driver; active by default.
    pub fn blank() -> Self {
        Self {
            is_active: Some("on".to_string()),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AppResult<DriverDraft> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Driver name is required".to_string()));
        }

        Ok(DriverDraft {
            name: name.to_string(),
            shift_start: shift_time("Shift start", &self.shift_start)?,
            shift_end: shift_time("Shift end", &self.shift_end)?,
            vehicle_type_name: blank_to_none(&self.vehicle_type_name),
            is_active: self.is_active.is_some(),
        })
    }
}

/// Normalizes a shift bound to `HH:MM`.
fn shift_time(field: &str, raw: &str) -> AppResult<Option<String>> {
    let Some(value) = blank_to_none(raw) else {
        return Ok(None);
    };
    let minutes = parse_time_of_day(&value)
        .ok_or_else(|| AppError::Validation(format!("{field} must be a time like 09:30")))?;
    Ok(Some(format!("{:02}:{:02}", minutes / 60, minutes % 60)))
}

#[derive(Clone)]
pub struct DriverRepository {
    store: Arc<dyn DataStore>,
}

impl DriverRepository {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, bearer: &Bearer) -> AppResult<Vec<Driver>> {
        let rows = self
            .store
            .select(bearer, &Query::table(TABLE).order("name", true))
            .await?;
        decode_rows(rows)
    }

    pub async fn vehicle_types(&self, bearer: &Bearer) -> AppResult<Vec<VehicleType>> {
        let query = Query::table("vehicle_types")
            .select("name")
            .eq("is_active", true)
            .order("display_order", true)
            .order("name", true);
        let rows = self.store.select(bearer, &query).await?;
        decode_rows(rows)
    }

    pub async fn create(&self, bearer: &Bearer, draft: &DriverDraft) -> AppResult<Driver> {
        let row = self
            .store
            .insert(bearer, TABLE, serde_json::to_value(draft)?)
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    pub async fn update(
        &self,
        bearer: &Bearer,
        id: &str,
        draft: &DriverDraft,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut changes = serde_json::to_value(draft)?;
        changes["updated_at"] = json!(now);
        self.apply(bearer, id, changes).await
    }

    pub async fn set_active(
        &self,
        bearer: &Bearer,
        id: &str,
        active: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.apply(bearer, id, json!({ "is_active": active, "updated_at": now }))
            .await
    }

    async fn apply(&self, bearer: &Bearer, id: &str, changes: serde_json::Value) -> AppResult<()> {
        let updated = self
            .store
            .update(bearer, &Query::table(TABLE).eq("id", id), changes)
            .await?;

        if updated.is_empty() {
            return Err(AppError::NotFound(
                "Driver not found or could not be updated".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DriverInput;

    fn input(name: &str, start: &str, end: &str) -> DriverInput {
        DriverInput {
            name: name.to_string(),
            shift_start: start.to_string(),
            shift_end: end.to_string(),
            vehicle_type_name: String::new(),
            is_active: Some("on".to_string()),
        }
    }

    #[test]
    fn name_is_required() {
        let err = input("   ", "", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "Driver name is required");
    }

    #[test]
    fn blank_fields_become_null_and_times_normalize() {
        let draft = input(" Suresh ", "22:00:00", "").validate().unwrap();
        assert_eq!(draft.name, "Suresh");
        assert_eq!(draft.shift_start.as_deref(), Some("22:00"));
        assert_eq!(draft.shift_end, None);
        assert_eq!(draft.vehicle_type_name, None);
        assert!(draft.is_active);
    }

    #[test]
    fn unparseable_shift_is_rejected() {
        let err = input("Suresh", "9pm", "06:00").validate().unwrap_err();
        assert_eq!(err.to_string(), "Shift start must be a time like 09:30");
    }

    #[test]
    fn unchecked_box_means_inactive() {
        let mut raw = input("Suresh", "", "");
        raw.is_active = None;
        assert!(!raw.validate().unwrap().is_active);
    }
}
