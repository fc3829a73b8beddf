use crate::error::RegistryError;
use crate::schema::{decode_document, encode_snapshot, Discard};
use crate::storage::KeyValueStore;
use chrono::Weekday;
use common::validation::{validate_name, validate_time_of_day};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Storage key of the persisted schedule list
pub const SCHEDULES_KEY: &str = "schedules";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TargetDevice {
    Temperature,
    Lighting,
    #[serde(rename = "HVAC")]
    Hvac,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: String,
    pub name: String,
    pub target_device: TargetDevice,
    /// Free-form setpoint, e.g. "22°C", "75%", "On"
    pub target_value: String,
    /// `HH:MM`, 24-hour
    pub time: String,
    pub days: Vec<Weekday>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDraft {
    pub name: String,
    pub target_device: TargetDevice,
    pub target_value: String,
    pub time: String,
    #[serde(default)]
    pub days: Vec<Weekday>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl ScheduleDraft {
    fn validate(&self) -> Result<(), RegistryError> {
        validate_name(&self.name, "name")?;
        validate_name(&self.target_value, "targetValue")?;
        validate_time_of_day(&self.time, "time")?;
        Ok(())
    }

    fn into_item(self, id: String) -> ScheduleItem {
        let mut days = Vec::with_capacity(self.days.len());
        for day in self.days {
            if !days.contains(&day) {
                days.push(day);
            }
        }
        days.sort_by_key(|d: &Weekday| d.num_days_from_monday());

        ScheduleItem {
            id,
            name: self.name.trim().to_string(),
            target_device: self.target_device,
            target_value: self.target_value.trim().to_string(),
            time: self.time,
            days,
            is_active: self.is_active,
        }
    }
}

/// Building automation schedules, persisted like the camera registry.
pub struct ScheduleBook {
    store: Arc<dyn KeyValueStore>,
    schedules: Vec<ScheduleItem>,
}

impl ScheduleBook {
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let schedules = match store.get(SCHEDULES_KEY) {
            Ok(Some(raw)) => match load_schedules(&raw) {
                Ok((schedules, discarded)) => {
                    for discard in discarded {
                        warn!(index = discard.index, reason = %discard.reason, "discarded stored schedule");
                    }
                    schedules
                }
                Err(e) => {
                    error!(error = %e, "stored schedules are unusable, starting empty");
                    if let Err(e) = store.remove(SCHEDULES_KEY) {
                        warn!(error = %e, "failed to clear unusable schedules");
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                error!(error = %e, "failed to read schedules, starting empty");
                Vec::new()
            }
        };

        Self { store, schedules }
    }

    pub fn list(&self) -> &[ScheduleItem] {
        &self.schedules
    }

    pub fn get(&self, id: &str) -> Option<&ScheduleItem> {
        self.schedules.iter().find(|s| s.id == id)
    }

    pub fn add(&mut self, draft: ScheduleDraft) -> Result<ScheduleItem, RegistryError> {
        draft.validate()?;
        let item = draft.into_item(format!("sched_{}", Uuid::new_v4().simple()));

        info!(schedule_id = %item.id, name = %item.name, "schedule added");
        self.schedules.push(item.clone());
        self.persist();
        Ok(item)
    }

    pub fn update(&mut self, id: &str, draft: ScheduleDraft) -> Result<ScheduleItem, RegistryError> {
        let slot = self
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RegistryError::not_found(id))?;
        draft.validate()?;
        *slot = draft.into_item(id.to_string());
        let updated = slot.clone();

        self.persist();
        Ok(updated)
    }

    pub fn remove(&mut self, id: &str) -> Result<ScheduleItem, RegistryError> {
        let index = self
            .schedules
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| RegistryError::not_found(id))?;
        let removed = self.schedules.remove(index);

        info!(schedule_id = %id, "schedule removed");
        self.persist();
        Ok(removed)
    }

    pub fn toggle_active(&mut self, id: &str) -> Result<ScheduleItem, RegistryError> {
        let item = self
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| RegistryError::not_found(id))?;
        item.is_active = !item.is_active;
        let updated = item.clone();

        self.persist();
        Ok(updated)
    }

    fn persist(&self) {
        let result = encode_snapshot(&self.schedules).and_then(|raw| self.store.set(SCHEDULES_KEY, &raw));
        match result {
            Ok(()) => debug!(count = self.schedules.len(), "schedules saved"),
            Err(e) => error!(error = %e, "failed to save schedules"),
        }
    }
}

fn load_schedules(raw: &str) -> Result<(Vec<ScheduleItem>, Vec<Discard>), crate::schema::DocumentError> {
    let (_version, items) = decode_document(raw)?;
    let mut schedules = Vec::with_capacity(items.len());
    let mut discarded = Vec::new();

    for (index, item) in items.into_iter().enumerate() {
        let checked = serde_json::from_value::<ScheduleItem>(item)
            .map_err(|e| e.to_string())
            .and_then(|s| {
                validate_time_of_day(&s.time, "time").map_err(|e| e.to_string())?;
                if s.id.trim().is_empty() || schedules.iter().any(|k: &ScheduleItem| k.id == s.id) {
                    return Err(format!("missing or duplicate id '{}'", s.id));
                }
                Ok(s)
            });

        match checked {
            Ok(s) => schedules.push(s),
            Err(reason) => discarded.push(Discard { index, reason }),
        }
    }

    Ok((schedules, discarded))
}
