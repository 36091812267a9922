//! Variable Store
//!
//! Typed value cells layered on object identities. The declared type is fixed
//! at creation; writes of another type fail.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use ips_core::constants::presentation;
use ips_core::{KernelError, KernelResult, ObjectId, Value, VariableType};

/// Structured presentation record (`PRESENTATION`, `PROFILE`, `OPTIONS`, ...)
///
/// An empty record means "no presentation".
pub type Presentation = serde_json::Map<String, serde_json::Value>;

/// Presentation wrapping a named profile; empty name yields no presentation
pub fn legacy_presentation(profile: &str) -> Presentation {
    let mut record = Presentation::new();
    if !profile.is_empty() {
        record.insert(
            presentation::KEY_PRESENTATION.to_string(),
            presentation::LEGACY.into(),
        );
        record.insert(presentation::KEY_PROFILE.to_string(), profile.into());
    }
    record
}

/// A variable record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableEntry {
    pub id: ObjectId,
    pub variable_type: VariableType,
    pub value: Value,
    pub profile: String,
    pub action: Option<ObjectId>,
    pub presentation: Presentation,
    pub custom_profile: String,
    pub custom_action: Option<ObjectId>,
    pub custom_presentation: Presentation,
    /// Set on every write
    pub updated: Option<DateTime<Utc>>,
    /// Set only when a write changed the value
    pub changed: Option<DateTime<Utc>>,
    pub locked: bool,
}

impl VariableEntry {
    pub fn new(id: ObjectId, variable_type: VariableType) -> Self {
        Self {
            id,
            variable_type,
            value: Value::default_for(variable_type),
            profile: String::new(),
            action: None,
            presentation: Presentation::new(),
            custom_profile: String::new(),
            custom_action: None,
            custom_presentation: Presentation::new(),
            updated: None,
            changed: None,
            locked: false,
        }
    }

    /// Custom presentation when set, otherwise the module-defined one
    pub fn effective_presentation(&self) -> &Presentation {
        if self.custom_presentation.is_empty() {
            &self.presentation
        } else {
            &self.custom_presentation
        }
    }

    /// Custom action when set, otherwise the module-defined one
    pub fn effective_action(&self) -> Option<ObjectId> {
        self.custom_action.or(self.action)
    }
}

/// Variable Store
#[derive(Default)]
pub struct VariableStore {
    by_id: DashMap<ObjectId, Arc<VariableEntry>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, id: ObjectId, variable_type: VariableType) -> KernelResult<()> {
        if self.by_id.contains_key(&id) {
            return Err(KernelError::already_exists("Variable", id));
        }
        self.by_id
            .insert(id, Arc::new(VariableEntry::new(id, variable_type)));
        debug!("Created {} variable {}", variable_type, id);
        Ok(())
    }

    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        self.by_id
            .remove(&id)
            .map(|_| debug!("Deleted variable {}", id))
            .ok_or_else(|| KernelError::not_found("Variable", id))
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<Arc<VariableEntry>> {
        self.by_id
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| KernelError::not_found("Variable", id))
    }

    /// All variable identities, ascending
    pub fn list(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self.by_id.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.by_id.clear();
    }

    fn update<F, R>(&self, id: ObjectId, f: F) -> KernelResult<R>
    where
        F: FnOnce(&mut VariableEntry) -> KernelResult<R>,
    {
        let mut slot = self
            .by_id
            .get_mut(&id)
            .ok_or_else(|| KernelError::not_found("Variable", id))?;
        let mut entry = (**slot).clone();
        let result = f(&mut entry)?;
        *slot = Arc::new(entry);
        Ok(result)
    }

    pub fn variable_type(&self, id: ObjectId) -> KernelResult<VariableType> {
        Ok(self.get(id)?.variable_type)
    }

    pub fn read(&self, id: ObjectId) -> KernelResult<Value> {
        Ok(self.get(id)?.value.clone())
    }

    /// Write a value of the declared type
    ///
    /// Returns whether the value changed.
    pub fn write(&self, id: ObjectId, value: Value, now: DateTime<Utc>) -> KernelResult<bool> {
        self.update(id, |entry| {
            value.check_type(&format!("Variable #{}", id), entry.variable_type)?;
            let changed = entry.value != value;
            entry.updated = Some(now);
            if changed {
                entry.changed = Some(now);
                entry.value = value;
            }
            trace!("Wrote variable {} (changed: {})", id, changed);
            Ok(changed)
        })
    }

    /// Set the module-defined profile and its legacy presentation
    pub fn set_profile(&self, id: ObjectId, profile: &str) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.profile = profile.to_string();
            entry.presentation = legacy_presentation(profile);
            Ok(())
        })
    }

    /// Set the user-defined profile and its legacy presentation
    pub fn set_custom_profile(&self, id: ObjectId, profile: &str) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.custom_profile = profile.to_string();
            entry.custom_presentation = legacy_presentation(profile);
            Ok(())
        })
    }

    pub fn set_action(&self, id: ObjectId, action: Option<ObjectId>) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.action = action;
            Ok(())
        })
    }

    pub fn set_custom_action(&self, id: ObjectId, action: Option<ObjectId>) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.custom_action = action;
            Ok(())
        })
    }

    pub fn set_presentation(&self, id: ObjectId, record: Presentation) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.presentation = record;
            Ok(())
        })
    }

    pub fn set_custom_presentation(&self, id: ObjectId, record: Presentation) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.custom_presentation = record;
            Ok(())
        })
    }

    pub fn set_locked(&self, id: ObjectId, locked: bool) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.locked = locked;
            Ok(())
        })
    }

    pub fn effective_presentation(&self, id: ObjectId) -> KernelResult<Presentation> {
        Ok(self.get(id)?.effective_presentation().clone())
    }
}
