//! Event Store
//!
//! Bookkeeping for trigger, cyclic and schedule events. Nothing is ever
//! scheduled or fired; modules and tests only inspect the configuration.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ips_core::{EventType, KernelError, KernelResult, ObjectId, Value};

use crate::records::Records;

/// Trigger configuration of a trigger event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTrigger {
    /// On update (0), on change (1), limit exceeded (2), limit dropped (3), on value (4)
    pub trigger_type: i64,
    pub variable_id: ObjectId,
}

/// An event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: ObjectId,
    pub event_type: EventType,
    pub active: bool,
    pub trigger: Option<EventTrigger>,
    pub trigger_value: Option<Value>,
    pub script: String,
    /// Remaining executions; 0 means unlimited
    pub limit: i64,
}

/// Event Store
pub struct EventStore {
    records: Records<EventEntry>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self {
            records: Records::new("Event"),
        }
    }
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, id: ObjectId, event_type: EventType) -> KernelResult<()> {
        self.records.insert(
            id,
            EventEntry {
                id,
                event_type,
                active: false,
                trigger: None,
                trigger_value: None,
                script: String::new(),
                limit: 0,
            },
        )
    }

    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        self.records.remove(id).map(|_| ())
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.records.contains(id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<Arc<EventEntry>> {
        self.records.get(id)
    }

    pub fn list(&self) -> Vec<ObjectId> {
        self.records.ids_where(|_| true)
    }

    pub fn list_by_type(&self, event_type: EventType) -> Vec<ObjectId> {
        self.records.ids_where(|event| event.event_type == event_type)
    }

    pub fn set_active(&self, id: ObjectId, active: bool) -> KernelResult<()> {
        self.records.update(id, |event| {
            event.active = active;
            Ok(())
        })
    }

    pub fn set_trigger(&self, id: ObjectId, trigger_type: i64, variable_id: ObjectId) -> KernelResult<()> {
        if !(0..=4).contains(&trigger_type) {
            return Err(KernelError::UnsupportedType {
                kind: "EventTriggerType",
                code: trigger_type,
            });
        }
        self.records.update(id, |event| {
            if event.event_type != EventType::Trigger {
                return Err(KernelError::invalid(format!(
                    "event #{} is not a trigger event",
                    id
                )));
            }
            event.trigger = Some(EventTrigger {
                trigger_type,
                variable_id,
            });
            Ok(())
        })
    }

    pub fn set_trigger_value(&self, id: ObjectId, value: Value) -> KernelResult<()> {
        self.records.update(id, |event| {
            event.trigger_value = Some(value);
            Ok(())
        })
    }

    pub fn set_script(&self, id: ObjectId, script: &str) -> KernelResult<()> {
        self.records.update(id, |event| {
            event.script = script.to_string();
            Ok(())
        })
    }

    pub fn set_limit(&self, id: ObjectId, limit: i64) -> KernelResult<()> {
        self.records.update(id, |event| {
            event.limit = limit;
            Ok(())
        })
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
