//! Per-instance runtime state
//!
//! Everything a module keeps on the host side: properties with their
//! pending/current staging, attributes, timers, buffers, data filters,
//! references and message registrations. The kernel keeps one
//! `ModuleState` per instance next to the module object itself.

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use ips_core::{KernelError, KernelResult, ObjectId, Value, VariableType};

/// A configuration slot with pending/current staging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub value_type: VariableType,
    pub default: Value,
    pub current: Value,
    pub pending: Value,
}

/// A runtime value written directly by the module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub value_type: VariableType,
    pub default: Value,
    pub current: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timer {
    pub interval_ms: i64,
    pub started: DateTime<Utc>,
    pub script: String,
}

impl Timer {
    /// Remaining milliseconds until the timer fires at `now`
    pub fn remaining_ms(&self, now: DateTime<Utc>) -> i64 {
        self.interval_ms - (now - self.started).num_milliseconds()
    }
}

#[derive(Debug, Default)]
pub struct ModuleState {
    properties: IndexMap<String, Property>,
    attributes: IndexMap<String, Attribute>,
    timers: IndexMap<String, Timer>,
    buffers: IndexMap<String, String>,
    receive_filter: String,
    forward_filter: String,
    references: IndexSet<ObjectId>,
    messages: IndexMap<ObjectId, IndexSet<i64>>,
}

impl ModuleState {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Properties ====================

    /// Register (or re-register) a property; all snapshots start at `default`
    pub fn register_property(&mut self, name: &str, default: Value) {
        self.properties.insert(
            name.to_string(),
            Property {
                value_type: default.value_type(),
                current: default.clone(),
                pending: default.clone(),
                default,
            },
        );
    }

    pub fn property(&self, name: &str) -> KernelResult<&Property> {
        self.properties
            .get(name)
            .ok_or_else(|| KernelError::not_found("Property", name))
    }

    /// Current value, checked against `expected`
    pub fn read_property(&self, name: &str, expected: VariableType) -> KernelResult<Value> {
        let property = self.property(name)?;
        property.current.check_type(&format!("Property {}", name), expected)?;
        Ok(property.current.clone())
    }

    /// Queue `value` as the pending value of `name`
    pub fn set_property(&mut self, name: &str, value: Value) -> KernelResult<()> {
        let property = self
            .properties
            .get_mut(name)
            .ok_or_else(|| KernelError::not_found("Property", name))?;
        value.check_type(&format!("Property {}", name), property.value_type)?;
        property.pending = value;
        Ok(())
    }

    pub fn has_changes(&self) -> bool {
        self.properties.values().any(|p| p.current != p.pending)
    }

    pub fn reset_changes(&mut self) {
        for property in self.properties.values_mut() {
            property.pending = property.current.clone();
        }
    }

    /// Commit every pending value
    pub fn commit_changes(&mut self) {
        for property in self.properties.values_mut() {
            property.current = property.pending.clone();
        }
    }

    /// Current values of all properties as a JSON object
    pub fn configuration(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .properties
            .iter()
            .map(|(name, p)| (name.clone(), p.current.to_json()))
            .collect();
        serde_json::Value::Object(map).to_string()
    }

    /// Queue values from a JSON object; unknown names are ignored
    ///
    /// Nothing is queued when any known value has the wrong type.
    pub fn set_configuration(&mut self, json: &str) -> KernelResult<()> {
        let parsed: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| KernelError::invalid(format!("Cannot parse configuration json: {}", e)))?;
        let object = parsed
            .as_object()
            .ok_or_else(|| KernelError::invalid("configuration must be a JSON object"))?;

        let mut updates = Vec::new();
        for (name, json) in object {
            if let Some(property) = self.properties.get(name) {
                updates.push((
                    name.clone(),
                    Value::from_json(&format!("Property {}", name), property.value_type, json)?,
                ));
            }
        }
        for (name, value) in updates {
            if let Some(property) = self.properties.get_mut(&name) {
                property.pending = value;
            }
        }
        Ok(())
    }

    // ==================== Attributes ====================

    pub fn register_attribute(&mut self, name: &str, default: Value) {
        self.attributes.insert(
            name.to_string(),
            Attribute {
                value_type: default.value_type(),
                current: default.clone(),
                default,
            },
        );
    }

    pub fn read_attribute(&self, name: &str, expected: VariableType) -> KernelResult<Value> {
        let attribute = self
            .attributes
            .get(name)
            .ok_or_else(|| KernelError::not_found("Attribute", name))?;
        attribute
            .current
            .check_type(&format!("Attribute {}", name), expected)?;
        Ok(attribute.current.clone())
    }

    pub fn write_attribute(&mut self, name: &str, value: Value) -> KernelResult<()> {
        let attribute = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| KernelError::not_found("Attribute", name))?;
        value.check_type(&format!("Attribute {}", name), attribute.value_type)?;
        attribute.current = value;
        Ok(())
    }

    // ==================== Timers ====================

    pub fn register_timer(&mut self, ident: &str, interval_ms: i64, script: &str, now: DateTime<Utc>) {
        self.timers.insert(
            ident.to_string(),
            Timer {
                interval_ms,
                started: now,
                script: script.to_string(),
            },
        );
    }

    /// Restart a registered timer with a new interval
    pub fn set_timer_interval(&mut self, ident: &str, interval_ms: i64, now: DateTime<Utc>) -> KernelResult<()> {
        let timer = self
            .timers
            .get_mut(ident)
            .ok_or_else(|| KernelError::not_found("Timer", ident))?;
        timer.interval_ms = interval_ms;
        timer.started = now;
        Ok(())
    }

    pub fn timer(&self, ident: &str) -> KernelResult<&Timer> {
        self.timers
            .get(ident)
            .ok_or_else(|| KernelError::not_found("Timer", ident))
    }

    // ==================== Buffers ====================

    pub fn set_buffer(&mut self, name: &str, data: &str) {
        self.buffers.insert(name.to_string(), data.to_string());
    }

    /// Buffer content; empty when never written
    pub fn buffer(&self, name: &str) -> String {
        self.buffers.get(name).cloned().unwrap_or_default()
    }

    pub fn buffer_list(&self) -> Vec<String> {
        self.buffers.keys().cloned().collect()
    }

    // ==================== Filters ====================

    pub fn receive_filter(&self) -> &str {
        &self.receive_filter
    }

    pub fn set_receive_filter(&mut self, pattern: &str) {
        self.receive_filter = pattern.to_string();
    }

    pub fn forward_filter(&self) -> &str {
        &self.forward_filter
    }

    pub fn set_forward_filter(&mut self, pattern: &str) {
        self.forward_filter = pattern.to_string();
    }

    // ==================== References & messages ====================

    pub fn register_reference(&mut self, id: ObjectId) {
        self.references.insert(id);
    }

    pub fn unregister_reference(&mut self, id: ObjectId) {
        self.references.shift_remove(&id);
    }

    pub fn references(&self) -> Vec<ObjectId> {
        self.references.iter().copied().collect()
    }

    pub fn register_message(&mut self, sender_id: ObjectId, message: i64) {
        self.messages.entry(sender_id).or_default().insert(message);
    }

    pub fn unregister_message(&mut self, sender_id: ObjectId, message: i64) {
        if let Some(messages) = self.messages.get_mut(&sender_id) {
            messages.shift_remove(&message);
            if messages.is_empty() {
                self.messages.shift_remove(&sender_id);
            }
        }
    }

    /// Registered messages per sender
    pub fn message_list(&self) -> IndexMap<ObjectId, Vec<i64>> {
        self.messages
            .iter()
            .map(|(sender, messages)| (*sender, messages.iter().copied().collect()))
            .collect()
    }
}
