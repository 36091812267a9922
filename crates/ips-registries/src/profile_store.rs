//! Profile Store
//!
//! Named formatting rule sets. Associations of numeric and boolean profiles
//! are kept sorted by value; string profiles keep insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

use ips_core::{KernelError, KernelResult, Value, VariableType};

/// One value -> label mapping of a profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileAssociation {
    pub value: Value,
    pub name: String,
    pub icon: String,
    pub color: i64,
}

/// A variable profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableProfile {
    pub name: String,
    pub profile_type: VariableType,
    pub icon: String,
    pub prefix: String,
    pub suffix: String,
    pub min_value: f64,
    pub max_value: f64,
    pub step_size: f64,
    pub digits: i32,
    pub read_only: bool,
    pub associations: Vec<ProfileAssociation>,
}

impl VariableProfile {
    pub fn new(name: impl Into<String>, profile_type: VariableType) -> Self {
        Self {
            name: name.into(),
            profile_type,
            icon: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            min_value: 0.0,
            max_value: 0.0,
            step_size: 0.0,
            digits: 0,
            read_only: false,
            associations: Vec::new(),
        }
    }

    /// Mark as system profile that cannot be edited
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_text(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.suffix = suffix.into();
        self
    }

    pub fn with_values(mut self, min_value: f64, max_value: f64, step_size: f64) -> Self {
        self.min_value = min_value;
        self.max_value = max_value;
        self.step_size = step_size;
        self
    }

    pub fn with_association(mut self, value: impl Into<Value>, name: impl Into<String>) -> Self {
        self.associations.push(ProfileAssociation {
            value: value.into(),
            name: name.into(),
            icon: String::new(),
            color: -1,
        });
        self.sort_associations();
        self
    }

    fn is_sorted_type(&self) -> bool {
        self.profile_type != VariableType::String
    }

    fn sort_associations(&mut self) {
        if self.is_sorted_type() {
            self.associations.sort_by(|a, b| compare_numeric(&a.value, &b.value));
        }
    }

    /// Bring an association value into the profile's type
    ///
    /// Integer values are widened for float profiles; everything else must
    /// match exactly.
    fn association_value(&self, value: Value) -> KernelResult<Value> {
        match (self.profile_type, value) {
            (VariableType::Float, Value::Integer(v)) => Ok(Value::Float(v as f64)),
            (_, value) => {
                value.check_type(&format!("Association of profile '{}'", self.name), self.profile_type)?;
                Ok(value)
            }
        }
    }

    fn position_of(&self, value: &Value) -> Option<usize> {
        self.associations.iter().position(|a| &a.value == value)
    }
}

fn compare_numeric(a: &Value, b: &Value) -> Ordering {
    match (a.numeric(), b.numeric()) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Profile Store
///
/// Uses IndexMap + RwLock so listing follows creation order.
#[derive(Default)]
pub struct ProfileStore {
    by_name: RwLock<IndexMap<String, Arc<VariableProfile>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<VariableProfile>>> {
        self.by_name.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<VariableProfile>>> {
        self.by_name.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create an empty, editable profile
    pub fn create(&self, name: &str, profile_type: VariableType) -> KernelResult<()> {
        if name.is_empty() {
            return Err(KernelError::invalid("profile name cannot be empty"));
        }
        self.insert(VariableProfile::new(name, profile_type))
    }

    /// Insert a fully built profile (used for system presets)
    pub fn insert(&self, profile: VariableProfile) -> KernelResult<()> {
        let mut idx = self.write();
        if idx.contains_key(&profile.name) {
            return Err(KernelError::already_exists("Profile", &profile.name));
        }
        debug!("Created {} profile '{}'", profile.profile_type, profile.name);
        idx.insert(profile.name.clone(), Arc::new(profile));
        Ok(())
    }

    pub fn delete(&self, name: &str) -> KernelResult<()> {
        self.write()
            .shift_remove(name)
            .map(|_| debug!("Deleted profile '{}'", name))
            .ok_or_else(|| KernelError::not_found("Profile", name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    pub fn get(&self, name: &str) -> KernelResult<Arc<VariableProfile>> {
        self.read()
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::not_found("Profile", name))
    }

    pub fn list(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn list_by_type(&self, profile_type: VariableType) -> Vec<String> {
        self.read()
            .values()
            .filter(|profile| profile.profile_type == profile_type)
            .map(|profile| profile.name.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn update<F>(&self, name: &str, f: F) -> KernelResult<()>
    where
        F: FnOnce(&mut VariableProfile) -> KernelResult<()>,
    {
        let mut idx = self.write();
        let slot = idx
            .get_mut(name)
            .ok_or_else(|| KernelError::not_found("Profile", name))?;
        if slot.read_only {
            return Err(KernelError::invalid(format!("profile '{}' is read-only", name)));
        }
        let mut profile = (**slot).clone();
        f(&mut profile)?;
        *slot = Arc::new(profile);
        Ok(())
    }

    pub fn set_text(&self, name: &str, prefix: &str, suffix: &str) -> KernelResult<()> {
        self.update(name, |profile| {
            profile.prefix = prefix.to_string();
            profile.suffix = suffix.to_string();
            Ok(())
        })
    }

    pub fn set_values(&self, name: &str, min_value: f64, max_value: f64, step_size: f64) -> KernelResult<()> {
        self.update(name, |profile| {
            profile.min_value = min_value;
            profile.max_value = max_value;
            profile.step_size = step_size;
            Ok(())
        })
    }

    pub fn set_digits(&self, name: &str, digits: i32) -> KernelResult<()> {
        if digits < 0 {
            return Err(KernelError::invalid("digits cannot be negative"));
        }
        self.update(name, |profile| {
            profile.digits = digits;
            Ok(())
        })
    }

    pub fn set_icon(&self, name: &str, icon: &str) -> KernelResult<()> {
        self.update(name, |profile| {
            profile.icon = icon.to_string();
            Ok(())
        })
    }

    /// Add, update or (with empty label and icon) remove an association
    pub fn set_association(
        &self,
        name: &str,
        value: Value,
        label: &str,
        icon: &str,
        color: i64,
    ) -> KernelResult<()> {
        self.update(name, |profile| {
            let value = profile.association_value(value)?;
            let position = profile.position_of(&value);

            if label.is_empty() && icon.is_empty() {
                let Some(position) = position else {
                    warn!("Cannot find association for deletion with value {}", value);
                    return Err(KernelError::not_found("Association", &value));
                };
                profile.associations.remove(position);
                return Ok(());
            }

            match position {
                Some(position) => {
                    let association = &mut profile.associations[position];
                    association.name = label.to_string();
                    association.icon = icon.to_string();
                    association.color = color;
                }
                None => {
                    profile.associations.push(ProfileAssociation {
                        value,
                        name: label.to_string(),
                        icon: icon.to_string(),
                        color,
                    });
                    profile.sort_associations();
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ips_core::ErrorKind;

    fn labels(store: &ProfileStore, name: &str) -> Vec<String> {
        store
            .get(name)
            .unwrap()
            .associations
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    #[test]
    fn test_create_and_duplicate() {
        let store = ProfileStore::new();
        store.create("Temp", VariableType::Float).unwrap();
        assert!(store.exists("Temp"));
        assert_eq!(
            store.create("Temp", VariableType::Float).unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(store.list_by_type(VariableType::Float), vec!["Temp"]);
        store.delete("Temp").unwrap();
        assert_eq!(store.get("Temp").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_numeric_associations_sorted() {
        let store = ProfileStore::new();
        store.create("Level", VariableType::Integer).unwrap();
        store.set_association("Level", Value::Integer(10), "High", "", -1).unwrap();
        store.set_association("Level", Value::Integer(0), "Low", "", -1).unwrap();
        store.set_association("Level", Value::Integer(5), "Mid", "", -1).unwrap();
        assert_eq!(labels(&store, "Level"), vec!["Low", "Mid", "High"]);

        // update in place
        store.set_association("Level", Value::Integer(5), "Medium", "Gauge", 0xFF).unwrap();
        assert_eq!(labels(&store, "Level"), vec!["Low", "Medium", "High"]);

        // delete
        store.set_association("Level", Value::Integer(0), "", "", -1).unwrap();
        assert_eq!(labels(&store, "Level"), vec!["Medium", "High"]);
        assert_eq!(
            store
                .set_association("Level", Value::Integer(42), "", "", -1)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_string_associations_keep_order() {
        let store = ProfileStore::new();
        store.create("Mode", VariableType::String).unwrap();
        store.set_association("Mode", "z".into(), "Zulu", "", -1).unwrap();
        store.set_association("Mode", "a".into(), "Alpha", "", -1).unwrap();
        assert_eq!(labels(&store, "Mode"), vec!["Zulu", "Alpha"]);
    }

    #[test]
    fn test_association_type_checked() {
        let store = ProfileStore::new();
        store.create("Switch", VariableType::Boolean).unwrap();
        assert_eq!(
            store
                .set_association("Switch", Value::Integer(1), "An", "", -1)
                .unwrap_err()
                .kind(),
            ErrorKind::TypeMismatch
        );
        store.set_association("Switch", true.into(), "An", "", -1).unwrap();
        store.set_association("Switch", false.into(), "Aus", "", -1).unwrap();
        assert_eq!(labels(&store, "Switch"), vec!["Aus", "An"]);

        store.create("Factor", VariableType::Float).unwrap();
        store.set_association("Factor", Value::Integer(2), "Two", "", -1).unwrap();
        assert_eq!(
            store.get("Factor").unwrap().associations[0].value,
            Value::Float(2.0)
        );
    }

    #[test]
    fn test_read_only_profiles() {
        let store = ProfileStore::new();
        store
            .insert(VariableProfile::new("~Battery", VariableType::Boolean).read_only())
            .unwrap();
        assert_eq!(
            store.set_icon("~Battery", "Battery").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_text_values_digits() {
        let store = ProfileStore::new();
        store.create("Percent", VariableType::Integer).unwrap();
        store.set_text("Percent", "", " %").unwrap();
        store.set_values("Percent", 0.0, 255.0, 1.0).unwrap();
        store.set_digits("Percent", 1).unwrap();
        let profile = store.get("Percent").unwrap();
        assert_eq!(profile.suffix, " %");
        assert_eq!(profile.max_value, 255.0);
        assert_eq!(profile.digits, 1);
        assert!(store.set_digits("Percent", -1).is_err());
    }
}
