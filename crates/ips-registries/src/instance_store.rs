//! Instance Store
//!
//! Records of module instances: module reference, status and the connection
//! to an optional parent instance. The live module objects are owned by the
//! kernel runtime, not by this store.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use ips_core::constants::status::IS_CREATING;
use ips_core::{KernelError, KernelResult, ModuleType, ObjectId};

/// Module an instance was created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRef {
    pub module_id: String,
    pub module_name: String,
    pub module_type: ModuleType,
}

/// An instance record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub id: ObjectId,
    /// Parent instance used for data routing
    pub connection_id: Option<ObjectId>,
    /// Open status code; see `ips_core::constants::status`
    pub status: i32,
    pub changed: DateTime<Utc>,
    pub module: ModuleRef,
}

/// Instance Store
///
/// Uses IndexMap + RwLock so listing follows creation order.
#[derive(Default)]
pub struct InstanceStore {
    by_id: RwLock<IndexMap<ObjectId, Arc<InstanceEntry>>>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<ObjectId, Arc<InstanceEntry>>> {
        self.by_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<ObjectId, Arc<InstanceEntry>>> {
        self.by_id.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a record in status `IS_CREATING`
    pub fn create(&self, id: ObjectId, module: ModuleRef, now: DateTime<Utc>) -> KernelResult<()> {
        let mut idx = self.write();
        if idx.contains_key(&id) {
            return Err(KernelError::already_exists("Instance", id));
        }
        debug!("Created instance {} of '{}'", id, module.module_name);
        idx.insert(
            id,
            Arc::new(InstanceEntry {
                id,
                connection_id: None,
                status: IS_CREATING,
                changed: now,
                module,
            }),
        );
        Ok(())
    }

    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        self.write()
            .shift_remove(&id)
            .map(|_| debug!("Deleted instance {}", id))
            .ok_or_else(|| KernelError::not_found("Instance", id))
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.read().contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<Arc<InstanceEntry>> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or_else(|| KernelError::not_found("Instance", id))
    }

    /// All instance identities in creation order
    pub fn list(&self) -> Vec<ObjectId> {
        self.read().keys().copied().collect()
    }

    pub fn list_by_module_id(&self, module_id: &str) -> Vec<ObjectId> {
        self.filter(|entry| entry.module.module_id == module_id)
    }

    pub fn list_by_module_type(&self, module_type: ModuleType) -> Vec<ObjectId> {
        self.filter(|entry| entry.module.module_type == module_type)
    }

    /// Instances whose connection points at `parent_id`, in creation order
    pub fn children_of(&self, parent_id: ObjectId) -> Vec<ObjectId> {
        self.filter(|entry| entry.connection_id == Some(parent_id))
    }

    fn filter<P>(&self, predicate: P) -> Vec<ObjectId>
    where
        P: Fn(&InstanceEntry) -> bool,
    {
        self.read()
            .values()
            .filter(|entry| predicate(entry))
            .map(|entry| entry.id)
            .collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn update<F>(&self, id: ObjectId, f: F) -> KernelResult<()>
    where
        F: FnOnce(&mut InstanceEntry),
    {
        let mut idx = self.write();
        let slot = idx
            .get_mut(&id)
            .ok_or_else(|| KernelError::not_found("Instance", id))?;
        let mut entry = (**slot).clone();
        f(&mut entry);
        *slot = Arc::new(entry);
        Ok(())
    }

    pub fn status(&self, id: ObjectId) -> KernelResult<i32> {
        Ok(self.get(id)?.status)
    }

    pub fn set_status(&self, id: ObjectId, status: i32, now: DateTime<Utc>) -> KernelResult<()> {
        self.update(id, |entry| {
            if entry.status != status {
                debug!("Instance {} status {} -> {}", id, entry.status, status);
                entry.status = status;
                entry.changed = now;
            }
        })
    }

    pub fn connection(&self, id: ObjectId) -> KernelResult<Option<ObjectId>> {
        Ok(self.get(id)?.connection_id)
    }

    pub fn connect(&self, id: ObjectId, parent_id: ObjectId, now: DateTime<Utc>) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.connection_id = Some(parent_id);
            entry.changed = now;
        })
    }

    pub fn disconnect(&self, id: ObjectId, now: DateTime<Utc>) -> KernelResult<()> {
        self.update(id, |entry| {
            entry.connection_id = None;
            entry.changed = now;
        })
    }
}
