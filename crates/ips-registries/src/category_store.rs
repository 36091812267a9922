//! Category Store

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ips_core::{KernelResult, ObjectId};

use crate::records::Records;

/// A category record; categories only group other objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: ObjectId,
}

/// Category Store
pub struct CategoryStore {
    records: Records<CategoryEntry>,
}

impl Default for CategoryStore {
    fn default() -> Self {
        Self {
            records: Records::new("Category"),
        }
    }
}

impl CategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, id: ObjectId) -> KernelResult<()> {
        self.records.insert(id, CategoryEntry { id })
    }

    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        self.records.remove(id).map(|_| ())
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.records.contains(id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<Arc<CategoryEntry>> {
        self.records.get(id)
    }

    pub fn list(&self) -> Vec<ObjectId> {
        self.records.ids_where(|_| true)
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
