//! Link Store

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ips_core::{KernelResult, ObjectId};

use crate::records::Records;

/// A link record pointing at another object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub id: ObjectId,
    pub target_id: ObjectId,
}

/// Link Store
pub struct LinkStore {
    records: Records<LinkEntry>,
}

impl Default for LinkStore {
    fn default() -> Self {
        Self {
            records: Records::new("Link"),
        }
    }
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link that does not point anywhere yet (target = root)
    pub fn create(&self, id: ObjectId) -> KernelResult<()> {
        self.records.insert(
            id,
            LinkEntry {
                id,
                target_id: ObjectId::ROOT,
            },
        )
    }

    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        self.records.remove(id).map(|_| ())
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.records.contains(id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<Arc<LinkEntry>> {
        self.records.get(id)
    }

    pub fn list(&self) -> Vec<ObjectId> {
        self.records.ids_where(|_| true)
    }

    /// Links pointing at `target_id`
    pub fn list_by_target(&self, target_id: ObjectId) -> Vec<ObjectId> {
        self.records.ids_where(|link| link.target_id == target_id)
    }

    pub fn set_target(&self, id: ObjectId, target_id: ObjectId) -> KernelResult<()> {
        self.records.update(id, |link| {
            link.target_id = target_id;
            Ok(())
        })
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
