//! Identity-keyed record map shared by the simple entity stores

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use ips_core::{KernelError, KernelResult, ObjectId};

pub(crate) struct Records<T> {
    kind: &'static str,
    by_id: DashMap<ObjectId, Arc<T>>,
}

impl<T: Clone> Records<T> {
    pub(crate) fn new(kind: &'static str) -> Self {
        Self {
            kind,
            by_id: DashMap::new(),
        }
    }

    pub(crate) fn insert(&self, id: ObjectId, record: T) -> KernelResult<()> {
        if self.by_id.contains_key(&id) {
            return Err(KernelError::already_exists(self.kind, id));
        }
        self.by_id.insert(id, Arc::new(record));
        debug!("Created {} {}", self.kind, id);
        Ok(())
    }

    pub(crate) fn remove(&self, id: ObjectId) -> KernelResult<Arc<T>> {
        self.by_id
            .remove(&id)
            .map(|(_, record)| {
                debug!("Deleted {} {}", self.kind, id);
                record
            })
            .ok_or_else(|| KernelError::not_found(self.kind, id))
    }

    pub(crate) fn contains(&self, id: ObjectId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub(crate) fn get(&self, id: ObjectId) -> KernelResult<Arc<T>> {
        self.by_id
            .get(&id)
            .map(|record| Arc::clone(record.value()))
            .ok_or_else(|| KernelError::not_found(self.kind, id))
    }

    /// Identities of matching records, ascending
    pub(crate) fn ids_where<P>(&self, predicate: P) -> Vec<ObjectId>
    where
        P: Fn(&T) -> bool,
    {
        let mut ids: Vec<ObjectId> = self
            .by_id
            .iter()
            .filter(|record| predicate(record.value()))
            .map(|record| *record.key())
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn clear(&self) {
        self.by_id.clear();
    }

    /// Copy-on-write update; nothing is stored when `f` fails
    pub(crate) fn update<F, R>(&self, id: ObjectId, f: F) -> KernelResult<R>
    where
        F: FnOnce(&mut T) -> KernelResult<R>,
    {
        let mut slot = self
            .by_id
            .get_mut(&id)
            .ok_or_else(|| KernelError::not_found(self.kind, id))?;
        let mut record = (**slot).clone();
        let result = f(&mut record)?;
        *slot = Arc::new(record);
        Ok(result)
    }
}
