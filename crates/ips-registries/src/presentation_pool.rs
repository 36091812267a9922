//! Presentation Pool
//!
//! Catalogue of presentation descriptors keyed by GUID. The kernel starts
//! with an empty pool; tests register what they need.

use indexmap::IndexMap;
use std::sync::{PoisonError, RwLock};

use ips_core::{KernelError, KernelResult};

pub type PresentationRecord = serde_json::Map<String, serde_json::Value>;

#[derive(Default)]
pub struct PresentationPool {
    by_guid: RwLock<IndexMap<String, PresentationRecord>>,
}

impl PresentationPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, guid: &str, record: PresentationRecord) {
        self.by_guid
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(guid.to_string(), record);
    }

    pub fn exists(&self, guid: &str) -> bool {
        self.by_guid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(guid)
    }

    pub fn get(&self, guid: &str) -> KernelResult<PresentationRecord> {
        self.by_guid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(guid)
            .cloned()
            .ok_or_else(|| KernelError::not_found("Presentation", guid))
    }

    /// All presentations as one JSON object keyed by GUID
    pub fn list_json(&self) -> String {
        let idx = self.by_guid.read().unwrap_or_else(PoisonError::into_inner);
        let map: serde_json::Map<String, serde_json::Value> = idx
            .iter()
            .map(|(guid, record)| (guid.clone(), serde_json::Value::Object(record.clone())))
            .collect();
        serde_json::Value::Object(map).to_string()
    }

    pub fn default_parameters(&self, _guid: &str) -> KernelResult<PresentationRecord> {
        Err(KernelError::not_implemented("presentation default parameters"))
    }

    pub fn form(&self, _guid: &str) -> KernelResult<String> {
        Err(KernelError::not_implemented("presentation form"))
    }

    pub fn clear(&self) {
        self.by_guid
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ips_core::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_register_and_list() {
        let pool = PresentationPool::new();
        assert_eq!(pool.list_json(), "{}");
        let record = json!({"caption": "Switch"}).as_object().unwrap().clone();
        pool.register("{SWITCH}", record);
        assert!(pool.exists("{SWITCH}"));
        assert_eq!(pool.get("{SWITCH}").unwrap()["caption"], json!("Switch"));
        assert_eq!(pool.list_json(), r#"{"{SWITCH}":{"caption":"Switch"}}"#);
        assert_eq!(pool.get("{NOPE}").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(
            pool.form("{SWITCH}").unwrap_err().kind(),
            ErrorKind::NotImplemented
        );
    }
}
