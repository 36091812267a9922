//! Script Store
//!
//! Holds script text; execution is done by the script engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ips_core::{KernelResult, ObjectId, ScriptType};

use crate::records::Records;

/// Content of freshly created scripts
pub const DEFAULT_SCRIPT_CONTENT: &str =
    "<?php \n\n//Start writing your scripts between the brackets\n\n?>";

/// A script record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub id: ObjectId,
    pub script_type: ScriptType,
    pub file: String,
    pub executed: Option<DateTime<Utc>>,
    pub is_broken: bool,
    pub content: String,
}

/// Script Store
pub struct ScriptStore {
    records: Records<ScriptEntry>,
}

impl Default for ScriptStore {
    fn default() -> Self {
        Self {
            records: Records::new("Script"),
        }
    }
}

impl ScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, id: ObjectId, script_type: ScriptType) -> KernelResult<()> {
        self.records.insert(
            id,
            ScriptEntry {
                id,
                script_type,
                file: format!("{}.ips.php", id),
                executed: None,
                is_broken: false,
                content: DEFAULT_SCRIPT_CONTENT.to_string(),
            },
        )
    }

    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        self.records.remove(id).map(|_| ())
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.records.contains(id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<Arc<ScriptEntry>> {
        self.records.get(id)
    }

    pub fn list(&self) -> Vec<ObjectId> {
        self.records.ids_where(|_| true)
    }

    pub fn content(&self, id: ObjectId) -> KernelResult<String> {
        Ok(self.records.get(id)?.content.clone())
    }

    pub fn set_content(&self, id: ObjectId, content: &str) -> KernelResult<()> {
        self.records.update(id, |script| {
            script.content = content.to_string();
            script.is_broken = false;
            Ok(())
        })
    }

    pub fn file(&self, id: ObjectId) -> KernelResult<String> {
        Ok(self.records.get(id)?.file.clone())
    }

    pub fn set_file(&self, id: ObjectId, file: &str) -> KernelResult<()> {
        self.records.update(id, |script| {
            script.file = file.to_string();
            Ok(())
        })
    }

    pub fn mark_executed(&self, id: ObjectId, now: DateTime<Utc>) -> KernelResult<()> {
        self.records.update(id, |script| {
            script.executed = Some(now);
            Ok(())
        })
    }

    pub fn set_broken(&self, id: ObjectId, is_broken: bool) -> KernelResult<()> {
        self.records.update(id, |script| {
            script.is_broken = is_broken;
            Ok(())
        })
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
