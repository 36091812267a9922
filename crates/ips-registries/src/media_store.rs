//! Media Store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use ips_core::{KernelResult, MediaType, ObjectId};

use crate::records::Records;

/// A media record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: ObjectId,
    pub media_type: MediaType,
    pub file: String,
    /// Base64 payload as handed over by the caller
    pub content: String,
    pub size: usize,
    pub is_available: bool,
    pub is_cached: bool,
    pub updated: Option<DateTime<Utc>>,
}

/// Media Store
pub struct MediaStore {
    records: Records<MediaEntry>,
}

impl Default for MediaStore {
    fn default() -> Self {
        Self {
            records: Records::new("Media"),
        }
    }
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, id: ObjectId, media_type: MediaType) -> KernelResult<()> {
        self.records.insert(
            id,
            MediaEntry {
                id,
                media_type,
                file: String::new(),
                content: String::new(),
                size: 0,
                is_available: false,
                is_cached: false,
                updated: None,
            },
        )
    }

    pub fn delete(&self, id: ObjectId) -> KernelResult<()> {
        self.records.remove(id).map(|_| ())
    }

    pub fn exists(&self, id: ObjectId) -> bool {
        self.records.contains(id)
    }

    pub fn get(&self, id: ObjectId) -> KernelResult<Arc<MediaEntry>> {
        self.records.get(id)
    }

    pub fn list(&self) -> Vec<ObjectId> {
        self.records.ids_where(|_| true)
    }

    pub fn list_by_type(&self, media_type: MediaType) -> Vec<ObjectId> {
        self.records.ids_where(|media| media.media_type == media_type)
    }

    /// Media bound to `file`, if any
    pub fn find_by_file(&self, file: &str) -> Option<ObjectId> {
        self.records
            .ids_where(|media| media.file == file)
            .into_iter()
            .next()
    }

    pub fn set_file(&self, id: ObjectId, file: &str, now: DateTime<Utc>) -> KernelResult<()> {
        self.records.update(id, |media| {
            media.file = file.to_string();
            media.updated = Some(now);
            Ok(())
        })
    }

    pub fn content(&self, id: ObjectId) -> KernelResult<String> {
        Ok(self.records.get(id)?.content.clone())
    }

    pub fn set_content(&self, id: ObjectId, content: &str, now: DateTime<Utc>) -> KernelResult<()> {
        self.records.update(id, |media| {
            media.content = content.to_string();
            media.size = content.len();
            media.is_available = true;
            media.updated = Some(now);
            Ok(())
        })
    }

    pub fn set_cached(&self, id: ObjectId, is_cached: bool) -> KernelResult<()> {
        self.records.update(id, |media| {
            media.is_cached = is_cached;
            Ok(())
        })
    }

    pub fn clear(&self) {
        self.records.clear();
    }
}
