//! Debug server
//!
//! Collects `SendDebug` output per sender. Every message is recorded; it is
//! echoed only while a debug window opened with [`DebugServer::enable`] is
//! still running.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::fmt::Write;
use tracing::info;

use ips_core::ObjectId;

/// Format code for binary payloads, echoed hex-encoded
pub const FORMAT_BINARY: i32 = 1;

/// A recorded debug message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DebugMessage {
    pub message: String,
    pub data: String,
    pub format: i32,
}

#[derive(Default)]
pub struct DebugServer {
    /// Sender -> end of its debug window
    windows: DashMap<ObjectId, DateTime<Utc>>,
    messages: DashMap<ObjectId, Vec<DebugMessage>>,
}

impl DebugServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a debug window of `seconds` for `id`
    pub fn enable(&self, id: ObjectId, seconds: i64, now: DateTime<Utc>) {
        self.windows.insert(id, now + Duration::seconds(seconds));
    }

    pub fn disable(&self, id: ObjectId) {
        self.windows.insert(id, DateTime::<Utc>::UNIX_EPOCH);
    }

    pub fn is_enabled(&self, id: ObjectId, now: DateTime<Utc>) -> bool {
        self.windows.get(&id).is_some_and(|until| now <= *until)
    }

    /// Record a message; returns the echoed line when the window is open
    pub fn send(
        &self,
        id: ObjectId,
        message: &str,
        data: &str,
        format: i32,
        now: DateTime<Utc>,
    ) -> Option<String> {
        self.messages.entry(id).or_default().push(DebugMessage {
            message: message.to_string(),
            data: data.to_string(),
            format,
        });

        if !self.is_enabled(id, now) {
            return None;
        }

        let data = if format == FORMAT_BINARY {
            hex_encode(data.as_bytes())
        } else {
            data.to_string()
        };
        let line = format!("DEBUG: {} | {}", message, data);
        info!(sender = %id, "{}", line);
        Some(line)
    }

    /// Messages recorded for `id`, oldest first
    pub fn messages(&self, id: ObjectId) -> Vec<DebugMessage> {
        self.messages
            .get(&id)
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        self.windows.clear();
        self.messages.clear();
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{:02x}", b);
        out
    })
}
