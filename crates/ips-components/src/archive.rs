//! Archive Control
//!
//! Keeps logged values per variable and aggregated values per variable and
//! span. Archives are append-only in time: a batch may not start before the
//! newest stored entry, and stored data is never reordered.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

use ips_core::{KernelError, KernelResult, ObjectId};
use ips_kernel::{FunctionSignature, Module, ModuleClass, ModuleContext, ParameterType};

use crate::args::{bool_arg, id_arg, int_arg, list_arg, to_json};

pub const ARCHIVE_CONTROL_ID: &str = "{43192F0B-135B-4CE7-A0A7-1475603F3060}";

/// Upper bound (and default) of returned entries per query
pub const MAX_LIMIT: usize = 10_000;

/// A stored archive record
///
/// Only `TimeStamp` is interpreted; every other field (`Value`, `Avg`,
/// `Duration`, ...) is kept as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    #[serde(rename = "TimeStamp")]
    pub timestamp: i64,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Json>,
}

impl ArchiveEntry {
    /// Logged value
    pub fn logged(timestamp: i64, value: impl Into<Json>) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("Value".to_string(), value.into());
        Self { timestamp, fields }
    }

    /// Aggregated value covering `duration` seconds
    pub fn aggregated(timestamp: i64, duration: i64, avg: f64, min: f64, max: f64) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("Duration".to_string(), duration.into());
        fields.insert("Avg".to_string(), avg.into());
        fields.insert("Min".to_string(), min.into());
        fields.insert("Max".to_string(), max.into());
        Self { timestamp, fields }
    }

    pub fn duration(&self) -> Option<i64> {
        self.fields.get("Duration").and_then(Json::as_i64)
    }
}

/// Aggregation span (`AggregationLevel`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AggregationSpan {
    Hourly = 0,
    Daily = 1,
    Weekly = 2,
    Monthly = 3,
    Yearly = 4,
    FiveMinutes = 5,
    OneMinute = 6,
}

impl TryFrom<i64> for AggregationSpan {
    type Error = KernelError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        Ok(match level {
            0 => AggregationSpan::Hourly,
            1 => AggregationSpan::Daily,
            2 => AggregationSpan::Weekly,
            3 => AggregationSpan::Monthly,
            4 => AggregationSpan::Yearly,
            5 => AggregationSpan::FiveMinutes,
            6 => AggregationSpan::OneMinute,
            other => {
                return Err(KernelError::invalid(format!(
                    "unknown aggregation level {}",
                    other
                )))
            }
        })
    }
}

/// How logged values of a variable are aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationType {
    #[default]
    Standard = 0,
    Counter = 1,
}

impl AggregationType {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for AggregationType {
    type Error = KernelError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AggregationType::Standard),
            1 => Ok(AggregationType::Counter),
            other => Err(KernelError::invalid(format!("unknown aggregation type {}", other))),
        }
    }
}

/// Summary row of `GetAggregationVariables`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AggregationVariable {
    #[serde(rename = "VariableID")]
    pub variable_id: ObjectId,
    pub aggregation_type: i64,
    pub aggregation_active: bool,
    pub record_count: usize,
    pub first_time: i64,
    pub last_time: i64,
}

#[derive(Debug, Clone, Default)]
struct VariableArchive {
    logged: bool,
    aggregation_type: AggregationType,
    values: Vec<ArchiveEntry>,
    aggregated: BTreeMap<AggregationSpan, Vec<ArchiveEntry>>,
}

impl VariableArchive {
    fn is_empty(&self) -> bool {
        self.values.is_empty() && self.aggregated.values().all(Vec::is_empty)
    }
}

/// Limit 0 or above the maximum means the maximum
fn effective_limit(limit: i64) -> usize {
    match usize::try_from(limit) {
        Ok(limit) if limit > 0 && limit <= MAX_LIMIT => limit,
        _ => MAX_LIMIT,
    }
}

/// Append a batch after sorting it; the batch may not start before `stored` ends
fn append(stored: &mut Vec<ArchiveEntry>, mut batch: Vec<ArchiveEntry>) -> KernelResult<usize> {
    batch.sort_by_key(|entry| entry.timestamp);
    if let (Some(first), Some(newest)) = (batch.first(), stored.last()) {
        if first.timestamp < newest.timestamp {
            return Err(KernelError::invariant(format!(
                "It is not yet possible to add values before the newest ({} < {})",
                first.timestamp, newest.timestamp
            )));
        }
    }
    let added = batch.len();
    stored.extend(batch);
    Ok(added)
}

/// Entries within `[start, end]`, newest first
fn select(stored: &[ArchiveEntry], start: i64, end: i64, limit: i64) -> Vec<ArchiveEntry> {
    stored
        .iter()
        .rev()
        .filter(|entry| entry.timestamp >= start && entry.timestamp <= end)
        .take(effective_limit(limit))
        .cloned()
        .collect()
}

/// Archive Store
///
/// Uses IndexMap + RwLock so `GetAggregationVariables` follows the order in
/// which variables were first archived.
#[derive(Default)]
pub struct ArchiveStore {
    archives: RwLock<IndexMap<ObjectId, VariableArchive>>,
}

impl ArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<ObjectId, VariableArchive>> {
        self.archives.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<ObjectId, VariableArchive>> {
        self.archives.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_logged_values(&self, id: ObjectId, batch: Vec<ArchiveEntry>) -> KernelResult<usize> {
        let mut archives = self.write();
        let added = append(&mut archives.entry(id).or_default().values, batch)?;
        debug!("Archived {} values of {}", added, id);
        Ok(added)
    }

    /// Append aggregated values; every entry needs a `Duration`
    pub fn add_aggregated_values(
        &self,
        id: ObjectId,
        span: AggregationSpan,
        batch: Vec<ArchiveEntry>,
    ) -> KernelResult<usize> {
        if let Some(entry) = batch.iter().find(|entry| entry.duration().is_none()) {
            return Err(KernelError::invalid(format!(
                "aggregated value at {} has no Duration",
                entry.timestamp
            )));
        }
        let mut archives = self.write();
        let stored = archives
            .entry(id)
            .or_default()
            .aggregated
            .entry(span)
            .or_default();
        let added = append(stored, batch)?;
        debug!("Archived {} {:?} aggregates of {}", added, span, id);
        Ok(added)
    }

    pub fn logged_values(&self, id: ObjectId, start: i64, end: i64, limit: i64) -> Vec<ArchiveEntry> {
        self.read()
            .get(&id)
            .map(|archive| select(&archive.values, start, end, limit))
            .unwrap_or_default()
    }

    pub fn aggregated_values(
        &self,
        id: ObjectId,
        span: AggregationSpan,
        start: i64,
        end: i64,
        limit: i64,
    ) -> Vec<ArchiveEntry> {
        self.read()
            .get(&id)
            .and_then(|archive| archive.aggregated.get(&span))
            .map(|stored| select(stored, start, end, limit))
            .unwrap_or_default()
    }

    /// Drop logged and aggregated values within `[start, end]`
    ///
    /// Returns the number of removed logged values.
    pub fn delete_variable_data(&self, id: ObjectId, start: i64, end: i64) -> usize {
        let mut archives = self.write();
        let Some(archive) = archives.get_mut(&id) else {
            return 0;
        };
        let in_range = |entry: &ArchiveEntry| entry.timestamp >= start && entry.timestamp <= end;

        let before = archive.values.len();
        archive.values.retain(|entry| !in_range(entry));
        for stored in archive.aggregated.values_mut() {
            stored.retain(|entry| !in_range(entry));
        }
        let removed = before - archive.values.len();
        debug!("Deleted {} values of {}", removed, id);
        removed
    }

    /// Move the archive of `old_id` over to `new_id`
    pub fn change_variable_id(&self, old_id: ObjectId, new_id: ObjectId) -> KernelResult<()> {
        let mut archives = self.write();
        if archives.get(&new_id).is_some_and(|archive| !archive.is_empty()) {
            return Err(KernelError::already_exists("Archive", new_id));
        }
        let archive = archives
            .shift_remove(&old_id)
            .ok_or_else(|| KernelError::not_found("Archive", old_id))?;
        archives.insert(new_id, archive);
        info!("Moved archive of {} to {}", old_id, new_id);
        Ok(())
    }

    pub fn logging_status(&self, id: ObjectId) -> bool {
        self.read().get(&id).is_some_and(|archive| archive.logged)
    }

    pub fn set_logging_status(&self, id: ObjectId, active: bool) {
        self.write().entry(id).or_default().logged = active;
    }

    pub fn aggregation_type(&self, id: ObjectId) -> AggregationType {
        self.read()
            .get(&id)
            .map(|archive| archive.aggregation_type)
            .unwrap_or_default()
    }

    pub fn set_aggregation_type(&self, id: ObjectId, aggregation_type: AggregationType) {
        self.write().entry(id).or_default().aggregation_type = aggregation_type;
    }

    /// Every variable that is logged or has archived data
    pub fn aggregation_variables(&self) -> Vec<AggregationVariable> {
        self.read()
            .iter()
            .filter(|(_, archive)| archive.logged || !archive.is_empty())
            .map(|(id, archive)| AggregationVariable {
                variable_id: *id,
                aggregation_type: archive.aggregation_type.code(),
                aggregation_active: archive.logged,
                record_count: archive.values.len(),
                first_time: archive.values.first().map_or(0, |e| e.timestamp),
                last_time: archive.values.last().map_or(0, |e| e.timestamp),
            })
            .collect()
    }

    pub fn clear(&self) {
        self.write().clear();
    }
}

// ==================== Module ====================

/// Archive Control instance
#[derive(Default)]
pub struct ArchiveControl {
    store: ArchiveStore,
}

impl ArchiveControl {
    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    pub fn class() -> ModuleClass {
        use ParameterType::{Array, Boolean, Integer};

        ModuleClass::new("ArchiveControl", ArchiveControl::default)
            .with_function(
                FunctionSignature::new("AddLoggedValues")
                    .param("VariableID", Integer)
                    .param("NewData", Array),
            )
            .with_function(
                FunctionSignature::new("AddAggregatedValues")
                    .param("VariableID", Integer)
                    .param("AggregationSpan", Integer)
                    .param("NewData", Array),
            )
            .with_function(
                FunctionSignature::new("GetLoggedValues")
                    .param("VariableID", Integer)
                    .param("StartTime", Integer)
                    .param("EndTime", Integer)
                    .param("Limit", Integer),
            )
            .with_function(
                FunctionSignature::new("GetAggregatedValues")
                    .param("VariableID", Integer)
                    .param("AggregationSpan", Integer)
                    .param("StartTime", Integer)
                    .param("EndTime", Integer)
                    .param("Limit", Integer),
            )
            .with_function(
                FunctionSignature::new("DeleteVariableData")
                    .param("VariableID", Integer)
                    .param("StartTime", Integer)
                    .param("EndTime", Integer),
            )
            .with_function(
                FunctionSignature::new("ChangeVariableID")
                    .param("OldVariableID", Integer)
                    .param("NewVariableID", Integer),
            )
            .with_function(FunctionSignature::new("GetLoggingStatus").param("VariableID", Integer))
            .with_function(
                FunctionSignature::new("SetLoggingStatus")
                    .param("VariableID", Integer)
                    .param("Active", Boolean),
            )
            .with_function(FunctionSignature::new("GetAggregationType").param("VariableID", Integer))
            .with_function(
                FunctionSignature::new("SetAggregationType")
                    .param("VariableID", Integer)
                    .param("AggregationType", Integer),
            )
            .with_function(
                FunctionSignature::new("GetAggregationVariables").param("DatabaseRequest", Boolean),
            )
            .with_function(FunctionSignature::new("GetGraphStatus").param("VariableID", Integer))
            .with_function(
                FunctionSignature::new("SetGraphStatus")
                    .param("VariableID", Integer)
                    .param("Active", Boolean),
            )
            .with_function(FunctionSignature::new("ReAggregateVariable").param("VariableID", Integer))
    }
}

fn require_variable(ctx: &ModuleContext<'_>, id: ObjectId) -> KernelResult<()> {
    if ctx.kernel().variables().exists(id) {
        Ok(())
    } else {
        Err(KernelError::not_found("Variable", id))
    }
}

impl Module for ArchiveControl {
    fn call(&self, ctx: &ModuleContext<'_>, function: &str, args: &[Json]) -> KernelResult<Json> {
        match function {
            "AddLoggedValues" => {
                let id = id_arg(args, 0, "VariableID")?;
                require_variable(ctx, id)?;
                let batch = list_arg(args, 1, "NewData")?;
                self.store.add_logged_values(id, batch)?;
                Ok(Json::Bool(true))
            }
            "AddAggregatedValues" => {
                let id = id_arg(args, 0, "VariableID")?;
                require_variable(ctx, id)?;
                let span = AggregationSpan::try_from(int_arg(args, 1, "AggregationSpan")?)?;
                let batch = list_arg(args, 2, "NewData")?;
                self.store.add_aggregated_values(id, span, batch)?;
                Ok(Json::Bool(true))
            }
            "GetLoggedValues" => to_json(&self.store.logged_values(
                id_arg(args, 0, "VariableID")?,
                int_arg(args, 1, "StartTime")?,
                int_arg(args, 2, "EndTime")?,
                int_arg(args, 3, "Limit")?,
            )),
            "GetAggregatedValues" => to_json(&self.store.aggregated_values(
                id_arg(args, 0, "VariableID")?,
                AggregationSpan::try_from(int_arg(args, 1, "AggregationSpan")?)?,
                int_arg(args, 2, "StartTime")?,
                int_arg(args, 3, "EndTime")?,
                int_arg(args, 4, "Limit")?,
            )),
            "DeleteVariableData" => Ok(Json::from(self.store.delete_variable_data(
                id_arg(args, 0, "VariableID")?,
                int_arg(args, 1, "StartTime")?,
                int_arg(args, 2, "EndTime")?,
            ))),
            "ChangeVariableID" => {
                let old_id = id_arg(args, 0, "OldVariableID")?;
                let new_id = id_arg(args, 1, "NewVariableID")?;
                require_variable(ctx, new_id)?;
                self.store.change_variable_id(old_id, new_id)?;
                Ok(Json::Bool(true))
            }
            "GetLoggingStatus" => Ok(Json::Bool(
                self.store.logging_status(id_arg(args, 0, "VariableID")?),
            )),
            "SetLoggingStatus" => {
                let id = id_arg(args, 0, "VariableID")?;
                require_variable(ctx, id)?;
                self.store.set_logging_status(id, bool_arg(args, 1, "Active")?);
                Ok(Json::Bool(true))
            }
            "GetAggregationType" => Ok(Json::from(
                self.store
                    .aggregation_type(id_arg(args, 0, "VariableID")?)
                    .code(),
            )),
            "SetAggregationType" => {
                let id = id_arg(args, 0, "VariableID")?;
                require_variable(ctx, id)?;
                let aggregation_type = AggregationType::try_from(int_arg(args, 1, "AggregationType")?)?;
                self.store.set_aggregation_type(id, aggregation_type);
                Ok(Json::Bool(true))
            }
            "GetAggregationVariables" => to_json(&self.store.aggregation_variables()),
            "GetGraphStatus" | "SetGraphStatus" | "ReAggregateVariable" => {
                Err(KernelError::not_implemented(function))
            }
            _ => Err(KernelError::not_found("Function", function)),
        }
    }
}
