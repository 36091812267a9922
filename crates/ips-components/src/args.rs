//! Argument extraction for exposed module functions
//!
//! Types were already checked against the function signature; these
//! helpers only guard against short argument lists.

use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use ips_core::{KernelError, KernelResult, ObjectId};

pub(crate) fn arg<'a>(args: &'a [Json], index: usize, name: &str) -> KernelResult<&'a Json> {
    args.get(index)
        .ok_or_else(|| KernelError::invalid(format!("missing argument {}", name)))
}

pub(crate) fn int_arg(args: &[Json], index: usize, name: &str) -> KernelResult<i64> {
    arg(args, index, name)?
        .as_i64()
        .ok_or_else(|| KernelError::invalid(format!("argument {} must be an integer", name)))
}

pub(crate) fn id_arg(args: &[Json], index: usize, name: &str) -> KernelResult<ObjectId> {
    let raw = int_arg(args, index, name)?;
    u32::try_from(raw)
        .map(ObjectId::new)
        .map_err(|_| KernelError::invalid(format!("argument {} is not an object id: {}", name, raw)))
}

pub(crate) fn bool_arg(args: &[Json], index: usize, name: &str) -> KernelResult<bool> {
    arg(args, index, name)?
        .as_bool()
        .ok_or_else(|| KernelError::invalid(format!("argument {} must be a boolean", name)))
}

pub(crate) fn str_arg<'a>(args: &'a [Json], index: usize, name: &str) -> KernelResult<&'a str> {
    arg(args, index, name)?
        .as_str()
        .ok_or_else(|| KernelError::invalid(format!("argument {} must be a string", name)))
}

pub(crate) fn list_arg<T: DeserializeOwned>(args: &[Json], index: usize, name: &str) -> KernelResult<Vec<T>> {
    serde_json::from_value(arg(args, index, name)?.clone())
        .map_err(|e| KernelError::invalid(format!("argument {}: {}", name, e)))
}

/// Serialize a function result
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> KernelResult<Json> {
    serde_json::to_value(value).map_err(|e| KernelError::invariant(format!("cannot encode result: {}", e)))
}
