//! Core types for the kernel emulation
//!
//! This crate provides the fundamental types used throughout the workspace:
//! object identities and kinds, the tagged `Value`, the `KernelError`
//! taxonomy and the injectable `Clock`.

mod clock;
mod error;
mod ids;
mod value;

pub mod constants;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorKind, KernelError, KernelResult};
pub use ids::{EventType, MediaType, ModuleType, ObjectId, ObjectType, ScriptType, VariableType};
pub use value::Value;
