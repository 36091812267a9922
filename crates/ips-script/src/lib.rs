//! Script Shim
//!
//! This crate provides the script side of the kernel emulation. Script
//! text is never interpreted here; it is cleaned and handed to an injected
//! [`ScriptExecutor`].
//!
//! # Key Types
//!
//! - [`ScriptExecutor`] - runs script source for a host
//! - [`ScriptEngine`] - marker stripping, executor injection, semaphores
//! - [`ActionPool`] - action definitions loaded from JSON folders

pub mod action_pool;
pub mod engine;
pub mod executor;

pub use action_pool::ActionPool;
pub use engine::{strip_markers, ScriptEngine};
pub use executor::{FnExecutor, RecordingExecutor, ScriptCall, ScriptExecutor, ScriptParameters};
