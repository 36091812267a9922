//! Script executors
//!
//! The kernel never interprets script text itself. A `ScriptExecutor` is
//! injected and receives the cleaned source together with the parameters
//! the kernel wants to expose (`SELF`, `VARIABLE`, `VALUE`, `SENDER`,
//! `TARGET`, ...). `H` is the host the script runs against, usually the
//! kernel, so executors can call back into it.

use indexmap::IndexMap;
use std::sync::{Mutex, PoisonError};

use ips_core::{KernelResult, Value};

/// Named parameters handed to a script run, in insertion order
pub type ScriptParameters = IndexMap<String, Value>;

/// Runs script source and returns its output
pub trait ScriptExecutor<H: ?Sized>: Send + Sync {
    fn execute(&self, host: &H, source: &str, parameters: &ScriptParameters) -> KernelResult<String>;
}

/// One recorded execution
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptCall {
    pub source: String,
    pub parameters: ScriptParameters,
}

/// Executor that records every run and answers with a fixed output
///
/// This is the default executor of a fresh engine.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    output: Mutex<String>,
    calls: Mutex<Vec<ScriptCall>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(output: impl Into<String>) -> Self {
        Self {
            output: Mutex::new(output.into()),
            calls: Mutex::default(),
        }
    }

    pub fn set_output(&self, output: impl Into<String>) {
        *self.output.lock().unwrap_or_else(PoisonError::into_inner) = output.into();
    }

    /// Recorded runs, oldest first
    pub fn calls(&self) -> Vec<ScriptCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_call(&self) -> Option<ScriptCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<H: ?Sized> ScriptExecutor<H> for RecordingExecutor {
    fn execute(&self, _host: &H, source: &str, parameters: &ScriptParameters) -> KernelResult<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ScriptCall {
                source: source.to_string(),
                parameters: parameters.clone(),
            });
        Ok(self
            .output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Executor backed by a closure
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<H, F> ScriptExecutor<H> for FnExecutor<F>
where
    H: ?Sized,
    F: Fn(&H, &str, &ScriptParameters) -> KernelResult<String> + Send + Sync,
{
    fn execute(&self, host: &H, source: &str, parameters: &ScriptParameters) -> KernelResult<String> {
        (self.f)(host, source, parameters)
    }
}
