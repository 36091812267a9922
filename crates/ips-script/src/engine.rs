//! Script engine
//!
//! Cleans script text, forwards it to the injected executor and tracks the
//! named semaphores scripts use for mutual exclusion.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, instrument};

use ips_core::{KernelError, KernelResult};

use crate::executor::{RecordingExecutor, ScriptExecutor, ScriptParameters};

const SCRIPT_MARKERS: [&str; 3] = ["<?php", "<?", "?>"];

/// Remove the opening and closing script tags from `text`
pub fn strip_markers(text: &str) -> String {
    SCRIPT_MARKERS
        .iter()
        .fold(text.to_string(), |text, marker| text.replace(marker, ""))
}

/// Script Engine
pub struct ScriptEngine<H: ?Sized> {
    executor: RwLock<Arc<dyn ScriptExecutor<H>>>,
    semaphores: Mutex<HashSet<String>>,
}

impl<H: ?Sized + 'static> Default for ScriptEngine<H> {
    fn default() -> Self {
        Self::new(Arc::new(RecordingExecutor::new()))
    }
}

impl<H: ?Sized + 'static> ScriptEngine<H> {
    pub fn new(executor: Arc<dyn ScriptExecutor<H>>) -> Self {
        Self {
            executor: RwLock::new(executor),
            semaphores: Mutex::new(HashSet::new()),
        }
    }

    /// Replace the executor used for subsequent runs
    pub fn set_executor(&self, executor: Arc<dyn ScriptExecutor<H>>) {
        *self.executor.write().unwrap_or_else(PoisonError::into_inner) = executor;
    }

    pub fn executor(&self) -> Arc<dyn ScriptExecutor<H>> {
        Arc::clone(&self.executor.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Run script text and return its output
    #[instrument(skip(self, host, text, parameters))]
    pub fn run_text_wait(
        &self,
        host: &H,
        text: &str,
        parameters: &ScriptParameters,
    ) -> KernelResult<String> {
        let source = strip_markers(text);
        debug!("Running script ({} bytes, {} parameters)", source.len(), parameters.len());
        // The executor may call back into the engine
        let executor = self.executor();
        executor.execute(host, &source, parameters)
    }

    /// Take the semaphore `name`; false when it is already held
    ///
    /// Runs are synchronous, so waiting would never succeed and the timeout
    /// is not used.
    pub fn semaphore_enter(&self, name: &str, _milliseconds: u64) -> bool {
        self.semaphores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string())
    }

    /// Release the semaphore `name`; releasing a free semaphore is fine
    pub fn semaphore_leave(&self, name: &str) -> bool {
        self.semaphores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        true
    }

    pub fn script_thread_exists(&self, _thread_id: i64) -> KernelResult<bool> {
        Err(KernelError::not_implemented("script threads"))
    }

    pub fn get_script_thread(&self, _thread_id: i64) -> KernelResult<serde_json::Value> {
        Err(KernelError::not_implemented("script threads"))
    }

    pub fn get_script_thread_list(&self) -> KernelResult<Vec<i64>> {
        Err(KernelError::not_implemented("script threads"))
    }

    /// Release all semaphores
    pub fn reset(&self) {
        self.semaphores
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
