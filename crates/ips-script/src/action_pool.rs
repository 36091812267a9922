//! Action Pool
//!
//! Actions are JSON documents with an `id` and an `action` body (one string
//! or a list of lines). Everything else in the document is kept as-is and
//! returned by [`ActionPool::get_actions`].

use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

use ips_config::{read_json, ConfigError};
use ips_core::{KernelError, KernelResult};

use crate::engine::ScriptEngine;
use crate::executor::ScriptParameters;

#[derive(Default)]
pub struct ActionPool {
    actions: RwLock<Vec<serde_json::Value>>,
}

impl ActionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` file of `dir`, in file name order
    pub fn load_actions(&self, dir: impl AsRef<Path>) -> KernelResult<usize> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| ConfigError::ReadFile {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut loaded = Vec::with_capacity(files.len());
        for file in &files {
            let action: serde_json::Value = read_json(file)?;
            debug!("Loaded action {} from {}", action["id"], file.display());
            loaded.push(action);
        }

        let count = loaded.len();
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(loaded);
        info!("Loaded {} actions from {}", count, dir.display());
        Ok(count)
    }

    /// All loaded actions as a JSON array
    pub fn get_actions(&self) -> String {
        serde_json::Value::Array(
            self.actions
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
        .to_string()
    }

    /// Script text of the action `action_id`
    pub fn action_text(&self, action_id: &str) -> KernelResult<String> {
        let actions = self.actions.read().unwrap_or_else(PoisonError::into_inner);
        let action = actions
            .iter()
            .find(|action| action["id"].as_str() == Some(action_id))
            .ok_or_else(|| KernelError::not_found("Action", action_id))?;

        match &action["action"] {
            serde_json::Value::String(text) => Ok(text.clone()),
            serde_json::Value::Array(lines) => Ok(lines
                .iter()
                .map(|line| line.as_str().unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\n")),
            _ => Err(KernelError::invalid(format!(
                "action {} has no script body",
                action_id
            ))),
        }
    }

    /// Run the action `action_id` through `engine` and return its output
    pub fn run_action_wait<H: ?Sized + 'static>(
        &self,
        engine: &ScriptEngine<H>,
        host: &H,
        action_id: &str,
        parameters: &ScriptParameters,
    ) -> KernelResult<String> {
        let text = self.action_text(action_id)?;
        engine.run_text_wait(host, &text, parameters)
    }

    pub fn get_actions_by_environment(
        &self,
        _id: i64,
        _environment: &str,
        _include_default: bool,
    ) -> KernelResult<String> {
        Err(KernelError::not_implemented("actions by environment"))
    }

    pub fn get_action_form(&self, _action_id: &str, _parameters: &ScriptParameters) -> KernelResult<String> {
        Err(KernelError::not_implemented("action forms"))
    }

    pub fn get_action_readable_code(
        &self,
        _action_id: &str,
        _parameters: &ScriptParameters,
    ) -> KernelResult<String> {
        Err(KernelError::not_implemented("readable action code"))
    }

    pub fn update_form_field(&self, _name: &str, _parameter: &str) -> KernelResult<()> {
        Err(KernelError::not_implemented("action form fields"))
    }

    pub fn reset(&self) {
        self.actions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RecordingExecutor, ScriptExecutor};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn make_test_actions() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a_toggle.json"),
            r#"{"id": "{TOGGLE}", "caption": "Toggle", "action": ["<?php", "IPS_Toggle($_IPS['TARGET']);"]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b_echo.json"),
            r#"{"id": "{ECHO}", "action": "echo 'x';"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("readme.txt"), "not an action").unwrap();
        dir
    }

    #[test]
    fn test_load_and_list() {
        let dir = make_test_actions();
        let pool = ActionPool::new();
        assert_eq!(pool.load_actions(dir.path()).unwrap(), 2);

        let actions: serde_json::Value = serde_json::from_str(&pool.get_actions()).unwrap();
        assert_eq!(actions[0]["id"], "{TOGGLE}");
        assert_eq!(actions[0]["caption"], "Toggle");
        assert_eq!(actions[1]["id"], "{ECHO}");

        pool.reset();
        assert_eq!(pool.get_actions(), "[]");
    }

    #[test]
    fn test_run_action_wait() {
        let dir = make_test_actions();
        let pool = ActionPool::new();
        pool.load_actions(dir.path()).unwrap();

        let recorder = Arc::new(RecordingExecutor::with_output("ran"));
        let engine: ScriptEngine<()> =
            ScriptEngine::new(recorder.clone() as Arc<dyn ScriptExecutor<()>>);

        let out = pool
            .run_action_wait(&engine, &(), "{TOGGLE}", &ScriptParameters::new())
            .unwrap();
        assert_eq!(out, "ran");
        assert_eq!(
            recorder.last_call().unwrap().source,
            "\nIPS_Toggle($_IPS['TARGET']);"
        );

        let err = pool
            .run_action_wait(&engine, &(), "{MISSING}", &ScriptParameters::new())
            .unwrap_err();
        assert_eq!(err.kind(), ips_core::ErrorKind::NotFound);
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_missing_folder() {
        let pool = ActionPool::new();
        assert!(pool.load_actions("/definitely/not/here").is_err());
    }
}
