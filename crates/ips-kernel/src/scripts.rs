//! Script and action runs
//!
//! Every run goes through the injected executor. Runs are synchronous, so
//! the non-waiting variants only discard the output.

use std::path::Path;

use ips_core::{KernelResult, ObjectId, Value};
use ips_script::ScriptParameters;

use crate::kernel::Kernel;

impl Kernel {
    // ==================== Stored scripts ====================

    pub fn run_script(&self, id: ObjectId) -> KernelResult<()> {
        self.run_script_wait_ex(id, &ScriptParameters::new()).map(|_| ())
    }

    pub fn run_script_ex(&self, id: ObjectId, parameters: &ScriptParameters) -> KernelResult<()> {
        self.run_script_wait_ex(id, parameters).map(|_| ())
    }

    pub fn run_script_wait(&self, id: ObjectId) -> KernelResult<String> {
        self.run_script_wait_ex(id, &ScriptParameters::new())
    }

    /// Run a stored script with `SELF` set to its id and return the output
    pub fn run_script_wait_ex(&self, id: ObjectId, parameters: &ScriptParameters) -> KernelResult<String> {
        let content = self.scripts().content(id)?;
        self.scripts().mark_executed(id, self.now())?;

        let mut parameters = parameters.clone();
        parameters.insert("SELF".to_string(), Value::from(id.get() as i64));
        self.engine().run_text_wait(self, &content, &parameters)
    }

    // ==================== Script text ====================

    pub fn run_script_text(&self, text: &str) -> KernelResult<()> {
        self.run_script_text_wait_ex(text, &ScriptParameters::new())
            .map(|_| ())
    }

    pub fn run_script_text_ex(&self, text: &str, parameters: &ScriptParameters) -> KernelResult<()> {
        self.run_script_text_wait_ex(text, parameters).map(|_| ())
    }

    pub fn run_script_text_wait(&self, text: &str) -> KernelResult<String> {
        self.run_script_text_wait_ex(text, &ScriptParameters::new())
    }

    pub fn run_script_text_wait_ex(&self, text: &str, parameters: &ScriptParameters) -> KernelResult<String> {
        self.engine().run_text_wait(self, text, parameters)
    }

    pub fn semaphore_enter(&self, name: &str, milliseconds: u64) -> bool {
        self.engine().semaphore_enter(name, milliseconds)
    }

    pub fn semaphore_leave(&self, name: &str) -> bool {
        self.engine().semaphore_leave(name)
    }

    // ==================== Actions ====================

    /// Load every `*.json` action definition from `dir`
    pub fn load_actions(&self, dir: impl AsRef<Path>) -> KernelResult<usize> {
        self.actions().load_actions(dir)
    }

    pub fn get_actions(&self) -> String {
        self.actions().get_actions()
    }

    pub fn run_action(&self, action_id: &str, parameters: &ScriptParameters) -> KernelResult<()> {
        self.run_action_wait(action_id, parameters).map(|_| ())
    }

    pub fn run_action_wait(&self, action_id: &str, parameters: &ScriptParameters) -> KernelResult<String> {
        self.actions()
            .run_action_wait(self.engine(), self, action_id, parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ips_config::KernelConfig;
    use ips_core::{ErrorKind, ScriptType};
    use ips_script::{FnExecutor, RecordingExecutor};
    use std::sync::Arc;

    fn make_test_kernel() -> (Kernel, Arc<RecordingExecutor>) {
        let kernel = Kernel::new(KernelConfig::default());
        kernel.reset();
        let executor = Arc::new(RecordingExecutor::with_output("ok"));
        kernel.set_script_executor(executor.clone());
        (kernel, executor)
    }

    #[test]
    fn test_run_stored_script() {
        let (kernel, executor) = make_test_kernel();
        let id = kernel.create_script(ScriptType::Php).unwrap();
        kernel.scripts().set_content(id, "<?php echo 1; ?>").unwrap();
        assert!(kernel.scripts().get(id).unwrap().executed.is_none());

        assert_eq!(kernel.run_script_wait(id).unwrap(), "ok");
        let call = executor.last_call().unwrap();
        assert_eq!(call.source.trim(), "echo 1;");
        assert_eq!(call.parameters["SELF"], Value::from(id.get() as i64));
        assert!(kernel.scripts().get(id).unwrap().executed.is_some());

        assert_eq!(
            kernel.run_script(ObjectId::new(4242)).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_run_script_text_with_parameters() {
        let (kernel, executor) = make_test_kernel();
        let mut parameters = ScriptParameters::new();
        parameters.insert("TARGET".to_string(), Value::Integer(12345));
        kernel.run_script_text_ex("<? return; ?>", &parameters).unwrap();
        assert_eq!(executor.calls().len(), 1);
        assert_eq!(executor.last_call().unwrap().parameters["TARGET"], Value::Integer(12345));
    }

    #[test]
    fn test_executor_calls_back_into_kernel() {
        let kernel = Kernel::new(KernelConfig::default());
        kernel.reset();
        let variable = kernel.create_variable(ips_core::VariableType::Integer).unwrap();
        kernel.set_script_executor(Arc::new(FnExecutor::new(
            move |host: &Kernel, _source: &str, parameters: &ScriptParameters| {
                let value = parameters["VALUE"].as_integer()?;
                host.set_value_integer(variable, value * 2)?;
                Ok(String::new())
            },
        )));

        let mut parameters = ScriptParameters::new();
        parameters.insert("VALUE".to_string(), Value::Integer(21));
        kernel.run_script_text_wait_ex("double", &parameters).unwrap();
        assert_eq!(kernel.get_value_integer(variable).unwrap(), 42);
    }

    #[test]
    fn test_semaphores() {
        let (kernel, _) = make_test_kernel();
        assert!(kernel.semaphore_enter("update", 1000));
        assert!(!kernel.semaphore_enter("update", 1000));
        assert!(kernel.semaphore_leave("update"));
        assert!(kernel.semaphore_enter("update", 0));
    }
}
