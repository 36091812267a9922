//! Global variable accessors and variable actions

use tracing::debug;

use ips_core::constants::FIRST_ACTION_ID;
use ips_core::{KernelError, KernelResult, ObjectId, Value, VariableType};
use ips_script::ScriptParameters;

use crate::kernel::Kernel;

impl Kernel {
    pub fn get_value(&self, id: ObjectId) -> KernelResult<Value> {
        self.variables().read(id)
    }

    fn get_value_of(&self, id: ObjectId, expected: VariableType) -> KernelResult<Value> {
        let value = self.variables().read(id)?;
        value.check_type(&format!("Variable #{}", id), expected)?;
        Ok(value)
    }

    pub fn get_value_boolean(&self, id: ObjectId) -> KernelResult<bool> {
        self.get_value_of(id, VariableType::Boolean)?.as_bool()
    }

    pub fn get_value_integer(&self, id: ObjectId) -> KernelResult<i64> {
        self.get_value_of(id, VariableType::Integer)?.as_integer()
    }

    pub fn get_value_float(&self, id: ObjectId) -> KernelResult<f64> {
        self.get_value_of(id, VariableType::Float)?.as_float()
    }

    pub fn get_value_string(&self, id: ObjectId) -> KernelResult<String> {
        Ok(self
            .get_value_of(id, VariableType::String)?
            .as_str()?
            .to_string())
    }

    /// Write a value of the variable's declared type
    pub fn set_value(&self, id: ObjectId, value: impl Into<Value>) -> KernelResult<()> {
        self.variables().write(id, value.into(), self.now())?;
        Ok(())
    }

    pub fn set_value_boolean(&self, id: ObjectId, value: bool) -> KernelResult<()> {
        self.set_value(id, Value::Boolean(value))
    }

    pub fn set_value_integer(&self, id: ObjectId, value: i64) -> KernelResult<()> {
        self.set_value(id, Value::Integer(value))
    }

    pub fn set_value_float(&self, id: ObjectId, value: f64) -> KernelResult<()> {
        self.set_value(id, Value::Float(value))
    }

    pub fn set_value_string(&self, id: ObjectId, value: &str) -> KernelResult<()> {
        self.set_value(id, Value::from(value))
    }

    // ==================== Actions ====================

    /// Whether the effective action of a variable points at an object
    pub fn has_action(&self, id: ObjectId) -> KernelResult<bool> {
        let variable = self.variables().get(id)?;
        Ok(variable
            .effective_action()
            .is_some_and(|action| action.get() >= FIRST_ACTION_ID))
    }

    pub fn request_action(&self, id: ObjectId, value: impl Into<Value>) -> KernelResult<String> {
        self.request_action_ex(id, value, "Action")
    }

    /// Run the effective action of a variable
    ///
    /// An instance receives `RequestAction(ident, value)`; a script runs
    /// with `VARIABLE`, `VALUE` and `SENDER`. Returns the script output.
    pub fn request_action_ex(
        &self,
        id: ObjectId,
        value: impl Into<Value>,
        sender: &str,
    ) -> KernelResult<String> {
        let value = value.into();
        let variable = self.variables().get(id)?;
        let action = variable
            .effective_action()
            .ok_or_else(|| KernelError::invalid("Action is invalid"))?;

        if self.instances().exists(action) {
            let ident = self.objects().ident(id)?;
            debug!("Requesting action {} on instance {}", ident, action);
            self.request_instance_action(action, &ident, value)?;
            Ok(String::new())
        } else if self.scripts().exists(action) {
            let mut parameters = ScriptParameters::new();
            parameters.insert("VARIABLE".to_string(), Value::from(id.get() as i64));
            parameters.insert("VALUE".to_string(), value);
            parameters.insert("SENDER".to_string(), Value::from(sender));
            self.run_script_wait_ex(action, &parameters)
        } else {
            Err(KernelError::invalid("Action is invalid"))
        }
    }
}
