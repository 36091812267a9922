//! Protected host API handed to module hooks
//!
//! A `ModuleContext` is a borrowed view of the kernel bound to one
//! instance. Everything a module may do to the host (properties, timers,
//! variables, routing, parents) goes through it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, error, info, trace, warn};

use ips_core::constants::log::{KL_DEBUG, KL_ERROR, KL_WARNING};
use ips_core::constants::status::{IS_ACTIVE, IS_CREATING};
use ips_core::{KernelError, KernelResult, ObjectId, ScriptType, Value, VariableType};
use ips_registries::{is_valid_ident, Presentation};
use ips_script::ScriptParameters;

use crate::kernel::Kernel;
use crate::state::ModuleState;

/// Display setting of a registered variable
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileOrPresentation {
    /// Profile name; `~name` is preferred when such a system profile exists
    Profile(String),
    Presentation(Presentation),
}

impl Default for ProfileOrPresentation {
    fn default() -> Self {
        ProfileOrPresentation::Profile(String::new())
    }
}

impl From<&str> for ProfileOrPresentation {
    fn from(profile: &str) -> Self {
        ProfileOrPresentation::Profile(profile.to_string())
    }
}

impl From<String> for ProfileOrPresentation {
    fn from(profile: String) -> Self {
        ProfileOrPresentation::Profile(profile)
    }
}

impl From<Presentation> for ProfileOrPresentation {
    fn from(presentation: Presentation) -> Self {
        ProfileOrPresentation::Presentation(presentation)
    }
}

/// Whether `data` passes a data filter; an empty filter passes everything
pub(crate) fn filter_matches(pattern: &str, data: &str) -> KernelResult<bool> {
    let regex = Regex::new(pattern)
        .map_err(|e| KernelError::invalid(format!("invalid data filter '{}': {}", pattern, e)))?;
    Ok(regex.is_match(data))
}

pub struct ModuleContext<'a> {
    kernel: &'a Kernel,
    instance_id: ObjectId,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(kernel: &'a Kernel, instance_id: ObjectId) -> Self {
        Self {
            kernel,
            instance_id,
        }
    }

    pub fn kernel(&self) -> &'a Kernel {
        self.kernel
    }

    pub fn instance_id(&self) -> ObjectId {
        self.instance_id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.kernel.now()
    }

    fn state<R, F>(&self, f: F) -> KernelResult<R>
    where
        F: FnOnce(&mut ModuleState) -> KernelResult<R>,
    {
        self.kernel.with_state(self.instance_id, f)
    }

    // ==================== Properties ====================

    pub fn register_property(&self, name: &str, default: Value) -> KernelResult<()> {
        self.state(|s| {
            s.register_property(name, default);
            Ok(())
        })
    }

    pub fn register_property_boolean(&self, name: &str, default: bool) -> KernelResult<()> {
        self.register_property(name, Value::Boolean(default))
    }

    pub fn register_property_integer(&self, name: &str, default: i64) -> KernelResult<()> {
        self.register_property(name, Value::Integer(default))
    }

    pub fn register_property_float(&self, name: &str, default: f64) -> KernelResult<()> {
        self.register_property(name, Value::Float(default))
    }

    pub fn register_property_string(&self, name: &str, default: &str) -> KernelResult<()> {
        self.register_property(name, Value::from(default))
    }

    fn read_property(&self, name: &str, expected: VariableType) -> KernelResult<Value> {
        self.state(|s| s.read_property(name, expected))
    }

    pub fn read_property_boolean(&self, name: &str) -> KernelResult<bool> {
        self.read_property(name, VariableType::Boolean)?.as_bool()
    }

    pub fn read_property_integer(&self, name: &str) -> KernelResult<i64> {
        self.read_property(name, VariableType::Integer)?.as_integer()
    }

    pub fn read_property_float(&self, name: &str) -> KernelResult<f64> {
        self.read_property(name, VariableType::Float)?.as_float()
    }

    pub fn read_property_string(&self, name: &str) -> KernelResult<String> {
        Ok(self
            .read_property(name, VariableType::String)?
            .as_str()?
            .to_string())
    }

    // ==================== Attributes ====================

    pub fn register_attribute(&self, name: &str, default: Value) -> KernelResult<()> {
        self.state(|s| {
            s.register_attribute(name, default);
            Ok(())
        })
    }

    pub fn register_attribute_boolean(&self, name: &str, default: bool) -> KernelResult<()> {
        self.register_attribute(name, Value::Boolean(default))
    }

    pub fn register_attribute_integer(&self, name: &str, default: i64) -> KernelResult<()> {
        self.register_attribute(name, Value::Integer(default))
    }

    pub fn register_attribute_float(&self, name: &str, default: f64) -> KernelResult<()> {
        self.register_attribute(name, Value::Float(default))
    }

    pub fn register_attribute_string(&self, name: &str, default: &str) -> KernelResult<()> {
        self.register_attribute(name, Value::from(default))
    }

    fn read_attribute(&self, name: &str, expected: VariableType) -> KernelResult<Value> {
        self.state(|s| s.read_attribute(name, expected))
    }

    pub fn read_attribute_boolean(&self, name: &str) -> KernelResult<bool> {
        self.read_attribute(name, VariableType::Boolean)?.as_bool()
    }

    pub fn read_attribute_integer(&self, name: &str) -> KernelResult<i64> {
        self.read_attribute(name, VariableType::Integer)?.as_integer()
    }

    pub fn read_attribute_float(&self, name: &str) -> KernelResult<f64> {
        self.read_attribute(name, VariableType::Float)?.as_float()
    }

    pub fn read_attribute_string(&self, name: &str) -> KernelResult<String> {
        Ok(self
            .read_attribute(name, VariableType::String)?
            .as_str()?
            .to_string())
    }

    pub fn write_attribute(&self, name: &str, value: Value) -> KernelResult<()> {
        self.state(|s| s.write_attribute(name, value))
    }

    pub fn write_attribute_boolean(&self, name: &str, value: bool) -> KernelResult<()> {
        self.write_attribute(name, Value::Boolean(value))
    }

    pub fn write_attribute_integer(&self, name: &str, value: i64) -> KernelResult<()> {
        self.write_attribute(name, Value::Integer(value))
    }

    pub fn write_attribute_float(&self, name: &str, value: f64) -> KernelResult<()> {
        self.write_attribute(name, Value::Float(value))
    }

    pub fn write_attribute_string(&self, name: &str, value: &str) -> KernelResult<()> {
        self.write_attribute(name, Value::from(value))
    }

    // ==================== Configuration ====================

    /// Commit pending properties and leave `IS_CREATING`
    pub fn apply_changes(&self) -> KernelResult<()> {
        self.state(|s| {
            s.commit_changes();
            Ok(())
        })?;
        if self.get_status()? == IS_CREATING {
            self.set_status(IS_ACTIVE)?;
        }
        Ok(())
    }

    pub fn has_changes(&self) -> KernelResult<bool> {
        self.state(|s| Ok(s.has_changes()))
    }

    pub fn reset_changes(&self) -> KernelResult<()> {
        self.state(|s| {
            s.reset_changes();
            Ok(())
        })
    }

    pub fn get_configuration(&self) -> KernelResult<String> {
        self.state(|s| Ok(s.configuration()))
    }

    pub fn set_configuration(&self, json: &str) -> KernelResult<()> {
        self.state(|s| s.set_configuration(json))
    }

    // ==================== Timers ====================

    pub fn register_timer(&self, ident: &str, interval_ms: i64, script: &str) -> KernelResult<()> {
        let now = self.now();
        self.state(|s| {
            s.register_timer(ident, interval_ms, script, now);
            Ok(())
        })
    }

    pub fn set_timer_interval(&self, ident: &str, interval_ms: i64) -> KernelResult<()> {
        let now = self.now();
        self.state(|s| s.set_timer_interval(ident, interval_ms, now))
    }

    /// Milliseconds left until the timer fires
    pub fn get_timer_interval(&self, ident: &str) -> KernelResult<i64> {
        let now = self.now();
        self.state(|s| Ok(s.timer(ident)?.remaining_ms(now)))
    }

    /// Run `script` once right away with `TARGET` set to this instance
    pub fn register_once_timer(&self, ident: &str, script: &str) -> KernelResult<()> {
        debug!(instance = %self.instance_id, "Once timer {}", ident);
        let mut parameters = ScriptParameters::new();
        parameters.insert("TARGET".to_string(), Value::from(self.instance_id.get() as i64));
        self.kernel.run_script_text_ex(script, &parameters)
    }

    // ==================== Variables & scripts ====================

    /// Ensure a variable of `variable_type` exists below this instance
    ///
    /// An existing variable with another type is deleted and recreated. The
    /// profile (or presentation) is always refreshed.
    pub fn register_variable(
        &self,
        ident: &str,
        name: &str,
        variable_type: VariableType,
        display: impl Into<ProfileOrPresentation>,
        position: i32,
    ) -> KernelResult<ObjectId> {
        let display = match display.into() {
            ProfileOrPresentation::Profile(profile) => {
                ProfileOrPresentation::Profile(self.resolve_profile(&profile, variable_type)?)
            }
            presentation => presentation,
        };

        if !is_valid_ident(ident) {
            return Err(KernelError::InvalidIdent(ident.to_string()));
        }

        let kernel = self.kernel;
        let mut existing = kernel.objects().find_by_ident(ident, self.instance_id)?;
        if let Some(id) = existing {
            if !kernel.variables().exists(id) {
                return Err(KernelError::invalid(format!(
                    "ident {} is used for wrong object type",
                    ident
                )));
            }
            if kernel.variables().variable_type(id)? != variable_type {
                debug!("Recreating variable {} as {}", ident, variable_type);
                kernel.delete_variable(id)?;
                existing = None;
            }
        }

        let apply_display = |id: ObjectId| -> KernelResult<()> {
            match display {
                ProfileOrPresentation::Profile(profile) => kernel.variables().set_profile(id, &profile),
                ProfileOrPresentation::Presentation(record) => {
                    kernel.variables().set_profile(id, "")?;
                    kernel.variables().set_presentation(id, record)
                }
            }
        };

        if let Some(id) = existing {
            apply_display(id)?;
            return Ok(id);
        }

        let id = kernel.create_variable(variable_type)?;
        let placed = self
            .place_child(id, ident, name, position)
            .and_then(|()| apply_display(id));
        if let Err(err) = placed {
            kernel.delete_variable(id)?;
            return Err(err);
        }
        Ok(id)
    }

    /// Move a freshly created object below this instance
    fn place_child(&self, id: ObjectId, ident: &str, name: &str, position: i32) -> KernelResult<()> {
        let objects = self.kernel.objects();
        objects.set_parent(id, self.instance_id)?;
        objects.set_ident(id, ident)?;
        objects.set_name(id, name)?;
        objects.set_position(id, position)
    }

    /// Prefer the system profile `~name`; the profile must match the type
    fn resolve_profile(&self, profile: &str, variable_type: VariableType) -> KernelResult<String> {
        if profile.is_empty() {
            return Ok(String::new());
        }
        let system = format!("~{}", profile);
        let resolved = if self.kernel.profiles().exists(&system) {
            system
        } else {
            profile.to_string()
        };
        let record = self.kernel.profiles().get(&resolved)?;
        if record.profile_type != variable_type {
            return Err(KernelError::invalid(format!(
                "profile {} is not of type {}",
                resolved, variable_type
            )));
        }
        Ok(resolved)
    }

    pub fn register_variable_boolean(
        &self,
        ident: &str,
        name: &str,
        display: impl Into<ProfileOrPresentation>,
        position: i32,
    ) -> KernelResult<ObjectId> {
        self.register_variable(ident, name, VariableType::Boolean, display, position)
    }

    pub fn register_variable_integer(
        &self,
        ident: &str,
        name: &str,
        display: impl Into<ProfileOrPresentation>,
        position: i32,
    ) -> KernelResult<ObjectId> {
        self.register_variable(ident, name, VariableType::Integer, display, position)
    }

    pub fn register_variable_float(
        &self,
        ident: &str,
        name: &str,
        display: impl Into<ProfileOrPresentation>,
        position: i32,
    ) -> KernelResult<ObjectId> {
        self.register_variable(ident, name, VariableType::Float, display, position)
    }

    pub fn register_variable_string(
        &self,
        ident: &str,
        name: &str,
        display: impl Into<ProfileOrPresentation>,
        position: i32,
    ) -> KernelResult<ObjectId> {
        self.register_variable(ident, name, VariableType::String, display, position)
    }

    /// Delete the variable behind `ident`; anything else is left alone
    pub fn unregister_variable(&self, ident: &str) -> KernelResult<()> {
        match self.kernel.objects().find_by_ident(ident, self.instance_id)? {
            Some(id) if self.kernel.variables().exists(id) => self.kernel.delete_variable(id),
            _ => Ok(()),
        }
    }

    pub fn maintain_variable(
        &self,
        ident: &str,
        name: &str,
        variable_type: VariableType,
        display: impl Into<ProfileOrPresentation>,
        position: i32,
        keep: bool,
    ) -> KernelResult<()> {
        if keep {
            self.register_variable(ident, name, variable_type, display, position)
                .map(|_| ())
        } else {
            self.unregister_variable(ident)
        }
    }

    /// Ensure a script exists below this instance; existing content is kept
    pub fn register_script(
        &self,
        ident: &str,
        name: &str,
        content: &str,
        position: i32,
    ) -> KernelResult<ObjectId> {
        if !is_valid_ident(ident) {
            return Err(KernelError::InvalidIdent(ident.to_string()));
        }

        let kernel = self.kernel;
        if let Some(id) = kernel.objects().find_by_ident(ident, self.instance_id)? {
            if !kernel.scripts().exists(id) {
                return Err(KernelError::invalid(format!(
                    "ident {} is used for wrong object type",
                    ident
                )));
            }
            return Ok(id);
        }

        let id = kernel.create_script(ScriptType::Php)?;
        let placed = self.place_child(id, ident, name, position).and_then(|()| {
            if content.is_empty() {
                Ok(())
            } else {
                kernel.scripts().set_content(id, content)
            }
        });
        if let Err(err) = placed {
            kernel.delete_script(id, true)?;
            return Err(err);
        }
        Ok(id)
    }

    pub fn get_id_for_ident(&self, ident: &str) -> KernelResult<ObjectId> {
        self.kernel.objects().get_id_by_ident(ident, self.instance_id)
    }

    // ==================== Actions ====================

    /// Route actions on the variable `ident` to this instance
    pub fn enable_action(&self, ident: &str) -> KernelResult<()> {
        let id = self.get_id_for_ident(ident)?;
        self.kernel.variables().set_action(id, Some(self.instance_id))
    }

    pub fn disable_action(&self, ident: &str) -> KernelResult<()> {
        let id = self.get_id_for_ident(ident)?;
        self.kernel.variables().set_action(id, None)
    }

    pub fn maintain_action(&self, ident: &str, keep: bool) -> KernelResult<()> {
        if keep {
            self.enable_action(ident)
        } else {
            self.disable_action(ident)
        }
    }

    // ==================== Data flow ====================

    /// Hand `data` to the parent's `ForwardData` when its forward filter matches
    pub fn send_data_to_parent(&self, data: &str) -> KernelResult<String> {
        let parent_id = self
            .kernel
            .instances()
            .connection(self.instance_id)?
            .ok_or_else(|| KernelError::not_found("Parent", self.instance_id))?;

        let filter = self.kernel.get_forward_data_filter(parent_id)?;
        if !filter_matches(&filter, data)? {
            trace!(from = %self.instance_id, to = %parent_id, "Forward filter rejected data");
            return Ok(String::new());
        }
        trace!(from = %self.instance_id, to = %parent_id, "Forwarding data");
        self.kernel.forward_data(parent_id, data)
    }

    /// Hand `data` to every connected child whose receive filter matches
    ///
    /// Returns the non-empty answers in child creation order.
    pub fn send_data_to_children(&self, data: &str) -> KernelResult<Vec<String>> {
        let mut answers = Vec::new();
        for child_id in self.kernel.instances().children_of(self.instance_id) {
            let filter = self.kernel.get_receive_data_filter(child_id)?;
            if !filter_matches(&filter, data)? {
                trace!(from = %self.instance_id, to = %child_id, "Receive filter rejected data");
                continue;
            }
            let answer = self.kernel.receive_data(child_id, data)?;
            if !answer.is_empty() {
                answers.push(answer);
            }
        }
        Ok(answers)
    }

    pub fn set_receive_data_filter(&self, pattern: &str) -> KernelResult<()> {
        filter_matches(pattern, "")?;
        self.state(|s| {
            s.set_receive_filter(pattern);
            Ok(())
        })
    }

    pub fn set_forward_data_filter(&self, pattern: &str) -> KernelResult<()> {
        filter_matches(pattern, "")?;
        self.state(|s| {
            s.set_forward_filter(pattern);
            Ok(())
        })
    }

    // ==================== Parents ====================

    /// Connect to the first instance of `module_id`, creating one if needed
    pub fn connect_parent(&self, module_id: &str) -> KernelResult<()> {
        if self.kernel.instances().connection(self.instance_id)?.is_some() {
            return Ok(());
        }
        match self.kernel.instances().list_by_module_id(module_id).first() {
            Some(parent_id) => self.kernel.connect_instance(self.instance_id, *parent_id),
            None => self.require_parent(module_id),
        }
    }

    /// Create a new parent of `module_id` when not connected
    pub fn require_parent(&self, module_id: &str) -> KernelResult<()> {
        if self.kernel.instances().connection(self.instance_id)?.is_some() {
            return Ok(());
        }
        let parent_id = self.create_parent(module_id)?;
        if let Err(err) = self.kernel.connect_instance(self.instance_id, parent_id) {
            self.kernel.delete_instance(parent_id)?;
            return Err(err);
        }
        Ok(())
    }

    /// Create an instance of `module_id` named after its module
    fn create_parent(&self, module_id: &str) -> KernelResult<ObjectId> {
        let module = self.kernel.loader().get_module(module_id)?;
        let parent_id = self.kernel.create_instance(module_id)?;
        if let Err(err) = self.kernel.objects().set_name(parent_id, &module.manifest.name) {
            self.kernel.delete_instance(parent_id)?;
            return Err(err);
        }
        Ok(parent_id)
    }

    /// Replace a parent of another module; the old parent is deleted when
    /// nothing else is connected to it
    ///
    /// Nothing changes when the old parent cannot be deleted or the new one
    /// cannot be created.
    pub fn force_parent(&self, module_id: &str) -> KernelResult<()> {
        let Some(old_parent) = self.kernel.instances().connection(self.instance_id)? else {
            return self.require_parent(module_id);
        };
        if self.kernel.instances().get(old_parent)?.module.module_id == module_id {
            return Ok(());
        }

        let orphaned = self.kernel.instances().children_of(old_parent) == [self.instance_id];
        if orphaned {
            self.kernel.objects().check_removable(old_parent)?;
        }

        let new_parent = self.create_parent(module_id)?;
        if let Err(err) = self.kernel.connect_instance(self.instance_id, new_parent) {
            self.kernel.delete_instance(new_parent)?;
            return Err(err);
        }
        if orphaned {
            if let Err(err) = self.kernel.delete_instance(old_parent) {
                self.kernel.connect_instance(self.instance_id, old_parent)?;
                self.kernel.delete_instance(new_parent)?;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Whether a parent exists and every instance up the chain is active
    pub fn has_active_parent(&self) -> KernelResult<bool> {
        let instances = self.kernel.instances();
        let mut cursor = instances.connection(self.instance_id)?;
        if cursor.is_none() {
            return Ok(false);
        }
        let mut visited = HashSet::new();
        while let Some(parent_id) = cursor {
            if !visited.insert(parent_id) {
                break;
            }
            if instances.status(parent_id)? != IS_ACTIVE {
                return Ok(false);
            }
            cursor = instances.connection(parent_id)?;
        }
        Ok(true)
    }

    // ==================== Status & buffers ====================

    pub fn set_status(&self, status: i32) -> KernelResult<()> {
        self.kernel
            .instances()
            .set_status(self.instance_id, status, self.now())
    }

    pub fn get_status(&self) -> KernelResult<i32> {
        self.kernel.instances().status(self.instance_id)
    }

    pub fn set_summary(&self, summary: &str) -> KernelResult<()> {
        self.kernel.objects().set_summary(self.instance_id, summary)
    }

    pub fn set_buffer(&self, name: &str, data: &str) -> KernelResult<()> {
        self.state(|s| {
            s.set_buffer(name, data);
            Ok(())
        })
    }

    /// Buffer content; empty when never written
    pub fn get_buffer(&self, name: &str) -> KernelResult<String> {
        self.state(|s| Ok(s.buffer(name)))
    }

    pub fn get_buffer_list(&self) -> KernelResult<Vec<String>> {
        self.state(|s| Ok(s.buffer_list()))
    }

    // ==================== Messages & references ====================

    pub fn register_message(&self, sender_id: ObjectId, message: i64) -> KernelResult<()> {
        self.state(|s| {
            s.register_message(sender_id, message);
            Ok(())
        })
    }

    pub fn unregister_message(&self, sender_id: ObjectId, message: i64) -> KernelResult<()> {
        self.state(|s| {
            s.unregister_message(sender_id, message);
            Ok(())
        })
    }

    pub fn get_message_list(&self) -> KernelResult<IndexMap<ObjectId, Vec<i64>>> {
        self.state(|s| Ok(s.message_list()))
    }

    pub fn register_reference(&self, id: ObjectId) -> KernelResult<()> {
        self.state(|s| {
            s.register_reference(id);
            Ok(())
        })
    }

    pub fn unregister_reference(&self, id: ObjectId) -> KernelResult<()> {
        self.state(|s| {
            s.unregister_reference(id);
            Ok(())
        })
    }

    pub fn get_reference_list(&self) -> KernelResult<Vec<ObjectId>> {
        self.state(|s| Ok(s.references()))
    }

    // ==================== Misc ====================

    /// Record a debug message for this instance
    pub fn send_debug(&self, message: &str, data: &str, format: i32) -> Option<String> {
        self.kernel
            .send_debug(self.instance_id, message, data, format)
    }

    pub fn reload_form(&self) {}

    pub fn update_form_field(&self, _field: &str, _parameter: &str, _value: &serde_json::Value) {}

    /// Value of the variable `ident` below this instance
    pub fn get_value(&self, ident: &str) -> KernelResult<Value> {
        self.kernel.get_value(self.get_id_for_ident(ident)?)
    }

    pub fn set_value(&self, ident: &str, value: impl Into<Value>) -> KernelResult<()> {
        self.kernel
            .set_value(self.get_id_for_ident(ident)?, value.into())
    }

    /// Emit a message on the tracing level matching `message_type`
    pub fn log_message(&self, message: &str, message_type: i32) {
        let sender = self.instance_id;
        match message_type {
            KL_ERROR => error!(%sender, "{}", message),
            KL_WARNING => warn!(%sender, "{}", message),
            KL_DEBUG => debug!(%sender, "{}", message),
            _ => info!(%sender, "{}", message),
        }
    }
}
