//! Instance lifecycle and dispatch into module objects

use tracing::{debug, info, instrument, warn};

use ips_core::{KernelError, KernelResult, ObjectId, ObjectType, Value};
use ips_registries::ModuleRef;

use crate::kernel::Kernel;
use crate::state::ModuleState;

impl Kernel {
    // ==================== Lifecycle ====================

    /// Create an instance of `module_id` and run its create and apply hooks
    ///
    /// Nothing is left behind when a hook fails.
    #[instrument(skip(self))]
    pub fn create_instance(&self, module_id: &str) -> KernelResult<ObjectId> {
        let module = self.loader().get_module(module_id)?;
        let class = self.loader().class(&module.class_name)?;

        let id = self.objects().register(ObjectType::Instance)?;
        let module_ref = ModuleRef {
            module_id: module.manifest.id.clone(),
            module_name: module.manifest.name.clone(),
            module_type: module.manifest.module_type,
        };
        if let Err(err) = self.instances().create(id, module_ref, self.now()) {
            self.objects().unregister(id)?;
            return Err(err);
        }
        self.insert_runtime(id, class.instantiate(), ModuleState::new());

        let created = self.with_module(id, |module, ctx| {
            module.create(ctx)?;
            module.apply_changes(ctx)
        });
        if let Err(err) = created {
            warn!("Creating instance {} of '{}' failed: {}", id, module.manifest.name, err);
            self.purge_object(id)?;
            return Err(err);
        }

        info!("Created instance {} of module '{}'", id, module.manifest.name);
        Ok(id)
    }

    /// Run the destroy hook and remove the instance
    #[instrument(skip(self))]
    pub fn delete_instance(&self, id: ObjectId) -> KernelResult<()> {
        if !self.instances().exists(id) {
            return Err(KernelError::not_found("Instance", id));
        }
        self.objects().check_removable(id)?;

        self.with_module(id, |module, ctx| module.destroy(ctx))?;

        let now = self.now();
        for child_id in self.instances().children_of(id) {
            self.instances().disconnect(child_id, now)?;
        }
        self.remove_runtime(id);
        self.instances().delete(id)?;
        self.objects().unregister(id)?;
        info!("Deleted instance {}", id);
        Ok(())
    }

    /// Remove `id` and everything below it without running hooks
    fn purge_object(&self, id: ObjectId) -> KernelResult<()> {
        for child_id in self.objects().children(id)? {
            self.purge_object(child_id)?;
        }
        match self.objects().object_type(id)? {
            ObjectType::Category => self.delete_category(id),
            ObjectType::Instance => {
                self.remove_runtime(id);
                self.instances().delete(id)?;
                self.objects().unregister(id)
            }
            ObjectType::Variable => self.delete_variable(id),
            ObjectType::Script => self.delete_script(id, true),
            ObjectType::Event => self.delete_event(id),
            ObjectType::Media => self.delete_media(id, true),
            ObjectType::Link => self.delete_link(id),
        }
    }

    pub fn instance_exists(&self, id: ObjectId) -> bool {
        self.instances().exists(id)
    }

    pub fn get_instance_list(&self) -> Vec<ObjectId> {
        self.instances().list()
    }

    pub fn get_instance_list_by_module_id(&self, module_id: &str) -> Vec<ObjectId> {
        self.instances().list_by_module_id(module_id)
    }

    // ==================== Configuration ====================

    pub fn apply_changes(&self, id: ObjectId) -> KernelResult<()> {
        self.with_module(id, |module, ctx| module.apply_changes(ctx))
    }

    /// Current (committed) value of a property
    pub fn get_property(&self, id: ObjectId, name: &str) -> KernelResult<Value> {
        self.with_state(id, |s| Ok(s.property(name)?.current.clone()))
    }

    /// Queue a pending property value; takes effect on [`apply_changes`](Self::apply_changes)
    pub fn set_property(&self, id: ObjectId, name: &str, value: impl Into<Value>) -> KernelResult<()> {
        let value = value.into();
        self.with_state(id, |s| s.set_property(name, value))
    }

    pub fn get_configuration(&self, id: ObjectId) -> KernelResult<String> {
        self.with_state(id, |s| Ok(s.configuration()))
    }

    pub fn set_configuration(&self, id: ObjectId, json: &str) -> KernelResult<()> {
        self.with_state(id, |s| s.set_configuration(json))
    }

    pub fn has_changes(&self, id: ObjectId) -> KernelResult<bool> {
        self.with_state(id, |s| Ok(s.has_changes()))
    }

    pub fn reset_changes(&self, id: ObjectId) -> KernelResult<()> {
        self.with_state(id, |s| {
            s.reset_changes();
            Ok(())
        })
    }

    pub fn get_configuration_form(&self, id: ObjectId) -> KernelResult<String> {
        self.with_module(id, |module, ctx| module.configuration_form(ctx))
    }

    pub fn get_configuration_for_parent(&self, id: ObjectId) -> KernelResult<String> {
        self.with_module(id, |module, ctx| module.configuration_for_parent(ctx))
    }

    pub fn get_reference_list(&self, id: ObjectId) -> KernelResult<Vec<ObjectId>> {
        self.with_state(id, |s| Ok(s.references()))
    }

    pub fn get_receive_data_filter(&self, id: ObjectId) -> KernelResult<String> {
        self.with_state(id, |s| Ok(s.receive_filter().to_string()))
    }

    pub fn get_forward_data_filter(&self, id: ObjectId) -> KernelResult<String> {
        self.with_state(id, |s| Ok(s.forward_filter().to_string()))
    }

    /// Milliseconds left on a module timer
    pub fn get_timer_interval(&self, id: ObjectId, ident: &str) -> KernelResult<i64> {
        let now = self.now();
        self.with_state(id, |s| Ok(s.timer(ident)?.remaining_ms(now)))
    }

    pub fn get_buffer(&self, id: ObjectId, name: &str) -> KernelResult<String> {
        self.with_state(id, |s| Ok(s.buffer(name)))
    }

    // ==================== Connections ====================

    /// Connect `id` below the instance `parent_id` for data routing
    pub fn connect_instance(&self, id: ObjectId, parent_id: ObjectId) -> KernelResult<()> {
        if !self.instances().exists(parent_id) {
            return Err(KernelError::not_found("Instance", parent_id));
        }
        if id == parent_id {
            return Err(KernelError::invalid(format!(
                "instance #{} cannot be its own parent",
                id
            )));
        }
        self.instances().connect(id, parent_id, self.now())
    }

    pub fn disconnect_instance(&self, id: ObjectId) -> KernelResult<()> {
        self.instances().disconnect(id, self.now())
    }

    /// Whether `id` could be connected below `parent_id`
    pub fn is_instance_compatible(&self, id: ObjectId, parent_id: ObjectId) -> KernelResult<bool> {
        let instance = self.instances().get(id)?;
        let parent = self.instances().get(parent_id)?;
        self.loader()
            .is_module_compatible(&instance.module.module_id, &parent.module.module_id)
    }

    /// Instances `id` could be connected to
    pub fn get_compatible_instances(&self, id: ObjectId) -> KernelResult<Vec<ObjectId>> {
        let instance = self.instances().get(id)?;
        let modules = self
            .loader()
            .get_compatible_modules(&instance.module.module_id)?;
        Ok(self
            .instances()
            .list()
            .into_iter()
            .filter(|candidate| *candidate != id)
            .filter(|candidate| {
                self.instances()
                    .get(*candidate)
                    .is_ok_and(|entry| modules.contains(&entry.module.module_id))
            })
            .collect())
    }

    // ==================== Dispatch ====================

    pub fn receive_data(&self, id: ObjectId, data: &str) -> KernelResult<String> {
        self.with_module(id, |module, ctx| module.receive_data(ctx, data))
    }

    pub fn forward_data(&self, id: ObjectId, data: &str) -> KernelResult<String> {
        self.with_module(id, |module, ctx| module.forward_data(ctx, data))
    }

    /// Deliver `RequestAction(ident, value)` to an instance
    pub fn request_instance_action(&self, id: ObjectId, ident: &str, value: impl Into<Value>) -> KernelResult<()> {
        let value = value.into();
        self.with_module(id, |module, ctx| module.request_action(ctx, ident, value))
    }

    /// Deliver a message to an instance's `MessageSink`
    pub fn message_sink(
        &self,
        id: ObjectId,
        sender_id: ObjectId,
        message: i64,
        data: &[serde_json::Value],
    ) -> KernelResult<()> {
        let timestamp = self.now().timestamp();
        self.with_module(id, |module, ctx| {
            module.message_sink(ctx, timestamp, sender_id, message, data)
        })
    }

    pub fn translate(&self, id: ObjectId, text: &str) -> KernelResult<String> {
        self.with_module(id, |module, ctx| Ok(module.translate(ctx, text)))
    }

    /// Call a generated `{PREFIX}_{Function}` on an instance
    ///
    /// Arguments are checked against the registered signature before the
    /// module sees them.
    #[instrument(skip(self, args))]
    pub fn call_function(
        &self,
        name: &str,
        instance_id: ObjectId,
        args: &[serde_json::Value],
    ) -> KernelResult<serde_json::Value> {
        let function = self.loader().get_function(name)?;
        let instance = self.instances().get(instance_id)?;
        if instance.module.module_id != function.module_id {
            return Err(KernelError::invalid(format!(
                "{} is not available for instance #{}",
                name, instance_id
            )));
        }
        if args.len() != function.parameters.len() {
            return Err(KernelError::invalid(format!(
                "{} expects {} arguments, got {}",
                name,
                function.parameters.len(),
                args.len()
            )));
        }
        for (parameter, arg) in function.parameters.iter().zip(args) {
            if !parameter.parameter_type.accepts(arg) {
                return Err(KernelError::invalid(format!(
                    "{}: parameter {} expects {:?}, got {}",
                    name, parameter.name, parameter.parameter_type, arg
                )));
            }
        }

        debug!("Calling {} on {}", name, instance_id);
        self.with_module(instance_id, |module, ctx| {
            module.call(ctx, &function.function, args)
        })
    }

    /// Generated functions, optionally only those usable on `instance_id`
    pub fn get_function_list(&self, instance_id: Option<ObjectId>) -> KernelResult<Vec<String>> {
        match instance_id {
            Some(id) => {
                let instance = self.instances().get(id)?;
                Ok(self
                    .loader()
                    .get_function_list_by_module(&instance.module.module_id))
            }
            None => Ok(self.loader().get_function_list()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ModuleContext;
    use crate::loader::{FunctionSignature, ModuleClass, ParameterType};
    use crate::module::Module;
    use ips_config::{KernelConfig, ModuleManifest};
    use ips_core::constants::status::IS_ACTIVE;
    use ips_core::{ErrorKind, ModuleType};
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};

    const COUNTER_ID: &str = "{5A1B2C3D-0000-4000-8000-00000000C0DE}";

    #[derive(Default)]
    struct Counter {
        calls: AtomicI64,
    }

    impl Module for Counter {
        fn create(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
            ctx.register_property_integer("Step", 1)?;
            ctx.register_variable_integer("Count", "Count", "", 0)?;
            Ok(())
        }

        fn call(
            &self,
            ctx: &ModuleContext<'_>,
            function: &str,
            args: &[serde_json::Value],
        ) -> KernelResult<serde_json::Value> {
            match function {
                "Increment" => {
                    self.calls.fetch_add(1, Ordering::SeqCst);
                    let step = ctx.read_property_integer("Step")?;
                    let count = ctx.get_value("Count")?.as_integer()? + step;
                    ctx.set_value("Count", count)?;
                    Ok(json!(count))
                }
                "Add" => Ok(json!(args[0].as_i64().unwrap_or_default() + self.calls.load(Ordering::SeqCst))),
                "Recurse" => ctx
                    .kernel()
                    .call_function("CNT_Increment", ctx.instance_id(), &[]),
                _ => Err(KernelError::not_found("Function", function)),
            }
        }
    }

    struct Broken;

    impl Module for Broken {
        fn create(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
            ctx.register_variable_string("Leftover", "Leftover", "", 0)?;
            Err(KernelError::invalid("broken on purpose"))
        }
    }

    fn make_test_kernel() -> Kernel {
        let kernel = Kernel::new(KernelConfig::default());
        kernel
            .loader()
            .register_class(
                ModuleClass::new("Counter", Counter::default)
                    .with_function(FunctionSignature::new("Increment"))
                    .with_function(FunctionSignature::new("Add").param("Amount", ParameterType::Integer))
                    .with_function(FunctionSignature::new("Recurse")),
            )
            .unwrap();
        kernel
            .loader()
            .register_class(ModuleClass::new("Broken", || Broken))
            .unwrap();
        kernel.reset();
        kernel
            .loader()
            .register_module(
                ModuleManifest::new(COUNTER_ID, "Counter", ModuleType::Device, "CNT"),
                "{LIB}",
            )
            .unwrap();
        kernel
            .loader()
            .register_module(
                ModuleManifest::new("{BROKEN}", "Broken", ModuleType::Device, "BRK"),
                "{LIB}",
            )
            .unwrap();
        kernel
    }

    #[test]
    fn test_create_instance_runs_hooks() {
        let kernel = make_test_kernel();
        let id = kernel.create_instance(COUNTER_ID).unwrap();

        assert_eq!(kernel.instances().status(id).unwrap(), IS_ACTIVE);
        assert_eq!(kernel.get_property(id, "Step").unwrap(), Value::Integer(1));
        let count = kernel.objects().get_id_by_ident("Count", id).unwrap();
        assert_eq!(kernel.objects().parent(count).unwrap(), id);
        assert_eq!(kernel.get_instance_list_by_module_id(COUNTER_ID), vec![id]);
    }

    #[test]
    fn test_failed_create_leaves_nothing() {
        let kernel = make_test_kernel();
        let err = kernel.create_instance("{BROKEN}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(kernel.get_instance_list().is_empty());
        assert!(kernel.variables().list().is_empty());
        assert_eq!(kernel.objects().list(), vec![ObjectId::ROOT]);
    }

    #[test]
    fn test_call_function() {
        let kernel = make_test_kernel();
        let id = kernel.create_instance(COUNTER_ID).unwrap();
        kernel.set_property(id, "Step", 5).unwrap();
        kernel.apply_changes(id).unwrap();

        assert_eq!(kernel.call_function("CNT_Increment", id, &[]).unwrap(), json!(5));
        assert_eq!(kernel.call_function("CNT_Increment", id, &[]).unwrap(), json!(10));
        assert_eq!(kernel.call_function("CNT_Add", id, &[json!(1)]).unwrap(), json!(3));
        assert_eq!(
            kernel.get_function_list(Some(id)).unwrap(),
            vec!["CNT_Add", "CNT_Increment", "CNT_Recurse"]
        );
    }

    #[test]
    fn test_call_function_validation() {
        let kernel = make_test_kernel();
        let id = kernel.create_instance(COUNTER_ID).unwrap();

        let missing = kernel.call_function("CNT_Nope", id, &[]).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        let arity = kernel.call_function("CNT_Add", id, &[]).unwrap_err();
        assert_eq!(arity.kind(), ErrorKind::InvalidArgument);
        let types = kernel.call_function("CNT_Add", id, &[json!("1")]).unwrap_err();
        assert_eq!(types.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_reentrant_call_reaches_same_module() {
        let kernel = make_test_kernel();
        let id = kernel.create_instance(COUNTER_ID).unwrap();
        assert_eq!(kernel.call_function("CNT_Recurse", id, &[]).unwrap(), json!(1));
        assert_eq!(kernel.call_function("CNT_Increment", id, &[]).unwrap(), json!(2));
        // Both increments went through the one module object
        assert_eq!(kernel.call_function("CNT_Add", id, &[json!(0)]).unwrap(), json!(2));
    }

    #[test]
    fn test_delete_instance() {
        let kernel = make_test_kernel();
        let parent = kernel.create_instance(COUNTER_ID).unwrap();
        let child = kernel.create_instance(COUNTER_ID).unwrap();
        kernel.connect_instance(child, parent).unwrap();

        // Still owns its Count variable
        assert!(matches!(
            kernel.delete_instance(parent),
            Err(KernelError::HasChildren(_))
        ));
        let count = kernel.objects().get_id_by_ident("Count", parent).unwrap();
        kernel.delete_variable(count).unwrap();
        kernel.delete_instance(parent).unwrap();

        assert!(!kernel.instance_exists(parent));
        assert_eq!(kernel.instances().connection(child).unwrap(), None);
        assert_eq!(
            kernel.apply_changes(parent).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_connect_requires_instance_parent() {
        let kernel = make_test_kernel();
        let id = kernel.create_instance(COUNTER_ID).unwrap();
        let category = kernel.create_category().unwrap();
        assert_eq!(
            kernel.connect_instance(id, category).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            kernel.connect_instance(id, id).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
}
