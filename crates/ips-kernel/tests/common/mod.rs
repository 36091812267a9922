//! Shared fixtures for the kernel integration suites
//!
//! Provides a kernel on a manual clock with a small set of test modules:
//! a gateway (IO) that answers forwarded data, a spare gateway of another
//! module kind, and a device that exercises properties, variables, timers
//! and parent provisioning.

#![allow(dead_code)]

use std::sync::Arc;

use ips_config::{KernelConfig, LibraryManifest, ModuleManifest};
use ips_core::{KernelError, KernelResult, ManualClock, ModuleType, ObjectId, Value, VariableType};
use ips_kernel::{FunctionSignature, Kernel, Module, ModuleClass, ModuleContext, ParameterType};
use ips_registries::VariableProfile;
use serde_json::json;

pub const LIBRARY_ID: &str = "{0A1B2C3D-1111-4000-8000-000000000000}";
pub const GATEWAY_ID: &str = "{0A1B2C3D-1111-4000-8000-000000000001}";
pub const SPARE_GATEWAY_ID: &str = "{0A1B2C3D-1111-4000-8000-000000000002}";
pub const DEVICE_ID: &str = "{0A1B2C3D-1111-4000-8000-000000000003}";
pub const LOOPBACK_ID: &str = "{0A1B2C3D-1111-4000-8000-000000000004}";
pub const OWNER_GATEWAY_ID: &str = "{0A1B2C3D-1111-4000-8000-000000000005}";
pub const GATEWAY_INTERFACE: &str = "{0A1B2C3D-1111-4000-8000-00000000FFFF}";

/// Start of the manual clock (2020-09-13 12:26:40 UTC)
pub const START: i64 = 1_600_000_000;

/// Gateway answering forwarded data with an acknowledgement
#[derive(Default)]
pub struct Gateway;

impl Module for Gateway {
    fn forward_data(&self, ctx: &ModuleContext<'_>, data: &str) -> KernelResult<String> {
        ctx.send_debug("Forward", data, 0);
        Ok(format!("ACK {}", data))
    }

    fn call(
        &self,
        ctx: &ModuleContext<'_>,
        function: &str,
        args: &[serde_json::Value],
    ) -> KernelResult<serde_json::Value> {
        match function {
            "SetForwardFilter" => {
                ctx.set_forward_data_filter(args[0].as_str().unwrap_or_default())?;
                Ok(serde_json::Value::Null)
            }
            "Broadcast" => Ok(json!(ctx.send_data_to_children(args[0].as_str().unwrap_or_default())?)),
            _ => Err(KernelError::not_found("Function", function)),
        }
    }
}

/// Gateway that answers forwarded data by routing it to all its children
#[derive(Default)]
pub struct Loopback;

impl Module for Loopback {
    fn forward_data(&self, ctx: &ModuleContext<'_>, data: &str) -> KernelResult<String> {
        Ok(ctx.send_data_to_children(data)?.join(","))
    }
}

/// Gateway keeping a status variable of its own below the instance
#[derive(Default)]
pub struct OwnerGateway;

impl Module for OwnerGateway {
    fn create(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
        ctx.register_variable_integer("Owned", "Owned", "", 0)?;
        Ok(())
    }
}

/// Device with a `Port` property, a switch variable and an update timer
#[derive(Default)]
pub struct Device;

impl Module for Device {
    fn create(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
        ctx.register_property_integer("Port", 80)?;
        ctx.register_property_boolean("Numeric", false)?;
        ctx.register_attribute_integer("Received", 0)?;
        ctx.register_timer("Update", 60_000, "DEV_Update($_IPS['TARGET']);")?;
        Ok(())
    }

    fn apply_changes(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
        ctx.apply_changes()?;
        ctx.register_variable_boolean("State", "State", "Switch", 1)?;
        if ctx.read_property_boolean("Numeric")? {
            ctx.register_variable_integer("Reading", "Reading", "", 2)?;
        } else {
            ctx.register_variable_string("Reading", "Reading", "", 2)?;
        }
        Ok(())
    }

    fn receive_data(&self, ctx: &ModuleContext<'_>, data: &str) -> KernelResult<String> {
        let count = ctx.read_attribute_integer("Received")? + 1;
        ctx.write_attribute_integer("Received", count)?;
        Ok(format!("{}:{}", ctx.instance_id(), data))
    }

    fn request_action(&self, ctx: &ModuleContext<'_>, ident: &str, value: Value) -> KernelResult<()> {
        ctx.set_value(ident, value)
    }

    fn call(
        &self,
        ctx: &ModuleContext<'_>,
        function: &str,
        args: &[serde_json::Value],
    ) -> KernelResult<serde_json::Value> {
        let text = || args.first().and_then(|a| a.as_str()).unwrap_or_default().to_string();
        match function {
            "Send" => Ok(json!(ctx.send_data_to_parent(&text())?)),
            "Connect" => {
                ctx.connect_parent(&text())?;
                Ok(serde_json::Value::Null)
            }
            "Require" => {
                ctx.require_parent(&text())?;
                Ok(serde_json::Value::Null)
            }
            "Force" => {
                ctx.force_parent(&text())?;
                Ok(serde_json::Value::Null)
            }
            "AddReading" => Ok(json!(ctx.register_variable_float(&text(), "Extra", "", 10)?)),
            "AddScript" => Ok(json!(ctx.register_script(&text(), "Handler", "", 11)?)),
            "GetReceived" => Ok(json!(ctx.read_attribute_integer("Received")?)),
            "HasActiveParent" => Ok(json!(ctx.has_active_parent()?)),
            "GetUpdateInterval" => Ok(json!(ctx.get_timer_interval("Update")?)),
            "SetUpdateInterval" => {
                ctx.set_timer_interval("Update", args[0].as_i64().unwrap_or_default())?;
                Ok(serde_json::Value::Null)
            }
            _ => Err(KernelError::not_found("Function", function)),
        }
    }
}

/// Kernel on a manual clock with the test modules loaded
pub struct TestKernel {
    pub kernel: Kernel,
    pub clock: Arc<ManualClock>,
}

impl TestKernel {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::at_timestamp(START));
        let mut config = KernelConfig::default();
        config.identity_pool.seed = Some(42);
        let kernel = Kernel::with_clock(config, clock.clone());

        let loader = kernel.loader();
        loader
            .register_class(
                ModuleClass::new("Gateway", Gateway::default)
                    .with_function(FunctionSignature::new("SetForwardFilter").param("Filter", ParameterType::String))
                    .with_function(FunctionSignature::new("Broadcast").param("Data", ParameterType::String)),
            )
            .unwrap();
        loader
            .register_class(ModuleClass::new("SpareGateway", Gateway::default))
            .unwrap();
        loader
            .register_class(ModuleClass::new("Loopback", Loopback::default))
            .unwrap();
        loader
            .register_class(ModuleClass::new("OwnerGateway", OwnerGateway::default))
            .unwrap();
        loader
            .register_class(
                ModuleClass::new("Device", Device::default)
                    .with_function(FunctionSignature::new("Send").param("Data", ParameterType::String))
                    .with_function(FunctionSignature::new("Connect").param("ModuleID", ParameterType::String))
                    .with_function(FunctionSignature::new("Require").param("ModuleID", ParameterType::String))
                    .with_function(FunctionSignature::new("Force").param("ModuleID", ParameterType::String))
                    .with_function(FunctionSignature::new("AddReading").param("Ident", ParameterType::String))
                    .with_function(FunctionSignature::new("AddScript").param("Ident", ParameterType::String))
                    .with_function(FunctionSignature::new("GetReceived"))
                    .with_function(FunctionSignature::new("HasActiveParent"))
                    .with_function(FunctionSignature::new("GetUpdateInterval"))
                    .with_function(FunctionSignature::new("SetUpdateInterval").param("Milliseconds", ParameterType::Integer)),
            )
            .unwrap();

        let harness = Self { kernel, clock };
        harness.reset();
        harness
    }

    /// Reset the kernel and register the test library and `~Switch` again
    pub fn reset(&self) {
        self.kernel.reset();
        self.install_library();
        self.install_switch_profile();
    }

    fn install_library(&self) {
        let loader = self.kernel.loader();
        loader.register_library(LibraryManifest {
            id: LIBRARY_ID.to_string(),
            author: "Test".to_string(),
            name: "Test Library".to_string(),
            url: "https://example.org".to_string(),
            version: "1.0".to_string(),
            build: 1,
            date: START,
            compatibility: None,
        });
        loader
            .register_module(
                ModuleManifest::new(GATEWAY_ID, "Gateway", ModuleType::Io, "GW")
                    .with_implemented(&[GATEWAY_INTERFACE]),
                LIBRARY_ID,
            )
            .unwrap();
        loader
            .register_module(
                ModuleManifest::new(SPARE_GATEWAY_ID, "Spare Gateway", ModuleType::Io, "SPARE")
                    .with_implemented(&[GATEWAY_INTERFACE]),
                LIBRARY_ID,
            )
            .unwrap();
        loader
            .register_module(
                ModuleManifest::new(LOOPBACK_ID, "Loopback", ModuleType::Io, "LOOP")
                    .with_implemented(&[GATEWAY_INTERFACE]),
                LIBRARY_ID,
            )
            .unwrap();
        loader
            .register_module(
                ModuleManifest::new(OWNER_GATEWAY_ID, "Owner Gateway", ModuleType::Io, "OWN")
                    .with_implemented(&[GATEWAY_INTERFACE]),
                LIBRARY_ID,
            )
            .unwrap();
        loader
            .register_module(
                ModuleManifest::new(DEVICE_ID, "Device", ModuleType::Device, "DEV")
                    .with_parent_requirements(&[GATEWAY_INTERFACE]),
                LIBRARY_ID,
            )
            .unwrap();
    }

    fn install_switch_profile(&self) {
        self.kernel
            .profiles()
            .insert(
                VariableProfile::new("~Switch", VariableType::Boolean)
                    .with_association(false, "Aus")
                    .with_association(true, "An"),
            )
            .unwrap();
    }

    pub fn create_device(&self) -> ObjectId {
        self.kernel.create_instance(DEVICE_ID).unwrap()
    }

    pub fn create_gateway(&self) -> ObjectId {
        self.kernel.create_instance(GATEWAY_ID).unwrap()
    }

    /// Variable below `instance_id` registered under `ident`
    pub fn variable(&self, instance_id: ObjectId, ident: &str) -> ObjectId {
        self.kernel
            .objects()
            .get_id_by_ident(ident, instance_id)
            .unwrap()
    }

    pub fn call(&self, function: &str, instance_id: ObjectId, args: &[serde_json::Value]) -> serde_json::Value {
        self.kernel.call_function(function, instance_id, args).unwrap()
    }
}
