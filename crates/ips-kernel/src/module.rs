//! Module trait
//!
//! A module is the plugin-side object behind an instance. The kernel owns
//! one boxed module per instance and calls its hooks with a
//! [`ModuleContext`] that exposes the protected host API.
//!
//! Every hook has a default that mirrors an empty base module, so concrete
//! modules only override what they need.
//!
//! Hooks take `&self`: data routed back to an instance whose own hook is
//! still running (a device sending to its parent, which answers every
//! child) reaches the same module object. Persistent state belongs in
//! properties, attributes and buffers; anything kept on the module itself
//! sits behind a lock that is released before calling into the kernel.

use ips_core::{KernelError, KernelResult, ObjectId, Value};

use crate::context::ModuleContext;

/// Plugin-side behaviour of an instance
pub trait Module: Send + Sync {
    /// Register properties, attributes and variables
    fn create(&self, _ctx: &ModuleContext<'_>) -> KernelResult<()> {
        Ok(())
    }

    fn destroy(&self, _ctx: &ModuleContext<'_>) -> KernelResult<()> {
        Ok(())
    }

    /// Commit pending properties; overriding modules should call
    /// `ctx.apply_changes()` first
    fn apply_changes(&self, ctx: &ModuleContext<'_>) -> KernelResult<()> {
        ctx.apply_changes()
    }

    /// Data sent down by the parent instance
    fn receive_data(&self, _ctx: &ModuleContext<'_>, _data: &str) -> KernelResult<String> {
        Ok(String::new())
    }

    /// Data sent up by a child instance
    fn forward_data(&self, _ctx: &ModuleContext<'_>, _data: &str) -> KernelResult<String> {
        Ok(String::new())
    }

    fn request_action(
        &self,
        _ctx: &ModuleContext<'_>,
        _ident: &str,
        _value: Value,
    ) -> KernelResult<()> {
        Ok(())
    }

    fn message_sink(
        &self,
        _ctx: &ModuleContext<'_>,
        _timestamp: i64,
        _sender_id: ObjectId,
        _message: i64,
        _data: &[serde_json::Value],
    ) -> KernelResult<()> {
        Ok(())
    }

    fn configuration_form(&self, _ctx: &ModuleContext<'_>) -> KernelResult<String> {
        Ok("{}".to_string())
    }

    fn configuration_for_parent(&self, _ctx: &ModuleContext<'_>) -> KernelResult<String> {
        Ok("{}".to_string())
    }

    fn translate(&self, _ctx: &ModuleContext<'_>, text: &str) -> String {
        text.to_string()
    }

    /// Dispatch an exposed function
    ///
    /// Arguments are already checked against the registered signature.
    fn call(
        &self,
        _ctx: &ModuleContext<'_>,
        function: &str,
        _args: &[serde_json::Value],
    ) -> KernelResult<serde_json::Value> {
        Err(KernelError::not_found("Function", function))
    }
}
