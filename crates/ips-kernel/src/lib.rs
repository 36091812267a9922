//! Kernel
//!
//! This crate ties the registries, the module loader and the script engine
//! into a single in-memory host kernel.
//!
//! # Key Types
//!
//! - [`Kernel`] - Composition root holding every subsystem
//! - [`Module`] - Behavior contract implemented by module classes
//! - [`ModuleContext`] - Kernel services available to a running module
//! - [`ModuleLoader`] - Libraries, modules and the generated function table
//!
//! # Re-entrancy
//!
//! Hooks run against a shared module object and take `&self`. Routing may
//! call back into the instance whose hook is still running, so a device
//! sending to its parent also receives the parent's answer to every child.

pub mod context;
pub mod debug;
pub mod kernel;
pub mod loader;
pub mod module;
pub mod state;

mod conditions;
mod formatting;
mod instances;
mod objects;
mod scripts;
mod values;

// Re-export main types
pub use context::{ModuleContext, ProfileOrPresentation};
pub use debug::{DebugMessage, DebugServer, FORMAT_BINARY};
pub use kernel::Kernel;
pub use loader::{
    FunctionEntry, FunctionSignature, ModuleClass, ModuleEntry, ModuleFactory, ModuleLoader,
    Parameter, ParameterType, RESERVED_FUNCTION_NAMES,
};
pub use module::Module;
pub use state::{Attribute, ModuleState, Property, Timer};
