//! Module loader
//!
//! Module classes are registered explicitly: a class name, a factory and
//! the list of functions the class exposes with their typed parameters.
//! Binding a `module.json` manifest to its class synthesizes one
//! `{PREFIX}_{Function}` entry per exposed function.

use dashmap::DashMap;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument, warn};

use ips_config::{LibraryManifest, ModuleManifest};
use ips_core::{KernelError, KernelResult, ModuleType};

use crate::module::Module;

/// Names that are lifecycle hooks and never exposed as functions
pub const RESERVED_FUNCTION_NAMES: [&str; 11] = [
    "Create",
    "Destroy",
    "ApplyChanges",
    "ReceiveData",
    "ForwardData",
    "RequestAction",
    "MessageSink",
    "GetConfigurationForm",
    "GetConfigurationForParent",
    "Translate",
    "GetCompatibleParents",
];

/// Declared type of a function parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    Boolean,
    Integer,
    Float,
    String,
    /// JSON array or object
    Array,
    /// Anything
    Variant,
}

impl ParameterType {
    /// Whether `value` can be passed for a parameter of this type
    pub fn accepts(self, value: &serde_json::Value) -> bool {
        match self {
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Float => value.is_number(),
            ParameterType::String => value.is_string(),
            ParameterType::Array => value.is_array() || value.is_object(),
            ParameterType::Variant => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub parameter_type: ParameterType,
}

/// Name and parameters of an exposed function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, parameter_type: ParameterType) -> Self {
        self.parameters.push(Parameter {
            name: name.into(),
            parameter_type,
        });
        self
    }
}

/// Factory creating a fresh module object per instance
pub type ModuleFactory = Arc<dyn Fn() -> Box<dyn Module> + Send + Sync>;

/// A registered module class
pub struct ModuleClass {
    name: String,
    factory: ModuleFactory,
    functions: Vec<FunctionSignature>,
}

impl ModuleClass {
    pub fn new<M, F>(name: impl Into<String>, factory: F) -> Self
    where
        M: Module + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Arc::new(move || Box::new(factory()) as Box<dyn Module>),
            functions: Vec::new(),
        }
    }

    /// Expose a function through the generated function table
    pub fn with_function(mut self, signature: FunctionSignature) -> Self {
        self.functions.push(signature);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn functions(&self) -> &[FunctionSignature] {
        &self.functions
    }

    pub fn instantiate(&self) -> Box<dyn Module> {
        (self.factory)()
    }
}

impl std::fmt::Debug for ModuleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleClass")
            .field("name", &self.name)
            .field("functions", &self.functions)
            .finish_non_exhaustive()
    }
}

/// A module manifest bound to its library and class
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub manifest: ModuleManifest,
    pub library_id: String,
    pub class_name: String,
}

/// A generated `{PREFIX}_{Function}` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub module_id: String,
    pub function: String,
    pub parameters: Vec<Parameter>,
}

/// Module Loader
#[derive(Default)]
pub struct ModuleLoader {
    /// Classes survive a reset, like loaded code
    classes: DashMap<String, Arc<ModuleClass>>,
    libraries: RwLock<IndexMap<String, Arc<LibraryManifest>>>,
    modules: RwLock<IndexMap<String, Arc<ModuleEntry>>>,
    functions: DashMap<String, Arc<FunctionEntry>>,
}

impl ModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_libraries(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<LibraryManifest>>> {
        self.libraries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_libraries(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<LibraryManifest>>> {
        self.libraries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_modules(&self) -> RwLockReadGuard<'_, IndexMap<String, Arc<ModuleEntry>>> {
        self.modules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_modules(&self) -> RwLockWriteGuard<'_, IndexMap<String, Arc<ModuleEntry>>> {
        self.modules.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Classes ====================

    /// Register a class; reserved or `__`-prefixed function names are rejected
    #[instrument(skip(self, class), fields(class = %class.name))]
    pub fn register_class(&self, class: ModuleClass) -> KernelResult<()> {
        if class.name.is_empty() {
            return Err(KernelError::invalid("class name cannot be empty"));
        }
        for function in &class.functions {
            let name = function.name.as_str();
            if name.is_empty() || name.starts_with("__") || RESERVED_FUNCTION_NAMES.contains(&name) {
                return Err(KernelError::invalid(format!(
                    "function '{}' of class {} cannot be exposed",
                    name, class.name
                )));
            }
        }
        debug!("Registered class with {} functions", class.functions.len());
        self.classes.insert(class.name.clone(), Arc::new(class));
        Ok(())
    }

    pub fn class_exists(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn class(&self, name: &str) -> KernelResult<Arc<ModuleClass>> {
        self.classes
            .get(name)
            .map(|class| Arc::clone(class.value()))
            .ok_or_else(|| KernelError::not_found("Class", name))
    }

    // ==================== Libraries & modules ====================

    pub fn register_library(&self, manifest: LibraryManifest) {
        info!("Registered library '{}' ({})", manifest.name, manifest.id);
        self.write_libraries()
            .insert(manifest.id.clone(), Arc::new(manifest));
    }

    /// Bind a module manifest to its class and generate its functions
    #[instrument(skip(self, manifest), fields(module = %manifest.id))]
    pub fn register_module(&self, manifest: ModuleManifest, library_id: &str) -> KernelResult<()> {
        let class_name = manifest.class_name();
        let class = self.class(&class_name)?;

        for function in class.functions() {
            let name = format!("{}_{}", manifest.prefix, function.name);
            if self.functions.contains_key(&name) {
                warn!("Function {} already exists, keeping the first definition", name);
                continue;
            }
            self.functions.insert(
                name.clone(),
                Arc::new(FunctionEntry {
                    name,
                    module_id: manifest.id.clone(),
                    function: function.name.clone(),
                    parameters: function.parameters.clone(),
                }),
            );
        }

        debug!("Registered module '{}' as class {}", manifest.name, class_name);
        self.write_modules().insert(
            manifest.id.clone(),
            Arc::new(ModuleEntry {
                manifest,
                library_id: library_id.to_string(),
                class_name,
            }),
        );
        Ok(())
    }

    /// Load `library.json` and all module folders of `dir`
    pub fn load_library(&self, dir: impl AsRef<Path>) -> KernelResult<String> {
        let folder = ips_config::load_library(dir)?;
        let library_id = folder.manifest.id.clone();
        self.register_library(folder.manifest);
        for module in folder.modules {
            self.register_module(module.manifest, &library_id)?;
        }
        Ok(library_id)
    }

    /// Load a single module folder into `library_id`
    pub fn load_module(&self, dir: impl AsRef<Path>, library_id: &str) -> KernelResult<String> {
        let manifest = ips_config::load_module(dir)?;
        let module_id = manifest.id.clone();
        self.register_module(manifest, library_id)?;
        Ok(module_id)
    }

    pub fn library_exists(&self, library_id: &str) -> bool {
        self.read_libraries().contains_key(library_id)
    }

    pub fn get_library(&self, library_id: &str) -> KernelResult<Arc<LibraryManifest>> {
        self.read_libraries()
            .get(library_id)
            .cloned()
            .ok_or_else(|| KernelError::not_found("Library", library_id))
    }

    pub fn get_library_list(&self) -> Vec<String> {
        self.read_libraries().keys().cloned().collect()
    }

    pub fn get_library_modules(&self, library_id: &str) -> Vec<String> {
        self.read_modules()
            .values()
            .filter(|m| m.library_id == library_id)
            .map(|m| m.manifest.id.clone())
            .collect()
    }

    pub fn module_exists(&self, module_id: &str) -> bool {
        self.read_modules().contains_key(module_id)
    }

    pub fn get_module(&self, module_id: &str) -> KernelResult<Arc<ModuleEntry>> {
        self.read_modules()
            .get(module_id)
            .cloned()
            .ok_or_else(|| KernelError::not_found("Module", module_id))
    }

    pub fn get_module_list(&self) -> Vec<String> {
        self.read_modules().keys().cloned().collect()
    }

    pub fn get_module_list_by_type(&self, module_type: ModuleType) -> Vec<String> {
        self.read_modules()
            .values()
            .filter(|m| m.manifest.module_type == module_type)
            .map(|m| m.manifest.id.clone())
            .collect()
    }

    /// Whether `module_id` can be connected below `parent_module_id`
    ///
    /// True when the parent implements one of the module's parent
    /// requirements.
    pub fn is_module_compatible(&self, module_id: &str, parent_module_id: &str) -> KernelResult<bool> {
        let module = self.get_module(module_id)?;
        let parent = self.get_module(parent_module_id)?;
        Ok(module
            .manifest
            .parent_requirements
            .iter()
            .any(|guid| parent.manifest.implemented.contains(guid)))
    }

    /// Modules `module_id` can be connected to as a child
    pub fn get_compatible_modules(&self, module_id: &str) -> KernelResult<Vec<String>> {
        let module = self.get_module(module_id)?;
        Ok(self
            .read_modules()
            .values()
            .filter(|parent| {
                module
                    .manifest
                    .parent_requirements
                    .iter()
                    .any(|guid| parent.manifest.implemented.contains(guid))
            })
            .map(|parent| parent.manifest.id.clone())
            .collect())
    }

    // ==================== Functions ====================

    pub fn function_exists(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn get_function(&self, name: &str) -> KernelResult<Arc<FunctionEntry>> {
        self.functions
            .get(name)
            .map(|f| Arc::clone(f.value()))
            .ok_or_else(|| KernelError::not_found("Function", name))
    }

    /// All generated function names, sorted
    pub fn get_function_list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.iter().map(|f| f.key().clone()).collect();
        names.sort();
        names
    }

    pub fn get_function_list_by_module(&self, module_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .iter()
            .filter(|f| f.module_id == module_id)
            .map(|f| f.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Forget libraries, modules and generated functions
    pub fn reset(&self) {
        self.write_libraries().clear();
        self.write_modules().clear();
        self.functions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ips_core::ErrorKind;

    struct Blank;

    impl Module for Blank {}

    fn make_test_loader() -> ModuleLoader {
        let loader = ModuleLoader::new();
        loader
            .register_class(
                ModuleClass::new("TestDevice", || Blank)
                    .with_function(FunctionSignature::new("UpdateValue"))
                    .with_function(
                        FunctionSignature::new("SetLevel").param("Level", ParameterType::Integer),
                    ),
            )
            .unwrap();
        loader
            .register_class(ModuleClass::new("TestIO", || Blank))
            .unwrap();
        loader
    }

    fn make_test_manifest(id: &str, name: &str, module_type: ModuleType, prefix: &str) -> ModuleManifest {
        ModuleManifest::new(id, name, module_type, prefix)
    }

    #[test]
    fn test_reserved_names_rejected() {
        let loader = ModuleLoader::new();
        for name in ["ApplyChanges", "__construct", "GetCompatibleParents"] {
            let class = ModuleClass::new("Bad", || Blank).with_function(FunctionSignature::new(name));
            assert_eq!(
                loader.register_class(class).unwrap_err().kind(),
                ErrorKind::InvalidArgument
            );
        }
    }

    #[test]
    fn test_register_module_generates_functions() {
        let loader = make_test_loader();
        loader
            .register_module(
                make_test_manifest("{AAAA0000-0000-0000-0000-000000000001}", "Test Device", ModuleType::Device, "TD"),
                "{LIB}",
            )
            .unwrap();

        assert!(loader.function_exists("TD_UpdateValue"));
        let function = loader.get_function("TD_SetLevel").unwrap();
        assert_eq!(function.function, "SetLevel");
        assert_eq!(function.parameters[0].parameter_type, ParameterType::Integer);
        assert_eq!(
            loader.get_function_list_by_module("{AAAA0000-0000-0000-0000-000000000001}"),
            vec!["TD_SetLevel", "TD_UpdateValue"]
        );
        assert_eq!(
            loader.get_module("{AAAA0000-0000-0000-0000-000000000001}").unwrap().class_name,
            "TestDevice"
        );
        assert_eq!(loader.get_library_modules("{LIB}").len(), 1);
    }

    #[test]
    fn test_missing_class() {
        let loader = make_test_loader();
        let err = loader
            .register_module(make_test_manifest("{X}", "Unknown Thing", ModuleType::Core, "UT"), "{LIB}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!loader.module_exists("{X}"));
    }

    #[test]
    fn test_compatibility() {
        let loader = make_test_loader();
        loader
            .register_module(
                make_test_manifest("{DEV}", "Test Device", ModuleType::Device, "TD")
                    .with_parent_requirements(&["{IFACE}"]),
                "{LIB}",
            )
            .unwrap();
        loader
            .register_module(
                make_test_manifest("{IO}", "Test IO", ModuleType::Io, "TIO").with_implemented(&["{IFACE}"]),
                "{LIB}",
            )
            .unwrap();

        assert!(loader.is_module_compatible("{DEV}", "{IO}").unwrap());
        assert!(!loader.is_module_compatible("{IO}", "{DEV}").unwrap());
        assert_eq!(loader.get_compatible_modules("{DEV}").unwrap(), vec!["{IO}"]);
        assert_eq!(loader.get_module_list_by_type(ModuleType::Io), vec!["{IO}"]);
    }

    #[test]
    fn test_reset_keeps_classes() {
        let loader = make_test_loader();
        loader
            .register_module(make_test_manifest("{DEV}", "Test Device", ModuleType::Device, "TD"), "{LIB}")
            .unwrap();
        loader.reset();
        assert!(loader.get_module_list().is_empty());
        assert!(!loader.function_exists("TD_UpdateValue"));
        assert!(loader.class_exists("TestDevice"));
    }
}
