//! Kernel composition root
//!
//! The `Kernel` owns every store, the module loader, the live module
//! objects, the script engine and the debug server. Operations are split
//! over several `impl Kernel` blocks by topic (objects, instances, values,
//! scripts, formatting, conditions).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use ips_config::KernelConfig;
use ips_core::constants::runlevel::KR_READY;
use ips_core::{Clock, KernelError, KernelResult, ObjectId, SystemClock};
use ips_registries::{
    CategoryStore, EventStore, InstanceStore, LinkStore, MediaStore, ObjectRegistry,
    PresentationPool, ProfileStore, Registries, ScriptStore, TemplateStore, VariableStore,
};
use ips_script::{ActionPool, ScriptEngine, ScriptExecutor};

use crate::context::ModuleContext;
use crate::debug::{DebugMessage, DebugServer};
use crate::loader::ModuleLoader;
use crate::module::Module;
use crate::state::ModuleState;

/// In-memory host kernel
pub struct Kernel {
    config: KernelConfig,
    clock: Arc<dyn Clock>,
    registries: Registries,
    loader: ModuleLoader,
    /// Live module objects, shared with every hook currently running on them
    runtimes: DashMap<ObjectId, Arc<dyn Module>>,
    states: DashMap<ObjectId, ModuleState>,
    engine: ScriptEngine<Kernel>,
    actions: ActionPool,
    debug: DebugServer,
    started: DateTime<Utc>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl Kernel {
    /// Create a kernel on the wall clock
    ///
    /// The kernel is unusable until [`reset`](Self::reset) was called.
    pub fn new(config: KernelConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: KernelConfig, clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            registries: Registries::new(config.identity_pool.clone()),
            config,
            clock,
            loader: ModuleLoader::new(),
            runtimes: DashMap::new(),
            states: DashMap::new(),
            engine: ScriptEngine::default(),
            actions: ActionPool::new(),
            debug: DebugServer::new(),
            started,
        }
    }

    /// Bring every subsystem back to its empty state
    ///
    /// Registered module classes survive; libraries and modules have to be
    /// registered again.
    #[instrument(skip(self))]
    pub fn reset(&self) {
        self.loader.reset();
        self.registries.objects.reset();
        self.registries.categories.clear();
        self.registries.instances.clear();
        self.runtimes.clear();
        self.states.clear();
        self.registries.variables.clear();
        self.registries.scripts.clear();
        self.registries.events.clear();
        self.registries.media.clear();
        self.registries.links.clear();
        self.registries.profiles.clear();
        self.debug.reset();
        self.actions.reset();
        self.registries.presentations.clear();
        self.registries.templates.clear();
        self.engine.reset();
        info!("Kernel reset");
    }

    // ==================== Subsystems ====================

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.registries.objects
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.registries.categories
    }

    pub fn instances(&self) -> &InstanceStore {
        &self.registries.instances
    }

    pub fn variables(&self) -> &VariableStore {
        &self.registries.variables
    }

    pub fn scripts(&self) -> &ScriptStore {
        &self.registries.scripts
    }

    pub fn events(&self) -> &EventStore {
        &self.registries.events
    }

    pub fn media(&self) -> &MediaStore {
        &self.registries.media
    }

    pub fn links(&self) -> &LinkStore {
        &self.registries.links
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.registries.profiles
    }

    pub fn presentations(&self) -> &PresentationPool {
        &self.registries.presentations
    }

    pub fn templates(&self) -> &TemplateStore {
        &self.registries.templates
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    pub fn engine(&self) -> &ScriptEngine<Kernel> {
        &self.engine
    }

    pub fn actions(&self) -> &ActionPool {
        &self.actions
    }

    pub fn debug(&self) -> &DebugServer {
        &self.debug
    }

    /// Replace the executor used for every script and action run
    pub fn set_script_executor(&self, executor: Arc<dyn ScriptExecutor<Kernel>>) {
        self.engine.set_executor(executor);
    }

    // ==================== Debug ====================

    pub fn enable_debug(&self, id: ObjectId, seconds: i64) {
        self.debug.enable(id, seconds, self.now());
    }

    pub fn disable_debug(&self, id: ObjectId) {
        self.debug.disable(id);
    }

    /// Record a debug message; returns the echoed line inside a debug window
    pub fn send_debug(&self, id: ObjectId, message: &str, data: &str, format: i32) -> Option<String> {
        self.debug.send(id, message, data, format, self.now())
    }

    pub fn get_debug_messages(&self, id: ObjectId) -> Vec<DebugMessage> {
        self.debug.messages(id)
    }

    // ==================== Runtime slots ====================

    pub(crate) fn insert_runtime(&self, id: ObjectId, module: Box<dyn Module>, state: ModuleState) {
        self.states.insert(id, state);
        self.runtimes.insert(id, Arc::from(module));
    }

    pub(crate) fn remove_runtime(&self, id: ObjectId) {
        self.runtimes.remove(&id);
        self.states.remove(&id);
    }

    /// Run `f` against the module object of `id`
    ///
    /// Hooks may call back into the kernel freely, including into `id`
    /// itself. The slot is not held while `f` runs, so the hook may also
    /// delete its own instance.
    pub(crate) fn with_module<R, F>(&self, id: ObjectId, f: F) -> KernelResult<R>
    where
        F: FnOnce(&dyn Module, &ModuleContext<'_>) -> KernelResult<R>,
    {
        if !self.instances().exists(id) {
            return Err(KernelError::not_found("Instance", id));
        }
        let module = self
            .runtimes
            .get(&id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| KernelError::not_found("Module object of instance", id))?;

        let ctx = ModuleContext::new(self, id);
        f(module.as_ref(), &ctx)
    }

    /// Run `f` against the host-side state of `id`
    ///
    /// `f` must not call back into the kernel.
    pub(crate) fn with_state<R, F>(&self, id: ObjectId, f: F) -> KernelResult<R>
    where
        F: FnOnce(&mut ModuleState) -> KernelResult<R>,
    {
        let mut state = self
            .states
            .get_mut(&id)
            .ok_or_else(|| KernelError::not_found("Instance", id))?;
        f(&mut state)
    }

    // ==================== Kernel info ====================

    pub fn get_kernel_version(&self) -> &str {
        &self.config.kernel.version
    }

    pub fn get_kernel_revision(&self) -> &str {
        &self.config.kernel.revision
    }

    /// Build date as unix timestamp
    pub fn get_kernel_date(&self) -> i64 {
        self.config.kernel.date
    }

    pub fn get_kernel_platform(&self) -> &str {
        &self.config.kernel.platform
    }

    pub fn get_system_language(&self) -> &str {
        &self.config.kernel.system_language
    }

    pub fn get_kernel_runlevel(&self) -> i32 {
        KR_READY
    }

    pub fn get_kernel_start_time(&self) -> i64 {
        self.started.timestamp()
    }

    pub fn get_kernel_dir(&self) -> &Path {
        &self.config.kernel.kernel_dir
    }

    pub fn get_log_dir(&self) -> &Path {
        &self.config.kernel.log_dir
    }

    pub fn get_licensee(&self) -> &str {
        &self.config.kernel.licensee
    }

    pub fn get_limit_demo(&self) -> i64 {
        self.config.kernel.limit_demo
    }

    pub fn get_limit_server(&self) -> &str {
        &self.config.kernel.limit_server
    }

    pub fn get_limit_variables(&self) -> i64 {
        self.config.kernel.limit_variables
    }

    pub fn get_limit_webfront(&self) -> i64 {
        self.config.kernel.limit_webfront
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ips_core::{ManualClock, ObjectType, VariableType};

    fn make_test_kernel() -> Kernel {
        let mut config = KernelConfig::default();
        config.identity_pool.seed = Some(1);
        let kernel = Kernel::with_clock(config, Arc::new(ManualClock::at_timestamp(1_600_000_000)));
        kernel.reset();
        kernel
    }

    #[test]
    fn test_reset_clears_everything() {
        let kernel = make_test_kernel();
        let variable = kernel.create_variable(VariableType::Integer).unwrap();
        kernel.profiles().create("Level", VariableType::Integer).unwrap();
        kernel.debug().send(variable, "x", "y", 0, kernel.now());
        assert!(kernel.engine().semaphore_enter("lock", 0));

        kernel.reset();
        assert!(!kernel.objects().exists(variable));
        assert!(!kernel.variables().exists(variable));
        assert!(kernel.profiles().list().is_empty());
        assert!(kernel.debug().messages(variable).is_empty());
        assert!(kernel.engine().semaphore_enter("lock", 0));
        assert_eq!(kernel.objects().list(), vec![ObjectId::ROOT]);
    }

    #[test]
    fn test_kernel_info() {
        let kernel = make_test_kernel();
        assert_eq!(kernel.get_kernel_runlevel(), 10103);
        assert_eq!(kernel.get_kernel_start_time(), 1_600_000_000);
        assert_eq!(kernel.get_kernel_version(), KernelConfig::default().kernel.version);
        assert_eq!(kernel.get_licensee(), "max@mustermann.de");
    }

    #[test]
    fn test_root_after_reset() {
        let kernel = make_test_kernel();
        assert_eq!(kernel.objects().object_type(ObjectId::ROOT).unwrap(), ObjectType::Category);
        assert_eq!(kernel.objects().name(ObjectId::ROOT).unwrap(), "IP-Symcon");
    }
}
