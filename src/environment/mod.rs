//! Environment - one scripting runtime instance and everything bound to it
//!
//! Design: the environment owns the runtime, the native host adapter, the
//! class registry, the handle table and the value pool. It is confined to
//! the thread that created it; every mutating entry point checks this.
//!
//! Lifecycle, in the order an embedder drives it:
//! 1. [`Environment::wrap`] - construct around a runtime and a host
//! 2. class registration
//! 3. object binding (`bind_pointer`, `bind_host_object`, `bind_value_type`)
//! 4. periodic [`Environment::update`], occasional [`Environment::gc`]
//! 5. drop, which force-finalizes every remaining handle
//!
//! Collector finalization is best effort. Nothing here relies on it for
//! correctness: the handle table is the authoritative list of what is still
//! bound, and the shutdown sweep releases whatever the collector never did.

mod binding;
mod modules;
mod references;
mod stats;
mod symbols;
mod timers;

#[cfg(feature = "debugger")]
mod debugger;
#[cfg(feature = "sourcemap")]
mod sourcemap;


pub use modules::{ModuleLoader, ModuleResolver, ModuleSource, ModuleTables};
pub use stats::{Counters, Statistics};
pub use symbols::{Symbol, SymbolTable};
pub use timers::{TimerId, TimerManager};

#[cfg(feature = "debugger")]
pub use debugger::Debugger;
#[cfg(feature = "sourcemap")]
pub use sourcemap::{SourceMapper, SourcePosition};

use crate::allocator::VariantAllocator;
use crate::config::BridgeConfig;
use crate::core::{intern, ClassId, NativePtr, ObjectId, ScriptClassId, StringName};
use crate::errors::Result;
use crate::handles::{HandleTable, Teardown};
use crate::logging::console::{self, LogSeverity};
use crate::logging::{log_environment_created, log_sweep_complete, log_sweep_start, perf};
use crate::registry::{ClassInfo, ClassKind, ClassRegistry, Finalizer, ScriptClassEntry, ScriptClassInfo};
use crate::runtime::{NativeHost, ScriptRuntime};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct Environment<R: ScriptRuntime, H: NativeHost> {
    thread_id: ThreadId,
    runtime: R,
    host: H,
    config: BridgeConfig,

    classes: ClassRegistry,
    objects: HandleTable<R::Object>,
    symbols: SymbolTable<R::Symbol>,
    variants: Arc<VariantAllocator>,

    modules: ModuleTables,
    timers: TimerManager,
    last_update: Instant,
    microtasks_run: bool,
    battery_save_mode: bool,

    counters: Counters,
    torn_down: bool,

    #[cfg(feature = "debugger")]
    debugger: Option<Box<dyn Debugger>>,
    #[cfg(feature = "sourcemap")]
    source_mapper: Option<Box<dyn SourceMapper>>,
}

impl<R: ScriptRuntime, H: NativeHost> Environment<R, H> {
    /// Construct with the default configuration
    pub fn new(runtime: R, host: H) -> Self {
        Self::wrap(runtime, host, BridgeConfig::default())
    }

    /// Construct an environment owning `runtime` and `host`
    ///
    /// The calling thread becomes the only thread allowed to use it.
    pub fn wrap(mut runtime: R, host: H, config: BridgeConfig) -> Self {
        let symbols = SymbolTable::new(|description| runtime.new_symbol(description));
        let variants = Arc::new(VariantAllocator::with_page_size(
            config.allocator.page_size,
            config.allocator.max_page_size,
        ));

        let battery_save_mode = config.environment.battery_save_mode;
        if battery_save_mode {
            runtime.set_battery_save_mode(true);
        }

        let current = thread::current();
        log_environment_created(
            current.name().unwrap_or("<unnamed>"),
            config.environment.initial_object_capacity,
        );

        Self {
            thread_id: current.id(),
            runtime,
            host,
            classes: ClassRegistry::with_capacity(config.environment.initial_class_capacity),
            objects: HandleTable::with_capacity(config.environment.initial_object_capacity),
            symbols,
            variants,
            modules: ModuleTables::new(),
            timers: TimerManager::new(),
            last_update: Instant::now(),
            microtasks_run: false,
            battery_save_mode,
            counters: Counters::default(),
            torn_down: false,
            #[cfg(feature = "debugger")]
            debugger: None,
            #[cfg(feature = "sourcemap")]
            source_mapper: None,
            config,
        }
    }

    /// Fatal unless called on the thread that created the environment
    ///
    /// Class finalizers are `Rc` closures, so the environment is neither
    /// `Send` nor `Sync` and safe code cannot reach it from another thread.
    /// The check still runs on every mutating entry point to catch embedders
    /// that smuggle it across through raw pointers.
    #[inline]
    pub fn check_internal_state(&self) {
        assert!(
            thread::current().id() == self.thread_id,
            "environment accessed from a thread other than its owner ({:?})",
            self.thread_id
        );
    }

    /// The scripting runtime this environment wraps
    #[inline]
    pub fn unwrap(&self) -> &R {
        &self.runtime
    }

    #[inline]
    pub fn runtime_mut(&mut self) -> &mut R {
        self.check_internal_state();
        &mut self.runtime
    }

    #[inline]
    pub fn host(&self) -> &H {
        &self.host
    }

    #[inline]
    pub fn host_mut(&mut self) -> &mut H {
        self.check_internal_state();
        &mut self.host
    }

    #[inline]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Handle table, for read-only queries
    #[inline]
    pub fn objects(&self) -> &HandleTable<R::Object> {
        &self.objects
    }

    #[inline]
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Value pool, shareable with threads that dispose value payloads
    #[inline]
    pub fn variants(&self) -> &Arc<VariantAllocator> {
        &self.variants
    }

    #[inline]
    pub fn counters(&self) -> Counters {
        self.counters
    }

    #[inline]
    pub fn get_symbol(&self, symbol: Symbol) -> &R::Symbol {
        self.symbols.get(symbol)
    }

    // ========================================================================
    // Classes
    // ========================================================================

    pub fn register_class(&mut self, kind: ClassKind, name: impl Into<StringName>) -> Result<ClassId> {
        self.check_internal_state();
        self.classes.register(kind, name)
    }

    pub fn register_class_with_finalizer(
        &mut self,
        kind: ClassKind,
        name: impl Into<StringName>,
        finalizer: Finalizer,
    ) -> Result<ClassId> {
        self.check_internal_state();
        self.classes.register_with_finalizer(kind, name, finalizer)
    }

    /// Class metadata; do not hold across a registration
    pub fn get_native_class(&self, class_id: ClassId) -> Result<&ClassInfo> {
        self.classes.get(class_id)
    }

    pub fn find_host_class(&self, name: &str) -> Option<ClassId> {
        self.classes.lookup_by_name(name)
    }

    pub fn add_script_subclass(&mut self, info: ScriptClassInfo) -> Result<ScriptClassId> {
        self.check_internal_state();
        self.classes.add_script_subclass(info)
    }

    pub fn get_script_class(&self, id: ScriptClassId) -> Result<&ScriptClassEntry> {
        self.classes.get_script_class(id)
    }

    pub fn find_script_class(&self, id: ScriptClassId) -> Option<&ScriptClassEntry> {
        self.classes.find_script_class(id)
    }

    // ========================================================================
    // Object queries
    // ========================================================================

    /// Whether `pointer` is bound
    #[inline]
    pub fn check_object(&self, pointer: NativePtr) -> bool {
        self.objects.lookup(pointer).is_some()
    }

    #[inline]
    pub fn get_object_id(&self, pointer: NativePtr) -> Option<ObjectId> {
        self.objects.lookup(pointer)
    }

    /// Live wrapper of `pointer`
    pub fn get_object(&self, pointer: NativePtr) -> Option<R::Object> {
        self.objects
            .get_wrapper(pointer)
            .filter(|wrapper| self.runtime.is_alive(wrapper))
            .cloned()
    }

    pub fn find_object_class(&self, pointer: NativePtr) -> Option<&ClassInfo> {
        let handle = self.objects.handle(pointer)?;
        self.classes.find(handle.class_id())
    }

    pub fn get_object_type(&self, pointer: NativePtr) -> Option<ClassKind> {
        self.find_object_class(pointer).map(ClassInfo::kind)
    }

    pub fn get_object_class_id(&self, pointer: NativePtr) -> Option<ClassId> {
        self.objects.handle(pointer).map(|handle| handle.class_id())
    }

    #[inline]
    pub fn is_persistent(&self, pointer: NativePtr) -> bool {
        self.objects.is_persistent(pointer)
    }

    // ========================================================================
    // Modules
    // ========================================================================

    pub fn add_module_loader(&mut self, module_id: impl Into<StringName>, loader: Box<dyn ModuleLoader>) -> Result<()> {
        self.check_internal_state();
        self.modules.add_loader(module_id, loader)
    }

    pub fn find_module_loader(&self, module_id: &str) -> Option<&dyn ModuleLoader> {
        self.modules.find_loader(module_id)
    }

    /// Resolvers are consulted in the order they were added
    pub fn add_module_resolver(&mut self, resolver: Box<dyn ModuleResolver>) {
        self.check_internal_state();
        self.modules.add_resolver(resolver);
    }

    pub fn find_module_resolver(&self, module_id: &str) -> Option<(&dyn ModuleResolver, String)> {
        self.modules.find_resolver(module_id)
    }

    pub fn locate_module(&self, module_id: &str) -> Option<ModuleSource> {
        self.modules.locate(module_id)
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    pub fn timers(&self) -> &TimerManager {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimerManager {
        self.check_internal_state();
        &mut self.timers
    }

    /// Ask for a microtask checkpoint on the next `update()`
    pub fn notify_microtasks_run(&mut self) {
        self.check_internal_state();
        self.microtasks_run = true;
    }

    /// Request a full collection and process whatever it finalized
    pub fn gc(&mut self) {
        self.check_internal_state();
        let _perf = perf::track("gc");

        self.runtime.collect_garbage();
        let finalized = self.process_finalized();
        let disposed = self.process_disposed();
        debug!(event = "gc", finalized, disposed, live = self.objects.bound_count(), "collection processed");
    }

    /// Per-frame tick driven by the host
    pub fn update(&mut self) {
        self.check_internal_state();
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_update);
        self.last_update = now;
        self.update_with_elapsed(elapsed);
    }

    /// [`update`](Self::update) with an explicit time step
    pub fn update_with_elapsed(&mut self, elapsed: Duration) {
        self.check_internal_state();

        if self.microtasks_run {
            self.microtasks_run = false;
            self.runtime.perform_microtask_checkpoint();
            self.counters.microtask_checkpoints += 1;
        }

        if self.timers.tick(elapsed) > 0 {
            self.microtasks_run = true;
        }

        #[cfg(feature = "debugger")]
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.update();
        }

        self.process_finalized();
        self.process_disposed();
    }

    pub fn set_battery_save_mode(&mut self, enabled: bool) {
        self.check_internal_state();
        self.battery_save_mode = enabled;
        self.runtime.set_battery_save_mode(enabled);
    }

    #[inline]
    pub fn is_battery_save_mode(&self) -> bool {
        self.battery_save_mode
    }

    // ========================================================================
    // Debugging
    // ========================================================================

    #[cfg(feature = "debugger")]
    pub fn start_debugger(&mut self, debugger: Box<dyn Debugger>) {
        self.check_internal_state();
        if self.debugger.replace(debugger).is_some() {
            warn!(event = "debugger_replaced", "previous debugger session dropped");
        }
    }

    #[cfg(feature = "sourcemap")]
    pub fn set_source_mapper(&mut self, mapper: Box<dyn SourceMapper>) {
        self.check_internal_state();
        self.source_mapper = Some(mapper);
    }

    /// Translate generated positions in a stack trace to original sources
    #[cfg(feature = "sourcemap")]
    pub fn handle_source_map(&self, trace: &str) -> String {
        match self.source_mapper.as_deref() {
            Some(mapper) => sourcemap::translate(mapper, trace),
            None => trace.to_string(),
        }
    }

    /// Without source map support traces pass through unchanged
    #[cfg(not(feature = "sourcemap"))]
    pub fn handle_source_map(&self, trace: &str) -> String {
        trace.to_string()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn statistics(&self) -> Statistics {
        Statistics {
            objects: self.objects.len(),
            bound: self.objects.bound_count(),
            persistent: self.objects.persistent_count(),
            native_classes: self.classes.len(),
            host_classes: self.classes.host_class_count(),
            script_classes: self.classes.script_class_count(),
            module_loaders: self.modules.loader_count(),
            module_resolvers: self.modules.resolver_count(),
            timers: self.timers.len(),
            interned_names: intern::interned_count(),
            battery_save_mode: self.battery_save_mode,
            allocator: self.variants.stats(),
            counters: self.counters,
        }
    }

    /// Write statistics to the console sinks and return them
    pub fn print_statistics(&self) -> Statistics {
        let stats = self.statistics();
        for line in stats.lines() {
            console::write(LogSeverity::Log, &line);
        }
        stats
    }

    // ========================================================================
    // Shutdown
    // ========================================================================

    /// Force-finalize every remaining handle
    ///
    /// Runs at most once; the drop of the environment calls it too. Pending
    /// collector notifications are processed first so nothing is released
    /// twice.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.check_internal_state();
        self.torn_down = true;

        #[cfg(feature = "debugger")]
        if let Some(mut debugger) = self.debugger.take() {
            debugger.on_shutdown();
        }

        self.process_finalized();
        self.process_disposed();

        let start = Instant::now();
        log_sweep_start(self.objects.bound_count());

        // releasing native objects never reaches back into the table
        let mut released = 0;
        for pointer in self.objects.pointers() {
            let free = !self.objects.is_persistent(pointer);
            if self.free_object(pointer, Teardown::Shutdown, free) {
                released += 1;
            }
        }

        // slots that were reserved but never attached
        let reserved: Vec<ObjectId> = self.objects.iter().map(|(id, _)| id).collect();
        for id in reserved {
            self.objects.release(id);
        }

        // the pool reclaims undisposed payloads when it is dropped
        let leaked_values = self.variants.live();
        log_sweep_complete(start.elapsed().as_micros() as u64, released, leaked_values);
    }

    #[inline]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<R: ScriptRuntime, H: NativeHost> Drop for Environment<R, H> {
    fn drop(&mut self) {
        if self.config.environment.sweep_on_drop {
            self.shutdown();
        } else if !self.torn_down && !self.objects.is_empty() {
            warn!(
                event = "handles_leaked",
                live = self.objects.bound_count(),
                "environment dropped without a shutdown sweep"
            );
        }
    }
}
