//! jsbridge - object lifecycle bridge between a native reference-counted
//! object model and an embedded garbage-collected scripting runtime
//!
//! Native objects cross into script space as wrappers. The bridge keeps the
//! identity map between native addresses and wrappers, decides when a native
//! object may die given both native references and wrapper reachability, and
//! releases everything still bound when the runtime instance goes away.

// Core modules
pub mod core;
pub mod errors;
pub mod registry;
pub mod handles;
pub mod allocator;
pub mod runtime;
pub mod environment;

// Ambient stack
pub mod config;
pub mod logging;

// Simulated collaborators for tools, tests and benchmarks
pub mod sim;

// Re-export commonly used items
pub use crate::core::{ClassId, NativePtr, ObjectId, ScriptClassId, StringName};
pub use allocator::{Variant, VariantAllocator, VariantHandle};
pub use config::BridgeConfig;
pub use environment::{Environment, Statistics, Symbol};
pub use errors::{BridgeError, ConfigError, Result};
pub use handles::{HandleTable, ObjectHandle, Ownership, ReferencePolicy, Teardown};
pub use registry::{ClassInfo, ClassKind, ClassRegistry, ScriptClassInfo};
pub use runtime::{NativeHost, ScriptRuntime};
