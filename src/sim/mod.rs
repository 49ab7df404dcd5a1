//! Simulated collaborators - an in-process scripting runtime and native host
//!
//! `SimRuntime` models a tracing collector over wrapper objects: script
//! holds a wrapper while it is reachable, and a collection reclaims
//! unreachable wrappers that are weak or own a value payload. Finalizer
//! delivery can be switched off to model a collector that never calls back.
//!
//! `SimHost` models intrusively reference-counted native objects at fake
//! addresses and records every release so tests can check for leaks and
//! double frees after the environment is gone.

mod host;
mod runtime;


pub use host::{HostProbe, SimHost};
pub use runtime::{SimObject, SimRuntime, SimSymbol};

use crate::core::NativePtr;
use crate::environment::Environment;
use crate::runtime::ScriptRuntime;

/// Native code takes a reference to `pointer` and tells the bridge
pub fn add_native_reference<R: ScriptRuntime>(env: &mut Environment<R, SimHost>, pointer: NativePtr) {
    env.host_mut().retain(pointer);
    env.on_reference_request(pointer, true);
}

/// Native code drops a reference to `pointer`, destroying it when allowed
///
/// Returns whether the native object was destroyed.
pub fn release_native_reference<R: ScriptRuntime>(env: &mut Environment<R, SimHost>, pointer: NativePtr) -> bool {
    let reached_zero = env.host_mut().release(pointer);
    let can_die = env.on_reference_request(pointer, false);
    if reached_zero && can_die {
        env.host_mut().destroy_native(pointer);
    }
    // the bridge may have dropped the last reference itself
    env.host().probe().is_destroyed(pointer)
}
