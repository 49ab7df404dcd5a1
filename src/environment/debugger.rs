//! Debugger attachment point

/// Debugger session polled from `update()`
pub trait Debugger {
    /// Service pending protocol traffic
    fn update(&mut self);

    /// Called once when the environment starts tearing down
    fn on_shutdown(&mut self) {}
}
