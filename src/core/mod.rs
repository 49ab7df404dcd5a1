//! Core identity types
//!
//! Addresses, dense class ids, generational object ids, the slot array that
//! issues them, and interned names.

pub mod ids;
pub mod intern;
pub mod slots;

#[cfg(test)]
mod tests;

pub use ids::{ClassId, NativePtr, ObjectId, ScriptClassId, SlotKey};
pub use intern::StringName;
pub use slots::SlotArray;
