//! Class metadata - immutable once registered

use crate::core::{ClassId, NativePtr, ScriptClassId, StringName};
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

/// Category of a bindable native type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    /// Identity-tracked host object, participates in the refcount bridge
    HostObject,
    /// Value type, copied into a pooled payload owned by its wrapper
    HostPrimitiveValue,
    /// Script class extending a host object class
    ScriptDefinedSubclass,
    /// Any other native type, released through its class finalizer
    Other,
}

impl ClassKind {
    #[inline]
    pub fn is_identity_tracked(self) -> bool {
        self != ClassKind::HostPrimitiveValue
    }
}

/// Release callback for non-host classes
///
/// `free` is false when the object is persistent and must outlive its
/// wrapper; the finalizer should then only drop bridge-held resources.
pub type Finalizer = Rc<dyn Fn(NativePtr, bool)>;

#[derive(Clone)]
pub struct ClassInfo {
    pub(crate) id: ClassId,
    pub(crate) name: StringName,
    pub(crate) kind: ClassKind,
    pub(crate) finalizer: Option<Finalizer>,
}

impl ClassInfo {
    #[inline]
    pub fn id(&self) -> ClassId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &StringName {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    #[inline]
    pub fn finalizer(&self) -> Option<&Finalizer> {
        self.finalizer.as_ref()
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("finalizer", &self.finalizer.is_some())
            .finish()
    }
}

/// Metadata of a class defined in script space on top of a host class
///
/// The annotation lists mirror the symbol-tagged arrays a script class
/// template carries (signals, exported properties, ready hooks).
#[derive(Debug, Clone, Serialize)]
pub struct ScriptClassInfo {
    pub name: StringName,
    pub module_id: String,
    pub native_class: ClassId,
    pub signals: Vec<StringName>,
    pub properties: Vec<StringName>,
    pub ready_funcs: Vec<StringName>,
    pub tool: bool,
    pub icon: Option<String>,
}

impl ScriptClassInfo {
    pub fn new(name: impl Into<StringName>, module_id: impl Into<String>, native_class: ClassId) -> Self {
        Self {
            name: name.into(),
            module_id: module_id.into(),
            native_class,
            signals: Vec::new(),
            properties: Vec::new(),
            ready_funcs: Vec::new(),
            tool: false,
            icon: None,
        }
    }

    pub fn with_signal(mut self, signal: impl Into<StringName>) -> Self {
        self.signals.push(signal.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<StringName>) -> Self {
        self.properties.push(property.into());
        self
    }

    pub fn with_ready_func(mut self, func: impl Into<StringName>) -> Self {
        self.ready_funcs.push(func.into());
        self
    }

    pub fn with_tool(mut self, tool: bool) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Stored script class entry
#[derive(Debug, Clone)]
pub struct ScriptClassEntry {
    pub(crate) id: ScriptClassId,
    pub(crate) info: ScriptClassInfo,
}

impl ScriptClassEntry {
    #[inline]
    pub fn id(&self) -> ScriptClassId {
        self.id
    }

    #[inline]
    pub fn info(&self) -> &ScriptClassInfo {
        &self.info
    }
}
