//! Class registry - metadata for every bindable native type
//!
//! Design: two dense tables, one for native classes and one for classes
//! defined in script space. Host object classes are additionally indexed by
//! name; that index is the only way to discover a class without its id.
//!
//! Entries are never removed. `get` hands out references into a growable
//! table, so callers must not hold one across a registration.

mod class_info;


pub use class_info::{ClassInfo, ClassKind, Finalizer, ScriptClassEntry, ScriptClassInfo};

use crate::core::{ClassId, ScriptClassId, StringName};
use crate::errors::{BridgeError, Result};
use crate::logging::log_class_registered;
use rustc_hash::FxHashMap;

pub struct ClassRegistry {
    native_classes: Vec<ClassInfo>,
    host_index: FxHashMap<StringName, ClassId>,
    script_classes: Vec<ScriptClassEntry>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            native_classes: Vec::with_capacity(capacity),
            host_index: FxHashMap::default(),
            script_classes: Vec::new(),
        }
    }

    /// Register a native class and return its dense id
    ///
    /// Host object names must be unique; other kinds may share names.
    pub fn register(&mut self, kind: ClassKind, name: impl Into<StringName>) -> Result<ClassId> {
        self.insert(kind, name.into(), None)
    }

    /// Register a native class released through `finalizer`
    pub fn register_with_finalizer(
        &mut self,
        kind: ClassKind,
        name: impl Into<StringName>,
        finalizer: Finalizer,
    ) -> Result<ClassId> {
        self.insert(kind, name.into(), Some(finalizer))
    }

    fn insert(&mut self, kind: ClassKind, name: StringName, finalizer: Option<Finalizer>) -> Result<ClassId> {
        if kind == ClassKind::HostObject {
            if let Some(&existing) = self.host_index.get(&name) {
                return Err(BridgeError::DuplicateClass { name, existing });
            }
        }

        let id = ClassId::new(self.native_classes.len() as u32);
        if kind == ClassKind::HostObject {
            self.host_index.insert(name.clone(), id);
        }

        log_class_registered(id, &name, kind);
        self.native_classes.push(ClassInfo { id, name, kind, finalizer });
        Ok(id)
    }

    /// Find a host object class by name
    pub fn lookup_by_name(&self, name: &str) -> Option<ClassId> {
        self.host_index.get(name).copied()
    }

    pub fn get(&self, class_id: ClassId) -> Result<&ClassInfo> {
        self.find(class_id).ok_or(BridgeError::InvalidClassId(class_id))
    }

    #[inline]
    pub fn find(&self, class_id: ClassId) -> Option<&ClassInfo> {
        self.native_classes.get(class_id.index() as usize)
    }

    #[inline]
    pub fn contains(&self, class_id: ClassId) -> bool {
        (class_id.index() as usize) < self.native_classes.len()
    }

    /// Register a script class extending a host object class
    pub fn add_script_subclass(&mut self, info: ScriptClassInfo) -> Result<ScriptClassId> {
        let base = self.get(info.native_class)?;
        if base.kind != ClassKind::HostObject {
            return Err(BridgeError::NotHostObject {
                class_id: base.id,
                name: base.name.clone(),
            });
        }

        let id = ScriptClassId::new(self.script_classes.len() as u32);
        tracing::debug!(
            event = "script_class_registered",
            script_class = %id,
            name = %info.name,
            module = %info.module_id,
            base = %info.native_class,
            "script class registered"
        );
        self.script_classes.push(ScriptClassEntry { id, info });
        Ok(id)
    }

    pub fn get_script_class(&self, id: ScriptClassId) -> Result<&ScriptClassEntry> {
        self.find_script_class(id).ok_or(BridgeError::InvalidScriptClassId(id))
    }

    #[inline]
    pub fn find_script_class(&self, id: ScriptClassId) -> Option<&ScriptClassEntry> {
        self.script_classes.get(id.index() as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> + '_ {
        self.native_classes.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.native_classes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.native_classes.is_empty()
    }

    #[inline]
    pub fn host_class_count(&self) -> usize {
        self.host_index.len()
    }

    #[inline]
    pub fn script_class_count(&self) -> usize {
        self.script_classes.len()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
