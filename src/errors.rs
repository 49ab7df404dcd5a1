//! Error types for the bridge
//!
//! Only misuse of the embedding API produces an error. Absence (an unbound
//! pointer, an unknown module, a class name that was never registered) is
//! reported through `Option` or `bool` instead.

use crate::core::{ClassId, NativePtr, ObjectId, ScriptClassId, StringName};
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("host class '{name}' is already registered as {existing}")]
    DuplicateClass { name: StringName, existing: ClassId },

    #[error("invalid class id {0}")]
    InvalidClassId(ClassId),

    #[error("invalid script class id {0}")]
    InvalidScriptClassId(ScriptClassId),

    #[error("pointer {pointer} is already bound as {existing}")]
    AlreadyBound { pointer: NativePtr, existing: ObjectId },

    #[error("{class_id} ('{name}') is not a host object class")]
    NotHostObject { class_id: ClassId, name: StringName },

    #[error("{class_id} ('{name}') is not a value type class")]
    NotValueType { class_id: ClassId, name: StringName },

    #[error("{class_id} ('{name}') is a value type and cannot be identity-tracked")]
    ValueTypeNotTrackable { class_id: ClassId, name: StringName },

    #[error("no live handle for {0}")]
    UnknownObject(ObjectId),

    #[error("module loader '{0}' is already registered")]
    DuplicateModuleLoader(StringName),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
