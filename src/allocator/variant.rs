//! Boxed value payloads shared between native and script representations

use crate::core::{NativePtr, SlotKey};
use serde::Serialize;
use std::fmt;

/// Host value as copied into a value-type wrapper
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Color([f32; 4]),
    Object(Option<NativePtr>),
}

impl Variant {
    pub fn type_name(&self) -> &'static str {
        match self {
            Variant::Nil => "nil",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Float(_) => "float",
            Variant::String(_) => "string",
            Variant::Vector2(_) => "vector2",
            Variant::Vector3(_) => "vector3",
            Variant::Color(_) => "color",
            Variant::Object(_) => "object",
        }
    }
}

/// Pooled variant slot, handed to the script runtime as a backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariantHandle {
    index: u32,
    generation: u32,
}

impl SlotKey for VariantHandle {
    #[inline]
    fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    fn index(self) -> u32 {
        self.index
    }

    #[inline]
    fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for VariantHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "variant#{}v{}", self.index, self.generation)
    }
}
