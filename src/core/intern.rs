//! Name interning for class names and module identifiers
//!
//! Every distinct name is stored once per process; `StringName` values are
//! cheap to clone and compare. The interner is shared by all contexts since
//! names never carry per-runtime state.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Global name interner
static INTERNER: Lazy<NameInterner> = Lazy::new(NameInterner::new);

/// Thread-safe interning table
struct NameInterner {
    names: DashMap<Arc<str>, ()>,
}

impl NameInterner {
    fn new() -> Self {
        Self {
            names: DashMap::with_capacity(1024),
        }
    }

    fn intern(&self, name: &str) -> Arc<str> {
        // Fast path: already interned
        if let Some(entry) = self.names.get(name) {
            return entry.key().clone();
        }

        let name: Arc<str> = Arc::from(name);
        self.names.entry(name).or_insert(()).key().clone()
    }

    fn len(&self) -> usize {
        self.names.len()
    }
}

/// Interned, immutable name
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringName(Arc<str>);

impl StringName {
    pub fn new(name: &str) -> Self {
        Self(INTERNER.intern(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether both names share the interned storage
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Number of distinct names interned so far in this process
pub fn interned_count() -> usize {
    INTERNER.len()
}

impl Deref for StringName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StringName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StringName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StringName {
    fn from(name: String) -> Self {
        Self::new(&name)
    }
}

impl fmt::Debug for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for StringName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
