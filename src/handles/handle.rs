//! Object handle record and binding policies

use crate::core::{ClassId, NativePtr};
use serde::Serialize;

/// Per-binding rule for whether the binding holds a native reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Native side owns the object; the wrapper is rooted until the native
    /// side unbinds it.
    NoReference,
    /// Binding holds a native reference; the wrapper is weak while script
    /// is the only owner and rooted while native code holds references too.
    Reference,
    /// Binding holds a native reference and keeps the wrapper rooted for
    /// the whole lifetime of the handle.
    ReferenceAlways,
}

impl ReferencePolicy {
    #[inline]
    pub fn takes_reference(self) -> bool {
        self != ReferencePolicy::NoReference
    }
}

/// Which side currently keeps the pair alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ownership {
    /// Wrapper is rooted, native lifetime decides
    Native,
    /// Wrapper is weak, collector decides
    Script,
    /// Wrapper is rooted and the binding holds a native reference
    Shared,
}

impl Ownership {
    #[inline]
    pub fn is_weak(self) -> bool {
        self == Ownership::Script
    }
}

/// How a binding came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Teardown {
    /// Collector finalized the wrapper
    Collector,
    /// Native side unbound the pointer
    Explicit,
    /// Context shutdown swept the handle
    Shutdown,
}

impl Teardown {
    pub fn as_str(self) -> &'static str {
        match self {
            Teardown::Collector => "collector",
            Teardown::Explicit => "explicit",
            Teardown::Shutdown => "shutdown",
        }
    }
}

/// Bridge-side record of one native pointer and its script wrapper
///
/// The handle never owns the native object; it records identity, the
/// wrapper relationship and whether the binding took a native reference.
#[derive(Debug, Clone)]
pub struct ObjectHandle<W> {
    pub(crate) class_id: ClassId,
    pub(crate) pointer: Option<NativePtr>,
    pub(crate) wrapper: Option<W>,
    pub(crate) policy: ReferencePolicy,
    pub(crate) ownership: Ownership,
    pub(crate) holds_reference: bool,
    pub(crate) wrapper_alive: bool,
    pub(crate) release_deferred: bool,
}

impl<W> ObjectHandle<W> {
    pub(crate) fn reserved(class_id: ClassId) -> Self {
        Self {
            class_id,
            pointer: None,
            wrapper: None,
            policy: ReferencePolicy::NoReference,
            ownership: Ownership::Native,
            holds_reference: false,
            wrapper_alive: false,
            release_deferred: false,
        }
    }

    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    #[inline]
    pub fn pointer(&self) -> Option<NativePtr> {
        self.pointer
    }

    #[inline]
    pub fn wrapper(&self) -> Option<&W> {
        self.wrapper.as_ref()
    }

    #[inline]
    pub fn policy(&self) -> ReferencePolicy {
        self.policy
    }

    #[inline]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    #[inline]
    pub fn holds_reference(&self) -> bool {
        self.holds_reference
    }

    /// Bridge-side belief that the wrapper has not been collected
    #[inline]
    pub fn is_wrapper_alive(&self) -> bool {
        self.wrapper_alive && self.wrapper.is_some()
    }

    /// Native death was suppressed and handed over to the collector
    #[inline]
    pub fn is_release_deferred(&self) -> bool {
        self.release_deferred
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.pointer.is_some()
    }
}
