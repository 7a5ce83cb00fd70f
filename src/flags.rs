//! Type capability flags.
//!
//! Bit positions are part of the ABI shared with existing extensions and must
//! never be renumbered.

use std::ffi::c_ulong;

use bitflags::bitflags;

bitflags! {
    /// Capabilities of a type created from a [`TypeSpec`](crate::TypeSpec).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: c_ulong {
        /// The type object is heap allocated. Always set for spec-built types.
        const HEAP_ALLOCATED = 1 << 9;
        /// The type may be subclassed.
        const BASE_TYPE = 1 << 10;
        /// Instances participate in cyclic garbage collection. Advisory on
        /// hosts that do not use reference counting.
        const GARBAGE_COLLECTED = 1 << 14;
        /// The host keeps a method-cache version tag for the type.
        const VERSION_TAG_TRACKING = 1 << 18;
    }
}

impl TypeFlags {
    /// Flags every spec-built type starts with.
    pub const DEFAULT: TypeFlags = TypeFlags::HEAP_ALLOCATED.union(TypeFlags::VERSION_TAG_TRACKING);

    /// Interpret a wire value, keeping bits this crate does not name.
    pub const fn from_raw(raw: c_ulong) -> Self {
        Self::from_bits_retain(raw)
    }
}

impl Default for TypeFlags {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// `HeapAllocated | VersionTagTracking`.
pub const fn default_flags() -> TypeFlags {
    TypeFlags::DEFAULT
}

/// Bitwise OR of two flag sets.
pub const fn combine(a: TypeFlags, b: TypeFlags) -> TypeFlags {
    a.union(b)
}
