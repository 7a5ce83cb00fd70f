//! Opaque object handles.
//!
//! A [`Handle`] is the only way extension code refers to a host object. It is
//! a plain integer on the wire and carries no meaning outside the host that
//! issued it; only the active [`Context`](crate::Context) can resolve it.

use std::fmt;

/// Opaque, runtime-issued reference to an object.
///
/// Handles are `Copy` and never dereferenced directly. The all-zero handle is
/// reserved as [`Handle::NULL`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Handle(u64);

impl Handle {
    /// The null handle. Never refers to a live object.
    pub const NULL: Handle = Handle(0);

    /// Wrap a raw handle value received from a host.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value as passed across the ABI.
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Check if this is the null handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Pack a table index and generation into a handle.
    ///
    /// Index `0` maps to raw value `1` so that no live slot ever produces
    /// [`Handle::NULL`].
    pub(crate) const fn pack(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64 + 1))
    }

    /// Split a handle back into `(index, generation)`.
    ///
    /// Returns `None` for the null handle.
    pub(crate) const fn unpack(self) -> Option<(u32, u32)> {
        let low = (self.0 & 0xFFFF_FFFF) as u32;
        if low == 0 {
            return None;
        }
        Some((low - 1, (self.0 >> 32) as u32))
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("Handle(NULL)");
        }
        write!(f, "Handle({:#x})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle() {
        assert!(Handle::NULL.is_null());
        assert!(Handle::default().is_null());
        assert_eq!(Handle::NULL.unpack(), None);
    }

    #[test]
    fn pack_never_produces_null() {
        let h = Handle::pack(0, 0);
        assert!(!h.is_null());
        assert_eq!(h.unpack(), Some((0, 0)));
    }

    #[test]
    fn pack_keeps_generation() {
        let h = Handle::pack(41, 7);
        assert_eq!(h.unpack(), Some((41, 7)));
        assert_ne!(h, Handle::pack(41, 8));
    }

    #[test]
    fn raw_round_trip_preserves_value() {
        let h = Handle::from_raw(0xdead_beef);
        assert_eq!(h.to_raw(), 0xdead_beef);
    }
}
