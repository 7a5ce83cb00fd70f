//! Error types for type specification and host registration.
//!
//! ```text
//! ConfigError  - caller mistakes, detectable before any instance exists
//! HostError    - type creation inside a host (wraps ConfigError)
//! AccessError  - checked accessor failures
//! ```
//!
//! Unchecked accessor misuse (passing a handle of the wrong type to
//! [`Accessor::from_handle`](crate::Accessor::from_handle)) is not an error
//! value; it is a precondition violation.

use thiserror::Error;

use crate::Handle;
use crate::param::SpecParamKind;

/// Mistakes in a type specification or its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The spec's name is empty (or null on the wire).
    #[error("type spec name must not be empty")]
    EmptyName,

    /// `basicsize` or `itemsize` is negative.
    #[error("type spec field '{field}' must not be negative (got {value})")]
    NegativeSize { field: &'static str, value: i32 },

    /// `legacy_slots` was given for a spec that is not legacy.
    #[error("cannot specify .legacy_slots without setting .legacy=true")]
    LegacySlotsWithoutLegacyFlag,

    /// More than one spec parameter of the same kind.
    #[error("duplicate spec parameter of kind {0:?}")]
    DuplicateSpecParamKind(SpecParamKind),

    /// A spec parameter does not refer to what its kind requires.
    #[error("spec parameter of kind {kind:?} does not refer to {expected}")]
    InvalidSpecParamTarget {
        kind: SpecParamKind,
        expected: &'static str,
    },

    /// A pure struct declared directly over a builtin base with a host header.
    #[error("a pure type cannot declare its own struct over a legacy builtin base")]
    UnsupportedPureOverLegacyBase,

    /// A legacy struct declared over a pure extension base.
    #[error("a legacy type should not inherit its memory layout from a pure type")]
    LegacyOverPureBase,

    /// A garbage-collected type without a traverse slot.
    #[error("traverse function needed for type with GarbageCollected flag")]
    MissingTraverse,

    /// Unknown spec parameter kind on the wire.
    #[error("unknown spec parameter kind {0}")]
    UnknownSpecParamKind(i32),

    /// A string field cannot be represented as a NUL-terminated C string.
    #[error("type spec field '{field}' contains an interior NUL byte")]
    NulInString { field: &'static str },

    /// A wire string is not valid UTF-8.
    #[error("type spec field '{field}' is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// A wire definition record cannot be decoded.
    #[error("definition {index} is invalid: {reason}")]
    InvalidDef { index: usize, reason: &'static str },

    /// Several bases would give the new type different layout modes.
    #[error("bases disagree on whether instances carry the host header")]
    IncompatibleBaseLayouts,

    /// An instance struct does not fit the `basicsize` field.
    #[error("instance struct of {size} bytes exceeds the largest basicsize")]
    StructTooLarge { size: usize },
}

/// Errors raised by a host while creating a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The spec or its parameters are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A handle does not refer to a live object.
    #[error("unknown or stale handle {0}")]
    UnknownHandle(Handle),

    /// A handle refers to a live object that is not a type.
    #[error("handle {0} does not refer to a type")]
    NotAType(Handle),

    /// A base type does not allow subclassing.
    #[error("type '{base}' is not an acceptable base type")]
    BaseNotSubclassable { base: String },

    /// A type with the same dotted name is already registered.
    #[error("type '{name}' is already defined")]
    DuplicateTypeName { name: String },

    /// The instance size for the requested item count does not fit in memory.
    #[error("instance of '{name}' with {nitems} items is too large")]
    InstanceTooLarge { name: String, nitems: usize },
}

/// Failures of the checked accessor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The handle does not refer to a live object.
    #[error("unknown or stale handle {0}")]
    UnknownHandle(Handle),

    /// The object is not an instance of the expected type, or the type's
    /// struct is smaller than the requested one.
    #[error("handle {handle} is not an instance of a type whose struct is {expected}")]
    TypeMismatch {
        handle: Handle,
        expected: &'static str,
    },

    /// The accessor's layout mode differs from the type's.
    #[error("accessor for {expected} is {accessor} but the type is {actual}")]
    LayoutMismatch {
        expected: &'static str,
        accessor: &'static str,
        actual: &'static str,
    },
}

pub(crate) fn mode_name(legacy: bool) -> &'static str {
    if legacy { "legacy" } else { "pure" }
}
