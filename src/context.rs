//! The host capability consumed by extension code.
//!
//! A [`Context`] is supplied by the active host runtime at call time. This
//! crate never looks behind it: handle tables, reference counting and
//! garbage collection all live on the host side.
//!
//! # Threading
//!
//! [`Context::type_from_spec`] takes `&mut self` and must be called from a
//! single thread for the duration of the registration call. Whether later
//! instance access may happen concurrently is up to the host.

use std::ffi::c_void;

use crate::layout::BaseLayout;
use crate::{Handle, HostError, SpecParam, TypeFlags, TypeSpec};

/// What a host knows about a registered type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Type part of the name.
    pub name: String,
    /// Module part of the name, if any.
    pub module: Option<String>,
    pub basicsize: i32,
    pub itemsize: i32,
    pub flags: TypeFlags,
    pub legacy: bool,
    /// Provided by the host rather than built from a spec.
    pub builtin: bool,
}

impl TypeInfo {
    /// The type's layout as seen by the resolver when used as a base.
    pub fn layout(&self) -> BaseLayout {
        BaseLayout {
            legacy: self.legacy,
            builtin: self.builtin,
        }
    }
}

/// Host capability: casting and type-creation primitives.
///
/// The trait is object safe; generated accessors take `&dyn Context`.
pub trait Context {
    /// Pointer to the struct of a pure-type instance.
    ///
    /// The pointer borrows the object's memory and is valid as long as the
    /// object is alive. Behaviour for handles that are not instances of a
    /// spec-built pure type is host defined.
    fn as_struct(&self, h: Handle) -> *mut c_void;

    /// Pointer to the struct of a legacy-type instance, header included.
    fn as_struct_legacy(&self, h: Handle) -> *mut c_void;

    /// Create and register a type.
    fn type_from_spec(&mut self, spec: &TypeSpec, params: &[SpecParam]) -> Result<Handle, HostError>;

    /// Whether `h` refers to a type object.
    fn is_type(&self, h: Handle) -> bool;

    /// Items of a tuple object, or `None` if `h` is not a tuple.
    fn tuple_items(&self, h: Handle) -> Option<Vec<Handle>>;

    /// Type of a live object.
    fn type_of(&self, h: Handle) -> Option<Handle>;

    /// Description of a type object.
    fn type_info(&self, ty: Handle) -> Option<TypeInfo>;

    /// Whether `sub` is `ty` or inherits from it.
    fn is_subtype(&self, sub: Handle, ty: Handle) -> bool;

    /// Whether `h` is an instance of `ty` or of one of its subtypes.
    fn is_instance_of(&self, h: Handle, ty: Handle) -> bool {
        self.type_of(h).is_some_and(|t| self.is_subtype(t, ty))
    }
}
