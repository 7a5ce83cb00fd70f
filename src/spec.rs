//! Type specifications.
//!
//! A [`TypeSpec`] is the declarative description an extension builds once per
//! type, usually at module initialization, and hands to the host through
//! [`Context::type_from_spec`](crate::Context::type_from_spec).
//!
//! # Example
//!
//! ```
//! use univtype::{TypeFlags, TypeSpec};
//!
//! let spec = TypeSpec::builder("geometry.Point")
//!     .basicsize(16)
//!     .flags(TypeFlags::BASE_TYPE)
//!     .doc("A point in the plane")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(spec.module_name(), Some("geometry"));
//! assert_eq!(spec.type_name(), "Point");
//! assert!(!spec.legacy);
//! ```

use std::ffi::c_void;
use std::ptr::NonNull;

use rustc_hash::FxHashMap;

use crate::def::{Def, SlotId};
use crate::flags::{TypeFlags, combine};
use crate::ConfigError;

/// Opaque pointer to a host-specific legacy slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacySlots(NonNull<c_void>);

impl LegacySlots {
    /// Wrap a slot table pointer; `None` for null.
    pub fn new(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Declarative descriptor of one extension type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    /// `"module.Type"` or `"Type"`.
    pub name: String,
    /// Byte size of the fixed part of the instance struct; 0 inherits the
    /// base's struct.
    pub basicsize: i32,
    /// Byte size of each variable-length trailing element.
    pub itemsize: i32,
    pub flags: TypeFlags,
    /// The instance struct begins with the host's object header.
    pub legacy: bool,
    /// Only allowed when `legacy` is set.
    pub legacy_slots: Option<LegacySlots>,
    /// Later entries override earlier ones with the same key.
    pub defines: Vec<Def>,
    pub doc: Option<String>,
}

impl TypeSpec {
    /// A pure spec with default flags and no struct of its own.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            basicsize: 0,
            itemsize: 0,
            flags: TypeFlags::DEFAULT,
            legacy: false,
            legacy_slots: None,
            defines: Vec::new(),
            doc: None,
        }
    }

    /// Start a fluent builder.
    pub fn builder(name: impl Into<String>) -> TypeSpecBuilder {
        TypeSpecBuilder::new(name)
    }

    /// See [`validate`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self)
    }

    /// Whether the type declares an instance struct of its own.
    ///
    /// A zero `basicsize` delegates to the base's struct.
    pub fn declares_struct(&self) -> bool {
        self.basicsize != 0
    }

    /// Module part of the name, if the name is dotted.
    pub fn module_name(&self) -> Option<&str> {
        split_name(&self.name).0
    }

    /// Type part of the name.
    pub fn type_name(&self) -> &str {
        split_name(&self.name).1
    }

    pub fn has_slot(&self, slot: SlotId) -> bool {
        self.defines
            .iter()
            .any(|d| matches!(d, Def::Slot(s) if s.slot == slot))
    }

    /// Defines with overrides applied.
    ///
    /// Each key appears once, at the position of its first occurrence,
    /// carrying the value of its last occurrence.
    pub fn effective_defines(&self) -> Vec<&Def> {
        let mut index = FxHashMap::default();
        let mut out: Vec<&Def> = Vec::with_capacity(self.defines.len());
        for def in &self.defines {
            match index.get(&def.key()) {
                Some(&i) => out[i] = def,
                None => {
                    index.insert(def.key(), out.len());
                    out.push(def);
                }
            }
        }
        out
    }
}

/// Check a spec before registration.
///
/// Reports, in this order: [`ConfigError::EmptyName`],
/// [`ConfigError::NegativeSize`], [`ConfigError::LegacySlotsWithoutLegacyFlag`].
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn validate(spec: &TypeSpec) -> Result<(), ConfigError> {
    if spec.name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    check_sizes(spec.basicsize, spec.itemsize)?;
    if spec.legacy_slots.is_some() && !spec.legacy {
        return Err(ConfigError::LegacySlotsWithoutLegacyFlag);
    }
    Ok(())
}

pub(crate) fn check_sizes(basicsize: i32, itemsize: i32) -> Result<(), ConfigError> {
    if basicsize < 0 {
        return Err(ConfigError::NegativeSize {
            field: "basicsize",
            value: basicsize,
        });
    }
    if itemsize < 0 {
        return Err(ConfigError::NegativeSize {
            field: "itemsize",
            value: itemsize,
        });
    }
    Ok(())
}

/// A garbage-collected type must define a traverse slot.
///
/// Only reference-counting hosts need this; others may skip the check.
pub fn check_gc(spec: &TypeSpec) -> Result<(), ConfigError> {
    if spec.flags.contains(TypeFlags::GARBAGE_COLLECTED) && !spec.has_slot(SlotId::TpTraverse) {
        return Err(ConfigError::MissingTraverse);
    }
    Ok(())
}

/// Split `"module.Type"` at the first dot.
///
/// Everything after the first dot is the type name, dots included.
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once('.') {
        Some((module, ty)) => (Some(module), ty),
        None => (None, name),
    }
}

/// Fluent builder for [`TypeSpec`].
#[derive(Debug, Clone)]
pub struct TypeSpecBuilder {
    spec: TypeSpec,
}

impl TypeSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: TypeSpec::new(name),
        }
    }

    pub fn basicsize(mut self, size: i32) -> Self {
        self.spec.basicsize = size;
        self
    }

    pub fn itemsize(mut self, size: i32) -> Self {
        self.spec.itemsize = size;
        self
    }

    /// OR additional flags into the defaults.
    pub fn flags(mut self, flags: TypeFlags) -> Self {
        self.spec.flags = combine(self.spec.flags, flags);
        self
    }

    /// Replace the flags entirely, defaults included.
    pub fn exact_flags(mut self, flags: TypeFlags) -> Self {
        self.spec.flags = flags;
        self
    }

    pub fn legacy(mut self, legacy: bool) -> Self {
        self.spec.legacy = legacy;
        self
    }

    pub fn legacy_slots(mut self, slots: LegacySlots) -> Self {
        self.spec.legacy_slots = Some(slots);
        self
    }

    pub fn define(mut self, def: Def) -> Self {
        self.spec.defines.push(def);
        self
    }

    pub fn defines(mut self, defs: impl IntoIterator<Item = Def>) -> Self {
        self.spec.defines.extend(defs);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.spec.doc = Some(doc.into());
        self
    }

    /// Validate and return the spec.
    pub fn build(self) -> Result<TypeSpec, ConfigError> {
        validate(&self.spec)?;
        Ok(self.spec)
    }

    /// Return the spec without validating it.
    pub fn build_unchecked(self) -> TypeSpec {
        self.spec
    }
}
