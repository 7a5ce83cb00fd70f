//! Typed struct accessors.
//!
//! An [`Accessor<T>`] binds one of the host's two casting primitives to a
//! struct type `T` together with the matching legacy tag. Both flavours have
//! exactly the same shape; they differ only in the primitive they forward to
//! and in [`Accessor::is_legacy`].
//!
//! Most code gets its accessor through `#[derive(TypeStruct)]`:
//!
//! ```
//! use univtype::TypeStruct;
//!
//! #[derive(TypeStruct)]
//! #[repr(C)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! assert!(!Point::IS_LEGACY);
//! let spec = Point::spec_builder("Point").build().unwrap();
//! assert_eq!(spec.basicsize, 16);
//! assert!(!spec.legacy);
//! ```

use std::any::type_name;
use std::ffi::c_void;
use std::fmt;
use std::mem::size_of;
use std::ptr::NonNull;

use crate::error::mode_name;
use crate::spec::TypeSpecBuilder;
use crate::{AccessError, ConfigError, Context, Handle};

/// Which host casting primitive an accessor forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// [`Context::as_struct`].
    Pure,
    /// [`Context::as_struct_legacy`].
    Legacy,
}

impl CastKind {
    pub const fn is_legacy(self) -> bool {
        matches!(self, CastKind::Legacy)
    }

    /// Invoke the bound primitive.
    pub fn cast(self, ctx: &dyn Context, h: Handle) -> *mut c_void {
        match self {
            CastKind::Pure => ctx.as_struct(h),
            CastKind::Legacy => ctx.as_struct_legacy(h),
        }
    }
}

/// Signature of a generated cast function.
pub type CastFn<T> = fn(&dyn Context, Handle) -> *mut T;

fn cast_pure<T>(ctx: &dyn Context, h: Handle) -> *mut T {
    ctx.as_struct(h).cast()
}

fn cast_legacy<T>(ctx: &dyn Context, h: Handle) -> *mut T {
    ctx.as_struct_legacy(h).cast()
}

/// Typed cast function plus legacy tag for struct type `T`.
pub struct Accessor<T> {
    cast_fn: CastFn<T>,
    is_legacy: bool,
}

impl<T> Accessor<T> {
    /// Accessor for a pure type; tag `false`.
    pub const fn pure() -> Self {
        Self {
            cast_fn: cast_pure::<T>,
            is_legacy: false,
        }
    }

    /// Accessor for a legacy type; tag `true`.
    pub const fn legacy() -> Self {
        Self {
            cast_fn: cast_legacy::<T>,
            is_legacy: true,
        }
    }

    /// Accessor for the given primitive.
    pub const fn for_kind(kind: CastKind) -> Self {
        match kind {
            CastKind::Pure => Self::pure(),
            CastKind::Legacy => Self::legacy(),
        }
    }

    /// The tag to echo into the spec's `legacy` field.
    pub const fn is_legacy(&self) -> bool {
        self.is_legacy
    }

    pub const fn cast_kind(&self) -> CastKind {
        if self.is_legacy {
            CastKind::Legacy
        } else {
            CastKind::Pure
        }
    }

    pub const fn cast_fn(&self) -> CastFn<T> {
        self.cast_fn
    }

    /// Borrow the struct behind `h`.
    ///
    /// The pointer is non-owning; it stays valid while the object is alive.
    /// `h` must be an instance of a type built from a spec whose struct is
    /// `T`. Passing anything else is a precondition violation and the result
    /// is undefined; use [`checked_from_handle`](Self::checked_from_handle)
    /// when that cannot be guaranteed.
    pub fn from_handle(&self, ctx: &dyn Context, h: Handle) -> *mut T {
        (self.cast_fn)(ctx, h)
    }

    /// Like [`from_handle`](Self::from_handle), verifying first that `h` is
    /// an instance of `ty`, that `ty` has this accessor's layout mode and
    /// that its struct is large enough for `T`.
    pub fn checked_from_handle(
        &self,
        ctx: &dyn Context,
        h: Handle,
        ty: Handle,
    ) -> Result<NonNull<T>, AccessError> {
        let actual = ctx.type_of(h).ok_or(AccessError::UnknownHandle(h))?;
        let mismatch = AccessError::TypeMismatch {
            handle: h,
            expected: type_name::<T>(),
        };
        if !ctx.is_subtype(actual, ty) {
            return Err(mismatch);
        }
        let info = ctx.type_info(actual).ok_or(AccessError::UnknownHandle(h))?;
        if info.legacy != self.is_legacy {
            return Err(AccessError::LayoutMismatch {
                expected: type_name::<T>(),
                accessor: mode_name(self.is_legacy),
                actual: mode_name(info.legacy),
            });
        }
        let fits = usize::try_from(info.basicsize).is_ok_and(|size| size >= size_of::<T>());
        if !fits {
            return Err(mismatch);
        }
        NonNull::new(self.from_handle(ctx, h)).ok_or(mismatch)
    }
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Accessor<T> {}

impl<T> fmt::Debug for Accessor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("struct", &type_name::<T>())
            .field("cast", &self.cast_kind())
            .field("is_legacy", &self.is_legacy)
            .finish()
    }
}

/// The spec `basicsize` of a struct of `size` bytes.
pub const fn basicsize_of(size: usize) -> Result<i32, ConfigError> {
    if size > i32::MAX as usize {
        Err(ConfigError::StructTooLarge { size })
    } else {
        Ok(size as i32)
    }
}

/// A struct type used as the instance struct of a spec-built type.
///
/// Implemented by `#[derive(TypeStruct)]`; `#[univtype(legacy)]` selects the
/// legacy primitive.
pub trait TypeStruct: Sized {
    /// Layout tag; equals `ACCESSOR.is_legacy()`.
    const IS_LEGACY: bool;

    /// The accessor bound to this struct.
    const ACCESSOR: Accessor<Self>;

    /// `size_of::<Self>()` as a spec `basicsize`.
    ///
    /// Using it for a struct larger than `i32::MAX` bytes fails to compile.
    const BASICSIZE: i32 = match basicsize_of(size_of::<Self>()) {
        Ok(size) => size,
        Err(_) => panic!("TypeStruct instance struct is larger than i32::MAX bytes"),
    };

    /// See [`Accessor::from_handle`].
    fn from_handle(ctx: &dyn Context, h: Handle) -> *mut Self {
        Self::ACCESSOR.from_handle(ctx, h)
    }

    /// See [`Accessor::checked_from_handle`].
    fn checked_from_handle(
        ctx: &dyn Context,
        h: Handle,
        ty: Handle,
    ) -> Result<NonNull<Self>, AccessError> {
        Self::ACCESSOR.checked_from_handle(ctx, h, ty)
    }

    /// A spec builder with `basicsize` and `legacy` taken from this struct.
    fn spec_builder(name: impl Into<String>) -> TypeSpecBuilder {
        TypeSpecBuilder::new(name)
            .basicsize(Self::BASICSIZE)
            .legacy(Self::IS_LEGACY)
    }
}

/// The host header at the start of every legacy struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHead {
    pub ob_refcnt: isize,
    pub ob_type: Handle,
}
