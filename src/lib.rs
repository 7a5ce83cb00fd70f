//! Universal, ABI-stable type definitions for native extensions.
//!
//! An extension describes each of its types once with a [`TypeSpec`] and
//! hands it to whatever host runtime is active through a [`Context`]. The
//! same description works on every host: the host decides, with
//! [`resolve_layout`], whether instances carry its object header in front of
//! the extension's struct (*legacy*) or keep it out of sight (*pure*), and
//! the extension reaches its struct through a typed [`Accessor`].
//!
//! # Example
//!
//! ```
//! use univtype::prelude::*;
//!
//! #[derive(TypeStruct)]
//! #[repr(C)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! let mut host = LocalHost::default();
//! let spec = Point::spec_builder("geometry.Point").build()?;
//! let ty = host.type_from_spec(&spec, &[])?;
//!
//! let obj = host.new_instance(ty, 0)?;
//! let p = Point::checked_from_handle(&host, obj, ty)?;
//! unsafe { (*p.as_ptr()).x = 3.0 };
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Features
//!
//! - `profiling` - scopes on registration and resolution via `profiling`
//! - `profile-with-puffin` - route those scopes to puffin

extern crate self as univtype;

pub mod abi;
pub mod accessor;
pub mod context;
pub mod def;
pub mod error;
pub mod flags;
pub mod handle;
pub mod host;
pub mod layout;
pub mod param;
pub mod spec;

pub use accessor::{Accessor, CastFn, CastKind, ObjectHead, TypeStruct, basicsize_of};
pub use context::{Context, TypeInfo};
pub use def::{CFunction, Def, DefKey, DefKind, FuncSignature, MemberKind, SlotId};
pub use error::{AccessError, ConfigError, HostError};
pub use flags::{TypeFlags, combine, default_flags};
pub use handle::Handle;
pub use host::{BuiltinType, GcMode, HostConfig, LocalHost};
pub use layout::{BaseLayout, resolve_layout, resolve_layout_over, resolve_legacy};
pub use param::{SpecParam, SpecParamKind, resolve_bases, validate_params};
pub use spec::{LegacySlots, TypeSpec, TypeSpecBuilder, check_gc, split_name, validate};

/// Derive macro for [`TypeStruct`](trait@TypeStruct).
pub use univtype_macros::TypeStruct;

/// Common imports for extension code.
pub mod prelude {
    pub use crate::{
        AccessError, Accessor, ConfigError, Context, Def, Handle, HostError, LocalHost,
        ObjectHead, SlotId, SpecParam, TypeFlags, TypeSpec, TypeStruct,
    };
}
