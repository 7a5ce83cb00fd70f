//! Procedural macros for `univtype`.
//!
//! # Macros
//!
//! - `#[derive(TypeStruct)]` - Bind a struct to its typed accessor
//!
//! # Example
//!
//! ```ignore
//! use univtype::{ObjectHead, TypeStruct};
//!
//! #[derive(TypeStruct)]
//! #[repr(C)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//! }
//!
//! #[derive(TypeStruct)]
//! #[univtype(legacy)]
//! #[repr(C)]
//! struct Counter {
//!     head: ObjectHead,
//!     value: i64,
//! }
//! ```

use proc_macro::TokenStream;

mod attrs;
mod derive_struct;

/// Derive `univtype::TypeStruct` for an instance struct.
///
/// The struct must be `#[repr(C)]`.
///
/// # Attributes
///
/// - `#[univtype(pure)]` - Cast with the pure primitive (default)
/// - `#[univtype(legacy)]` - Cast with the legacy primitive; the first field
///   must be the host header `ObjectHead`
#[proc_macro_derive(TypeStruct, attributes(univtype))]
pub fn derive_type_struct(input: TokenStream) -> TokenStream {
    derive_struct::derive_type_struct_impl(input)
}
