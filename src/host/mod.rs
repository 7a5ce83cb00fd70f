//! In-process reference host.
//!
//! [`LocalHost`] implements [`Context`](crate::Context) over a generational
//! handle table. It exists so extensions can be exercised without a real
//! runtime, and it is what this crate's own tests run against.

mod heap;
mod local;

pub use local::{BuiltinType, GcMode, HostConfig, LocalHost, RegisteredType};
