//! The interpreter: compiled builders, the resource cache, pipe functions,
//! call-context plumbing, and embedded-script support.

pub mod script;

mod builder;
mod cache;
mod context;
mod error;
mod pipes;

pub use builder::StringBuilder;
pub use context::CallContext;
pub use error::{BuildError, BuildErrorKind, LoadError, PipeError, SourceSpan};
pub use pipes::{PipeFn, PipeRegistry};

pub(crate) use cache::ResourceCache;
pub(crate) use context::ForwardState;
