//! Pluggable embedded-script support for `{{! ... !}}` templates.
//!
//! The execution contract mirrors the source format's host runtime: a
//! script body is compiled into an *explicit* form (a statement list whose
//! value comes from `return`) and, where the body also reads as a single
//! expression, an *implicit-return* form. At build time the explicit form
//! runs first; if it produces no value, the evaluator pops the provisional
//! call-chain entry and retries with the implicit form.
//!
//! Engines are swappable via [`ScriptEngine`]; the default is the
//! expression engine in [`engine`].

mod engine;

pub use engine::ExprEngine;

use std::fmt;

use thiserror::Error;

use crate::types::{TemplateArguments, Value};

/// An error raised while compiling or executing a script.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ScriptError {
    /// Human-readable description.
    pub message: String,

    /// 1-based line within the script body, for compile errors.
    pub line: Option<usize>,
}

impl ScriptError {
    /// Create a script error with the given message and no line.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    /// Create a script error at a 1-based line within the script body.
    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}

/// Compiles raw script bodies. Implementations must be shareable across
/// threads; one engine instance serves a whole registry.
pub trait ScriptEngine: Send + Sync + fmt::Debug {
    /// Compile a script body into its explicit and (where possible)
    /// implicit forms.
    ///
    /// # Errors
    ///
    /// Returns an error when the body does not compile as a statement list;
    /// the error's `line` is relative to the body text and is remapped to
    /// the `.lang` source by the caller.
    fn compile(&self, body: &str) -> Result<CompiledScript, ScriptError>;
}

/// A compiled script: the explicit form plus the optional implicit-return
/// form.
#[derive(Debug)]
pub struct CompiledScript {
    /// The body compiled as a statement list.
    pub explicit: Box<dyn ScriptFn>,

    /// The body compiled as a single returned expression; absent when the
    /// body does not read as one.
    pub implicit: Option<Box<dyn ScriptFn>>,
}

/// One executable form of a compiled script.
pub trait ScriptFn: Send + Sync + fmt::Debug {
    /// Run the script against the argument bag and a resource-forwarding
    /// handle. Returning [`Value::Undefined`] signals "no value".
    ///
    /// # Errors
    ///
    /// Runtime failures surface as [`ScriptError`]s and are rewrapped with
    /// the script's source location by the evaluator.
    fn invoke(
        &self,
        args: &TemplateArguments,
        res: &mut dyn ResourceForward,
    ) -> Result<Value, ScriptError>;
}

/// The capability handed to scripts for building other resources in the
/// same path. Calls forward the outer call's arguments unless overridden,
/// and share the outer call's cycle-detection chain.
pub trait ResourceForward {
    /// Build the resource `key`, forwarding the outer call's arguments when
    /// `args` is `None`.
    ///
    /// # Errors
    ///
    /// Fails for keys already in the active call chain, and propagates any
    /// build failure of the target resource.
    fn call(
        &mut self,
        key: &str,
        args: Option<TemplateArguments>,
    ) -> Result<String, ScriptError>;
}
