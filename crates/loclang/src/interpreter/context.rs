//! Call context threaded through one top-level `resource()` invocation.

use std::panic::Location;

use crate::types::{ResourcePath, TemplateArguments};

/// State shared by every recursive build within one top-level `resource()`
/// call: the call chain used for cycle detection, the key currently being
/// resolved, the caller's location for error attribution, and the forward
/// state scripts use to call back into the registry.
///
/// A context is created fresh at the public API boundary and discarded when
/// the call tree returns; it is never shared across top-level calls.
#[derive(Debug)]
pub struct CallContext {
    /// Every key resolved within this call tree, in resolution order. Only
    /// the script implicit-retry rule ever pops an entry.
    chain: Vec<String>,

    /// The key of the most recently entered resource build.
    current_key: Option<String>,

    call_site: Option<&'static Location<'static>>,

    pub(crate) forward: Option<ForwardState>,
}

/// The path and arguments of the top-level call, captured once so that
/// scripts anywhere in the build tree forward with the outer call's
/// arguments by default.
#[derive(Debug, Clone)]
pub(crate) struct ForwardState {
    pub path: ResourcePath,
    pub args: TemplateArguments,
}

impl CallContext {
    pub(crate) fn new(call_site: Option<&'static Location<'static>>) -> Self {
        Self {
            chain: Vec::new(),
            current_key: None,
            call_site,
            forward: None,
        }
    }

    /// Record entry into a resource build.
    pub(crate) fn enter(&mut self, key: &str) {
        self.chain.push(key.to_string());
        self.current_key = Some(key.to_string());
    }

    /// Whether `key` has already been resolved in this call tree.
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.chain.iter().any(|k| k == key)
    }

    /// Undo the most recent chain entry if it belongs to the key currently
    /// being built. Used between a script's explicit and implicit runs so
    /// the implicit run's forwarding calls do not see the explicit run's
    /// provisional entries.
    pub(crate) fn pop_if_current(&mut self) {
        if let (Some(last), Some(current)) = (self.chain.last(), &self.current_key) {
            if last == current {
                self.chain.pop();
            }
        }
    }

    /// The ordered call chain, for error reporting.
    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    pub(crate) fn call_site(&self) -> Option<&'static Location<'static>> {
        self.call_site
    }
}
