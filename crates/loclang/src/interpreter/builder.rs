//! The evaluator: turns one resource node plus a runtime argument bag into
//! the final string.

use std::sync::Arc;

use super::context::CallContext;
use super::error::{closest_match, BuildError, BuildErrorKind, PipeError};
use super::script::{CompiledScript, ResourceForward, ScriptEngine, ScriptError};
use crate::localization::Localization;
use crate::parser::{
    KeyedTemplate, ParseError, ResourceNode, TemplateNode, TemplatePipe, TypeDeclaration,
};
use crate::types::{ResourcePath, TemplateArguments, Value};

/// Stores a parsed resource node, with its scripts compiled, and builds the
/// output string from it on demand.
#[derive(Debug)]
pub struct StringBuilder {
    language: String,
    node: Arc<ResourceNode>,
    /// Compiled scripts, keyed by child index.
    scripts: Vec<(usize, CompiledScript)>,
}

/// The evaluated value of one child node. `None` means the child produced
/// no value at all (as opposed to an empty string).
struct ChildResult {
    /// Whether the child may legitimately produce no value (optional, match
    /// and script templates), making it subject to isolated-line collapsing.
    maybe: bool,
    value: Option<String>,
}

impl StringBuilder {
    /// Compile a builder for `node`, compiling every script template with
    /// `engine`. Compile failures are fatal to the load and point at the
    /// `.lang` source.
    pub(crate) fn compile(
        language: &str,
        node: Arc<ResourceNode>,
        engine: &dyn ScriptEngine,
    ) -> Result<Self, ParseError> {
        let mut scripts = Vec::new();
        for (index, child) in node.children.iter().enumerate() {
            if let TemplateNode::Script(script) = child {
                let compiled = engine.compile(&script.body).map_err(|e| {
                    // Engine lines are relative to the body text, which
                    // begins on the template's opening line.
                    let line = script.line + e.line.unwrap_or(1).saturating_sub(1);
                    ParseError::new(
                        format!("Error compiling script template: {}", e.message),
                        &node.container,
                        &node.source,
                        line,
                        script.column,
                    )
                })?;
                scripts.push((index, compiled));
            }
        }
        Ok(Self {
            language: language.to_string(),
            node,
            scripts,
        })
    }

    /// The resource node this builder was compiled from.
    pub fn node(&self) -> &ResourceNode {
        &self.node
    }

    /// Build the output string.
    pub(crate) fn build(
        &self,
        loc: &Localization,
        args: &TemplateArguments,
        ctx: &mut CallContext,
    ) -> Result<String, BuildError> {
        if !self.node.params.is_empty() {
            self.validate_arguments(args, ctx)?;
        }

        let path = ResourcePath {
            language: self.language.clone(),
            category: self.node.category.clone(),
            subcategory: self.node.subcategory.clone(),
        };

        let mut results: Vec<ChildResult> = Vec::with_capacity(self.node.children.len());

        for (index, child) in self.node.children.iter().enumerate() {
            let result = match child {
                TemplateNode::StringChunk(chunk) => ChildResult {
                    maybe: false,
                    value: Some(chunk.content.clone()),
                },

                TemplateNode::Regular(template) | TemplateNode::Optional(template) => {
                    let initial = args.get(&template.key).cloned().unwrap_or_default();
                    let piped = self.run_pipes(loc, initial, &template.pipes, ctx)?;
                    ChildResult {
                        maybe: child.is_maybe(),
                        value: render_value(piped),
                    }
                }

                TemplateNode::Include(template) => {
                    let value = self.build_include(loc, &path, template, args, ctx)?;
                    ChildResult {
                        maybe: false,
                        value: render_value(value),
                    }
                }

                TemplateNode::Match(template) => {
                    let initial = args.get(&template.key).cloned().unwrap_or_default();
                    let piped = self.run_pipes(loc, initial, &template.pipes, ctx)?;

                    let mut matched = template
                        .matchers
                        .iter()
                        .find(|(pattern, _)| piped.strict_eq(&pattern.to_value()))
                        .map(|(_, value)| value);
                    if matched.is_none() {
                        matched = template.default_match.as_ref();
                    }

                    ChildResult {
                        maybe: true,
                        value: matched.map(ToString::to_string),
                    }
                }

                TemplateNode::Script(script) => {
                    let value = self.run_script(loc, index, script.line, script.column, args, ctx)?;
                    ChildResult {
                        maybe: true,
                        value: render_value(value),
                    }
                }
            };
            results.push(result);
        }

        collapse_isolated(&mut results);

        // Any remaining valueless optional/match/script result contributes
        // an empty string.
        for result in &mut results {
            if result.maybe && result.value.is_none() {
                result.value = Some(String::new());
            }
        }

        let output: String = results
            .iter()
            .map(|r| r.value.as_deref().unwrap_or("undefined"))
            .collect();

        Ok(output.trim_end().to_string())
    }

    /// Validate the argument bag against the node's type declarations.
    fn validate_arguments(
        &self,
        args: &TemplateArguments,
        ctx: &CallContext,
    ) -> Result<(), BuildError> {
        for (ident, declaration) in &self.node.params {
            let value = args.get(ident).unwrap_or(&Value::Undefined);

            if declaration.is_optional && value.is_undefined() {
                continue;
            }

            if value.is_undefined() {
                return Err(self.arg_error(
                    format!(
                        "Expected type '{}', got undefined",
                        declaration.expected_type()
                    ),
                    declaration,
                    ctx,
                ));
            }

            if declaration.is_array {
                let Some(items) = value.as_array() else {
                    return Err(self.arg_error(
                        format!("Expected array type, got {}", value.type_of()),
                        declaration,
                        ctx,
                    ));
                };
                for item in items {
                    self.validate_type(declaration, item, ctx)?;
                }
            } else {
                self.validate_type(declaration, value, ctx)?;
            }
        }
        Ok(())
    }

    fn validate_type(
        &self,
        declaration: &TypeDeclaration,
        value: &Value,
        ctx: &CallContext,
    ) -> Result<(), BuildError> {
        use crate::parser::DeclaredType;

        let matches = match declaration.kind {
            DeclaredType::Any => true,
            DeclaredType::String => matches!(value, Value::String(_)),
            DeclaredType::Number => matches!(value, Value::Number(_)),
            DeclaredType::Boolean => matches!(value, Value::Bool(_)),
        };
        if matches {
            return Ok(());
        }

        let in_array = if declaration.is_array { " in array" } else { "" };
        Err(self.arg_error(
            format!(
                "Expected type '{}'{in_array}, got {}",
                declaration.kind,
                value.type_of()
            ),
            declaration,
            ctx,
        ))
    }

    fn arg_error(
        &self,
        message: String,
        declaration: &TypeDeclaration,
        ctx: &CallContext,
    ) -> BuildError {
        BuildError::at_node(
            BuildErrorKind::ArgumentType,
            message,
            &self.node,
            declaration.line,
            declaration.column,
        )
        .with_call_site(ctx.call_site())
    }

    /// Resolve an include template: verify the target exists and is not
    /// already being built, then build it recursively with the shared
    /// context and apply the include's pipes to the result.
    fn build_include(
        &self,
        loc: &Localization,
        path: &ResourcePath,
        template: &KeyedTemplate,
        args: &TemplateArguments,
        ctx: &mut CallContext,
    ) -> Result<Value, BuildError> {
        if !loc.resource_exists(path.clone(), &template.key) {
            return Err(BuildError::at_node(
                BuildErrorKind::MissingInclude,
                format!(
                    "Localization string key '{}' does not exist for language '{}'",
                    template.key, self.language
                ),
                &self.node,
                template.line,
                template.column,
            )
            .with_call_site(ctx.call_site()));
        }

        if ctx.contains(&template.key) {
            return Err(BuildError::at_node(
                BuildErrorKind::CyclicReference,
                "A localization resource cannot refer to any previous parent",
                &self.node,
                template.line,
                template.column,
            )
            .with_call_site(ctx.call_site()));
        }

        let built = loc.resource_with(path, &template.key, args, ctx)?;
        self.run_pipes(loc, Value::String(built), &template.pipes, ctx)
    }

    /// Execute a compiled script: explicit form first; when it yields no
    /// value and an implicit form exists, pop the provisional chain entry
    /// and retry with the implicit form.
    fn run_script(
        &self,
        loc: &Localization,
        index: usize,
        line: usize,
        column: usize,
        args: &TemplateArguments,
        ctx: &mut CallContext,
    ) -> Result<Value, BuildError> {
        let Some((_, compiled)) = self.scripts.iter().find(|(i, _)| *i == index) else {
            // Scripts are compiled for every script child at load time.
            return Ok(Value::Undefined);
        };

        let wrap = |e: ScriptError, ctx: &CallContext| {
            BuildError::at_node(BuildErrorKind::ScriptFailed, e.message, &self.node, line, column)
                .with_call_site(ctx.call_site())
        };

        let result = {
            let mut forward = ForwardHandle { loc, ctx: &mut *ctx };
            compiled.explicit.invoke(args, &mut forward)
        };
        let value = match result {
            Ok(value) => value,
            Err(e) => return Err(wrap(e, ctx)),
        };

        if value.is_undefined() {
            if let Some(implicit) = &compiled.implicit {
                ctx.pop_if_current();
                let result = {
                    let mut forward = ForwardHandle { loc, ctx: &mut *ctx };
                    implicit.invoke(args, &mut forward)
                };
                return match result {
                    Ok(value) => Ok(value),
                    Err(e) => Err(wrap(e, ctx)),
                };
            }
        }

        Ok(value)
    }

    /// Thread a value through a pipe chain in declaration order.
    fn run_pipes(
        &self,
        loc: &Localization,
        initial: Value,
        pipes: &[TemplatePipe],
        ctx: &CallContext,
    ) -> Result<Value, BuildError> {
        let mut value = initial;
        for pipe in pipes {
            let Some(function) = loc.get_pipe_function(&pipe.ident) else {
                let mut message = format!("Pipe function '{}' does not exist", pipe.ident);
                if let Some(suggestion) =
                    closest_match(&pipe.ident, loc.pipe_idents().iter().map(String::as_str))
                {
                    message.push_str(&format!(". Did you mean '{suggestion}'?"));
                }
                return Err(BuildError::at_node(
                    BuildErrorKind::UnknownPipeFunction,
                    message,
                    &self.node,
                    pipe.line,
                    pipe.column,
                )
                .with_call_site(ctx.call_site()));
            };

            value = function(&value, &pipe.args).map_err(|e: PipeError| {
                BuildError::at_node(
                    BuildErrorKind::PipeFailed,
                    e.message,
                    &self.node,
                    pipe.line,
                    pipe.column,
                )
                .with_call_site(ctx.call_site())
            })?;
        }
        Ok(value)
    }
}

/// The resource-forwarding capability handed to scripts: builds sibling
/// resources with the top-level call's path and arguments, sharing the
/// call chain for cycle detection.
struct ForwardHandle<'a, 'c> {
    loc: &'a Localization,
    ctx: &'c mut CallContext,
}

impl ResourceForward for ForwardHandle<'_, '_> {
    fn call(
        &mut self,
        key: &str,
        args: Option<TemplateArguments>,
    ) -> Result<String, ScriptError> {
        let Some(state) = self.ctx.forward.clone() else {
            return Err(ScriptError::new("no active resource call to forward from"));
        };

        if self.ctx.contains(key) {
            return Err(ScriptError::new(
                "A localization resource cannot refer to any previous parent",
            ));
        }

        let call_args = args.unwrap_or(state.args);
        self.loc
            .resource_with(&state.path, key, &call_args, self.ctx)
            .map_err(|e| ScriptError::new(e.message))
    }
}

/// Convert a final child value into a result value, with `Undefined`
/// mapping to "no value".
fn render_value(value: Value) -> Option<String> {
    if value.is_undefined() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Collapse isolated valueless results: an optional/match/script template
/// occupying its own source line whose value is absent would otherwise
/// leave a blank line behind, so the leading newline of the next sibling is
/// stripped and the result contributes nothing.
fn collapse_isolated(results: &mut [ChildResult]) {
    let is_valid = |result: Option<&ChildResult>| -> bool {
        matches!(result.and_then(|r| r.value.as_deref()), Some(v) if !v.is_empty())
    };

    for i in 0..results.len() {
        if !results[i].maybe || results[i].value.is_some() {
            continue;
        }

        let prev_valid = i > 0 && is_valid(results.get(i - 1));
        let next_starts_newline = matches!(
            results.get(i + 1).and_then(|r| r.value.as_deref()),
            Some(v) if v.starts_with('\n')
        );
        let isolated = if prev_valid {
            let prev_ends_newline = matches!(
                results.get(i - 1).and_then(|r| r.value.as_deref()),
                Some(v) if v.ends_with('\n')
            );
            is_valid(results.get(i + 1)) && prev_ends_newline && next_starts_newline
        } else {
            is_valid(results.get(i + 1)) && next_starts_newline
        };

        if isolated {
            if let Some(next) = results.get_mut(i + 1) {
                if let Some(value) = next.value.take() {
                    next.value = Some(
                        value
                            .strip_prefix('\n')
                            .map(ToString::to_string)
                            .unwrap_or(value),
                    );
                }
            }
            results[i].value = Some(String::new());
        }
    }
}
