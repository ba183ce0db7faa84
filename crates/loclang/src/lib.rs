//! loclang is a string-resource templating engine: it parses a `.lang` DSL
//! describing localized strings with embedded templates, caches the parsed
//! representation per language/category/subcategory, and builds final
//! strings from a resource key and a set of runtime arguments.
//!
//! # Example
//!
//! ```
//! use loclang::{args, Localization};
//!
//! let loc = Localization::builder().build();
//! loc.load(
//!     "en",
//!     "[greeting]\nHello, {{ name | capitalize }}!\n{{? detail }}",
//!     "greetings.lang",
//! )
//! .unwrap();
//!
//! let text = loc.resource("en", "greeting", &args! { "name" => "alice" }).unwrap();
//! assert_eq!(text, "Hello, Alice!");
//! ```

pub mod interpreter;
pub mod parser;
pub mod types;

mod localization;

pub use interpreter::script::{
    CompiledScript, ExprEngine, ResourceForward, ScriptEngine, ScriptError, ScriptFn,
};
pub use interpreter::{
    BuildError, BuildErrorKind, CallContext, LoadError, PipeError, PipeFn, PipeRegistry,
    SourceSpan, StringBuilder,
};
pub use localization::{Localization, ResourceAccessor};
pub use parser::ParseError;
pub use types::{Primitive, ResourcePath, TemplateArguments, Value};

/// Creates a [`TemplateArguments`] bag from key-value pairs.
///
/// Values are converted via `Into<Value>`, so numbers, strings, booleans
/// and vectors can be passed directly.
///
/// # Example
///
/// ```
/// use loclang::args;
///
/// let a = args! { "count" => 3, "name" => "Alice" };
/// assert_eq!(a.len(), 2);
/// assert_eq!(a["name"].as_str(), Some("Alice"));
/// ```
#[macro_export]
macro_rules! args {
    {} => {
        ::std::collections::HashMap::<String, $crate::Value>::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut map = ::std::collections::HashMap::<String, $crate::Value>::new();
            $(
                map.insert($key.to_string(), ::std::convert::Into::<$crate::Value>::into($value));
            )+
            map
        }
    };
}
