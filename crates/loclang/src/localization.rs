//! The public registry handle: loading `.lang` sources, building resource
//! strings, and managing the pipe registry.

use std::collections::HashMap;
use std::fs;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use bon::bon;

use crate::interpreter::script::{ExprEngine, ScriptEngine};
use crate::interpreter::{
    BuildError, BuildErrorKind, CallContext, ForwardState, LoadError, PipeFn, PipeRegistry,
    ResourceCache, StringBuilder,
};
use crate::parser::{self, ParseError};
use crate::types::{ResourcePath, TemplateArguments};

/// The localization engine: an explicitly constructed registry of compiled
/// resources, rather than hidden process-wide state.
///
/// Cloning is cheap and clones share the same underlying registry. Interior
/// state is guarded by reader-writer locks, so resources can be built from
/// several threads while loads stay exclusive.
///
/// # Example
///
/// ```
/// use loclang::{args, Localization};
///
/// let loc = Localization::builder().build();
/// loc.load("en", "[greeting]\nHello, {{ name }}!", "example.lang").unwrap();
///
/// let text = loc.resource("en", "greeting", &args! { "name" => "Alice" }).unwrap();
/// assert_eq!(text, "Hello, Alice!");
/// ```
#[derive(Debug, Clone)]
pub struct Localization {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cache: RwLock<ResourceCache>,
    pipes: RwLock<PipeRegistry>,
    fallback_language: RwLock<Option<String>>,
    accessors: RwLock<HashMap<ResourcePath, ResourceAccessor>>,
    engine: Box<dyn ScriptEngine>,
}

#[bon]
impl Localization {
    /// Create a localization engine.
    #[builder(on(String, into))]
    pub fn new(
        /// Language consulted when a key is missing from the requested
        /// language.
        fallback_language: Option<String>,

        /// Engine used to compile `{{! ... !}}` script templates. Defaults
        /// to the built-in expression engine.
        script_engine: Option<Box<dyn ScriptEngine>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache: RwLock::new(ResourceCache::default()),
                pipes: RwLock::new(PipeRegistry::with_builtins()),
                fallback_language: RwLock::new(fallback_language),
                accessors: RwLock::new(HashMap::new()),
                engine: script_engine.unwrap_or_else(|| Box::new(ExprEngine)),
            }),
        }
    }
}

impl Default for Localization {
    fn default() -> Self {
        Localization::builder().build()
    }
}

impl Localization {
    // =========================================================================
    // Loading
    // =========================================================================

    /// Parse `source` and register every resource found in it under
    /// `language`. `container` identifies the source unit (usually the file
    /// path) and appears in error messages.
    ///
    /// Returns the number of resources registered. Re-loading a key that
    /// already exists replaces it (last load wins).
    ///
    /// # Errors
    ///
    /// Malformed or empty input is fatal to the whole source unit: nothing
    /// from a failed load is registered.
    pub fn load(&self, language: &str, source: &str, container: &str) -> Result<usize, ParseError> {
        let nodes = parser::parse(container, source)?;

        // Compile everything before touching the cache so a failed file
        // registers nothing.
        let mut prepared = Vec::with_capacity(nodes.len());
        for node in nodes {
            let node = Arc::new(node);
            let path = ResourcePath {
                language: language.to_string(),
                category: node.category.clone(),
                subcategory: node.subcategory.clone(),
            };
            let builder =
                StringBuilder::compile(language, Arc::clone(&node), self.inner.engine.as_ref())?;
            prepared.push((path, node.key.clone(), Arc::new(builder)));
        }

        let count = prepared.len();
        let mut cache = write(&self.inner.cache);
        for (path, key, builder) in prepared {
            cache.set(&path, &key, builder);
        }
        Ok(count)
    }

    /// Load and parse one `.lang` file, registering its resources under
    /// `language`.
    ///
    /// # Errors
    ///
    /// Fails on unreadable files and on parse errors; a failed file
    /// registers nothing.
    pub fn load_file(&self, language: &str, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(self.load(language, &content, &path.display().to_string())?)
    }

    /// Load every `.lang` file in `dir` (and subdirectories) under
    /// `language`, returning the total number of resources registered.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors and on the first file that fails to parse;
    /// files loaded before the failure stay registered.
    pub fn load_directory(
        &self,
        language: &str,
        dir: impl AsRef<Path>,
    ) -> Result<usize, LoadError> {
        self.load_directory_inner(language, dir.as_ref())
    }

    fn load_directory_inner(&self, language: &str, dir: &Path) -> Result<usize, LoadError> {
        let entries = fs::read_dir(dir).map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LoadError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
            paths.push(entry.path());
        }
        paths.sort();

        let mut count = 0;
        for path in paths {
            if path.is_dir() {
                count += self.load_directory_inner(language, &path)?;
            } else if path.extension().is_some_and(|ext| ext == "lang") {
                count += self.load_file(language, &path)?;
            }
        }
        Ok(count)
    }

    /// Remove every loaded resource. Pipe functions and the fallback
    /// language setting are kept.
    pub fn clear(&self) {
        write(&self.inner.cache).clear();
    }

    // =========================================================================
    // Lookup & building
    // =========================================================================

    /// Set the language consulted when a key is missing from the requested
    /// language.
    pub fn set_fallback_language(&self, language: &str) {
        *write(&self.inner.fallback_language) = Some(language.to_string());
    }

    /// The configured fallback language, if any.
    pub fn fallback_language(&self) -> Option<String> {
        read(&self.inner.fallback_language).clone()
    }

    /// Build the resource `key` under `path` with the given arguments.
    ///
    /// A key missing from the path's language is looked up in the fallback
    /// language; if it is missing there too the placeholder
    /// `"{language}::{category}::{subcategory}::{key}"` is returned instead
    /// of an error.
    ///
    /// # Errors
    ///
    /// Fails when the language has never been loaded, and for any build
    /// failure of the resource itself (argument validation, unknown pipes,
    /// missing includes, cyclic references, script failures).
    #[track_caller]
    pub fn resource(
        &self,
        path: impl Into<ResourcePath>,
        key: &str,
        args: &TemplateArguments,
    ) -> Result<String, BuildError> {
        let path = path.into();
        let mut ctx = CallContext::new(Some(Location::caller()));
        self.resource_with(&path, key, args, &mut ctx)
    }

    /// Whether a resource exists for the given path and key. The fallback
    /// language is not consulted.
    pub fn resource_exists(&self, path: impl Into<ResourcePath>, key: &str) -> bool {
        read(&self.inner.cache).has(&path.into(), key)
    }

    /// The resource keys present for a path, in load order. Empty when the
    /// path is absent.
    pub fn keys(&self, path: impl Into<ResourcePath>) -> Vec<String> {
        read(&self.inner.cache).keys(&path.into())
    }

    /// A handle bound to `path`, equivalent to repeated [`Localization::resource`]
    /// calls. Handles are cached per path.
    pub fn accessor(&self, path: impl Into<ResourcePath>) -> ResourceAccessor {
        let path = path.into();
        let mut accessors = write(&self.inner.accessors);
        accessors
            .entry(path.clone())
            .or_insert_with(|| ResourceAccessor {
                inner: Arc::downgrade(&self.inner),
                path,
            })
            .clone()
    }

    /// Shared entry point for top-level and recursive resource builds.
    pub(crate) fn resource_with(
        &self,
        path: &ResourcePath,
        key: &str,
        args: &TemplateArguments,
        ctx: &mut CallContext,
    ) -> Result<String, BuildError> {
        if !read(&self.inner.cache).has_language(&path.language) {
            return Err(BuildError::new(
                BuildErrorKind::UnknownLanguage,
                format!("No language '{}' has been loaded", path.language),
            )
            .with_call_site(ctx.call_site()));
        }

        // Scripts anywhere below forward with the top-level call's path and
        // arguments.
        if ctx.forward.is_none() {
            ctx.forward = Some(ForwardState {
                path: path.clone(),
                args: args.clone(),
            });
        }

        ctx.enter(key);

        match self.lookup_builder(path, key) {
            Some(builder) => builder.build(self, args, ctx),
            None => Ok(format!(
                "{}::{}::{}::{}",
                path.language, path.category, path.subcategory, key
            )),
        }
    }

    fn lookup_builder(&self, path: &ResourcePath, key: &str) -> Option<Arc<StringBuilder>> {
        let cache = read(&self.inner.cache);
        if let Some(builder) = cache.get(path, key) {
            return Some(builder);
        }
        let fallback = read(&self.inner.fallback_language).clone()?;
        let fallback_path = ResourcePath {
            language: fallback,
            category: path.category.clone(),
            subcategory: path.subcategory.clone(),
        };
        cache.get(&fallback_path, key)
    }

    // =========================================================================
    // Pipe registry
    // =========================================================================

    /// Whether a pipe function with the given identifier is registered.
    pub fn has_pipe_function(&self, ident: &str) -> bool {
        read(&self.inner.pipes).has(ident)
    }

    /// Register a pipe function, replacing any existing one with the same
    /// identifier.
    pub fn add_pipe_function(&self, ident: &str, pipe: PipeFn) {
        write(&self.inner.pipes).insert(ident, pipe);
    }

    /// Look up a pipe function by identifier.
    pub fn get_pipe_function(&self, ident: &str) -> Option<PipeFn> {
        read(&self.inner.pipes).get(ident)
    }

    pub(crate) fn pipe_idents(&self) -> Vec<String> {
        read(&self.inner.pipes).idents()
    }
}

/// A cached handle bound to one resource path; building through it is
/// equivalent to calling [`Localization::resource`] with that path.
///
/// Holds a weak reference to the registry so cached handles do not keep it
/// alive.
#[derive(Debug, Clone)]
pub struct ResourceAccessor {
    inner: Weak<Inner>,
    path: ResourcePath,
}

impl ResourceAccessor {
    /// The path this accessor is bound to.
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Build the resource `key` under this accessor's path.
    ///
    /// # Errors
    ///
    /// Fails like [`Localization::resource`], and additionally when the
    /// registry this accessor came from has been dropped.
    #[track_caller]
    pub fn get(&self, key: &str, args: &TemplateArguments) -> Result<String, BuildError> {
        let Some(inner) = self.inner.upgrade() else {
            return Err(BuildError::new(
                BuildErrorKind::RegistryDropped,
                "the localization registry this accessor was created from has been dropped",
            ));
        };
        let loc = Localization { inner };
        let mut ctx = CallContext::new(Some(Location::caller()));
        loc.resource_with(&self.path, key, args, &mut ctx)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
