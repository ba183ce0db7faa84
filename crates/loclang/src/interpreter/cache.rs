//! The builder cache: language → category → subcategory → key →
//! compiled string builder.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use super::builder::StringBuilder;
use crate::types::ResourcePath;

/// Process-wide storage for compiled builders.
///
/// The leaf level is insertion-ordered so `keys()` reflects load order;
/// overwriting an existing key keeps its original position (last load wins
/// for the value, first load wins for the position).
#[derive(Debug, Default)]
pub(crate) struct ResourceCache {
    languages: HashMap<String, HashMap<String, HashMap<String, IndexMap<String, Arc<StringBuilder>>>>>,
}

impl ResourceCache {
    /// Whether any resources are loaded under `language`.
    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Whether a builder exists for the given path and key.
    pub fn has(&self, path: &ResourcePath, key: &str) -> bool {
        self.get(path, key).is_some()
    }

    /// Look up the builder for the given path and key.
    pub fn get(&self, path: &ResourcePath, key: &str) -> Option<Arc<StringBuilder>> {
        self.languages
            .get(&path.language)?
            .get(&path.category)?
            .get(&path.subcategory)?
            .get(key)
            .cloned()
    }

    /// Store a builder, creating intermediate levels on demand and
    /// overwriting any existing entry at the leaf.
    pub fn set(&mut self, path: &ResourcePath, key: &str, builder: Arc<StringBuilder>) {
        self.languages
            .entry(path.language.clone())
            .or_default()
            .entry(path.category.clone())
            .or_default()
            .entry(path.subcategory.clone())
            .or_default()
            .insert(key.to_string(), builder);
    }

    /// The keys present for a path, in insertion order; empty when the path
    /// is absent at any level.
    pub fn keys(&self, path: &ResourcePath) -> Vec<String> {
        self.languages
            .get(&path.language)
            .and_then(|categories| categories.get(&path.category))
            .and_then(|subcategories| subcategories.get(&path.subcategory))
            .map(|leaf| leaf.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Empty the cache.
    pub fn clear(&mut self) {
        self.languages.clear();
    }
}
