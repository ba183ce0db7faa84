//! Resource paths: the (language, category, subcategory) triple that
//! addresses a group of resources.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The category and subcategory used when a path component is omitted.
pub const DEFAULT_CATEGORY: &str = "default";

/// Addresses a group of resources within the cache.
///
/// Category and subcategory default to `"default"` when omitted, so a bare
/// language string is a valid path:
///
/// ```
/// use loclang::ResourcePath;
///
/// let path = ResourcePath::from("en");
/// assert_eq!(path.category, "default");
///
/// let path = ResourcePath::from(("en", "commands", "admin"));
/// assert_eq!(path.subcategory, "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourcePath {
    /// Language code the resources were loaded under.
    pub language: String,

    /// Resource category, `"default"` when not specified.
    pub category: String,

    /// Resource subcategory, `"default"` when not specified.
    pub subcategory: String,
}

impl ResourcePath {
    /// Create a path with default category and subcategory.
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            category: DEFAULT_CATEGORY.to_string(),
            subcategory: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Replace the category, keeping the default subcategory.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Replace the subcategory.
    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = subcategory.into();
        self
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.language, self.category, self.subcategory)
    }
}

impl From<&str> for ResourcePath {
    fn from(language: &str) -> Self {
        ResourcePath::new(language)
    }
}

impl From<&String> for ResourcePath {
    fn from(language: &String) -> Self {
        ResourcePath::new(language.clone())
    }
}

impl From<(&str, &str)> for ResourcePath {
    fn from((language, category): (&str, &str)) -> Self {
        ResourcePath::new(language).with_category(category)
    }
}

impl From<(&str, &str, &str)> for ResourcePath {
    fn from((language, category, subcategory): (&str, &str, &str)) -> Self {
        ResourcePath::new(language)
            .with_category(category)
            .with_subcategory(subcategory)
    }
}

impl From<&ResourcePath> for ResourcePath {
    fn from(path: &ResourcePath) -> Self {
        path.clone()
    }
}
