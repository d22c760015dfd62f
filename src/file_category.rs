/// Extension-to-category mapping built from a JSON document.
///
/// The document maps category names to lists of dot-prefixed extensions and is
/// inverted into an extension-to-category lookup:
///
/// ```json
/// {
///     "images": [".png", ".jpg", ".gif"],
///     "documents": [".pdf", ".docx"],
///     "code": [".rs", ".py"]
/// }
/// ```
///
/// Categories and extensions are lower-cased. When two categories claim the
/// same extension the one that appears first in the document wins; the losing
/// claim is recorded as a dropped duplicate rather than an error.
///
/// # Examples
///
/// ```
/// use filenest::file_category::CategoryMap;
/// use serde_json::json;
///
/// let raw = json!({ "images": [".png", ".jpg"] });
/// let map = CategoryMap::build(&raw).expect("valid mapping");
/// assert_eq!(map.category_for(".png"), Some("images"));
/// assert_eq!(map.category_for(".txt"), None);
/// ```
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::file_store::{DirectoryEntry, FileStore, FileStoreError};

/// Category used when a file has no extension or its extension is unmapped.
pub const FALLBACK_CATEGORY: &str = "others";

/// Errors raised while loading or building the extension mapping.
#[derive(Debug)]
pub enum MappingError {
    /// The mapping document does not exist in the store.
    ConfigNotFound { name: String },
    /// The document is not valid JSON or its root is not an object.
    InvalidFormat { reason: String },
    /// A category key is empty or blank.
    InvalidCategory { found: String },
    /// A category's value is not a list.
    InvalidExtensionList { category: String, found: String },
    /// An extension is not a string or lacks the leading dot.
    InvalidExtension { category: String, found: String },
    /// Reading the document from the store failed.
    Store(FileStoreError),
}

impl std::fmt::Display for MappingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigNotFound { name } => {
                write!(f, "Mapping document '{}' not found", name)
            }
            Self::InvalidFormat { reason } => {
                write!(f, "Invalid mapping format: {}", reason)
            }
            Self::InvalidCategory { found } => {
                write!(
                    f,
                    "Invalid category name '{}': categories must be non-empty strings",
                    found
                )
            }
            Self::InvalidExtensionList { category, found } => {
                write!(
                    f,
                    "Extensions for category '{}' must be a list, found {}",
                    category, found
                )
            }
            Self::InvalidExtension { category, found } => {
                write!(
                    f,
                    "Invalid extension {} in category '{}': extensions must be strings starting with '.'",
                    found, category
                )
            }
            Self::Store(source) => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for MappingError {}

/// An extension claimed by more than one category.
///
/// The first category in document order keeps the extension; later claims are
/// dropped and reported here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedDuplicate {
    /// The contested extension, lower-cased.
    pub extension: String,
    /// The category that kept the extension.
    pub kept_category: String,
    /// The category whose claim was dropped.
    pub dropped_category: String,
}

/// Lookup table from file extension to category name.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMap {
    entries: HashMap<String, String>,
    dropped: Vec<DroppedDuplicate>,
}

impl CategoryMap {
    /// Builds a mapping from a parsed JSON document.
    ///
    /// Validation is fail-fast: the first malformed piece of the document
    /// aborts the build. Duplicate extensions are not an error; see
    /// [`CategoryMap::dropped`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if the root is not an object, `InvalidCategory`
    /// for blank category keys, `InvalidExtensionList` when a category's value
    /// is not a list, and `InvalidExtension` for entries that are not
    /// dot-prefixed strings.
    pub fn build(raw: &Value) -> Result<CategoryMap, MappingError> {
        let table = raw.as_object().ok_or_else(|| MappingError::InvalidFormat {
            reason: format!(
                "expected an object mapping categories to extension lists, found {}",
                value_kind(raw)
            ),
        })?;

        let mut entries: HashMap<String, String> = HashMap::new();
        let mut dropped = Vec::new();

        for (category, extension_list) in table {
            if category.trim().is_empty() {
                return Err(MappingError::InvalidCategory {
                    found: category.clone(),
                });
            }

            let extensions =
                extension_list
                    .as_array()
                    .ok_or_else(|| MappingError::InvalidExtensionList {
                        category: category.clone(),
                        found: value_kind(extension_list).to_string(),
                    })?;

            for extension in extensions {
                let Some(extension) = extension.as_str() else {
                    return Err(MappingError::InvalidExtension {
                        category: category.clone(),
                        found: value_kind(extension).to_string(),
                    });
                };
                if !extension.starts_with('.') {
                    return Err(MappingError::InvalidExtension {
                        category: category.clone(),
                        found: format!("'{}' (missing leading '.')", extension),
                    });
                }

                let normalized = extension.to_lowercase();
                if let Some(kept) = entries.get(&normalized) {
                    warn!(
                        extension = %normalized,
                        kept = %kept,
                        dropped = %category,
                        "duplicate extension ignored"
                    );
                    dropped.push(DroppedDuplicate {
                        extension: normalized,
                        kept_category: kept.clone(),
                        dropped_category: category.to_lowercase(),
                    });
                } else {
                    entries.insert(normalized, category.to_lowercase());
                }
            }
        }

        info!(extensions = entries.len(), "extension mapping built");
        Ok(CategoryMap { entries, dropped })
    }

    /// Reads the named JSON document from the store and builds the mapping.
    pub fn load(store: &FileStore, name: &str) -> Result<CategoryMap, MappingError> {
        debug!(name, "loading extension mapping document");

        let content = match store.read_file(name) {
            Ok(content) => content,
            Err(FileStoreError::NotFound { .. }) => {
                warn!(name, "extension mapping document not found");
                return Err(MappingError::ConfigNotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(MappingError::Store(e)),
        };

        let raw: Value =
            serde_json::from_str(&content).map_err(|e| MappingError::InvalidFormat {
                reason: e.to_string(),
            })?;

        Self::build(&raw)
    }

    /// Looks up the category for a dot-prefixed extension, case-insensitively.
    pub fn category_for(&self, extension: &str) -> Option<&str> {
        self.entries.get(&extension.to_lowercase()).map(String::as_str)
    }

    /// The category a directory entry belongs to.
    ///
    /// Entries without an extension and extensions absent from the mapping
    /// fall back to [`FALLBACK_CATEGORY`].
    pub fn classify(&self, entry: &DirectoryEntry) -> &str {
        let Some(extension) = entry.extension() else {
            debug!(file = %entry.name, "no extension, using fallback category");
            return FALLBACK_CATEGORY;
        };

        match self.category_for(&extension) {
            Some(category) => category,
            None => {
                debug!(
                    file = %entry.name,
                    extension = %extension,
                    "extension not mapped, using fallback category"
                );
                FALLBACK_CATEGORY
            }
        }
    }

    /// Number of mapped extensions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Duplicate claims dropped while building, in document order.
    pub fn dropped(&self) -> &[DroppedDuplicate] {
        &self.dropped
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_store::EntryKind;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn file_entry(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            path: PathBuf::from(name),
            kind: EntryKind::File,
        }
    }

    #[test]
    fn test_build_inverts_categories_to_extensions() {
        let raw = json!({
            "images": [".png", ".jpg"],
            "documents": [".pdf"]
        });

        let map = CategoryMap::build(&raw).expect("Failed to build mapping");

        assert_eq!(map.len(), 3);
        assert_eq!(map.category_for(".png"), Some("images"));
        assert_eq!(map.category_for(".jpg"), Some("images"));
        assert_eq!(map.category_for(".pdf"), Some("documents"));
        assert_eq!(map.category_for(".txt"), None);
    }

    #[test]
    fn test_build_lowercases_categories_and_extensions() {
        let raw = json!({ "Images": [".PNG"] });

        let map = CategoryMap::build(&raw).expect("Failed to build mapping");

        assert_eq!(map.category_for(".png"), Some("images"));
        assert_eq!(map.category_for(".PNG"), Some("images"));
    }

    #[test]
    fn test_build_rejects_non_object_root() {
        let raw = json!([".png", ".jpg"]);

        let result = CategoryMap::build(&raw);
        assert!(matches!(result, Err(MappingError::InvalidFormat { .. })));
    }

    #[test]
    fn test_build_rejects_blank_category() {
        for key in ["", "   "] {
            let raw = json!({ key: [".png"] });
            let result = CategoryMap::build(&raw);
            assert!(
                matches!(result, Err(MappingError::InvalidCategory { .. })),
                "category {:?} should be rejected",
                key
            );
        }
    }

    #[test]
    fn test_build_rejects_non_list_extensions() {
        let raw = json!({ "images": ".png" });

        let result = CategoryMap::build(&raw);
        match result {
            Err(MappingError::InvalidExtensionList { category, found }) => {
                assert_eq!(category, "images");
                assert_eq!(found, "a string");
            }
            other => panic!("expected InvalidExtensionList, got {:?}", other),
        }
    }

    #[test]
    fn test_build_rejects_non_string_extension() {
        let raw = json!({ "images": [".png", 42] });

        let result = CategoryMap::build(&raw);
        assert!(matches!(result, Err(MappingError::InvalidExtension { .. })));
    }

    #[test]
    fn test_build_rejects_extension_without_dot() {
        let raw = json!({ "images": ["png"] });

        let result = CategoryMap::build(&raw);
        assert!(matches!(result, Err(MappingError::InvalidExtension { .. })));
    }

    #[test]
    fn test_first_category_in_document_order_wins_duplicates() {
        // Parsed from text so the document order is not alphabetical.
        let raw: Value =
            serde_json::from_str(r#"{ "pictures": [".png"], "images": [".png", ".jpg"] }"#)
                .expect("Failed to parse JSON");

        let map = CategoryMap::build(&raw).expect("Failed to build mapping");

        assert_eq!(map.category_for(".png"), Some("pictures"));
        assert_eq!(map.category_for(".jpg"), Some("images"));
        assert_eq!(
            map.dropped(),
            &[DroppedDuplicate {
                extension: ".png".to_string(),
                kept_category: "pictures".to_string(),
                dropped_category: "images".to_string(),
            }]
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let raw: Value = serde_json::from_str(
            r#"{ "images": [".png"], "pictures": [".png"], "documents": [".pdf"] }"#,
        )
        .expect("Failed to parse JSON");

        let first = CategoryMap::build(&raw).expect("Failed to build mapping");
        let second = CategoryMap::build(&raw).expect("Failed to build mapping");

        assert_eq!(first, second);
    }

    #[test]
    fn test_classify_uses_fallback_for_unmapped_and_extensionless() {
        let raw = json!({ "images": [".png"] });
        let map = CategoryMap::build(&raw).expect("Failed to build mapping");

        assert_eq!(map.classify(&file_entry("photo.png")), "images");
        assert_eq!(map.classify(&file_entry("photo.PNG")), "images");
        assert_eq!(map.classify(&file_entry("notes.txt")), FALLBACK_CATEGORY);
        assert_eq!(map.classify(&file_entry("README")), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_load_reads_document_from_store() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path()).expect("Failed to open store");
        store
            .create_file("fileExtensions.json", r#"{ "images": [".png"] }"#)
            .expect("Failed to write mapping document");

        let map =
            CategoryMap::load(&store, "fileExtensions.json").expect("Failed to load mapping");

        assert_eq!(map.category_for(".png"), Some("images"));
    }

    #[test]
    fn test_load_missing_document_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path()).expect("Failed to open store");

        let result = CategoryMap::load(&store, "fileExtensions.json");
        assert!(matches!(result, Err(MappingError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path()).expect("Failed to open store");
        store
            .create_file("fileExtensions.json", "{ not json at all")
            .expect("Failed to write mapping document");

        let result = CategoryMap::load(&store, "fileExtensions.json");
        assert!(matches!(result, Err(MappingError::InvalidFormat { .. })));
    }
}
