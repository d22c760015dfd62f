/// Folder organization engine for sorting files into category subfolders.
///
/// This module classifies the files of a sandboxed folder by extension and
/// moves each one into its category subfolder, creating the subfolder on
/// demand and renaming on destination conflicts. The extension mapping is
/// loaded once per organizer and cached for later runs.
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::file_category::{CategoryMap, FALLBACK_CATEGORY, MappingError};
use crate::file_store::{DirectoryEntry, FileStore, FileStoreError};

/// Categories whose files are never moved out of the target folder.
const LEAVE_IN_PLACE: [&str; 2] = [FALLBACK_CATEGORY, "code"];

/// Records a single file that was moved during an organize run.
#[derive(Debug, Clone)]
pub struct MovedFile {
    /// The path of the file before organization.
    pub original_path: PathBuf,
    /// The path of the file after organization.
    pub new_path: PathBuf,
    /// The category the file was moved to.
    pub category: String,
}

/// Outcome of one organize run.
///
/// A run is best-effort: files that cannot be moved are recorded in
/// `failures` and the run continues with the remaining files.
#[derive(Debug, Default)]
pub struct OrganizeReport {
    /// Files moved into a category subfolder, in processing order.
    pub organized: Vec<MovedFile>,
    /// Files left where they were because of their category.
    pub left_in_place: usize,
    /// Files that could not be moved, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl OrganizeReport {
    /// True when every eligible file was moved without error.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of files moved per category.
    pub fn category_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for moved in &self.organized {
            *counts.entry(moved.category.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Errors that can occur during folder organization.
#[derive(Debug)]
pub enum OrganizeError {
    /// The target folder does not exist under the base directory.
    FolderNotFound { name: String },
    /// Loading or building the extension mapping failed.
    Mapping(MappingError),
    /// A file store operation failed.
    Store(FileStoreError),
    /// Failed to create a category directory.
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to move a file to its category directory.
    FileMoveFailure {
        source: PathBuf,
        destination: PathBuf,
        source_error: std::io::Error,
    },
}

impl std::fmt::Display for OrganizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FolderNotFound { name } => {
                write!(f, "Folder '{}' does not exist", name)
            }
            Self::Mapping(source) => write!(f, "{}", source),
            Self::Store(source) => write!(f, "{}", source),
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::FileMoveFailure {
                source,
                destination,
                source_error,
            } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    source_error
                )
            }
        }
    }
}

impl std::error::Error for OrganizeError {}

/// Result type for folder organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// Organizes the files of a sandboxed folder into category subfolders.
///
/// The extension mapping is loaded on the first `organize` call and reused by
/// every later call on the same instance; there is no reload path. The cache
/// lives in a `OnceCell`, so an organizer belongs to a single thread.
pub struct FolderOrganizer {
    store: FileStore,
    mapping: OnceCell<CategoryMap>,
}

impl FolderOrganizer {
    /// Creates an organizer operating on the given store's base directory.
    pub fn new(store: FileStore) -> Self {
        Self {
            store,
            mapping: OnceCell::new(),
        }
    }

    /// The cached extension mapping, if an organize call has loaded it.
    pub fn mapping(&self) -> Option<&CategoryMap> {
        self.mapping.get()
    }

    /// Organizes every file of `folder_name` into category subfolders.
    ///
    /// Subfolders of the target are skipped. Files classified into a
    /// leave-in-place category stay where they are and are counted in the
    /// report. A file that cannot be moved is recorded as a failure and the
    /// run continues with the next file.
    ///
    /// # Arguments
    ///
    /// * `folder_name` - Name of the folder to organize, under the base directory
    /// * `mapping_name` - Name of the JSON mapping document, also under the base directory
    ///
    /// # Returns
    ///
    /// Returns `Ok(OrganizeReport)` describing what was moved, left in place
    /// and what failed. Returns an `OrganizeError` only when the run cannot
    /// start at all: the folder is missing or the mapping cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filenest::file_organizer::FolderOrganizer;
    /// use filenest::file_store::FileStore;
    ///
    /// let store = FileStore::new("./filenest").expect("base directory");
    /// let organizer = FolderOrganizer::new(store);
    ///
    /// match organizer.organize("downloads", "fileExtensions.json") {
    ///     Ok(report) => println!("Moved {} files", report.organized.len()),
    ///     Err(e) => eprintln!("Organization failed: {}", e),
    /// }
    /// ```
    pub fn organize(&self, folder_name: &str, mapping_name: &str) -> OrganizeResult<OrganizeReport> {
        let folder = match self.store.enter(folder_name) {
            Ok(folder) => folder,
            Err(FileStoreError::NotFound { .. }) | Err(FileStoreError::NotADirectory { .. }) => {
                warn!(folder = folder_name, "organize target does not exist");
                return Err(OrganizeError::FolderNotFound {
                    name: folder_name.to_string(),
                });
            }
            Err(e) => return Err(OrganizeError::Store(e)),
        };

        let mapping = match self.mapping.get() {
            Some(mapping) => mapping,
            None => {
                let loaded =
                    CategoryMap::load(&self.store, mapping_name).map_err(OrganizeError::Mapping)?;
                self.mapping.get_or_init(|| loaded)
            }
        };

        info!(folder = folder_name, "organizing folder");
        let entries = folder.list().map_err(OrganizeError::Store)?;

        let mut report = OrganizeReport::default();
        for entry in &entries {
            if entry.is_folder() {
                continue;
            }

            let category = mapping.classify(entry);
            if LEAVE_IN_PLACE.contains(&category) {
                debug!(file = %entry.name, category, "left in place");
                report.left_in_place += 1;
                continue;
            }

            match move_into_category(folder.root(), entry, category) {
                Ok(moved) => {
                    info!(file = %entry.name, category, "file organized");
                    report.organized.push(moved);
                }
                Err(e) => {
                    warn!(file = %entry.name, error = %e, "failed to organize file, continuing");
                    report.failures.push((entry.path.clone(), e.to_string()));
                }
            }
        }

        info!(
            folder = folder_name,
            organized = report.organized.len(),
            left_in_place = report.left_in_place,
            failures = report.failures.len(),
            "organize finished"
        );
        Ok(report)
    }
}

/// Moves one file into its category subfolder, creating the subfolder if needed.
fn move_into_category(
    folder: &Path,
    entry: &DirectoryEntry,
    category: &str,
) -> OrganizeResult<MovedFile> {
    let category_path = folder.join(category);

    if !category_path.exists()
        && let Err(e) = fs::create_dir(&category_path)
    {
        return Err(OrganizeError::DirectoryCreationFailed {
            path: category_path,
            source: e,
        });
    }

    let destination = conflict_free_destination(&category_path, &entry.name);
    if let Err(e) = fs::rename(&entry.path, &destination) {
        return Err(OrganizeError::FileMoveFailure {
            source: entry.path.clone(),
            destination,
            source_error: e,
        });
    }

    Ok(MovedFile {
        original_path: entry.path.clone(),
        new_path: destination,
        category: category.to_string(),
    })
}

/// Picks a destination in `dir` for `file_name` that does not collide with an
/// existing entry.
///
/// On collision the candidate name becomes `<stem>(<n>)<extension>` with `n`
/// counting up from 1 until a free name is found. The counter starts fresh
/// for every file.
pub fn conflict_free_destination(dir: &Path, file_name: &str) -> PathBuf {
    let destination = dir.join(file_name);
    if !destination.exists() {
        return destination;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let extension = name
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut conflict = 1u32;
    loop {
        let candidate = format!("{}({}){}", stem, conflict, extension);
        let destination = dir.join(&candidate);
        if !destination.exists() {
            debug!(original = file_name, renamed = %candidate, "resolved name conflict");
            return destination;
        }
        conflict += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MAPPING: &str = r#"{ "images": [".png"], "documents": [".pdf"], "code": [".rs"] }"#;

    /// Opens a store with a mapping document and an empty `downloads` folder.
    fn organizer_fixture(mapping: &str) -> (TempDir, FolderOrganizer) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::new(temp_dir.path()).expect("Failed to open store");
        store
            .create_file("fileExtensions.json", mapping)
            .expect("Failed to write mapping document");
        store
            .create_folder("downloads")
            .expect("Failed to create downloads folder");
        (temp_dir, FolderOrganizer::new(store))
    }

    fn place_file(temp_dir: &TempDir, relative: &str, content: &str) {
        let path = temp_dir.path().join(relative);
        fs::create_dir_all(path.parent().expect("Path has no parent"))
            .expect("Failed to create parent directory");
        fs::write(&path, content).expect("Failed to write file");
    }

    #[test]
    fn test_organize_moves_mapped_files() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "downloads/photo.png", "png data");
        place_file(&temp_dir, "downloads/report.pdf", "pdf data");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        assert_eq!(report.organized.len(), 2);
        assert!(report.is_complete_success());
        assert!(temp_dir.path().join("downloads/images/photo.png").exists());
        assert!(temp_dir.path().join("downloads/documents/report.pdf").exists());
        assert!(!temp_dir.path().join("downloads/photo.png").exists());
    }

    #[test]
    fn test_organize_leaves_unmapped_and_code_files() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "downloads/notes.txt", "");
        place_file(&temp_dir, "downloads/README", "");
        place_file(&temp_dir, "downloads/main.rs", "");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        assert_eq!(report.organized.len(), 0);
        assert_eq!(report.left_in_place, 3);
        assert!(temp_dir.path().join("downloads/notes.txt").exists());
        assert!(temp_dir.path().join("downloads/README").exists());
        assert!(temp_dir.path().join("downloads/main.rs").exists());
    }

    #[test]
    fn test_organize_skips_subfolders() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "downloads/archive/old.png", "");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        assert_eq!(report.organized.len(), 0);
        assert_eq!(report.left_in_place, 0);
        assert!(temp_dir.path().join("downloads/archive/old.png").exists());
    }

    #[test]
    fn test_organize_renames_on_conflict() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "downloads/images/photo.png", "existing");
        place_file(&temp_dir, "downloads/photo.png", "incoming");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        assert_eq!(report.organized.len(), 1);
        let images = temp_dir.path().join("downloads/images");
        assert_eq!(
            fs::read_to_string(images.join("photo.png")).expect("Failed to read file"),
            "existing"
        );
        assert_eq!(
            fs::read_to_string(images.join("photo(1).png")).expect("Failed to read file"),
            "incoming"
        );
    }

    #[test]
    fn test_organize_missing_folder_fails() {
        let (_temp, organizer) = organizer_fixture(MAPPING);

        let result = organizer.organize("missing", "fileExtensions.json");
        assert!(matches!(result, Err(OrganizeError::FolderNotFound { .. })));
    }

    #[test]
    fn test_organize_file_target_fails() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "plain.txt", "");

        let result = organizer.organize("plain.txt", "fileExtensions.json");
        assert!(matches!(result, Err(OrganizeError::FolderNotFound { .. })));
    }

    #[test]
    fn test_organize_invalid_mapping_moves_nothing() {
        let (temp_dir, organizer) = organizer_fixture(r#"{ "images": ".png" }"#);
        place_file(&temp_dir, "downloads/photo.png", "");

        let result = organizer.organize("downloads", "fileExtensions.json");

        assert!(matches!(
            result,
            Err(OrganizeError::Mapping(MappingError::InvalidExtensionList { .. }))
        ));
        assert!(temp_dir.path().join("downloads/photo.png").exists());
    }

    #[test]
    fn test_organize_caches_mapping_across_runs() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "downloads/first.png", "");
        organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        // Rewriting the document must not affect an already-loaded organizer.
        fs::write(
            temp_dir.path().join("fileExtensions.json"),
            r#"{ "pictures": [".png"] }"#,
        )
        .expect("Failed to rewrite mapping document");
        place_file(&temp_dir, "downloads/second.png", "");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        assert_eq!(report.organized.len(), 1);
        assert!(temp_dir.path().join("downloads/images/second.png").exists());
        assert!(!temp_dir.path().join("downloads/pictures").exists());
    }

    #[test]
    fn test_organize_continues_after_failed_move() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        // A file named like the category directory blocks moves into it.
        place_file(&temp_dir, "downloads/images", "blocker");
        place_file(&temp_dir, "downloads/photo.png", "");
        place_file(&temp_dir, "downloads/report.pdf", "");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        assert!(!report.is_complete_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.organized.len(), 1);
        assert!(temp_dir.path().join("downloads/photo.png").exists());
        assert!(temp_dir.path().join("downloads/documents/report.pdf").exists());
    }

    #[test]
    fn test_category_counts_group_moved_files() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "downloads/a.png", "");
        place_file(&temp_dir, "downloads/b.png", "");
        place_file(&temp_dir, "downloads/c.pdf", "");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        let counts = report.category_counts();
        assert_eq!(counts.get("images"), Some(&2));
        assert_eq!(counts.get("documents"), Some(&1));
    }

    #[test]
    fn test_conflict_free_destination_prefers_plain_name() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let destination = conflict_free_destination(temp_dir.path(), "photo.png");
        assert_eq!(destination, temp_dir.path().join("photo.png"));
    }

    #[test]
    fn test_conflict_free_destination_counts_up() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("photo.png"), "").expect("Failed to write file");
        fs::write(temp_dir.path().join("photo(1).png"), "").expect("Failed to write file");

        let destination = conflict_free_destination(temp_dir.path(), "photo.png");
        assert_eq!(destination, temp_dir.path().join("photo(2).png"));
    }

    #[test]
    fn test_conflict_free_destination_without_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("README"), "").expect("Failed to write file");

        let destination = conflict_free_destination(temp_dir.path(), "README");
        assert_eq!(destination, temp_dir.path().join("README(1)"));
    }

    #[test]
    fn test_conflict_free_destination_keeps_inner_dots() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("archive.tar.gz"), "").expect("Failed to write file");

        let destination = conflict_free_destination(temp_dir.path(), "archive.tar.gz");
        assert_eq!(destination, temp_dir.path().join("archive.tar(1).gz"));
    }

    #[test]
    fn test_conflict_counter_is_per_file() {
        let (temp_dir, organizer) = organizer_fixture(MAPPING);
        place_file(&temp_dir, "downloads/images/a.png", "");
        place_file(&temp_dir, "downloads/images/a(1).png", "");
        place_file(&temp_dir, "downloads/images/b.png", "");
        place_file(&temp_dir, "downloads/a.png", "");
        place_file(&temp_dir, "downloads/b.png", "");

        let report = organizer
            .organize("downloads", "fileExtensions.json")
            .expect("Failed to organize");

        assert_eq!(report.organized.len(), 2);
        assert!(temp_dir.path().join("downloads/images/a(2).png").exists());
        assert!(temp_dir.path().join("downloads/images/b(1).png").exists());
    }
}
