//! Sandboxed file and folder storage.
//!
//! Every operation in this module resolves an entry name beneath a fixed base
//! directory and never escapes it. Entry names are validated before resolution:
//! they must be non-empty, free of path separators and reserved characters, and
//! at most 255 characters long.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Characters that are never allowed in entry names.
const INVALID_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Maximum length of a single entry name.
const MAX_NAME_LEN: usize = 255;

/// Errors that can occur during file store operations.
#[derive(Debug)]
pub enum FileStoreError {
    /// The named file or folder does not exist.
    NotFound { name: String },
    /// An entry with the given name already exists.
    AlreadyExists { name: String },
    /// The entry name failed validation.
    InvalidName { name: String, reason: String },
    /// A replace-mode update did not find the text to replace.
    OldTextNotFound { name: String },
    /// The path exists but is not a directory.
    NotADirectory { path: PathBuf },
    /// An underlying file-system operation failed.
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl std::fmt::Display for FileStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "'{}' not found", name),
            Self::AlreadyExists { name } => write!(f, "'{}' already exists", name),
            Self::InvalidName { name, reason } => {
                write!(f, "Invalid name '{}': {}", name, reason)
            }
            Self::OldTextNotFound { name } => {
                write!(f, "Old text not found in '{}'", name)
            }
            Self::NotADirectory { path } => {
                write!(f, "'{}' is not a directory", path.display())
            }
            Self::Io { context, source } => {
                write!(f, "Failed to {}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for FileStoreError {}

/// Result type for file store operations.
pub type FileStoreResult<T> = Result<T, FileStoreError>;

/// Whether a directory entry is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

/// A single entry produced by a directory listing.
///
/// Entries are transient: they describe the directory at the time of the
/// listing and are never persisted.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// The entry's file name.
    pub name: String,
    /// The full path of the entry.
    pub path: PathBuf,
    /// Whether the entry is a file or a folder.
    pub kind: EntryKind,
}

impl DirectoryEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }

    /// The file name without its extension.
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }

    /// The file's extension, lower-cased and dot-prefixed (e.g. `".png"`).
    ///
    /// Returns `None` for folders and for files without an extension.
    pub fn extension(&self) -> Option<String> {
        if self.kind != EntryKind::File {
            return None;
        }
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
    }
}

/// How `update_file` should change a file's content.
#[derive(Debug, Clone)]
pub enum UpdateMode {
    /// Replace every occurrence of `old` with `new`.
    Replace { old: String, new: String },
    /// Append a space followed by the given text.
    Append(String),
    /// Replace the whole content with the given text.
    Overwrite(String),
    /// Truncate the file to empty.
    Clear,
}

/// Decision returned by the callback consulted before deleting a non-empty folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    /// Delete the folder together with everything inside it.
    DeleteAll,
    /// Keep the folder and its contents.
    Cancel,
}

/// Outcome of a folder deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The folder was removed.
    Deleted,
    /// The folder was non-empty and the decision callback declined.
    Declined,
}

/// Validates an entry name and returns it trimmed.
fn validate_name(name: &str) -> FileStoreResult<&str> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(FileStoreError::InvalidName {
            name: name.to_string(),
            reason: "name cannot be empty".to_string(),
        });
    }

    if let Some(ch) = trimmed.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
        return Err(FileStoreError::InvalidName {
            name: trimmed.to_string(),
            reason: format!("contains invalid character '{}'", ch),
        });
    }

    if trimmed == "." || trimmed == ".." {
        return Err(FileStoreError::InvalidName {
            name: trimmed.to_string(),
            reason: "reserved name".to_string(),
        });
    }

    if trimmed.len() > MAX_NAME_LEN {
        return Err(FileStoreError::InvalidName {
            name: trimmed.to_string(),
            reason: format!("longer than {} characters", MAX_NAME_LEN),
        });
    }

    Ok(trimmed)
}

/// Single-file and folder operations scoped to a base directory.
///
/// The base directory is created on construction if it is missing. All entry
/// names are validated and joined onto the base, so operations cannot reach
/// outside of it.
#[derive(Debug, Clone)]
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `base`, creating the directory if needed.
    pub fn new(base: impl AsRef<Path>) -> FileStoreResult<FileStore> {
        let base = base.as_ref().to_path_buf();

        if !base.exists()
            && let Err(e) = fs::create_dir_all(&base)
        {
            error!(base = %base.display(), error = %e, "failed to create base directory");
            return Err(FileStoreError::Io {
                context: format!("create base directory '{}'", base.display()),
                source: e,
            });
        }

        info!(base = %base.display(), "file store opened");
        Ok(FileStore { base })
    }

    /// The base directory all operations are scoped to.
    pub fn root(&self) -> &Path {
        &self.base
    }

    /// Resolves a validated entry name to its path under the base directory.
    pub fn resolve(&self, name: &str) -> FileStoreResult<PathBuf> {
        match validate_name(name) {
            Ok(valid) => Ok(self.base.join(valid)),
            Err(e) => {
                warn!(name, error = %e, "rejected entry name");
                Err(e)
            }
        }
    }

    /// Returns a store scoped to an existing subfolder of this one.
    pub fn enter(&self, name: &str) -> FileStoreResult<FileStore> {
        let path = self.resolve(name)?;

        if !path.exists() {
            warn!(name, "cannot enter folder: not found");
            return Err(FileStoreError::NotFound {
                name: name.to_string(),
            });
        }
        if !path.is_dir() {
            warn!(name, "cannot enter folder: not a directory");
            return Err(FileStoreError::NotADirectory { path });
        }

        Ok(FileStore { base: path })
    }

    /// Lists the immediate entries of the base directory, sorted by name.
    pub fn list(&self) -> FileStoreResult<Vec<DirectoryEntry>> {
        if !self.base.exists() {
            warn!(path = %self.base.display(), "cannot list: directory missing");
            return Err(FileStoreError::NotFound {
                name: self.base.display().to_string(),
            });
        }

        let reader = match fs::read_dir(&self.base) {
            Ok(reader) => reader,
            Err(e) => {
                error!(path = %self.base.display(), error = %e, "failed to read directory");
                return Err(FileStoreError::Io {
                    context: format!("read directory '{}'", self.base.display()),
                    source: e,
                });
            }
        };

        let mut entries = Vec::new();
        for entry in reader.flatten() {
            if let Ok(file_type) = entry.file_type() {
                let kind = if file_type.is_dir() {
                    EntryKind::Folder
                } else {
                    EntryKind::File
                };
                entries.push(DirectoryEntry {
                    name: entry.file_name().to_string_lossy().to_string(),
                    path: entry.path(),
                    kind,
                });
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        info!(path = %self.base.display(), entries = entries.len(), "directory listed");
        Ok(entries)
    }

    /// Creates a new file with the given content.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` if an entry with that name is present.
    pub fn create_file(&self, name: &str, content: &str) -> FileStoreResult<()> {
        let path = self.resolve(name)?;

        if path.exists() {
            warn!(name, "create failed: file already exists");
            return Err(FileStoreError::AlreadyExists {
                name: name.to_string(),
            });
        }

        self.write_contents(&path, name, content)?;
        info!(name, "file created");
        Ok(())
    }

    /// Reads a file's content as a string.
    pub fn read_file(&self, name: &str) -> FileStoreResult<String> {
        let path = self.resolve(name)?;

        if !path.exists() {
            warn!(name, "read failed: file not found");
            return Err(FileStoreError::NotFound {
                name: name.to_string(),
            });
        }

        let data = self.read_contents(&path, name)?;
        info!(name, "file read");
        Ok(data)
    }

    /// Updates a file's content according to the given mode.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file is absent, and `OldTextNotFound` when a
    /// replace-mode update does not find its search text.
    pub fn update_file(&self, name: &str, mode: UpdateMode) -> FileStoreResult<()> {
        let path = self.resolve(name)?;

        if !path.exists() {
            warn!(name, "update failed: file not found");
            return Err(FileStoreError::NotFound {
                name: name.to_string(),
            });
        }

        match mode {
            UpdateMode::Replace { old, new } => {
                let data = self.read_contents(&path, name)?;
                if !data.contains(&old) {
                    warn!(name, "update failed: old text not found");
                    return Err(FileStoreError::OldTextNotFound {
                        name: name.to_string(),
                    });
                }
                self.write_contents(&path, name, &data.replace(&old, &new))?;
            }
            UpdateMode::Append(text) => {
                let mut file = match fs::OpenOptions::new().append(true).open(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        error!(name, error = %e, "failed to open file for append");
                        return Err(FileStoreError::Io {
                            context: format!("open file '{}' for append", name),
                            source: e,
                        });
                    }
                };
                if let Err(e) = write!(file, " {}", text) {
                    error!(name, error = %e, "failed to append to file");
                    return Err(FileStoreError::Io {
                        context: format!("append to file '{}'", name),
                        source: e,
                    });
                }
            }
            UpdateMode::Overwrite(text) => self.write_contents(&path, name, &text)?,
            UpdateMode::Clear => self.write_contents(&path, name, "")?,
        }

        info!(name, "file updated");
        Ok(())
    }

    /// Deletes a file.
    pub fn delete_file(&self, name: &str) -> FileStoreResult<()> {
        let path = self.resolve(name)?;

        if !path.exists() {
            warn!(name, "delete failed: file not found");
            return Err(FileStoreError::NotFound {
                name: name.to_string(),
            });
        }

        if let Err(e) = fs::remove_file(&path) {
            error!(name, error = %e, "failed to delete file");
            return Err(FileStoreError::Io {
                context: format!("delete file '{}'", name),
                source: e,
            });
        }

        info!(name, "file deleted");
        Ok(())
    }

    /// Renames a file or folder.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the source is absent and `AlreadyExists` if an
    /// entry with the new name is present.
    pub fn rename(&self, name: &str, new_name: &str) -> FileStoreResult<()> {
        let path = self.resolve(name)?;
        let new_path = self.resolve(new_name)?;

        if !path.exists() {
            warn!(name, "rename failed: entry not found");
            return Err(FileStoreError::NotFound {
                name: name.to_string(),
            });
        }
        if new_path.exists() {
            warn!(name, new_name, "rename failed: new name already exists");
            return Err(FileStoreError::AlreadyExists {
                name: new_name.to_string(),
            });
        }

        if let Err(e) = fs::rename(&path, &new_path) {
            error!(name, new_name, error = %e, "failed to rename entry");
            return Err(FileStoreError::Io {
                context: format!("rename '{}' to '{}'", name, new_name),
                source: e,
            });
        }

        info!(name, new_name, "entry renamed");
        Ok(())
    }

    /// Creates a new, empty folder.
    pub fn create_folder(&self, name: &str) -> FileStoreResult<()> {
        let path = self.resolve(name)?;

        if path.exists() {
            warn!(name, "create failed: folder already exists");
            return Err(FileStoreError::AlreadyExists {
                name: name.to_string(),
            });
        }

        if let Err(e) = fs::create_dir(&path) {
            error!(name, error = %e, "failed to create folder");
            return Err(FileStoreError::Io {
                context: format!("create folder '{}'", name),
                source: e,
            });
        }

        info!(name, "folder created");
        Ok(())
    }

    /// Deletes a folder.
    ///
    /// Empty folders are removed directly. For a non-empty folder the `decide`
    /// callback is consulted: `DeleteAll` removes the folder recursively,
    /// `Cancel` leaves everything in place and reports `Declined`.
    pub fn delete_folder<F>(&self, name: &str, decide: F) -> FileStoreResult<DeleteOutcome>
    where
        F: FnOnce(&str) -> DeleteDecision,
    {
        let path = self.resolve(name)?;

        if !path.exists() {
            warn!(name, "delete failed: folder not found");
            return Err(FileStoreError::NotFound {
                name: name.to_string(),
            });
        }
        if !path.is_dir() {
            warn!(name, "delete failed: not a directory");
            return Err(FileStoreError::NotADirectory { path });
        }

        let mut contents = match fs::read_dir(&path) {
            Ok(reader) => reader,
            Err(e) => {
                error!(name, error = %e, "failed to inspect folder before deletion");
                return Err(FileStoreError::Io {
                    context: format!("read folder '{}'", name),
                    source: e,
                });
            }
        };

        if contents.next().is_some() {
            match decide(name) {
                DeleteDecision::DeleteAll => {
                    if let Err(e) = fs::remove_dir_all(&path) {
                        error!(name, error = %e, "failed to delete folder contents");
                        return Err(FileStoreError::Io {
                            context: format!("delete folder '{}' and its contents", name),
                            source: e,
                        });
                    }
                    info!(name, "folder deleted with contents");
                    return Ok(DeleteOutcome::Deleted);
                }
                DeleteDecision::Cancel => {
                    info!(name, "deletion of non-empty folder declined");
                    return Ok(DeleteOutcome::Declined);
                }
            }
        }

        if let Err(e) = fs::remove_dir(&path) {
            error!(name, error = %e, "failed to delete folder");
            return Err(FileStoreError::Io {
                context: format!("delete folder '{}'", name),
                source: e,
            });
        }

        info!(name, "folder deleted");
        Ok(DeleteOutcome::Deleted)
    }

    fn read_contents(&self, path: &Path, name: &str) -> FileStoreResult<String> {
        match fs::read_to_string(path) {
            Ok(data) => Ok(data),
            Err(e) => {
                error!(name, error = %e, "failed to read file");
                Err(FileStoreError::Io {
                    context: format!("read file '{}'", name),
                    source: e,
                })
            }
        }
    }

    fn write_contents(&self, path: &Path, name: &str, data: &str) -> FileStoreResult<()> {
        if let Err(e) = fs::write(path, data) {
            error!(name, error = %e, "failed to write file");
            return Err(FileStoreError::Io {
                context: format!("write file '{}'", name),
                source: e,
            });
        }
        Ok(())
    }
}
