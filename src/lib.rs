//! filenest - a sandboxed file manager and folder organizer
//!
//! This library provides a file store whose operations are confined to a base
//! directory, an extension-to-category mapping loaded from a JSON document,
//! and an organizer that sorts a folder's files into category subfolders.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod file_store;
pub mod logging;
pub mod output;

pub use config::{ConfigError, Settings};
pub use file_category::{CategoryMap, DroppedDuplicate, MappingError};
pub use file_organizer::{FolderOrganizer, MovedFile, OrganizeError, OrganizeReport};
pub use file_store::{
    DeleteDecision, DeleteOutcome, DirectoryEntry, EntryKind, FileStore, FileStoreError,
    UpdateMode,
};

pub use cli::{Cli, Command, run};
