//! Command-line interface module for filenest.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and validation
//! - File and folder command handling
//! - Organization orchestration
//! - User-facing result reporting

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Settings;
use crate::file_organizer::FolderOrganizer;
use crate::file_store::{DeleteDecision, DeleteOutcome, FileStore, UpdateMode};
use crate::logging::Verbosity;
use crate::output::OutputFormatter;

/// Sandboxed file manager and folder organizer.
#[derive(Parser, Debug)]
#[command(name = "filenest", version, about = "Manage and organize files inside a sandbox directory")]
pub struct Cli {
    /// Base directory all operations are sandboxed to
    #[arg(long, global = true)]
    pub base: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Append logs to this file in addition to the console
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Console verbosity derived from the `--verbose`/`--quiet` flags.
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the entries of the base directory or one of its folders
    List {
        /// Folder to list instead of the base directory
        folder: Option<String>,
    },
    /// Create a new, empty folder
    CreateFolder {
        /// Name of the folder
        name: String,
    },
    /// Rename a file or folder
    Rename {
        /// Current name
        name: String,
        /// New name
        new_name: String,
    },
    /// Delete a folder
    DeleteFolder {
        /// Name of the folder
        name: String,
        /// Delete the folder even if it still has contents
        #[arg(long)]
        force: bool,
    },
    /// Create a new file
    CreateFile {
        /// Name of the file
        name: String,
        /// Initial content
        #[arg(long, default_value = "")]
        content: String,
        /// Operate inside this folder of the base directory
        #[arg(long)]
        folder: Option<String>,
    },
    /// Print a file's content
    ReadFile {
        /// Name of the file
        name: String,
        /// Operate inside this folder of the base directory
        #[arg(long)]
        folder: Option<String>,
    },
    /// Update a file's content
    UpdateFile {
        /// Name of the file
        name: String,
        /// How to change the content
        #[arg(long, value_enum)]
        mode: UpdateModeArg,
        /// Text to replace (replace mode)
        #[arg(long)]
        old: Option<String>,
        /// New text (replace, append and overwrite modes)
        #[arg(long)]
        new: Option<String>,
        /// Operate inside this folder of the base directory
        #[arg(long)]
        folder: Option<String>,
    },
    /// Delete a file
    DeleteFile {
        /// Name of the file
        name: String,
        /// Operate inside this folder of the base directory
        #[arg(long)]
        folder: Option<String>,
    },
    /// Sort a folder's files into category subfolders
    Organize {
        /// Folder to organize
        folder: String,
        /// Mapping document to use instead of the configured one
        #[arg(long)]
        mapping: Option<String>,
    },
}

/// Content update strategies selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateModeArg {
    /// Replace every occurrence of the old text with the new text
    Replace,
    /// Append the new text after the existing content
    Append,
    /// Replace the whole content with the new text
    Overwrite,
    /// Empty the file
    Clear,
}

/// Runs the parsed command against the configured base directory.
///
/// The base directory comes from `--base` when given and from the settings
/// otherwise, and is created if missing.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use filenest::cli::{self, Cli};
/// use filenest::config::Settings;
///
/// let cli = Cli::parse_from(["filenest", "list"]);
/// let settings = Settings::default();
/// if let Err(e) = cli::run(&cli, &settings) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run(cli: &Cli, settings: &Settings) -> Result<(), String> {
    let base = cli.base.as_ref().unwrap_or(&settings.base_dir);
    let store = FileStore::new(base)
        .map_err(|e| format!("Cannot open base directory {}: {}", base.display(), e))?;

    match &cli.command {
        Command::List { folder } => list_entries(&store, folder.as_deref()),
        Command::CreateFolder { name } => create_folder(&store, name),
        Command::Rename { name, new_name } => rename_entry(&store, name, new_name),
        Command::DeleteFolder { name, force } => delete_folder(&store, name, *force),
        Command::CreateFile {
            name,
            content,
            folder,
        } => create_file(&store, name, content, folder.as_deref()),
        Command::ReadFile { name, folder } => read_file(&store, name, folder.as_deref()),
        Command::UpdateFile {
            name,
            mode,
            old,
            new,
            folder,
        } => update_file(&store, name, *mode, old.clone(), new.clone(), folder.as_deref()),
        Command::DeleteFile { name, folder } => delete_file(&store, name, folder.as_deref()),
        Command::Organize { folder, mapping } => organize_folder(
            store,
            folder,
            mapping.as_deref().unwrap_or(&settings.mapping_file),
        ),
    }
}

/// Scopes the store into `folder` when one was requested.
fn scoped_store(store: &FileStore, folder: Option<&str>) -> Result<FileStore, String> {
    match folder {
        Some(name) => store.enter(name).map_err(|e| e.to_string()),
        None => Ok(store.clone()),
    }
}

fn list_entries(store: &FileStore, folder: Option<&str>) -> Result<(), String> {
    let store = scoped_store(store, folder)?;
    let entries = store.list().map_err(|e| e.to_string())?;

    if entries.is_empty() {
        OutputFormatter::info("(empty)");
        return Ok(());
    }

    OutputFormatter::header(&format!("Contents of {}", store.root().display()));
    for entry in &entries {
        if entry.is_folder() {
            OutputFormatter::plain(&format!(" - {}/", entry.name));
        } else {
            OutputFormatter::plain(&format!(" - {}", entry.name));
        }
    }
    Ok(())
}

fn create_folder(store: &FileStore, name: &str) -> Result<(), String> {
    store.create_folder(name).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("Folder '{}' created", name));
    Ok(())
}

fn rename_entry(store: &FileStore, name: &str, new_name: &str) -> Result<(), String> {
    store.rename(name, new_name).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("'{}' renamed to '{}'", name, new_name));
    Ok(())
}

fn delete_folder(store: &FileStore, name: &str, force: bool) -> Result<(), String> {
    let outcome = store
        .delete_folder(name, |folder| {
            if force {
                DeleteDecision::DeleteAll
            } else {
                OutputFormatter::warning(&format!(
                    "Folder '{}' is not empty. Re-run with --force to delete it anyway.",
                    folder
                ));
                DeleteDecision::Cancel
            }
        })
        .map_err(|e| e.to_string())?;

    if outcome == DeleteOutcome::Deleted {
        OutputFormatter::success(&format!("Folder '{}' deleted", name));
    }
    Ok(())
}

fn create_file(
    store: &FileStore,
    name: &str,
    content: &str,
    folder: Option<&str>,
) -> Result<(), String> {
    let store = scoped_store(store, folder)?;
    store.create_file(name, content).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("File '{}' created", name));
    Ok(())
}

fn read_file(store: &FileStore, name: &str, folder: Option<&str>) -> Result<(), String> {
    let store = scoped_store(store, folder)?;
    let content = store.read_file(name).map_err(|e| e.to_string())?;
    OutputFormatter::plain(&content);
    Ok(())
}

fn update_file(
    store: &FileStore,
    name: &str,
    mode: UpdateModeArg,
    old: Option<String>,
    new: Option<String>,
    folder: Option<&str>,
) -> Result<(), String> {
    let store = scoped_store(store, folder)?;
    let mode = build_update_mode(mode, old, new)?;
    store.update_file(name, mode).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("File '{}' updated", name));
    Ok(())
}

fn delete_file(store: &FileStore, name: &str, folder: Option<&str>) -> Result<(), String> {
    let store = scoped_store(store, folder)?;
    store.delete_file(name).map_err(|e| e.to_string())?;
    OutputFormatter::success(&format!("File '{}' deleted", name));
    Ok(())
}

/// Turns the parsed mode and its `--old`/`--new` options into an update.
fn build_update_mode(
    mode: UpdateModeArg,
    old: Option<String>,
    new: Option<String>,
) -> Result<UpdateMode, String> {
    match mode {
        UpdateModeArg::Replace => {
            let old = old.ok_or("replace mode requires --old")?;
            let new = new.ok_or("replace mode requires --new")?;
            Ok(UpdateMode::Replace { old, new })
        }
        UpdateModeArg::Append => {
            let text = new.ok_or("append mode requires --new")?;
            Ok(UpdateMode::Append(text))
        }
        UpdateModeArg::Overwrite => {
            let text = new.ok_or("overwrite mode requires --new")?;
            Ok(UpdateMode::Overwrite(text))
        }
        UpdateModeArg::Clear => Ok(UpdateMode::Clear),
    }
}

fn organize_folder(store: FileStore, folder: &str, mapping_name: &str) -> Result<(), String> {
    OutputFormatter::info(&format!("Organizing folder '{}'", folder));

    let organizer = FolderOrganizer::new(store);
    let spinner = OutputFormatter::create_spinner("Classifying and moving files...");
    let result = organizer.organize(folder, mapping_name);
    spinner.finish_and_clear();

    let report = result.map_err(|e| e.to_string())?;

    if let Some(mapping) = organizer.mapping() {
        for duplicate in mapping.dropped() {
            OutputFormatter::warning(&format!(
                "Extension '{}' is also claimed by '{}'; kept '{}'",
                duplicate.extension, duplicate.dropped_category, duplicate.kept_category
            ));
        }
    }

    for moved in &report.organized {
        let name = moved
            .original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| moved.original_path.display().to_string());
        OutputFormatter::plain(&format!(" - {} → {}/", name, moved.category));
    }

    if report.left_in_place > 0 {
        OutputFormatter::info(&format!("{} file(s) left in place", report.left_in_place));
    }

    if report.organized.is_empty() && report.is_complete_success() {
        OutputFormatter::info("No files needed organizing.");
    } else if !report.organized.is_empty() {
        OutputFormatter::summary_table(&report.category_counts(), report.organized.len());
    }

    if report.is_complete_success() {
        OutputFormatter::success(&format!("Folder '{}' organized", folder));
        Ok(())
    } else {
        for (path, reason) in &report.failures {
            OutputFormatter::error(&format!("{}: {}", path.display(), reason));
        }
        Err(format!(
            "{} file(s) could not be organized",
            report.failures.len()
        ))
    }
}
