//! One-shot directory preparation behind `keepsync --setup`.
//!
//! Steps, in order:
//! 1. warn when the directory is not a git repository (informational),
//! 2. create `config.json` unless present,
//! 3. append missing application entries to `.gitignore`,
//! 4. check that the configured database exists.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::config::{self, CreateOutcome};
use crate::error::{io_err, ConfigError};

pub const GITIGNORE_HEADER: &str = "# KeePass Git Sync Application Files";

/// Application files that must never be committed next to the database.
pub const GITIGNORE_ENTRIES: &[&str] = &[
    "keepsync",
    "keepsync.exe",
    "sync-keepass.sh",
    "sync-keepass.bat",
    "keepass_icon.*",
    "build/",
    "dist/",
];

/// Result of the `.gitignore` step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitignoreUpdate {
    /// This many entries were appended.
    Added(usize),
    AlreadyPresent,
}

/// Outcome of every setup step. Failed steps carry their error instead of
/// aborting the remaining steps.
#[derive(Debug)]
pub struct SetupReport {
    pub git_repository: bool,
    pub config: Result<CreateOutcome, ConfigError>,
    pub gitignore: Result<GitignoreUpdate, ConfigError>,
    pub database: PathBuf,
    pub database_found: bool,
}

impl SetupReport {
    pub const STEPS: usize = 3;

    /// Steps that completed this run. A `config.json` left over from an
    /// earlier run is skipped, not counted.
    pub fn steps_succeeded(&self) -> usize {
        [
            matches!(self.config, Ok(CreateOutcome::Created(_))),
            self.gitignore.is_ok(),
            self.database_found,
        ]
        .into_iter()
        .filter(|ok| *ok)
        .count()
    }

    pub fn is_complete(&self) -> bool {
        self.steps_succeeded() == Self::STEPS
    }
}

/// Run every setup step against `dir`.
pub fn setup_directory_at(dir: &Path) -> SetupReport {
    let git_repository = dir.join(".git").exists();
    let config = config::create_at(dir);
    let gitignore = update_gitignore_at(dir);

    // Use the filename from whatever config is now on disk.
    let settings = config::load_at(&config::config_path_at(dir)).unwrap_or_default();
    let database = dir.join(&settings.database.filename);
    let database_found = database.is_file();

    SetupReport {
        git_repository,
        config,
        gitignore,
        database,
        database_found,
    }
}

/// Append the entries of [`GITIGNORE_ENTRIES`] that `<dir>/.gitignore` lacks.
///
/// Comparison is per trimmed line. A missing trailing newline in the existing
/// file is repaired before appending.
pub fn update_gitignore_at(dir: &Path) -> Result<GitignoreUpdate, ConfigError> {
    let path = dir.join(".gitignore");
    let existing = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => return Err(io_err(&path, err)),
    };

    let missing: Vec<&str> = GITIGNORE_ENTRIES
        .iter()
        .copied()
        .filter(|entry| !existing.lines().any(|line| line.trim() == *entry))
        .collect();
    if missing.is_empty() {
        return Ok(GitignoreUpdate::AlreadyPresent);
    }

    let mut block = String::new();
    if !existing.is_empty() && !existing.ends_with('\n') {
        block.push('\n');
    }
    if !existing.is_empty() {
        block.push('\n');
    }
    block.push_str(GITIGNORE_HEADER);
    block.push('\n');
    for entry in &missing {
        block.push_str(entry);
        block.push('\n');
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| io_err(&path, e))?;
    file.write_all(block.as_bytes())
        .map_err(|e| io_err(&path, e))?;

    Ok(GitignoreUpdate::Added(missing.len()))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn gitignore_created_from_scratch() {
        let dir = TempDir::new().expect("tempdir");
        let update = update_gitignore_at(dir.path()).expect("update");
        assert_eq!(update, GitignoreUpdate::Added(GITIGNORE_ENTRIES.len()));

        let contents = std::fs::read_to_string(dir.path().join(".gitignore")).expect("read");
        assert!(contents.starts_with(GITIGNORE_HEADER));
        assert!(contents.lines().any(|line| line == "sync-keepass.sh"));
    }

    #[test]
    fn gitignore_only_appends_missing_entries() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(".gitignore"), "*.bak\nkeepsync\nbuild/").expect("write");

        let update = update_gitignore_at(dir.path()).expect("update");
        assert_eq!(update, GitignoreUpdate::Added(GITIGNORE_ENTRIES.len() - 2));

        let contents = std::fs::read_to_string(dir.path().join(".gitignore")).expect("read");
        assert!(contents.starts_with("*.bak\nkeepsync\nbuild/\n\n"));
        assert_eq!(contents.lines().filter(|l| *l == "keepsync").count(), 1);
    }

    #[test]
    fn gitignore_second_run_is_noop() {
        let dir = TempDir::new().expect("tempdir");
        update_gitignore_at(dir.path()).expect("first");
        let update = update_gitignore_at(dir.path()).expect("second");
        assert_eq!(update, GitignoreUpdate::AlreadyPresent);
    }

    #[test]
    fn substring_matches_do_not_count() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(".gitignore"), "old-keepsync.exe\n").expect("write");
        update_gitignore_at(dir.path()).expect("update");
        let contents = std::fs::read_to_string(dir.path().join(".gitignore")).expect("read");
        assert!(contents.lines().any(|line| line == "keepsync.exe"));
    }
}
