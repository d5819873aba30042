//! `config.json` persistence and base-directory layout.
//!
//! # Layout
//!
//! ```text
//! <base_dir>/
//!   config.json          (optional; defaults apply when absent)
//!   Passwords.kdbx       (database.filename)
//!   sync-keepass.sh      (sync script, Unix)
//!   sync-keepass.bat     (sync script, Windows)
//! ```
//!
//! The base directory is the parent of an explicit `--config` path, or the
//! current directory otherwise.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::settings::{Settings, DEFAULT_CONFIG_FILE};

// ---------------------------------------------------------------------------
// 1. Layout
// ---------------------------------------------------------------------------

/// Where the config file lives and which directory everything else resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
}

impl Layout {
    /// Resolve the layout from an optional `--config` argument.
    ///
    /// Relative paths are joined onto `cwd`.
    pub fn resolve(config: Option<&Path>, cwd: &Path) -> Self {
        match config {
            Some(path) => {
                let config_path = cwd.join(path);
                let base_dir = config_path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| cwd.to_path_buf());
                Self {
                    base_dir,
                    config_path,
                }
            }
            None => Self {
                base_dir: cwd.to_path_buf(),
                config_path: config_path_at(cwd),
            },
        }
    }

    /// Absolute path of the watched database.
    pub fn database_path(&self, settings: &Settings) -> PathBuf {
        self.base_dir.join(&settings.database.filename)
    }
}

/// `<dir>/config.json`. Pure, no I/O.
pub fn config_path_at(dir: &Path) -> PathBuf {
    dir.join(DEFAULT_CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load settings from `path`.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line/column) if the JSON is malformed or has the wrong shape.
pub fn load_at(path: &Path) -> Result<Settings, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) => return Err(io_err(path, err)),
    };
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write `settings` to `path` as pretty-printed JSON.
///
/// Write flow: serialize → `.json.tmp` sibling → `rename`.
pub fn save_at(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let mut json = serde_json::to_string_pretty(settings)?;
    json.push('\n');

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    std::fs::write(&tmp_path, json).map_err(|e| io_err(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| io_err(path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Create
// ---------------------------------------------------------------------------

/// Result of [`create_at`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(PathBuf),
    AlreadyExists(PathBuf),
}

/// Write a default `config.json` into `dir`. Never overwrites an existing file.
pub fn create_at(dir: &Path) -> Result<CreateOutcome, ConfigError> {
    let path = config_path_at(dir);
    if path.exists() {
        return Ok(CreateOutcome::AlreadyExists(path));
    }
    save_at(&path, &Settings::default())?;
    Ok(CreateOutcome::Created(path))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
