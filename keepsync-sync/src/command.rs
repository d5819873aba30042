//! Which program runs a sync, and how.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Default script name on Unix-like systems, run with `bash`.
pub const UNIX_SCRIPT: &str = "sync-keepass.sh";
/// Default script name on Windows, run with `cmd /c`.
pub const WINDOWS_SCRIPT: &str = "sync-keepass.bat";

/// A program plus arguments, invoked without any extra arguments from keepsync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    program: OsString,
    args: Vec<OsString>,
    script: Option<PathBuf>,
}

impl SyncCommand {
    /// An arbitrary program. Mostly useful for tests and custom wrappers.
    pub fn new<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            script: None,
        }
    }

    /// Run `script` through the interpreter its extension calls for:
    /// `.bat`/`.cmd` through `cmd /c`, everything else through `bash`.
    pub fn for_script(script: PathBuf) -> Self {
        let is_batch = script
            .extension()
            .and_then(OsStr::to_str)
            .map(|ext| ext.eq_ignore_ascii_case("bat") || ext.eq_ignore_ascii_case("cmd"))
            .unwrap_or(false);

        let (program, mut args): (OsString, Vec<OsString>) = if is_batch {
            ("cmd".into(), vec!["/c".into()])
        } else {
            ("bash".into(), Vec::new())
        };
        args.push(script.clone().into_os_string());

        Self {
            program,
            args,
            script: Some(script),
        }
    }

    /// The platform's default script inside `base_dir`.
    pub fn platform_default(base_dir: &Path) -> Self {
        let name = if cfg!(windows) {
            WINDOWS_SCRIPT
        } else {
            UNIX_SCRIPT
        };
        Self::for_script(base_dir.join(name))
    }

    /// `custom` (relative to `base_dir`) when configured, else the platform default.
    pub fn resolve(base_dir: &Path, custom: Option<&Path>) -> Self {
        match custom {
            Some(script) => Self::for_script(base_dir.join(script)),
            None => Self::platform_default(base_dir),
        }
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// The script this command runs, if it was built from one.
    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    /// Build the child-process command: stdin closed, output piped, killed
    /// when dropped.
    pub(crate) fn to_command(&self, working_dir: &Path) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
