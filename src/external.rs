use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin.
///
/// Created by the factory only after the name resolved to an executable on
/// disk, so `execute` works with a full path.
pub struct ExternalCommand {
    path: OsString,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(path: OsString, args: Vec<OsString>) -> Self {
        Self { path, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        match find_command_path(&env.search_dirs, Path::new(name)) {
            Some(executable) => Some(Box::new(ExternalCommand::new(
                executable.as_os_str().to_owned(),
                args.iter().map(|x| x.into()).collect(),
            ))),
            None => None,
        }
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let mut child = std::process::Command::new(&self.path)
            .args(&self.args)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .stderr(stderr.stdio())
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn()
            .with_context(|| format!("failed to launch {}", Path::new(&self.path).display()))?;
        let exit_status = child.wait()?;
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
pub(crate) fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
pub(crate) fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returned if it names an executable file.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: returned
///   if it names an executable file.
/// - Single path component (no separators): each directory of `search_dirs`
///   is tried in order and the first executable match wins.
/// - Relative path with multiple components (e.g., `bin/tool`): checked
///   against the current directory.
/// - Empty path: `None`.
///
/// A candidate counts only if it is a regular file with at least one execute
/// permission bit set.
pub fn find_command_path<'a>(search_dirs: &[PathBuf], path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return is_executable(path).then_some(Cow::Borrowed(path));
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && is_executable(path) {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => {
            // Empty path -> not found
            None
        }
        (Some(x), None) => {
            // Single component -> search the path list
            find_in_search_dirs(search_dirs, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            // Multiple components -> relative to the current dir
            is_executable(path).then_some(Cow::Borrowed(path))
        }
    }
}

fn find_in_search_dirs(search_dirs: &[PathBuf], cmd: &OsStr) -> Option<PathBuf> {
    search_dirs
        .iter()
        .map(|dir| dir.join(cmd))
        .find(|candidate| is_executable(candidate))
}

/// True for a regular file carrying any execute permission bit.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
