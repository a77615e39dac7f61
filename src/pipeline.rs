//! Two-stage pipelines: `left | right`.
//!
//! Both stage names are resolved before anything is spawned, so a bad name
//! on either side is reported without creating a pipe or leaving an orphan
//! child behind. The stages then run concurrently, the upstream stdout fed
//! to the downstream stdin through one OS pipe, and the shell waits for
//! both before reading the next line.

use crate::command::ExitCode;
use crate::env::Environment;
use crate::external::{find_command_path, terminated_by_signal};
use crate::redirect::{self, Redirections};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Run `left | right`, waiting for both children. Returns the downstream
/// stage's exit code.
///
/// Each stage honors its own redirections, with one exception: the pipe
/// owns the upstream stage's stdout, so only its stderr can be redirected.
pub fn run(left: &[String], right: &[String], env: &Environment) -> Result<ExitCode> {
    let (left_args, left_redirs) = redirect::extract(left.to_vec())?;
    let (right_args, right_redirs) = redirect::extract(right.to_vec())?;
    if left_args.is_empty() || right_args.is_empty() {
        return Err(anyhow!("syntax error: empty pipeline stage"));
    }

    let upstream_path = resolve(&left_args[0], env)?;
    let downstream_path = resolve(&right_args[0], env)?;

    let mut upstream = spawn_upstream(&upstream_path, &left_args[1..], &left_redirs, env)?;

    // The only handle the shell holds on the pipe. It is moved into the
    // downstream child's stdin; once that spawn returns, the shell owns no
    // pipe descriptor and the downstream child will see end-of-stream the
    // moment the upstream exits.
    let pipe_read = upstream
        .stdout
        .take()
        .ok_or_else(|| anyhow!("pipeline: upstream stdout was not captured"))?;

    let downstream = spawn_downstream(
        &downstream_path,
        &right_args[1..],
        &right_redirs,
        pipe_read,
        env,
    );

    let mut downstream = match downstream {
        Ok(child) => child,
        Err(e) => {
            // The read end died with the failed spawn; the upstream gets
            // EPIPE/EOF and can be reaped before reporting.
            let _ = upstream.wait();
            return Err(e);
        }
    };

    let downstream_status = downstream.wait()?;
    upstream.wait()?;

    match downstream_status.code() {
        Some(x) => Ok(x),
        None => Ok(terminated_by_signal(downstream_status)),
    }
}

fn resolve(name: &str, env: &Environment) -> Result<PathBuf> {
    find_command_path(&env.search_dirs, Path::new(name))
        .map(|p| p.into_owned())
        .ok_or_else(|| anyhow!("{}: command not found", name))
}

fn spawn_upstream(
    path: &Path,
    args: &[String],
    redirs: &Redirections,
    env: &Environment,
) -> Result<Child> {
    let mut cmd = Command::new(path);
    cmd.args(args)
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .stdout(Stdio::piped());
    if let Some(r) = &redirs.stderr {
        let file = r
            .open()
            .with_context(|| format!("cannot open {}", r.target))?;
        cmd.stderr(file);
    }
    cmd.spawn()
        .with_context(|| format!("failed to launch {}", path.display()))
}

fn spawn_downstream(
    path: &Path,
    args: &[String],
    redirs: &Redirections,
    pipe_read: std::process::ChildStdout,
    env: &Environment,
) -> Result<Child> {
    let mut cmd = Command::new(path);
    cmd.args(args)
        .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(&env.current_dir)
        .stdin(Stdio::from(pipe_read));
    if let Some(r) = &redirs.stdout {
        let file = r
            .open()
            .with_context(|| format!("cannot open {}", r.target))?;
        cmd.stdout(file);
    }
    if let Some(r) = &redirs.stderr {
        let file = r
            .open()
            .with_context(|| format!("cannot open {}", r.target))?;
        cmd.stderr(file);
    }
    cmd.spawn()
        .with_context(|| format!("failed to launch {}", path.display()))
}
