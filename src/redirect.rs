//! Extraction of redirection operators out of an argument vector.
//!
//! `>` and `1>` redirect stdout (truncating), `>>` and `1>>` append to it;
//! `2>` and `2>>` are the stderr analogs. Operators are recognized only as
//! standalone tokens. The operator and its target are removed from the
//! vector, so the command never sees them.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;

/// A single stream redirection: where to write, and whether to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Path of the target file.
    pub target: String,
    /// Open the target in append mode instead of truncating it.
    pub append: bool,
}

impl Redirect {
    /// Open the target file for writing, creating it if needed and either
    /// truncating or appending per the operator that produced this entry.
    pub fn open(&self) -> io::Result<File> {
        let mut opts = OpenOptions::new();
        opts.write(true).create(true);
        if self.append {
            opts.append(true);
        } else {
            opts.truncate(true);
        }
        opts.open(&self.target)
    }
}

/// Redirections collected from one command, at most one per stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirections {
    /// Redirection for standard output, if any.
    pub stdout: Option<Redirect>,
    /// Redirection for standard error, if any.
    pub stderr: Option<Redirect>,
}

impl Redirections {
    /// True when neither stream is redirected.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }
}

/// Errors produced while extracting redirections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectError {
    /// More than one stdout redirection in the same command.
    DuplicateStdout,
    /// More than one stderr redirection in the same command.
    DuplicateStderr,
}

impl fmt::Display for RedirectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectError::DuplicateStdout => {
                write!(f, "duplicate redirection for standard output")
            }
            RedirectError::DuplicateStderr => {
                write!(f, "duplicate redirection for standard error")
            }
        }
    }
}

impl std::error::Error for RedirectError {}

enum Stream {
    Stdout,
    Stderr,
}

fn classify(token: &str) -> Option<(Stream, bool)> {
    match token {
        ">" | "1>" => Some((Stream::Stdout, false)),
        ">>" | "1>>" => Some((Stream::Stdout, true)),
        "2>" => Some((Stream::Stderr, false)),
        "2>>" => Some((Stream::Stderr, true)),
        _ => None,
    }
}

/// Scan `args` left-to-right for redirection operators, removing each
/// operator together with its target token and recording them per stream.
///
/// Scanning resumes at the same index after a removal, so consecutive
/// operators are handled. A second operator for a stream that already has a
/// target is an error. An operator at the very end of the line is consumed
/// without setting a target. Running the extraction again over an
/// already-stripped vector is a no-op.
pub fn extract(mut args: Vec<String>) -> Result<(Vec<String>, Redirections), RedirectError> {
    let mut redirs = Redirections::default();

    let mut i = 0;
    while i < args.len() {
        let Some((stream, append)) = classify(&args[i]) else {
            i += 1;
            continue;
        };

        let slot = match stream {
            Stream::Stdout => &mut redirs.stdout,
            Stream::Stderr => &mut redirs.stderr,
        };
        if slot.is_some() {
            return Err(match stream {
                Stream::Stdout => RedirectError::DuplicateStdout,
                Stream::Stderr => RedirectError::DuplicateStderr,
            });
        }

        args.remove(i);
        if i < args.len() {
            let target = args.remove(i);
            *slot = Some(Redirect { target, append });
        }
        // do not advance: the shifted-in token may be another operator
    }

    Ok((args, redirs))
}
