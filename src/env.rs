use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a map of environment variables visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `search_dirs`: the executable search path, parsed once at construction.
/// - `should_exit`: a flag the REPL loop checks to know when to terminate.
///
/// Note: fields are public for simplicity. `search_dirs` is written exactly
/// once, in [`Environment::new`], and treated as read-only afterwards.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// Directories consulted, in order, to resolve external command names.
    pub search_dirs: Vec<PathBuf>,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// Copies variables from `std::env::vars()`, initializes `current_dir`
    /// from `std::env::current_dir()`, and splits PATH into `search_dirs`.
    /// An unset PATH is a non-fatal warning: builtins keep working, external
    /// command lookup simply never succeeds.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let search_dirs = match stdenv::var_os("PATH") {
            Some(path) => stdenv::split_paths(&path).collect(),
            None => {
                eprintln!("warning: PATH not set");
                Vec::new()
            }
        };
        Self {
            vars,
            current_dir,
            search_dirs,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
