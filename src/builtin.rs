use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::external::find_command_path;
use crate::interpreter::Factory;
use anyhow::{anyhow, Result};
use argh::{EarlyExit, FromArgs};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Builtin names in registration order. The interpreter registers its
/// factories in this order, and `type` and the completion engine consult
/// the same list, so the three can never disagree.
pub const NAMES: [&str; 6] = ["exit", "echo", "help", "type", "pwd", "cd"];

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed
/// directly in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using the provided IO streams and environment.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for
    /// error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, &mut stdin, &mut stdout, &mut stderr, env) {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(stderr, "{}", e)?;
                Ok(1)
            }
        }
    }
}

/// Fallback command produced when argh rejects the arguments; prints the
/// diagnostic argh prepared and yields the matching exit code.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            stderr.write_all(self.output.as_bytes())?;
            Ok(1)
        } else {
            stdout.write_all(self.output.as_bytes())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Leave the shell with status 0.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; a numeric status argument is not supported.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        // Shutdown is signalled through the environment rather than by
        // terminating here, so the REPL unwinds normally and terminal
        // restoration runs on this path exactly as on EOF.
        env.should_exit = true;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Write the arguments to standard output, separated by single spaces.
/// By default a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Print a summary of the built-in commands.
pub struct Help {}

impl BuiltinCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "tish, a small interactive shell. Built-ins available:")?;
        for name in NAMES {
            writeln!(stdout, "  {}", name)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report how each operand would be interpreted: as a shell builtin or as
/// an executable found on the search path.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to classify.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.names.is_empty() {
            return Err(anyhow!("type: expected argument"));
        }

        let mut code = 0;
        for name in &self.names {
            if NAMES.contains(&name.as_str()) {
                writeln!(stdout, "{} is a shell builtin", name)?;
            } else if let Some(path) = find_command_path(&env.search_dirs, Path::new(name)) {
                writeln!(stdout, "{} is {}", name, path.display())?;
            } else {
                writeln!(stdout, "{}: not found", name)?;
                code = 1;
            }
        }
        Ok(code)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let cwd = std::env::current_dir().map_err(|e| anyhow!("pwd: {}", e))?;
        writeln!(stdout, "{}", cwd.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory. A leading `~` expands to the home
/// directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let arg = match &self.target {
            Some(t) if !t.is_empty() => t,
            _ => return Err(anyhow!("cd: missing argument")),
        };

        let home = env.get_var("HOME");
        let expanded = expand_home(arg, home.as_deref())?;

        let target = PathBuf::from(expanded);
        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        match std::env::set_current_dir(&new_dir) {
            Ok(()) => {
                env.current_dir = std::env::current_dir().unwrap_or(new_dir);
                Ok(0)
            }
            Err(_) => Err(anyhow!("cd: {}: No such file or directory", arg)),
        }
    }
}

/// Expand a leading `~`: alone it becomes the home directory, `~/rest`
/// becomes home joined with the rest. Any other `~...` form is left alone.
fn expand_home(arg: &str, home: Option<&str>) -> Result<String> {
    if let Some(rest) = arg.strip_prefix('~') {
        if rest.is_empty() || rest.starts_with('/') {
            let home = home.ok_or_else(|| anyhow!("cd: HOME not set"))?;
            return Ok(format!("{}{}", home, rest));
        }
    }
    Ok(arg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io_adapters::{MemReader, MemWriter};
    use std::collections::HashMap;
    use std::env as stdenv;
    use std::fs;
    use std::io;
    use std::io::Cursor;
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn lock_current_dir() -> MutexGuard<'static, ()> {
        static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap()
    }

    fn test_env() -> Environment {
        Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
            search_dirs: Vec::new(),
            should_exit: false,
        }
    }

    fn make_unique_temp_dir(tag: &str) -> io::Result<PathBuf> {
        let mut p = stdenv::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        p.push(format!("tish_test_{}_{}_{}", tag, std::process::id(), nanos));
        fs::create_dir_all(&p)?;
        Ok(p)
    }

    #[test]
    fn test_echo_joins_args_with_single_spaces() {
        let mut env = test_env();

        let mut out = Vec::new();
        let echo = Echo {
            no_newline: false,
            args: vec!["hello".to_string(), "world".to_string()],
        };
        let code = echo
            .execute(
                &mut Cursor::new(Vec::new()),
                &mut out,
                &mut Vec::new(),
                &mut env,
            )
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "hello world\n");
    }

    #[test]
    fn test_echo_no_newline_switch() {
        let mut env = test_env();

        let mut out = Vec::new();
        let echo = Echo {
            no_newline: true,
            args: vec!["foo".to_string(), "bar".to_string()],
        };
        echo.execute(
            &mut Cursor::new(Vec::new()),
            &mut out,
            &mut Vec::new(),
            &mut env,
        )
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "foo bar");
    }

    #[test]
    fn test_echo_without_args_prints_bare_newline() {
        let mut env = test_env();

        let mut out = Vec::new();
        let echo = Echo {
            no_newline: false,
            args: Vec::new(),
        };
        echo.execute(
            &mut Cursor::new(Vec::new()),
            &mut out,
            &mut Vec::new(),
            &mut env,
        )
        .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "\n");
    }

    #[test]
    fn test_exit_sets_shutdown_flag_and_succeeds() {
        let mut env = test_env();

        let exit = Exit { _args: Vec::new() };
        let code = exit
            .execute(
                &mut Cursor::new(Vec::new()),
                &mut Vec::new(),
                &mut Vec::new(),
                &mut env,
            )
            .unwrap();

        assert_eq!(code, 0);
        assert!(env.should_exit);
    }

    #[test]
    fn test_help_lists_every_builtin() {
        let mut env = test_env();

        let mut out = Vec::new();
        Help {}
            .execute(
                &mut Cursor::new(Vec::new()),
                &mut out,
                &mut Vec::new(),
                &mut env,
            )
            .unwrap();

        let s = String::from_utf8(out).unwrap();
        for name in NAMES {
            assert!(s.contains(name), "help output is missing {:?}", name);
        }
    }

    #[test]
    fn test_type_classifies_builtin() {
        let mut env = test_env();

        let mut out = Vec::new();
        let cmd = Type {
            names: vec!["cd".to_string()],
        };
        let code = cmd
            .execute(
                &mut Cursor::new(Vec::new()),
                &mut out,
                &mut Vec::new(),
                &mut env,
            )
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(String::from_utf8(out).unwrap(), "cd is a shell builtin\n");
    }

    #[test]
    fn test_type_reports_unknown_name() {
        let mut env = test_env();

        let mut out = Vec::new();
        let cmd = Type {
            names: vec!["nonexistent_cmd_xyz".to_string()],
        };
        let code = cmd
            .execute(
                &mut Cursor::new(Vec::new()),
                &mut out,
                &mut Vec::new(),
                &mut env,
            )
            .unwrap();

        assert_eq!(code, 1);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "nonexistent_cmd_xyz: not found\n"
        );
    }

    #[test]
    fn test_type_missing_operand_is_an_error() {
        let mut env = test_env();

        let cmd = Type { names: Vec::new() };
        let res = cmd.execute(
            &mut Cursor::new(Vec::new()),
            &mut Vec::new(),
            &mut Vec::new(),
            &mut env,
        );

        assert!(res.is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_type_resolves_executable_on_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let temp = make_unique_temp_dir("type").unwrap();
        let exe = temp.join("frobnicate");
        fs::write(&exe, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

        let mut env = test_env();
        env.search_dirs = vec![temp.clone()];

        let mut out = Vec::new();
        let cmd = Type {
            names: vec!["frobnicate".to_string()],
        };
        cmd.execute(
            &mut Cursor::new(Vec::new()),
            &mut out,
            &mut Vec::new(),
            &mut env,
        )
        .unwrap();

        let s = String::from_utf8(out).unwrap();
        assert_eq!(s, format!("frobnicate is {}\n", exe.display()));

        let _ = fs::remove_dir_all(temp);
    }

    #[test]
    fn test_cd_missing_argument_is_an_error() {
        let mut env = test_env();

        let cd = Cd { target: None };
        let res = cd.execute(
            &mut Cursor::new(Vec::new()),
            &mut Vec::new(),
            &mut Vec::new(),
            &mut env,
        );

        assert!(res.is_err());
        assert!(res.unwrap_err().to_string().contains("missing argument"));
    }

    #[test]
    fn test_cd_to_absolute_path() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_abs").unwrap();
        let canonical_temp = fs::canonicalize(&temp).unwrap();
        let orig = stdenv::current_dir().unwrap();

        let mut env = test_env();
        let cd = Cd {
            target: Some(canonical_temp.to_string_lossy().to_string()),
        };
        let res = cd.execute(
            &mut Cursor::new(Vec::new()),
            &mut Vec::new(),
            &mut Vec::new(),
            &mut env,
        );

        assert!(res.is_ok());
        assert_eq!(
            fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(),
            canonical_temp
        );
        assert_eq!(fs::canonicalize(&env.current_dir).unwrap(), canonical_temp);

        stdenv::set_current_dir(orig).unwrap();
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_cd_nonexistent_path_reports_and_stays_put() {
        let _lock = lock_current_dir();
        let orig = stdenv::current_dir().unwrap();

        let mut env = test_env();
        let name = format!("nonexistent_dir_for_tish_test_{}", std::process::id());
        let cd = Cd {
            target: Some(name.clone()),
        };
        let res = cd.execute(
            &mut Cursor::new(Vec::new()),
            &mut Vec::new(),
            &mut Vec::new(),
            &mut env,
        );

        let err = res.unwrap_err().to_string();
        assert_eq!(err, format!("cd: {}: No such file or directory", name));
        assert_eq!(stdenv::current_dir().unwrap(), orig);
    }

    #[test]
    fn test_cd_tilde_goes_home() {
        let _lock = lock_current_dir();
        let temp = make_unique_temp_dir("cd_home").unwrap();
        let canonical_temp = fs::canonicalize(&temp).unwrap();
        let orig = stdenv::current_dir().unwrap();

        let mut env = test_env();
        env.set_var("HOME", canonical_temp.to_string_lossy().to_string());

        let cd = Cd {
            target: Some("~".to_string()),
        };
        let res = cd.execute(
            &mut Cursor::new(Vec::new()),
            &mut Vec::new(),
            &mut Vec::new(),
            &mut env,
        );

        assert!(res.is_ok());
        assert_eq!(
            fs::canonicalize(stdenv::current_dir().unwrap()).unwrap(),
            canonical_temp
        );

        stdenv::set_current_dir(orig).unwrap();
        let _ = fs::remove_dir_all(&temp);
    }

    #[test]
    fn test_expand_home_forms() {
        assert_eq!(expand_home("~", Some("/home/u")).unwrap(), "/home/u");
        assert_eq!(
            expand_home("~/src", Some("/home/u")).unwrap(),
            "/home/u/src"
        );
        // `~user` forms are passed through untouched
        assert_eq!(expand_home("~root", Some("/home/u")).unwrap(), "~root");
        assert_eq!(expand_home("plain", Some("/home/u")).unwrap(), "plain");
    }

    #[test]
    fn test_expand_home_without_home_is_an_error() {
        let err = expand_home("~", None).unwrap_err().to_string();
        assert_eq!(err, "cd: HOME not set");
        assert!(expand_home("~/x", None).is_err());
        // no expansion requested, no HOME needed
        assert!(expand_home("plain", None).is_ok());
    }

    #[test]
    fn test_handler_error_goes_to_the_injected_stderr() {
        let mut env = test_env();
        let (err, err_handle) = MemWriter::with_handle();

        let cmd: Box<dyn ExecutableCommand> = Box::new(Cd { target: None });
        let code = cmd
            .execute(
                Box::new(MemReader::new(Vec::new())),
                Box::new(MemWriter::new()),
                Box::new(err),
                &mut env,
            )
            .unwrap();

        assert_eq!(code, 1);
        let captured = String::from_utf8(err_handle.borrow().clone()).unwrap();
        assert_eq!(captured, "cd: missing argument\n");
    }

    #[test]
    fn test_factory_matches_name_and_rejects_bad_usage() {
        let env = test_env();
        let factory = Factory::<Cd>::default();

        assert!(factory.try_create(&env, "pwd", &[]).is_none());

        // two operands: argh refuses, and the fallback command reports it
        let cmd = factory.try_create(&env, "cd", &["a", "b"]).unwrap();
        let (err, err_handle) = MemWriter::with_handle();
        let mut env = test_env();
        let code = cmd
            .execute(
                Box::new(MemReader::new(Vec::new())),
                Box::new(MemWriter::new()),
                Box::new(err),
                &mut env,
            )
            .unwrap();

        assert_eq!(code, 1);
        assert!(!err_handle.borrow().is_empty());
    }

    #[test]
    fn test_pwd_prints_current_dir() {
        let _lock = lock_current_dir();
        let cur = stdenv::current_dir().unwrap();

        let mut env = test_env();
        let mut out = Vec::new();
        let res = Pwd {}.execute(
            &mut Cursor::new(Vec::new()),
            &mut out,
            &mut Vec::new(),
            &mut env,
        );

        assert!(res.is_ok());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{}\n", cur.display())
        );
    }
}
