use crate::command::{CommandFactory, ExitCode, Stdout};
use crate::completion::CompletionEngine;
use crate::editor::LineReader;
use crate::env::Environment;
use crate::io_adapters::{InheritedStderr, InheritedStdin, InheritedStdout};
use crate::redirect::{self, Redirections};
use crate::{lexer, pipeline};
use anyhow::{Context, Result};

const PROMPT: &str = "$ ";

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate — builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The interactive command interpreter.
///
/// Holds an [`Environment`] and a list of [`CommandFactory`] objects queried
/// in registration order to create commands by name; the first factory to
/// recognize a name wins. See [`Default`] for the factories included out of
/// the box.
///
/// Example
/// ```
/// use tish::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("echo", &["hello", "world"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
        }
    }

    /// Run a single command invocation by name with arguments, without
    /// touching the terminal. Returns the command's exit code.
    pub fn run(&mut self, name: &str, args: &[&str]) -> Result<ExitCode> {
        self.dispatch(name, args, &Redirections::default())
    }

    /// The Read-Eval-Print Loop.
    ///
    /// Reads lines until end of input or the exit builtin. Every per-command
    /// failure is reported and absorbed here; the loop itself only ends on
    /// EOF, `exit`, or a broken input stream.
    pub fn repl(&mut self) -> Result<()> {
        let completer = CompletionEngine::new(self.env.search_dirs.clone());
        let mut reader =
            LineReader::from_stdin(completer).context("cannot initialize input")?;

        while let Some(line) = reader.read_line(PROMPT)? {
            self.execute_line(&line);
            if self.env.should_exit {
                break;
            }
        }
        Ok(())
    }

    /// Parse and execute one command line, reporting any failure to the
    /// user. Nothing a single line does can take the loop down.
    pub fn execute_line(&mut self, line: &str) {
        let tokens = match lexer::split_into_tokens(line) {
            Ok(tokens) => tokens,
            Err(e) => {
                eprintln!("{}", e);
                return;
            }
        };
        if tokens.is_empty() {
            return;
        }

        if let Some(pos) = tokens.iter().position(|t| t == "|") {
            if tokens[pos + 1..].iter().any(|t| t == "|") {
                eprintln!("syntax error: only two-stage pipelines are supported");
                return;
            }
            if let Err(e) = pipeline::run(&tokens[..pos], &tokens[pos + 1..], &self.env) {
                eprintln!("{:#}", e);
            }
            return;
        }

        let (argv, redirs) = match redirect::extract(tokens) {
            Ok(extracted) => extracted,
            Err(e) => {
                eprintln!("{}", e);
                return;
            }
        };
        if argv.is_empty() {
            return;
        }

        let args: Vec<&str> = argv[1..].iter().map(|s| s.as_str()).collect();
        if let Err(e) = self.dispatch(&argv[0], &args, &redirs) {
            eprintln!("{:#}", e);
        }
    }

    /// Find a command through the factory chain and run it with its streams
    /// bound per the extracted redirections. Builtin redirection is scoped here by
    /// construction: the handler writes to the opened file, the shell's own
    /// streams are never rebound.
    fn dispatch(&mut self, name: &str, args: &[&str], redirs: &Redirections) -> Result<ExitCode> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                let stdout: Box<dyn Stdout> = match &redirs.stdout {
                    Some(r) => Box::new(
                        r.open()
                            .with_context(|| format!("cannot open {}", r.target))?,
                    ),
                    None => Box::new(InheritedStdout),
                };
                let stderr: Box<dyn Stdout> = match &redirs.stderr {
                    Some(r) => Box::new(
                        r.open()
                            .with_context(|| format!("cannot open {}", r.target))?,
                    ),
                    None => Box::new(InheritedStderr),
                };
                return cmd.execute(Box::new(InheritedStdin), stdout, stderr, &mut self.env);
            }
        }
        println!("{}: command not found", name);
        Ok(127)
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands: the builtins
    /// in registration order, then the external command launcher.
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Help>::default()),
            Box::new(Factory::<Type>::default()),
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tish_interp_{}_{}", tag, std::process::id()))
    }

    #[test]
    fn test_run_echo_succeeds() {
        let mut sh = Interpreter::default();
        let code = sh.run("echo", &["hello"]).unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn test_unknown_name_reports_not_found() {
        let mut sh = Interpreter::default();
        let code = sh
            .run("definitely_not_a_command_xyz", &[])
            .unwrap();
        assert_eq!(code, 127);
    }

    #[test]
    fn test_exit_line_raises_shutdown_flag() {
        let mut sh = Interpreter::default();
        assert!(!sh.env.should_exit);
        sh.execute_line("exit");
        assert!(sh.env.should_exit);
    }

    #[test]
    fn test_builtin_stdout_redirection_writes_file() {
        let mut sh = Interpreter::default();
        let out = temp_file("echo_redir");
        sh.execute_line(&format!("echo hello world > {}", out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello world\n");
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_append_redirection_accumulates() {
        let mut sh = Interpreter::default();
        let out = temp_file("echo_append");
        sh.execute_line(&format!("echo one > {}", out.display()));
        sh.execute_line(&format!("echo two >> {}", out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "one\ntwo\n");
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_quoting_survives_end_to_end() {
        let mut sh = Interpreter::default();
        let out = temp_file("quoting");
        sh.execute_line(&format!("echo 'a  b' c > {}", out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "a  b c\n");
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_type_with_explicit_stdout_operator() {
        let mut sh = Interpreter::default();
        let out = temp_file("type_redir");
        sh.execute_line(&format!("type cd 1> {}", out.display()));
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "cd is a shell builtin\n"
        );
        let _ = fs::remove_file(out);
    }

    #[test]
    #[cfg(unix)]
    fn test_pipeline_line_end_to_end() {
        let mut sh = Interpreter::default();
        let out = temp_file("pipe");
        sh.execute_line(&format!("printf hello | cat > {}", out.display()));
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello");
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_blank_and_overlong_lines_do_not_panic() {
        let mut sh = Interpreter::default();
        sh.execute_line("");
        sh.execute_line("   ");
        sh.execute_line("a | b | c");
        sh.execute_line(&"x ".repeat(500));
        assert!(!sh.env.should_exit);
    }
}
