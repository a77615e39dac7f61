//! A small interactive shell.
//!
//! The crate reads command lines from a terminal, parses them with
//! quote/escape-aware tokenizing, and executes each either as an in-process
//! builtin or as an external program, with stream redirection and two-stage
//! pipelines. On an interactive terminal, input goes through a byte-level
//! raw-mode line editor with tab completion; otherwise plain line-buffered
//! reads are used.
//!
//! The main entry point is [`Interpreter`], which drives the whole loop via
//! [`Interpreter::repl`] and can also execute single commands by name with
//! [`Interpreter::run`]. The public modules [`command`] and [`env`] expose
//! the traits and types for plugging in your own commands and for
//! interacting with the process environment.

mod builtin;
pub mod command;
mod completion;
mod editor;
pub mod env;
mod external;
mod interpreter;
mod io_adapters;
mod lexer;
mod pipeline;
mod redirect;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
