//! Lexical analysis: splitting a command line into an argument vector.
//!
//! Splitting happens on unquoted whitespace (runs collapse). Single quotes
//! suppress all interpretation of the enclosed text. Double quotes suppress
//! splitting; inside them a backslash escapes only `"` and `\`, any other
//! backslash pair is copied through verbatim. Outside quotes a backslash
//! escapes the next character, including whitespace. Quote characters are
//! never part of a token, and a quote left open at end of line is finalized
//! as if the line had ended normally.

use std::fmt;

/// Hard cap on the number of arguments in one command line.
pub const MAX_ARGS: usize = 100;

/// Hard cap on the byte length of a single token.
pub const MAX_TOKEN_LEN: usize = 1024;

/// Errors that can occur while splitting a line into tokens.
///
/// Both variants are resource-limit violations. Malformed quoting is never
/// an error: an unterminated quote is absorbed to the end of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    /// The line contains more than [`MAX_ARGS`] arguments.
    TooManyArguments,
    /// A single token exceeds [`MAX_TOKEN_LEN`] bytes.
    TokenTooLong,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyArguments => {
                write!(f, "too many arguments (limit {})", MAX_ARGS)
            }
            LexError::TokenTooLong => {
                write!(f, "argument too long (limit {} bytes)", MAX_TOKEN_LEN)
            }
        }
    }
}

impl std::error::Error for LexError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Unquoted,
    SingleQuoted,
    DoubleQuoted,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    args: Vec<String>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Unquoted,
            buffer: String::new(),
            args: Vec::new(),
        }
    }

    fn make_tokens(mut self) -> Result<Vec<String>, LexError> {
        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Unquoted => self.handle_unquoted(ch)?,
                LexingState::SingleQuoted => self.handle_single_quote(ch)?,
                LexingState::DoubleQuoted => self.handle_double_quote(ch)?,
            }
        }

        // An open quote at end of line is not an error; whatever was
        // collected so far becomes the final token.
        self.flush_token()?;
        Ok(self.args)
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn handle_unquoted(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            ' ' | '\t' => self.flush_token()?,
            '\'' => self.state = LexingState::SingleQuoted,
            '"' => self.state = LexingState::DoubleQuoted,
            '\\' => {
                // The next character is taken literally, whitespace included.
                // A lone backslash at end of line escapes nothing and is dropped.
                if let Some(next) = self.read_char() {
                    self.push_char(next)?;
                }
            }
            c => self.push_char(c)?,
        }
        Ok(())
    }

    fn handle_single_quote(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            '\'' => self.state = LexingState::Unquoted,
            c => self.push_char(c)?,
        }
        Ok(())
    }

    fn handle_double_quote(&mut self, ch: char) -> Result<(), LexError> {
        match ch {
            '"' => self.state = LexingState::Unquoted,
            '\\' => match self.read_char() {
                None => {}
                Some(next @ ('"' | '\\')) => self.push_char(next)?,
                Some(next) => {
                    // Only `"` and `\` are escapable here; for anything else
                    // the backslash stays literal.
                    self.push_char('\\')?;
                    self.push_char(next)?;
                }
            },
            c => self.push_char(c)?,
        }
        Ok(())
    }

    fn push_char(&mut self, ch: char) -> Result<(), LexError> {
        if self.buffer.len() + ch.len_utf8() > MAX_TOKEN_LEN {
            return Err(LexError::TokenTooLong);
        }
        self.buffer.push(ch);
        Ok(())
    }

    /// Ends the current token, if any. Empty buffers produce no token, so
    /// whitespace runs collapse and `''` contributes nothing.
    fn flush_token(&mut self) -> Result<(), LexError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        if self.args.len() == MAX_ARGS {
            return Err(LexError::TooManyArguments);
        }
        self.args.push(std::mem::take(&mut self.buffer));
        Ok(())
    }
}

/// Split a command line into its argument vector.
///
/// Empty or all-whitespace input yields an empty vector; the caller treats
/// that iteration as a no-op.
pub fn split_into_tokens(line: &str) -> Result<Vec<String>, LexError> {
    LexingFSM::new(line).make_tokens()
}
