//! Line input for the REPL.
//!
//! When stdin is a terminal the shell owns the line editing: the terminal
//! is switched to raw mode once at startup and input is handled one byte
//! at a time, with manual echo, end-of-line backspace, and two-step tab
//! completion. When stdin is anything else (a pipe, a file), plain
//! line-buffered reads are used instead. The choice is made exactly once.

use crate::completion::{longest_common_prefix, CompletionEngine};
use std::io::{self, BufRead, Read, Write};
use std::os::unix::io::RawFd;
use termios::{tcsetattr, Termios, ECHO, ICANON, ISIG, TCSANOW, VMIN, VTIME};

const EOT: u8 = 0x04;
const BELL: u8 = 0x07;

/// Keeps the terminal in raw mode for its lifetime.
///
/// The attributes captured at construction are restored in `Drop`, so every
/// way out of the REPL (end of input, the exit builtin, a panic unwinding
/// through the loop) puts the terminal back the way it was found.
pub struct RawModeGuard {
    fd: RawFd,
    original: Termios,
}

impl RawModeGuard {
    pub fn new(fd: RawFd) -> io::Result<Self> {
        let original = Termios::from_fd(fd)?;
        let mut raw = original;
        // No canonical buffering, no local echo; ISIG off so control bytes
        // reach the editor as bytes to be discarded (signals are out of scope).
        raw.c_lflag &= !(ICANON | ECHO | ISIG);
        raw.c_cc[VMIN] = 1;
        raw.c_cc[VTIME] = 0;
        tcsetattr(fd, TCSANOW, &raw)?;
        Ok(Self { fd, original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = tcsetattr(self.fd, TCSANOW, &self.original);
    }
}

/// Source of command lines, fixed at startup by a terminal-ness check.
pub enum LineReader {
    /// Raw-mode editing with tab completion on an interactive terminal.
    Interactive(RawEditor),
    /// Line-buffered fallback for non-terminal input.
    Buffered(io::BufReader<io::Stdin>),
}

impl LineReader {
    /// Probe stdin once and pick the matching input path.
    pub fn from_stdin(completer: CompletionEngine) -> io::Result<Self> {
        let fd = libc::STDIN_FILENO;
        if unsafe { libc::isatty(fd) } == 1 {
            Ok(LineReader::Interactive(RawEditor::new(fd, completer)?))
        } else {
            Ok(LineReader::Buffered(io::BufReader::new(io::stdin())))
        }
    }

    /// Print the prompt and read one line, without its terminator.
    /// `None` signals end of input.
    pub fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        match self {
            LineReader::Interactive(editor) => editor.read_line(prompt),
            LineReader::Buffered(reader) => {
                let mut stdout = io::stdout();
                stdout.write_all(prompt.as_bytes())?;
                stdout.flush()?;

                let mut line = String::new();
                if reader.read_line(&mut line)? == 0 {
                    return Ok(None);
                }
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(Some(line))
            }
        }
    }
}

/// Byte-at-a-time editor over a raw-mode terminal.
///
/// Editing happens at the end of the buffer only: printable bytes append,
/// backspace deletes, Tab completes the trailing word. Cursor movement,
/// history and multi-line input are not supported.
pub struct RawEditor {
    _raw: RawModeGuard,
    completer: CompletionEngine,
}

impl RawEditor {
    fn new(fd: RawFd, completer: CompletionEngine) -> io::Result<Self> {
        Ok(Self {
            _raw: RawModeGuard::new(fd)?,
            completer,
        })
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut stdin = io::stdin().lock();
        let mut buffer: Vec<u8> = Vec::new();
        // Two-step completion state: 1 after a tab that could neither
        // complete nor extend. Any other key resets it.
        let mut pending_tab: u8 = 0;

        loop {
            let mut byte = [0u8; 1];
            if stdin.read(&mut byte)? == 0 {
                // input stream closed underneath the terminal
                writeln!(stdout)?;
                stdout.flush()?;
                return Ok(finalize(buffer));
            }
            let b = byte[0];
            if b != b'\t' {
                pending_tab = 0;
            }

            match b {
                EOT => {
                    writeln!(stdout)?;
                    stdout.flush()?;
                    return Ok(finalize(buffer));
                }
                b'\n' | b'\r' => {
                    writeln!(stdout)?;
                    stdout.flush()?;
                    return Ok(Some(lossy(buffer)));
                }
                b'\t' => {
                    apply_completion(
                        &self.completer,
                        &mut buffer,
                        &mut pending_tab,
                        prompt,
                        &mut stdout,
                    )?;
                }
                0x08 | 0x7f => {
                    if buffer.pop().is_some() {
                        stdout.write_all(b"\x08 \x08")?;
                        stdout.flush()?;
                    }
                }
                b if b < 0x20 => {
                    // remaining control bytes are discarded
                }
                b => {
                    buffer.push(b);
                    stdout.write_all(&[b])?;
                    stdout.flush()?;
                }
            }
        }
    }
}

/// One Tab press: complete the word being typed at the end of the buffer,
/// updating both the buffer and the visible line.
///
/// A free function over plain streams so the behavior can be exercised
/// without a terminal.
fn apply_completion(
    completer: &CompletionEngine,
    buffer: &mut Vec<u8>,
    pending_tab: &mut u8,
    prompt: &str,
    stdout: &mut impl Write,
) -> io::Result<()> {
    let text = lossy(buffer.clone());
    let prefix = word_under_completion(&text).to_string();

    let matches = completer.candidates(&prefix);
    match matches.len() {
        0 => {
            *pending_tab = 0;
            stdout.write_all(&[BELL])?;
        }
        1 => {
            // unambiguous: fill in the rest plus a separating space
            *pending_tab = 0;
            let mut addition = matches[0][prefix.len()..].to_string();
            addition.push(' ');
            buffer.extend_from_slice(addition.as_bytes());
            stdout.write_all(addition.as_bytes())?;
        }
        _ => {
            let common = longest_common_prefix(&matches);
            if common.len() > prefix.len() {
                // partial completion: extend to the shared prefix and
                // let a further Tab continue from there
                *pending_tab = 0;
                let addition = common[prefix.len()..].to_string();
                buffer.extend_from_slice(addition.as_bytes());
                stdout.write_all(addition.as_bytes())?;
            } else if *pending_tab == 0 {
                *pending_tab = 1;
                stdout.write_all(&[BELL])?;
            } else {
                *pending_tab = 0;
                write!(stdout, "\n{}\n", matches.join("  "))?;
                write!(stdout, "{}", prompt)?;
                stdout.write_all(buffer)?;
            }
        }
    }
    stdout.flush()
}

fn finalize(buffer: Vec<u8>) -> Option<String> {
    if buffer.is_empty() {
        None
    } else {
        Some(lossy(buffer))
    }
}

fn lossy(buffer: Vec<u8>) -> String {
    String::from_utf8_lossy(&buffer).into_owned()
}

/// The whitespace-delimited word at the end of the line, i.e. the text the
/// user is in the middle of typing.
fn word_under_completion(text: &str) -> &str {
    match text.rfind([' ', '\t']) {
        Some(i) => &text[i + 1..],
        None => text,
    }
}
