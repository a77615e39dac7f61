//! Stream adapters handed to commands by the dispatcher.
//!
//! A command receives its stdin/stdout/stderr as boxed trait objects; these
//! adapters cover the three sources: the inherited process streams, opened
//! files (via the blanket impls in [`crate::command`]), and in-memory
//! buffers for capturing output in tests.

use std::cell::RefCell;
use std::io::{Cursor, Read, Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;

/// The shell's own standard input, passed through to commands that read it.
pub struct InheritedStdin;

impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        std::io::stdin().lock().read(buf)
    }
}

impl crate::command::Stdin for InheritedStdin {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// The shell's own standard output, used when a command's stdout is not
/// redirected.
pub struct InheritedStdout;

impl Write for InheritedStdout {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        std::io::stdout().write(data)
    }

    fn flush(&mut self) -> IoResult<()> {
        std::io::stdout().flush()
    }
}

impl crate::command::Stdout for InheritedStdout {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// The shell's own standard error, used when a command's stderr is not
/// redirected.
pub struct InheritedStderr;

impl Write for InheritedStderr {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        std::io::stderr().write(data)
    }

    fn flush(&mut self) -> IoResult<()> {
        std::io::stderr().flush()
    }
}

impl crate::command::Stdout for InheritedStderr {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Memory-backed reader for feeding builtins in tests.
pub struct MemReader {
    cursor: Cursor<Vec<u8>>,
}

impl MemReader {
    /// Create a MemReader that will read from the provided buffer.
    pub fn new(buf: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(buf),
        }
    }
}

impl Read for MemReader {
    fn read(&mut self, out: &mut [u8]) -> IoResult<usize> {
        self.cursor.read(out)
    }
}

impl crate::command::Stdin for MemReader {
    /// In-memory readers never back an external process, so the conversion
    /// degrades to a closed stream.
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}

/// Memory-backed writer for capturing a command's output.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self {
            buf: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Create a writer and return it together with a handle the caller can
    /// read the collected bytes from after the command ran.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let mw = MemWriter::new();
        let rc = mw.buf.clone();
        (mw, rc)
    }
}

impl Default for MemWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for MemWriter {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}
