//! Line-oriented console over any reader/writer pair, so the session can be
//! driven by a real terminal or by scripted input.

use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};

/// Clears the visible screen, homes the cursor, and wipes scrollback.
pub const CLEAR_SEQUENCE: &str = "\x1b[2J\x1b[H\x1b[3J";

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn say(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.output, "{line}")?;
        self.output.flush()
    }

    /// Prints `label` and reads one line. `None` means end of input.
    pub fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    pub fn clear(&mut self) -> io::Result<()> {
        self.output.write_all(CLEAR_SEQUENCE.as_bytes())?;
        self.output.flush()
    }

    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }
}
