//! Line source backing the dispenser.
//!
//! Wraps a buffered reader over the input file and hands each line out
//! exactly once, in file order. The file is opened at startup so a missing
//! or unreadable path fails before the socket is ever bound.

use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Ordered, consume-once supply of lines read from the input file
pub struct LineSource {
    reader: BufReader<File>,
    dispensed: u64,
}

impl LineSource {
    /// Open the input file, failing fast if it is missing, unreadable, or
    /// not a regular file.
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path).await?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        debug!(path = %path.display(), "opened line source");

        Ok(Self {
            reader: BufReader::new(file),
            dispensed: 0,
        })
    }

    /// Next unread line, without its terminator.
    ///
    /// Returns `None` once the file is exhausted; a trailing newline at end
    /// of file does not yield an extra empty line.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }

        // Trim the line ending
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        self.dispensed += 1;
        Ok(Some(line))
    }

    /// Lines handed out so far
    pub fn dispensed(&self) -> u64 {
        self.dispensed
    }
}
