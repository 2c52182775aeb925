//! Append-only JSONL file writer.
//!
//! A CLI command and a running terminal shell may log to the same file. The
//! file is opened in append mode and each line goes out in a single write, so
//! lines from different processes never interleave.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Writer shared by every event of the process.
#[derive(Clone)]
pub struct CentralLogWriter {
    file: Arc<Mutex<File>>,
}

impl CentralLogWriter {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl Write for CentralLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for CentralLogWriter {
    type Writer = CentralLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_creates_missing_log_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("app.jsonl");

        let mut writer = CentralLogWriter::new(&path).unwrap();
        writer.write_all(b"{\"message\":\"ready\"}\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"message\":\"ready\"}\n");
    }

    #[test]
    fn test_writers_append_to_the_same_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.jsonl");

        let mut cli = CentralLogWriter::new(&path).unwrap();
        let mut tui = CentralLogWriter::new(&path).unwrap();
        cli.write_all(b"cli\n").unwrap();
        tui.write_all(b"tui\n").unwrap();
        cli.make_writer().write_all(b"cli again\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "cli\ntui\ncli again\n");
    }
}
