//! Hosts file writer.
//!
//! Sluice owns one marker-delimited block of the hosts file and leaves every
//! other line alone:
//!
//! ```text
//! 127.0.0.1 localhost
//! # >>> sluice >>>
//! 10.0.0.1 printer.lan
//! # <<< sluice <<<
//! ```

use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;
use sluice_rules::SystemHosts;
use tracing::debug;

const BEGIN_MARKER: &str = "# >>> sluice >>>";
const END_MARKER: &str = "# <<< sluice <<<";

/// Reads and replaces the managed block of a hosts file.
pub struct FileHostsWriter {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileHostsWriter {
    /// Create a writer for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_file(&self) -> io::Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }
}

impl SystemHosts for FileHostsWriter {
    fn get_hosts(&self) -> io::Result<String> {
        let _guard = self.lock.lock();
        let file = self.read_file()?;
        Ok(managed_block(&file).unwrap_or_default())
    }

    fn set_hosts(&self, text: &str) -> io::Result<()> {
        let _guard = self.lock.lock();
        let file = self.read_file()?;
        let updated = replace_block(&file, text);
        if updated == file {
            return Ok(());
        }
        std::fs::write(&self.path, updated)?;
        debug!(path = %self.path.display(), bytes = text.len(), "hosts block written");
        Ok(())
    }
}

/// Locate the begin and end marker line indices.
fn block_bounds(lines: &[&str]) -> Option<(usize, usize)> {
    let begin = lines.iter().position(|l| l.trim_end() == BEGIN_MARKER)?;
    let end = lines[begin + 1..]
        .iter()
        .position(|l| l.trim_end() == END_MARKER)?;
    Some((begin, begin + 1 + end))
}

fn managed_block(file: &str) -> Option<String> {
    let lines: Vec<&str> = file.lines().collect();
    let (begin, end) = block_bounds(&lines)?;
    Some(lines[begin + 1..end].join("\r\n"))
}

/// Replace (or append, or drop when `text` is blank) the managed block.
fn replace_block(file: &str, text: &str) -> String {
    let lines: Vec<&str> = file.lines().collect();
    let (before, after): (Vec<&str>, Vec<&str>) = match block_bounds(&lines) {
        Some((begin, end)) => (lines[..begin].to_vec(), lines[end + 1..].to_vec()),
        None => (lines.clone(), Vec::new()),
    };

    let mut out: Vec<&str> = before;
    while out.last().is_some_and(|l| l.trim().is_empty()) {
        let _ = out.pop();
    }
    let body = text.trim();
    if !body.is_empty() {
        out.push(BEGIN_MARKER);
        out.extend(body.lines());
        out.push(END_MARKER);
    }
    out.extend(after);
    if out.is_empty() {
        return String::new();
    }
    let mut result = out.join("\n");
    result.push('\n');
    result
}
