//! Incremental reader for the watched game log.
//!
//! A [`Tailer`] owns the byte cursor into one log file. Opening a tailer
//! places the cursor at the current end of the file, so content written
//! before watching began is never replayed. Each [`poll`](Tailer::poll) reads
//! exactly the bytes appended since the previous poll and splits them into
//! lines.
//!
//! The cursor only moves forward. If the file shrinks, nothing is read until
//! it grows past the cursor again.
//!
//! # Example
//!
//! ```no_run
//! use slaintrack_monitor::tailer::Tailer;
//!
//! let mut tailer = Tailer::open("/games/eq/Logs/eqlog_Aaeldar_pq.proj.txt")?;
//! for line in tailer.poll()? {
//!     println!("{line}");
//! }
//! # Ok::<(), slaintrack_monitor::tailer::TailerError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors that can occur while tailing.
#[derive(Error, Debug)]
pub enum TailerError {
    /// The log file does not exist or cannot be opened.
    #[error("log file not found: {}", .path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to stat or read the log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tailer operations.
pub type Result<T> = std::result::Result<T, TailerError>;

/// Byte cursor into a single log file.
#[derive(Debug)]
pub struct Tailer {
    path: PathBuf,
    cursor: u64,
}

impl Tailer {
    /// Opens `path` and places the cursor at its current size.
    ///
    /// # Errors
    ///
    /// Returns `TailerError::FileNotFound` if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let size = File::open(&path)
            .and_then(|file| file.metadata())
            .map_err(|source| TailerError::FileNotFound {
                path: path.clone(),
                source,
            })?
            .len();

        info!(path = %path.display(), cursor = size, "Tailing log file");

        Ok(Self { path, cursor: size })
    }

    /// Returns the watched path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the offset of the first unprocessed byte.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Reads the bytes appended since the last poll and returns their
    /// non-blank lines.
    ///
    /// The cursor advances to the file size observed by this poll, including
    /// a trailing line that has no line ending yet.
    ///
    /// # Errors
    ///
    /// Returns `TailerError::Io` if the file cannot be stat'ed or read. The
    /// cursor is left untouched in that case.
    pub fn poll(&mut self) -> Result<Vec<String>> {
        let (cursor, lines) = read_delta(&self.path, self.cursor)?;
        self.cursor = cursor;
        Ok(lines)
    }

    /// Same as [`poll`](Self::poll), with the stat and read moved onto the
    /// blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns `TailerError::Io` if the file cannot be stat'ed or read, or if
    /// the blocking task panics. The cursor is left untouched in that case.
    pub async fn poll_async(&mut self) -> Result<Vec<String>> {
        let path = self.path.clone();
        let cursor = self.cursor;

        let (cursor, lines) = tokio::task::spawn_blocking(move || read_delta(&path, cursor))
            .await
            .map_err(|e| TailerError::Io(std::io::Error::other(e)))??;

        self.cursor = cursor;
        Ok(lines)
    }
}

/// Reads the lines appended after `cursor` and returns the new cursor.
fn read_delta(path: &Path, cursor: u64) -> Result<(u64, Vec<String>)> {
    let size = fs::metadata(path)?.len();

    if size < cursor {
        warn!(
            path = %path.display(),
            cursor,
            size,
            "Log file shrank below cursor, waiting for it to grow"
        );
        return Ok((cursor, Vec::new()));
    }
    if size == cursor {
        trace!(path = %path.display(), "No new bytes");
        return Ok((cursor, Vec::new()));
    }

    let delta = read_range(path, cursor, size)?;
    debug!(path = %path.display(), from = cursor, to = size, "Read appended bytes");

    Ok((size, split_lines(&String::from_utf8_lossy(&delta))))
}

/// Reads exactly `[start, end)` from `path`.
fn read_range(path: &Path, start: u64, end: u64) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;

    let len = end - start;
    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    file.take(len).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Splits text on `\n` / `\r\n`, dropping lines that are blank.
fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_log(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("eqlog_Aaeldar.txt");
        fs::write(&path, content).expect("Failed to write log");
        path
    }

    fn append(path: &Path, content: &str) {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(path)
            .expect("Failed to open log");
        file.write_all(content.as_bytes())
            .expect("Failed to append");
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Tailer::open(dir.path().join("missing.txt"));
        assert!(matches!(result, Err(TailerError::FileNotFound { .. })));
    }

    #[test]
    fn existing_content_is_not_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let content = "You have slain a rat.\nYou have slain a bat.\n";
        let path = create_log(&dir, content);

        let mut tailer = Tailer::open(&path).unwrap();
        assert_eq!(tailer.cursor(), content.len() as u64);
        assert!(tailer.poll().unwrap().is_empty());
    }

    #[test]
    fn appended_lines_are_read_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "old line\n");
        let mut tailer = Tailer::open(&path).unwrap();

        append(&path, "first\nsecond\n");
        assert_eq!(tailer.poll().unwrap(), vec!["first", "second"]);
        assert!(tailer.poll().unwrap().is_empty());

        append(&path, "third\n");
        assert_eq!(tailer.poll().unwrap(), vec!["third"]);
    }

    #[test]
    fn cursor_tracks_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "");
        let mut tailer = Tailer::open(&path).unwrap();
        assert_eq!(tailer.cursor(), 0);

        append(&path, "abc\n");
        tailer.poll().unwrap();
        assert_eq!(tailer.cursor(), 4);
    }

    #[test]
    fn blank_lines_and_crlf_are_handled() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "");
        let mut tailer = Tailer::open(&path).unwrap();

        append(&path, "one\r\n\r\n   \ntwo\n\n");
        assert_eq!(tailer.poll().unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn trailing_partial_line_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "");
        let mut tailer = Tailer::open(&path).unwrap();

        append(&path, "complete\npartial");
        assert_eq!(tailer.poll().unwrap(), vec!["complete", "partial"]);

        append(&path, " rest\n");
        assert_eq!(tailer.poll().unwrap(), vec![" rest"]);
    }

    #[test]
    fn shrinking_file_keeps_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "0123456789\n");
        let mut tailer = Tailer::open(&path).unwrap();

        fs::write(&path, "abc\n").unwrap();
        assert!(tailer.poll().unwrap().is_empty());
        assert_eq!(tailer.cursor(), 11);

        // Bytes before offset 11 were already consumed.
        append(&path, "defghij\nnew\n");
        assert_eq!(tailer.poll().unwrap(), vec!["new"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "");
        let mut tailer = Tailer::open(&path).unwrap();

        let mut file = fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"caf\xe9\n").unwrap();

        assert_eq!(tailer.poll().unwrap(), vec!["caf\u{FFFD}"]);
    }

    #[test]
    fn deleted_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "x\n");
        let mut tailer = Tailer::open(&path).unwrap();

        fs::remove_file(&path).unwrap();
        assert!(matches!(tailer.poll(), Err(TailerError::Io(_))));
        assert_eq!(tailer.cursor(), 2);
    }

    #[tokio::test]
    async fn poll_async_reads_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = create_log(&dir, "old\n");
        let mut tailer = Tailer::open(&path).unwrap();

        append(&path, "You have slain a rat.\n");
        assert_eq!(tailer.poll_async().await.unwrap(), vec!["You have slain a rat."]);
        assert_eq!(tailer.cursor(), 26);
        assert!(tailer.poll_async().await.unwrap().is_empty());

        fs::remove_file(&path).unwrap();
        assert!(matches!(tailer.poll_async().await, Err(TailerError::Io(_))));
        assert_eq!(tailer.cursor(), 26);
    }
}
