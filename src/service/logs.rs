use crate::domain::LogExcerpt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Logged once by the binary at startup; marks a process restart in the log file.
pub const STARTUP_MESSAGE: &str = "Starting nanoservice";

/// Inserted above every restart line in a log excerpt.
pub const RESTART_MARKER: &str = "\nRESTART\n\n";

pub const DEFAULT_LOG_LENGTH: usize = 100;
pub const MAX_LOG_LENGTH: usize = 10_000;

const CHUNK_SIZE: u64 = 8 * 1024;

/// The last `limit` lines of `path` in file order.
///
/// Reads backwards in fixed-size chunks and stops as soon as enough lines
/// are buffered, so large files are never loaded whole.
pub fn tail_lines(path: &Path, limit: usize) -> io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut pos = file.metadata()?.len();
    let mut tail: Vec<u8> = Vec::new();
    let mut newlines = 0usize;

    while pos > 0 && newlines <= limit {
        let size = CHUNK_SIZE.min(pos);
        pos -= size;
        file.seek(SeekFrom::Start(pos))?;

        let mut chunk = vec![0u8; size as usize];
        file.read_exact(&mut chunk)?;
        newlines += chunk.iter().filter(|&&b| b == b'\n').count();

        chunk.extend_from_slice(&tail);
        tail = chunk;
    }

    let text = String::from_utf8_lossy(&tail);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(limit);
    Ok(lines[start..]
        .iter()
        .map(|line| line.trim_end().to_string())
        .collect())
}

/// Prefix every line containing the startup message with [`RESTART_MARKER`].
pub fn annotate_restarts(lines: Vec<String>) -> Vec<String> {
    let mut annotated = Vec::with_capacity(lines.len());
    for line in lines {
        if line.contains(STARTUP_MESSAGE) {
            annotated.push(RESTART_MARKER.to_string());
        }
        annotated.push(line);
    }
    annotated
}

/// Newest-first excerpt of the last `limit` lines, with restart markers.
pub fn read_excerpt(path: &Path, limit: usize) -> io::Result<LogExcerpt> {
    let mut lines = tail_lines(path, limit)?;
    lines.reverse();
    Ok(LogExcerpt {
        lines: annotate_restarts(lines),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn log_file(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn numbered(count: usize) -> Vec<String> {
        (1..=count).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn test_tail_returns_last_lines_in_order() {
        let file = log_file(&numbered(10));
        let lines = tail_lines(file.path(), 3).unwrap();
        assert_eq!(lines, vec!["line 8", "line 9", "line 10"]);
    }

    #[test]
    fn test_tail_spans_multiple_chunks() {
        let file = log_file(&numbered(5_000));
        let lines = tail_lines(file.path(), 2_500).unwrap();
        assert_eq!(lines.len(), 2_500);
        assert_eq!(lines.first().unwrap(), "line 2501");
        assert_eq!(lines.last().unwrap(), "line 5000");
    }

    #[test]
    fn test_tail_shorter_file() {
        let file = log_file(&numbered(2));
        assert_eq!(tail_lines(file.path(), 100).unwrap(), vec!["line 1", "line 2"]);
    }

    #[test]
    fn test_tail_without_trailing_newline() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "a\nb\nc").unwrap();
        assert_eq!(tail_lines(file.path(), 2).unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_limit_and_missing_file() {
        let file = log_file(&numbered(3));
        assert!(tail_lines(file.path(), 0).unwrap().is_empty());
        assert!(tail_lines(Path::new("/nonexistent/app.log"), 0).is_err());
    }

    #[test]
    fn test_excerpt_is_newest_first_with_marker() {
        let file = log_file(&[
            "old entry".to_string(),
            format!("INFO {STARTUP_MESSAGE} on 0.0.0.0:8080"),
            "new entry".to_string(),
        ]);
        let excerpt = read_excerpt(file.path(), 10).unwrap();
        assert_eq!(
            excerpt.lines,
            vec![
                "new entry".to_string(),
                RESTART_MARKER.to_string(),
                format!("INFO {STARTUP_MESSAGE} on 0.0.0.0:8080"),
                "old entry".to_string(),
            ]
        );
    }
}
