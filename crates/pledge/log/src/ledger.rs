//! Append-only JSONL operation log.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use pledge_types::Operation;
use tracing::debug;

use crate::error::LogError;

/// File name of the log inside the workspace directory.
pub const LEDGER_FILE: &str = "ledger.jsonl";

/// Handle to a ledger file. Holds no open descriptor between calls.
#[derive(Clone, Debug)]
pub struct OperationLog {
    path: PathBuf,
}

impl OperationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Log stored as [`LEDGER_FILE`] inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(LEDGER_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every operation in append order. A missing file is an empty log.
    pub fn read(&self) -> Result<Vec<Operation>, LogError> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        parse_lines(&content)
    }

    /// Append a single operation.
    pub fn append(&self, op: &Operation) -> Result<(), LogError> {
        self.append_batch(std::slice::from_ref(op))
    }

    /// Append operations as one contiguous write, then sync to disk.
    ///
    /// The caller is responsible for holding the workspace lock.
    pub fn append_batch(&self, ops: &[Operation]) -> Result<(), LogError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut buf = Vec::new();
        for op in ops {
            serde_json::to_writer(&mut buf, op)?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // A hand-edited file may lack its final newline.
        if !ends_with_newline(&mut file)? {
            buf.insert(0, b'\n');
        }

        file.write_all(&buf)?;
        file.flush()?;
        file.sync_data()?;

        for op in ops {
            debug!(op_id = %op.id, op = %op.op_type(), actor = %op.actor, "appended operation");
        }
        Ok(())
    }

    pub fn exists(&self, id: &str) -> Result<bool, LogError> {
        Ok(contains_id(&self.read()?, id))
    }

    pub fn exists_by_source_key(&self, key: &str) -> Result<bool, LogError> {
        Ok(contains_source_key(&self.read()?, key))
    }
}

fn ends_with_newline(file: &mut File) -> Result<bool, LogError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Parse log content. Blank lines are skipped; any other line that is not
/// valid UTF-8 or not a valid operation fails the whole read.
pub fn parse_lines(content: &[u8]) -> Result<Vec<Operation>, LogError> {
    let mut ops = Vec::new();
    for (idx, raw) in content.split(|b| *b == b'\n').enumerate() {
        let corrupt = |reason: String| LogError::Corrupt {
            line: idx + 1,
            reason,
        };
        let line = std::str::from_utf8(raw).map_err(|e| corrupt(format!("invalid UTF-8: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }
        ops.push(serde_json::from_str(line).map_err(|e| corrupt(e.to_string()))?);
    }
    Ok(ops)
}

pub fn contains_id(ops: &[Operation], id: &str) -> bool {
    ops.iter().any(|op| op.id == id)
}

pub fn contains_source_key(ops: &[Operation], key: &str) -> bool {
    ops.iter().any(|op| op.source_key.as_deref() == Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pledge_types::{CapturePayload, ClaimPayload, OpPayload};
    use tempfile::tempdir;

    fn capture(body: &str) -> Operation {
        Operation::new(
            "alice",
            "ws",
            OpPayload::Capture(CapturePayload {
                body: body.into(),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        assert!(log.read().unwrap().is_empty());
        assert!(!log.exists("mem_00000000").unwrap());
    }

    #[test]
    fn append_preserves_order() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        let first = capture("first");
        let second = capture("second");
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let ops = log.read().unwrap();
        assert_eq!(ops, vec![first.clone(), second]);
        assert!(log.exists(&first.id).unwrap());
    }

    #[test]
    fn batch_append_writes_one_line_per_op() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        let ops = vec![capture("a"), capture("b"), capture("c")];
        log.append_batch(&ops).unwrap();
        log.append_batch(&[]).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.ends_with('\n'));
        assert_eq!(log.read().unwrap(), ops);
    }

    #[test]
    fn source_keys_are_found() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        log.append(&capture("a").with_source_key("slack:123")).unwrap();
        assert!(log.exists_by_source_key("slack:123").unwrap());
        assert!(!log.exists_by_source_key("slack:124").unwrap());
    }

    #[test]
    fn blank_lines_are_ignored() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        let op = capture("a");
        let line = serde_json::to_string(&op).unwrap();
        std::fs::write(log.path(), format!("\n{line}\n\n   \n")).unwrap();
        assert_eq!(log.read().unwrap(), vec![op]);
    }

    #[test]
    fn corrupt_line_fails_closed() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        log.append(&capture("a")).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        file.write_all(b"{\"id\": \"op_1\", \"op\": \n").unwrap();

        match log.read() {
            Err(LogError::Corrupt { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_line_is_corruption() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        log.append(&capture("a")).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        file.write_all(b"{\"id\": \"op_\xff\xfe\"}\n").unwrap();

        let err = log.read().unwrap_err();
        assert_eq!(err.code(), "E_CORRUPT_LOG");
        match err {
            LogError::Corrupt { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn wrong_payload_shape_is_corruption() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        std::fs::write(
            log.path(),
            r#"{"id":"op_00000001","op":"claim","ts":"2025-01-01T00:00:00Z","actor":"a","workspace":"w","payload":{}}"#,
        )
        .unwrap();
        let err = log.read().unwrap_err();
        assert_eq!(err.code(), "E_CORRUPT_LOG");
    }

    #[test]
    fn append_repairs_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let log = OperationLog::in_dir(dir.path());
        let first = capture("a");
        std::fs::write(log.path(), serde_json::to_string(&first).unwrap()).unwrap();

        let claim = Operation::new(
            "alice",
            "ws",
            OpPayload::Claim(ClaimPayload {
                commitment: "cmt_00000001".into(),
            }),
        );
        log.append(&claim).unwrap();
        assert_eq!(log.read().unwrap(), vec![first, claim]);
    }
}
