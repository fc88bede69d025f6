// Append-only JSONL journal, one record per line.
// Appends hold an exclusive advisory lock and re-derive the next id whenever
// the file grew since the last scan, so ids stay unique across processes.
// Reads take a shared lock on an independent handle.
use crate::core::error::{Error, ErrorKind};
use crate::core::record::FeedbackRecord;
use crate::core::store::FeedbackStore;
use fs2::FileExt;
use libc::{EACCES, EPERM};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::OffsetDateTime;

#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    state: Mutex<JournalState>,
}

#[derive(Debug)]
struct JournalState {
    file: File,
    next_id: u64,
    scanned_len: u64,
}

impl Journal {
    /// Open or create the journal at `path`, creating missing parent
    /// directories and validating every existing line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    Error::new(map_io_error_kind(&err))
                        .with_path(parent)
                        .with_source(err)
                })?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| {
                Error::new(map_io_error_kind(&err))
                    .with_path(&path)
                    .with_source(err)
            })?;

        let (next_id, scanned_len) = scan_journal(&path)?;
        Ok(Self {
            path,
            state: Mutex::new(JournalState {
                file,
                next_id,
                scanned_len,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record count after a full validating scan.
    pub fn verify(&self) -> Result<u64, Error> {
        Ok(self.list()?.len() as u64)
    }
}

impl FeedbackStore for Journal {
    fn append(&self, message: &str) -> Result<FeedbackRecord, Error> {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let state = &mut *guard;

        state.file.lock_exclusive().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_path(&self.path)
                .with_source(err)
        })?;
        let _lock = JournalLock { file: &state.file };

        let current_len = state
            .file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_path(&self.path)
                    .with_source(err)
            })?;
        if current_len != state.scanned_len {
            // The exclusive lock is already held, so the rescan must not
            // take another one: a second flock on a fresh handle would
            // conflict with our own and deadlock.
            let (next_id, scanned_len) = rescan_journal(&self.path)?;
            state.next_id = next_id;
            state.scanned_len = scanned_len;
        }

        let record = FeedbackRecord {
            id: state.next_id,
            message: message.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        let mut line = serde_json::to_string(&record).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("record encode failed")
                .with_source(err)
        })?;
        line.push('\n');

        (&state.file).write_all(line.as_bytes()).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_path(&self.path)
                .with_source(err)
        })?;
        state.file.sync_data().map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_path(&self.path)
                .with_source(err)
        })?;

        state.next_id += 1;
        state.scanned_len = current_len + line.len() as u64;
        Ok(record)
    }

    fn list(&self) -> Result<Vec<FeedbackRecord>, Error> {
        let file = File::open(&self.path).map_err(|err| {
            Error::new(map_io_error_kind(&err))
                .with_path(&self.path)
                .with_source(err)
        })?;
        file.lock_shared().map_err(|err| {
            Error::new(lock_error_kind(&err))
                .with_path(&self.path)
                .with_source(err)
        })?;
        let _lock = JournalLock { file: &file };
        read_records(BufReader::new(&file), &self.path)
    }
}

struct JournalLock<'a> {
    file: &'a File,
}

impl<'a> Drop for JournalLock<'a> {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

fn scan_journal(path: &Path) -> Result<(u64, u64), Error> {
    let file = open_for_scan(path)?;
    // Shared lock keeps a concurrent appender from exposing a partial
    // final line mid-scan.
    file.lock_shared().map_err(|err| {
        Error::new(lock_error_kind(&err))
            .with_path(path)
            .with_source(err)
    })?;
    let _lock = JournalLock { file: &file };
    scan_records(&file, path)
}

// Caller must already hold an advisory lock on the journal.
fn rescan_journal(path: &Path) -> Result<(u64, u64), Error> {
    let file = open_for_scan(path)?;
    scan_records(&file, path)
}

fn open_for_scan(path: &Path) -> Result<File, Error> {
    File::open(path).map_err(|err| {
        Error::new(map_io_error_kind(&err))
            .with_path(path)
            .with_source(err)
    })
}

fn scan_records(file: &File, path: &Path) -> Result<(u64, u64), Error> {
    // Length is captured before reading; a concurrent append makes the next
    // locked append observe a mismatch and rescan.
    let len = file.metadata().map(|meta| meta.len()).map_err(|err| {
        Error::new(ErrorKind::Io).with_path(path).with_source(err)
    })?;
    let records = read_records(BufReader::new(file), path)?;
    let next_id = records
        .iter()
        .map(|record| record.id)
        .max()
        .map_or(1, |id| id + 1);
    Ok((next_id, len))
}

fn read_records<R: BufRead>(reader: R, path: &Path) -> Result<Vec<FeedbackRecord>, Error> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| {
            Error::new(ErrorKind::Io).with_path(path).with_source(err)
        })?;
        let record = serde_json::from_str(&line).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("invalid record json")
                .with_path(path)
                .with_line(index as u64 + 1)
                .with_source(err)
        })?;
        records.push(record);
    }
    Ok(records)
}

fn map_io_error_kind(err: &io::Error) -> ErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

fn lock_error_kind(err: &io::Error) -> ErrorKind {
    let errno = err.raw_os_error().unwrap_or_default();
    if errno == EACCES || errno == EPERM {
        return ErrorKind::Permission;
    }
    match err.kind() {
        io::ErrorKind::PermissionDenied => ErrorKind::Permission,
        _ => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::Journal;
    use crate::core::error::ErrorKind;
    use crate::core::store::FeedbackStore;
    use std::fs;

    #[test]
    fn append_assigns_increasing_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = Journal::open(dir.path().join("feedback.jsonl")).expect("open");

        for expected in 1..=3u64 {
            let record = journal.append(&format!("note {expected}")).expect("append");
            assert_eq!(record.id, expected);
        }

        let records = journal.list().expect("list");
        let ids: Vec<u64> = records.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(records[0].message, "note 1");
    }

    #[test]
    fn reopen_continues_id_sequence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feedback.jsonl");

        let journal = Journal::open(&path).expect("open");
        journal.append("first").expect("append");
        journal.append("second").expect("append");
        drop(journal);

        let reopened = Journal::open(&path).expect("reopen");
        let record = reopened.append("third").expect("append");
        assert_eq!(record.id, 3);
    }

    #[test]
    fn two_handles_on_one_path_never_reuse_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feedback.jsonl");

        let first = Journal::open(&path).expect("open first");
        let second = Journal::open(&path).expect("open second");

        assert_eq!(first.append("from first").expect("append").id, 1);
        assert_eq!(second.append("from second").expect("append").id, 2);
        assert_eq!(first.append("from first again").expect("append").id, 3);

        let ids: Vec<u64> = first
            .list()
            .expect("list")
            .iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn corrupt_line_is_reported_with_line_number() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feedback.jsonl");

        let journal = Journal::open(&path).expect("open");
        journal.append("fine").expect("append");
        drop(journal);

        let mut contents = fs::read_to_string(&path).expect("read");
        contents.push_str("not json\n");
        fs::write(&path, contents).expect("write");

        let err = Journal::open(&path).expect_err("should reject");
        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.path(), Some(path.as_path()));
    }

    #[test]
    fn open_succeeds_while_a_shared_reader_holds_the_lock() {
        use fs2::FileExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feedback.jsonl");

        let journal = Journal::open(&path).expect("open");
        journal.append("one").expect("append");

        // The open-time scan takes a shared lock, so it coexists with
        // other shared readers instead of racing their view of the file.
        let reader = fs::File::open(&path).expect("reader handle");
        reader.lock_shared().expect("shared lock");

        let reopened = Journal::open(&path).expect("reopen under shared lock");
        assert_eq!(reopened.list().expect("list").len(), 1);
        reader.unlock().expect("unlock");
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("deeper").join("feedback.jsonl");

        let journal = Journal::open(&path).expect("open");
        assert!(path.exists());
        assert!(journal.list().expect("list").is_empty());
    }

    #[test]
    fn journal_lines_are_self_describing_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("feedback.jsonl");

        let journal = Journal::open(&path).expect("open");
        journal.append("hello").expect("append");

        let contents = fs::read_to_string(&path).expect("read");
        let line = contents.lines().next().expect("line");
        assert!(line.starts_with("{\"id\":1,\"message\":\"hello\",\"created_at\":\""));
        assert!(line.ends_with("Z\"}"));
    }

    #[test]
    fn verify_counts_valid_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = Journal::open(dir.path().join("feedback.jsonl")).expect("open");
        assert_eq!(journal.verify().expect("verify"), 0);
        journal.append("one").expect("append");
        journal.append("two").expect("append");
        assert_eq!(journal.verify().expect("verify"), 2);
    }
}
