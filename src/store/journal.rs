//! Durable row storage backed by an append-only change journal.
//!
//! Layout of a store directory:
//!
//! - `MANIFEST`: magic + format version
//! - `LOCK`: held exclusively while the store is open
//! - `state.journal`: header, then one frame per committed [`ChangeSet`]
//!
//! A frame is `len: u32 LE | rmp-serde(ChangeSet) | crc32: u32 LE`. Rows are
//! rebuilt in memory by replaying frames on open. A frame cut short by a
//! crash is discarded, so each event is either fully present or absent. A
//! frame whose write fails at runtime is cut off before the commit returns.

use super::{ChangeSet, MemoryStore, StateStore};
use crate::entities::Table;
use crate::error::{IndexerError, Result};
use crate::types::EntityId;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Magic bytes for the store manifest.
const STORE_MAGIC: &[u8; 4] = b"SWS\0";

/// Current store format version.
const STORE_VERSION: u8 = 1;

/// Magic bytes for the journal file.
const JOURNAL_MAGIC: &[u8; 4] = b"SWJ\0";

/// Current journal format version.
const JOURNAL_VERSION: u8 = 1;

const JOURNAL_HEADER_LEN: u64 = 5;

/// Upper bound on a single frame; anything larger is treated as corruption.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Journal store configuration.
#[derive(Clone, Debug)]
pub struct JournalConfig {
    /// Directory holding the store files.
    pub path: PathBuf,

    /// Whether to create the store if it doesn't exist.
    pub create_if_missing: bool,

    /// fsync the journal after every commit.
    pub sync_on_commit: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./stakewatch-data"),
            create_if_missing: true,
            sync_on_commit: true,
        }
    }
}

/// Row store whose commits are persisted as journal frames.
#[derive(Debug)]
pub struct JournalStore {
    config: JournalConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    journal: File,

    /// Byte length of the journal up to the last committed frame.
    end: u64,

    /// Set when a failed append could not be rolled back.
    poisoned: bool,

    /// Replayed rows.
    rows: MemoryStore,

    frames: u64,
}

impl JournalStore {
    /// Open an existing store or create a new one.
    pub fn open_or_create(config: JournalConfig) -> Result<Self> {
        if config.path.join("MANIFEST").exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(IndexerError::InvalidFormat(format!(
                "no store at {}",
                config.path.display()
            )))
        }
    }

    /// Create a new, empty store.
    pub fn create(config: JournalConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Self::write_manifest(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        let mut journal = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(config.path.join("state.journal"))?;
        journal.write_all(JOURNAL_MAGIC)?;
        journal.write_all(&[JOURNAL_VERSION])?;
        journal.sync_all()?;

        tracing::info!(path = %config.path.display(), "created journal store");

        Ok(Self {
            config,
            _lock_file: lock_file,
            journal,
            end: JOURNAL_HEADER_LEN,
            poisoned: false,
            rows: MemoryStore::new(),
            frames: 0,
        })
    }

    /// Open an existing store and replay its journal.
    pub fn open(config: JournalConfig) -> Result<Self> {
        Self::verify_manifest(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        let journal_path = config.path.join("state.journal");
        let mut journal = OpenOptions::new().read(true).write(true).open(&journal_path)?;

        let mut rows = MemoryStore::new();
        let (frames, good_len) = Self::replay(&mut journal, &mut rows)?;

        let file_len = journal.metadata()?.len();
        if good_len < file_len {
            tracing::warn!(
                path = %journal_path.display(),
                discarded_bytes = file_len - good_len,
                "discarding torn journal tail"
            );
            journal.set_len(good_len)?;
            journal.sync_all()?;
        }
        journal.seek(SeekFrom::End(0))?;

        tracing::info!(path = %config.path.display(), frames, "opened journal store");

        Ok(Self {
            config,
            _lock_file: lock_file,
            journal,
            end: good_len,
            poisoned: false,
            rows,
            frames,
        })
    }

    /// Number of committed frames.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Number of rows in a table.
    pub fn row_count(&self, table: Table) -> usize {
        self.rows.row_count(table)
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Replay all complete frames, returning the frame count and the byte
    /// length of the valid prefix.
    fn replay(journal: &mut File, rows: &mut MemoryStore) -> Result<(u64, u64)> {
        journal.seek(SeekFrom::Start(0))?;
        let mut reader = BufReader::new(&*journal);

        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != JOURNAL_MAGIC {
            return Err(IndexerError::InvalidFormat("Invalid journal magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != JOURNAL_VERSION {
            return Err(IndexerError::InvalidFormat(format!(
                "Unsupported journal version: {}",
                version[0]
            )));
        }

        let mut frames = 0u64;
        let mut good_len = JOURNAL_HEADER_LEN;
        while let Some((changes, frame_len)) = Self::read_frame(&mut reader)? {
            rows.apply(changes);
            frames += 1;
            good_len += frame_len;
        }

        Ok((frames, good_len))
    }

    /// Read one frame. `None` at a clean end of file or a torn final frame.
    fn read_frame(reader: &mut impl Read) -> Result<Option<(ChangeSet, u64)>> {
        let mut len_bytes = [0u8; 4];
        if !read_full(reader, &mut len_bytes)? {
            return Ok(None);
        }
        let len = u32::from_le_bytes(len_bytes) as usize;
        if len > MAX_FRAME_LEN {
            return Err(IndexerError::Corruption("journal frame too large".into()));
        }

        let mut encoded = vec![0u8; len];
        if !read_full(reader, &mut encoded)? {
            return Ok(None);
        }

        let mut checksum_bytes = [0u8; 4];
        if !read_full(reader, &mut checksum_bytes)? {
            return Ok(None);
        }

        let expected = u32::from_le_bytes(checksum_bytes);
        let got = crc32fast::hash(&encoded);
        if expected != got {
            return Err(IndexerError::ChecksumMismatch { expected, got });
        }

        let changes: ChangeSet = rmp_serde::from_slice(&encoded)?;
        Ok(Some((changes, (len + 8) as u64)))
    }

    fn write_frame(&mut self, changes: &ChangeSet) -> Result<()> {
        let encoded = rmp_serde::to_vec(changes)?;
        if encoded.len() > MAX_FRAME_LEN {
            return Err(IndexerError::Serialization(format!(
                "change set of {} bytes exceeds frame limit",
                encoded.len()
            )));
        }

        let mut frame = Vec::with_capacity(encoded.len() + 8);
        frame.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        frame.extend_from_slice(&encoded);
        frame.extend_from_slice(&crc32fast::hash(&encoded).to_le_bytes());

        match append_frame(&mut self.journal, self.end, &frame, self.config.sync_on_commit) {
            Ok(()) => {
                self.end += frame.len() as u64;
                Ok(())
            }
            Err(failed) => {
                if !failed.rolled_back {
                    self.poisoned = true;
                }
                tracing::error!(
                    path = %self.config.path.display(),
                    error = %failed.cause,
                    rolled_back = failed.rolled_back,
                    "journal append failed"
                );
                Err(failed.cause.into())
            }
        }
    }

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join("MANIFEST"))?;
        file.write_all(STORE_MAGIC)?;
        file.write_all(&[STORE_VERSION])?;
        file.sync_all()?;
        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let mut file = File::open(path.join("MANIFEST"))?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != STORE_MAGIC {
            return Err(IndexerError::InvalidFormat("Invalid store magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != STORE_VERSION {
            return Err(IndexerError::InvalidFormat(format!(
                "Unsupported store version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| IndexerError::Locked)?;
        Ok(lock_file)
    }
}

/// Destination of journal frames.
trait FrameSink: Write + Seek {
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    fn sync(&mut self) -> io::Result<()>;
}

impl FrameSink for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

#[derive(Debug)]
struct AppendError {
    cause: io::Error,
    /// Whether the sink was restored to its length before the append.
    rolled_back: bool,
}

/// Append `frame` at byte offset `end`. On failure the sink is truncated back
/// to `end` and positioned there, so no partial frame precedes the next one.
fn append_frame<W: FrameSink>(
    sink: &mut W,
    end: u64,
    frame: &[u8],
    sync: bool,
) -> std::result::Result<(), AppendError> {
    let written = sink
        .write_all(frame)
        .and_then(|()| if sync { sink.sync() } else { Ok(()) });

    match written {
        Ok(()) => Ok(()),
        Err(cause) => {
            let rolled_back = sink
                .truncate(end)
                .and_then(|()| sink.seek(SeekFrom::Start(end)))
                .is_ok();
            Err(AppendError { cause, rolled_back })
        }
    }
}

/// Fill `buf` completely. Returns false if the input ends first.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

impl StateStore for JournalStore {
    fn get_row(&self, table: Table, id: &EntityId) -> Result<Option<Vec<u8>>> {
        self.rows.get_row(table, id)
    }

    fn scan_rows(&self, table: Table) -> Result<Vec<Vec<u8>>> {
        self.rows.scan_rows(table)
    }

    fn commit(&mut self, changes: ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        if self.poisoned {
            return Err(IndexerError::Corruption(
                "journal has an unrecoverable partial frame; reopen the store".into(),
            ));
        }
        self.write_frame(&changes)?;
        self.rows.apply(changes);
        self.frames += 1;
        Ok(())
    }
}
