use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::{StoreConfig, SyncMode};
use crate::error::{StoreError, StoreResult};
use crate::journal::{Batch, Journal};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Interval between attempts to take the journal's process lock.
const LOCK_POLL: Duration = Duration::from_millis(10);

struct LogWriter {
    writer: BufWriter<File>,
    /// End of the last frame known to be complete.
    offset: u64,
}

/// Append-only journal file.
///
/// Each committed batch is one frame:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized Batch)]
/// ```
/// Replay reads the file front-to-back. Frames that fail the CRC check are
/// skipped; a frame running past the end of the file is a torn write from a
/// crash and ends the replay. Opening the journal cuts such a tail off so
/// later appends land directly after the last complete frame.
///
/// One process at a time may hold a journal open: `open` takes an exclusive
/// lock on a `<path>.lock` file next to it and keeps it until drop.
pub struct LogJournal {
    path: PathBuf,
    writer: Mutex<LogWriter>,
    sync_mode: SyncMode,
    _lock: File,
}

impl LogJournal {
    /// Open (or create) the journal file at `path`.
    ///
    /// Waits up to `config.lock_timeout` for another process holding the
    /// journal to let go, then fails with [`StoreError::LockTimeout`].
    pub fn open(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock = acquire_lock(&lock_path(path), config.lock_timeout)?;
        truncate_torn_tail(path)?;
        let (writer, offset) = open_append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(LogWriter { writer, offset }),
            sync_mode: config.sync_mode.clone(),
            _lock: lock,
        })
    }

    /// Current size of the journal in bytes.
    pub fn offset(&self) -> u64 {
        self.writer.lock().offset
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn compaction_path(&self) -> PathBuf {
        sibling(&self.path, ".compact")
    }

    fn write_durably(&self, w: &mut LogWriter, batch: &Batch) -> StoreResult<u64> {
        let written = write_frame(&mut w.writer, batch)?;
        w.writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            w.writer.get_ref().sync_all()?;
        }
        Ok(written)
    }

    /// Drop whatever a failed append left behind, buffered or on disk, so
    /// the file ends at the last complete frame again.
    fn discard_partial(&self, w: &mut LogWriter) -> StoreResult<()> {
        let (fresh, _) = open_append(&self.path)?;
        let stale = std::mem::replace(&mut w.writer, fresh);
        let (file, _unwritten) = stale.into_parts();
        file.set_len(w.offset)?;
        Ok(())
    }
}

impl Journal for LogJournal {
    fn append(&self, batch: &Batch) -> StoreResult<()> {
        let mut w = self.writer.lock();
        match self.write_durably(&mut w, batch) {
            Ok(written) => {
                debug!(offset = w.offset, len = written, "journal append");
                w.offset += written;
                Ok(())
            }
            Err(e) => {
                warn!(offset = w.offset, error = %e, "journal append failed; discarding partial frame");
                if let Err(reset) = self.discard_partial(&mut w) {
                    error!(offset = w.offset, error = %reset, "could not truncate journal after failed append");
                }
                Err(e)
            }
        }
    }

    fn replay(&self) -> StoreResult<Vec<Batch>> {
        let (batches, _) = read_frames(&self.path)?;
        debug!(batches = batches.len(), "journal replay complete");
        Ok(batches)
    }

    fn rewrite(&self, snapshot: &Batch) -> StoreResult<()> {
        let mut w = self.writer.lock();
        let tmp = self.compaction_path();

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        let mut out = BufWriter::new(file);
        let written = write_frame(&mut out, snapshot)?;
        out.flush()?;
        out.get_ref().sync_all()?;
        drop(out);

        fs::rename(&tmp, &self.path)?;
        let (writer, offset) = open_append(&self.path)?;
        w.writer = writer;
        w.offset = offset;

        debug!(len = written, records = snapshot.puts.len(), "journal rewritten");
        Ok(())
    }
}

impl std::fmt::Debug for LogJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogJournal")
            .field("path", &self.path)
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn lock_path(path: &Path) -> PathBuf {
    sibling(path, ".lock")
}

fn acquire_lock(path: &Path, timeout: Duration) -> StoreResult<File> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)?;
    let contended = fs2::lock_contended_error().raw_os_error();
    let deadline = Instant::now() + timeout;

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(e) if e.raw_os_error() == contended => {}
            Err(e) => return Err(e.into()),
        }
        if Instant::now() >= deadline {
            warn!(lock = %path.display(), "journal is held by another process");
            return Err(StoreError::LockTimeout(timeout));
        }
        thread::sleep(LOCK_POLL);
    }
}

/// Cut the file back to the end of its last complete frame.
fn truncate_torn_tail(path: &Path) -> StoreResult<()> {
    if !path.exists() {
        return Ok(());
    }
    let (_, valid_end) = read_frames(path)?;
    let file = OpenOptions::new().write(true).open(path)?;
    let file_len = file.metadata()?.len();
    if valid_end < file_len {
        warn!(valid_end, file_len, "truncating torn journal tail");
        file.set_len(valid_end)?;
        file.sync_all()?;
    }
    Ok(())
}

/// Decode every intact frame and return the batches along with the offset
/// just past the last complete frame.
fn read_frames(path: &Path) -> StoreResult<(Vec<Batch>, u64)> {
    let mut file = BufReader::new(File::open(path)?);
    let file_len = file.get_ref().metadata()?.len();
    let mut batches = Vec::new();
    let mut offset: u64 = 0;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        match file.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + length as u64 > file_len {
            warn!(offset, length, file_len, "torn journal frame; stopping replay");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match file.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated journal frame; stopping replay");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        let frame_offset = offset;
        offset += HEADER_SIZE as u64 + length as u64;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset = frame_offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping journal frame"
            );
            continue;
        }

        match bincode::deserialize::<Batch>(&payload) {
            Ok(batch) => batches.push(batch),
            Err(e) => warn!(offset = frame_offset, error = %e, "undecodable journal frame; skipping"),
        }
    }

    Ok((batches, offset))
}

fn open_append(path: &Path) -> StoreResult<(BufWriter<File>, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;
    let offset = file.metadata()?.len();
    Ok((BufWriter::new(file), offset))
}

/// Write one frame and return the number of bytes written.
fn write_frame(out: &mut impl Write, batch: &Batch) -> StoreResult<u64> {
    let payload =
        bincode::serialize(batch).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization(format!("batch of {} bytes", payload.len())))?;
    let crc = crc32fast::hash(&payload);

    out.write_all(&length.to_le_bytes())?;
    out.write_all(&crc.to_le_bytes())?;
    out.write_all(&payload)?;
    Ok(HEADER_SIZE as u64 + payload.len() as u64)
}
