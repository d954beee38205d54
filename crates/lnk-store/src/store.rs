use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::journal::{Batch, Journal, MemoryJournal};
use crate::log::LogJournal;

/// Committed state: records in key order plus the sequence counter.
#[derive(Debug, Default)]
struct Bucket {
    records: BTreeMap<String, Vec<u8>>,
    sequence: u64,
}

impl Bucket {
    fn apply(&mut self, batch: Batch) {
        self.sequence = self.sequence.max(batch.sequence);
        self.records.extend(batch.puts);
    }

    fn to_batch(&self) -> Batch {
        Batch {
            sequence: self.sequence,
            puts: self
                .records
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

/// Transactional key-value bucket with a monotonic sequence counter.
///
/// Writers are serialized behind a single lock; readers share it. Every
/// lock acquisition waits at most [`StoreConfig::lock_timeout`] and then
/// fails with [`StoreError::LockTimeout`].
pub struct RecordStore {
    bucket: RwLock<Bucket>,
    journal: Box<dyn Journal>,
    config: StoreConfig,
}

impl RecordStore {
    /// A store backed by a fresh [`MemoryJournal`].
    pub fn in_memory() -> Self {
        Self {
            bucket: RwLock::new(Bucket::default()),
            journal: Box::new(MemoryJournal::new()),
            config: StoreConfig::default(),
        }
    }

    /// Open (or create) a file-backed store at `path`, replaying its journal.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let journal = LogJournal::open(path.as_ref(), &config)?;
        Self::with_journal(Box::new(journal), config)
    }

    /// Build a store on top of an existing journal, replaying it first.
    pub fn with_journal(journal: Box<dyn Journal>, config: StoreConfig) -> StoreResult<Self> {
        let mut bucket = Bucket::default();
        let batches = journal.replay()?;
        let replayed = batches.len();
        for batch in batches {
            bucket.apply(batch);
        }
        info!(
            batches = replayed,
            records = bucket.records.len(),
            sequence = bucket.sequence,
            "record store opened"
        );

        Ok(Self {
            bucket: RwLock::new(bucket),
            journal,
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Run a read-modify-write transaction.
    ///
    /// Writes staged through the [`Transaction`] are journaled and applied
    /// only if `f` returns `Ok`. Any error, from `f` or from the journal,
    /// discards them.
    pub fn update<R, E>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let timeout = self.config.lock_timeout;
        let mut bucket = self
            .bucket
            .try_write_for(timeout)
            .ok_or(StoreError::LockTimeout(timeout))?;

        let mut tx = Transaction::new(&*bucket);
        let out = f(&mut tx)?;
        let batch = tx.into_batch();

        if let Some(batch) = batch {
            self.journal.append(&batch)?;
            debug!(puts = batch.puts.len(), sequence = batch.sequence, "transaction committed");
            bucket.apply(batch);
        }
        Ok(out)
    }

    /// Run a read-only view over the committed state.
    pub fn view<R, E>(&self, f: impl FnOnce(&Snapshot<'_>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let timeout = self.config.lock_timeout;
        let bucket = self
            .bucket
            .try_read_for(timeout)
            .ok_or(StoreError::LockTimeout(timeout))?;
        f(&Snapshot { bucket: &*bucket })
    }

    /// Number of committed records.
    pub fn len(&self) -> StoreResult<usize> {
        self.view(|snap| Ok(snap.len()))
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        self.view(|snap| Ok(snap.len() == 0))
    }

    /// Current value of the sequence counter.
    pub fn sequence(&self) -> StoreResult<u64> {
        self.view(|snap| Ok(snap.sequence()))
    }

    /// Rewrite the journal as a single batch holding the current state.
    pub fn compact(&self) -> StoreResult<()> {
        let timeout = self.config.lock_timeout;
        let bucket = self
            .bucket
            .try_write_for(timeout)
            .ok_or(StoreError::LockTimeout(timeout))?;
        let snapshot = bucket.to_batch();
        self.journal.rewrite(&snapshot)?;
        info!(records = snapshot.puts.len(), "record store compacted");
        Ok(())
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A write transaction in progress.
///
/// Reads see the committed state overlaid with this transaction's own
/// staged writes.
pub struct Transaction<'a> {
    committed: &'a Bucket,
    pending: BTreeMap<String, Vec<u8>>,
    sequence: u64,
}

impl<'a> Transaction<'a> {
    fn new(committed: &'a Bucket) -> Self {
        Self {
            committed,
            pending: BTreeMap::new(),
            sequence: committed.sequence,
        }
    }

    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.pending
            .get(key)
            .or_else(|| self.committed.records.get(key))
            .map(Vec::as_slice)
    }

    pub fn put(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.pending.insert(key.into(), value);
    }

    /// Allocate the next sequence number. The first allocation is `1`.
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Visit every record in key order until `f` breaks.
    pub fn for_each(&self, mut f: impl FnMut(&str, &[u8]) -> ControlFlow<()>) {
        let mut merged: BTreeMap<&str, &[u8]> = self
            .committed
            .records
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        merged.extend(self.pending.iter().map(|(k, v)| (k.as_str(), v.as_slice())));

        for (key, value) in merged {
            if f(key, value).is_break() {
                break;
            }
        }
    }

    fn into_batch(self) -> Option<Batch> {
        if self.pending.is_empty() && self.sequence == self.committed.sequence {
            return None;
        }
        Some(Batch {
            sequence: self.sequence,
            puts: self.pending.into_iter().collect(),
        })
    }
}

/// A read-only view of the committed state.
pub struct Snapshot<'a> {
    bucket: &'a Bucket,
}

impl Snapshot<'_> {
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.bucket.records.get(key).map(Vec::as_slice)
    }

    /// Visit every record in key order until `f` breaks.
    pub fn for_each(&self, mut f: impl FnMut(&str, &[u8]) -> ControlFlow<()>) {
        for (key, value) in &self.bucket.records {
            if f(key, value).is_break() {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.bucket.records.len()
    }

    pub fn sequence(&self) -> u64 {
        self.bucket.sequence
    }
}
