use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// The durable effect of one committed transaction.
///
/// `sequence` is the bucket's sequence counter after the transaction; replay
/// keeps the maximum seen so the counter never moves backwards.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub sequence: u64,
    pub puts: Vec<(String, Vec<u8>)>,
}

/// Durability backend behind a [`RecordStore`](crate::RecordStore).
///
/// Implementations must be thread-safe; the store serializes calls to
/// `append` and `rewrite` under its write lock.
pub trait Journal: Send + Sync {
    /// Durably record a committed batch.
    fn append(&self, batch: &Batch) -> StoreResult<()>;

    /// Return every recorded batch in commit order.
    fn replay(&self) -> StoreResult<Vec<Batch>>;

    /// Replace the whole journal with a single batch describing the
    /// current state.
    fn rewrite(&self, snapshot: &Batch) -> StoreResult<()>;
}

impl<J: Journal + ?Sized> Journal for Arc<J> {
    fn append(&self, batch: &Batch) -> StoreResult<()> {
        (**self).append(batch)
    }

    fn replay(&self) -> StoreResult<Vec<Batch>> {
        (**self).replay()
    }

    fn rewrite(&self, snapshot: &Batch) -> StoreResult<()> {
        (**self).rewrite(snapshot)
    }
}

/// In-memory journal.
///
/// Batches live as long as the journal does. Sharing one journal through an
/// `Arc` between two stores simulates a process restart.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    batches: Mutex<Vec<Batch>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches currently recorded.
    pub fn len(&self) -> usize {
        self.batches.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.lock().is_empty()
    }
}

impl Journal for MemoryJournal {
    fn append(&self, batch: &Batch) -> StoreResult<()> {
        self.batches.lock().push(batch.clone());
        Ok(())
    }

    fn replay(&self) -> StoreResult<Vec<Batch>> {
        Ok(self.batches.lock().clone())
    }

    fn rewrite(&self, snapshot: &Batch) -> StoreResult<()> {
        *self.batches.lock() = vec![snapshot.clone()];
        Ok(())
    }
}
