//! Durable record storage for lnk.
//!
//! A [`RecordStore`] is a single bucket of byte records keyed by string,
//! iterated in key order, plus a monotonic sequence counter. All mutation
//! happens inside [`RecordStore::update`], a read-modify-write transaction
//! that is either applied completely or not at all.
//!
//! # Durability
//!
//! Committed transactions are handed to a [`Journal`] before they become
//! visible:
//!
//! - [`MemoryJournal`] -- keeps batches in memory, for tests and embedding
//! - [`LogJournal`] -- append-only file of length- and CRC-framed batches
//!
//! Opening a store replays its journal to rebuild the bucket.
//!
//! # Design Rules
//!
//! 1. Journal first, then apply: a write the journal rejected is never visible.
//! 2. A failed transaction leaves no trace, sequence allocations included.
//! 3. Lock acquisition is bounded by [`StoreConfig::lock_timeout`]; the store
//!    fails fast instead of hanging.
//! 4. The store never interprets record contents.

pub mod config;
pub mod error;
pub mod journal;
pub mod log;
pub mod store;

pub use config::{StoreConfig, SyncMode};
pub use error::{StoreError, StoreResult};
pub use journal::{Batch, Journal, MemoryJournal};
pub use log::LogJournal;
pub use store::{RecordStore, Snapshot, Transaction};
