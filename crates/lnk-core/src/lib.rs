//! Link store for lnk.
//!
//! [`LinkStore`] keeps two views of every short link consistent:
//!
//! - the durable [`RecordStore`](lnk_store::RecordStore), keyed by origin,
//!   which remembers every link ever created, expired or not;
//! - the [`ExpiringCache`](lnk_cache::ExpiringCache), keyed by alias, which
//!   is the only thing consulted when resolving an alias.
//!
//! ## Lifecycle
//!
//! A link is created on the first request for its origin, resolves while
//! its TTL runs, and is flagged expired in the record store when the cache
//! evicts it. A later request for the same origin revives it under the same
//! alias. Records are never deleted.
//!
//! ## Consistency
//!
//! Creation, revival, warm start, and the eviction write-back all run inside
//! the cache's exclusion domain, taking the store lock second. An eviction
//! therefore either lands before a concurrent revival (which then rewrites
//! the record and re-admits it) or finds its countdown superseded and does
//! nothing.

pub mod config;
pub mod error;
pub mod link_store;
pub mod scan;

pub use config::LinkStoreConfig;
pub use error::{LinkError, LinkResult};
pub use link_store::{LinkStore, WarmStartReport};
pub use scan::{find_record, scan_owner};
