//! Expiring cache for lnk.
//!
//! [`ExpiringCache`] maps string keys to values that each carry their own
//! time-to-live. A background timer task reclaims entries as their
//! countdowns elapse and hands each reclaimed entry to an eviction callback
//! exactly once.
//!
//! ## Exclusion domain
//!
//! Replacing an entry and evicting it are serialized by one lock. Callers
//! that must pair a side effect with a cache write (a durable write before a
//! `put`, say) take that lock through [`ExpiringCache::exclusive`]; the
//! eviction path runs its callback while holding the same lock. Whichever
//! side gets the lock first wins: a `put` that lands before a due eviction
//! supersedes its countdown, which then fires as a no-op.
//!
//! Lookups never take the lock. A lookup after an entry's deadline reports
//! [`CacheError::Expired`] even if the timer has not reclaimed it yet.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lnk_cache::{CacheConfig, ExpiringCache};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = ExpiringCache::new(CacheConfig::default(), |key: &str, value: String| {
//!         println!("{key} -> {value} expired");
//!     })
//!     .unwrap();
//!
//!     cache.put("abcde", "https://example.com".to_string(), Duration::from_secs(60));
//!     assert!(cache.get("abcde").is_ok());
//!     cache.close();
//! }
//! ```

mod cache;
mod config;
mod error;
mod timer;

pub use cache::{Exclusive, ExpiringCache};
pub use config::{CacheConfig, MAX_TTL};
pub use error::CacheError;
