use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use lnk_cache::ExpiringCache;
use lnk_store::{RecordStore, StoreError};
use lnk_types::{Link, LinkOwnerView};
use tracing::{debug, error, info, warn};

use crate::config::LinkStoreConfig;
use crate::error::{LinkError, LinkResult};
use crate::scan::{decode_record, scan_owner};

/// Outcome of repopulating the cache from the record store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WarmStartReport {
    /// Records admitted to the cache with their remaining TTL.
    pub admitted: usize,
    /// Records left out because they are expired or no longer alive.
    pub stale: usize,
    /// Records that failed to decode.
    pub skipped: usize,
}

/// Coordinates the record store (durability) and the expiring cache
/// (resolvability) for short links.
///
/// Every write that touches both sides, including the eviction write-back,
/// runs inside the cache's exclusion domain, and always takes the store
/// lock second. A link is resolvable through [`lookup`](Self::lookup)
/// exactly when its stored record is not flagged expired.
pub struct LinkStore {
    records: Arc<RecordStore>,
    cache: ExpiringCache<Link>,
    config: LinkStoreConfig,
}

impl LinkStore {
    /// Wire a link store on top of `records`.
    ///
    /// Must be called from within a Tokio runtime. Unless disabled in
    /// `config`, the cache is warm-started before this returns.
    pub fn open(records: Arc<RecordStore>, config: LinkStoreConfig) -> LinkResult<Self> {
        let hook_records = Arc::clone(&records);
        let cache = ExpiringCache::new(config.cache_config(), move |alias: &str, link: Link| {
            write_back_expiry(&hook_records, alias, link);
        })?;

        let store = Self {
            records,
            cache,
            config,
        };
        if store.config.warm_start {
            store.warm_start()?;
        }
        Ok(store)
    }

    pub fn config(&self) -> &LinkStoreConfig {
        &self.config
    }

    pub fn records(&self) -> &Arc<RecordStore> {
        &self.records
    }

    /// Return the link for `origin`, creating it or reviving it as needed.
    ///
    /// A new origin gets a fresh sequence number and alias. An origin whose
    /// record is still active comes back unchanged. An origin whose record
    /// is flagged expired, or whose lifetime has lapsed by its timestamps,
    /// is revived under its original alias with a fresh `ttl`.
    ///
    /// Nothing reaches the cache unless the store write committed.
    pub fn create_or_revive(&self, origin: &str, owner: &str, ttl: Duration) -> LinkResult<Link> {
        if origin.trim().is_empty() || origin.chars().any(char::is_control) {
            return Err(LinkError::InvalidOrigin(origin.to_string()));
        }
        self.check_ttl(ttl)?;

        let slot = self.cache.exclusive();
        let now = Utc::now();

        let (link, admit_for) = self.records.update(|tx| -> LinkResult<(Link, Option<Duration>)> {
            let existing = match tx.get(origin) {
                Some(bytes) => Some(decode_record(origin, bytes)?),
                None => None,
            };

            match existing {
                None => {
                    let id = tx.next_sequence();
                    let link = Link::new(id, origin, owner, ttl, now);
                    tx.put(origin, encode_record(&link)?);
                    info!(id, alias = %link.alias, origin, "link created");
                    Ok((link, Some(ttl)))
                }
                Some(link) if link.is_active_at(now) => {
                    if slot.contains(&link.alias) {
                        debug!(alias = %link.alias, "link already active");
                        return Ok((link, None));
                    }
                    let left = link.remaining_at(now);
                    debug!(alias = %link.alias, remaining = ?left, "re-admitting active link");
                    Ok((link, left))
                }
                Some(mut link) => {
                    link.revive(ttl, now);
                    tx.put(origin, encode_record(&link)?);
                    info!(id = link.id, alias = %link.alias, origin, "link revived");
                    Ok((link, Some(ttl)))
                }
            }
        })?;

        if let Some(left) = admit_for {
            slot.put(link.alias.clone(), link.clone(), left);
        }
        Ok(link)
    }

    /// Resolve `alias` from the cache alone.
    pub fn lookup(&self, alias: &str) -> LinkResult<Link> {
        let link = self
            .cache
            .get(alias)
            .map_err(|e| LinkError::from_cache(alias, e))?;
        debug!(alias, origin = %link.origin, "lookup hit");
        Ok(link)
    }

    /// Time left before `alias` stops resolving.
    pub fn remaining(&self, alias: &str) -> Option<Duration> {
        self.cache.remaining(alias)
    }

    /// Every link created by `owner`, expired ones included.
    pub fn list_by_owner(&self, owner: &str) -> LinkResult<Vec<Link>> {
        scan_owner(&self.records, owner)
    }

    pub fn owner_view(&self, owner: &str) -> LinkResult<LinkOwnerView> {
        Ok(LinkOwnerView::new(owner, self.list_by_owner(owner)?))
    }

    /// Admit every active record to the cache with its remaining TTL.
    ///
    /// Records that lapsed while the process was down are left out and
    /// left unmodified; the next request for their origin revives them.
    pub fn warm_start(&self) -> LinkResult<WarmStartReport> {
        let slot = self.cache.exclusive();
        let now = Utc::now();
        let mut report = WarmStartReport::default();

        self.records.view(|snap| {
            snap.for_each(|origin, bytes| {
                match decode_record(origin, bytes) {
                    Ok(link) => match link.remaining_at(now) {
                        Some(left) if !link.expired => {
                            slot.put(link.alias.clone(), link, left);
                            report.admitted += 1;
                        }
                        _ => report.stale += 1,
                    },
                    Err(e) => {
                        warn!(error = %e, "skipping record during warm start");
                        report.skipped += 1;
                    }
                }
                ControlFlow::Continue(())
            });
            Ok::<_, LinkError>(())
        })?;

        info!(
            admitted = report.admitted,
            stale = report.stale,
            skipped = report.skipped,
            "warm start complete"
        );
        Ok(report)
    }

    /// Run due evictions now instead of waiting for the timer.
    pub fn evict_expired(&self) -> usize {
        self.cache.evict_expired()
    }

    /// Stop the expiry timer. Lookups keep answering from the cache.
    pub fn close(&self) {
        self.cache.close();
    }

    fn check_ttl(&self, ttl: Duration) -> LinkResult<()> {
        if ttl.as_millis() == 0 || ttl > self.config.max_ttl {
            return Err(LinkError::InvalidTtl {
                ttl,
                max: self.config.max_ttl,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for LinkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkStore")
            .field("records", &self.records)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

fn encode_record(link: &Link) -> LinkResult<Vec<u8>> {
    link.encode()
        .map_err(|e| LinkError::from(StoreError::Serialization(e.to_string())))
}

/// Eviction callback: flag the evicted link's record as expired.
///
/// Runs inside the cache's exclusion domain, so no revival of the same
/// origin can interleave with it.
fn write_back_expiry(records: &RecordStore, alias: &str, evicted: Link) {
    let origin = evicted.origin;
    let result = records.update(|tx| -> LinkResult<bool> {
        let Some(bytes) = tx.get(&origin) else {
            return Ok(false);
        };
        let mut link = decode_record(&origin, bytes)?;
        if link.expired || link.alias != alias {
            return Ok(false);
        }
        link.mark_expired();
        tx.put(origin.as_str(), encode_record(&link)?);
        Ok(true)
    });

    match result {
        Ok(true) => info!(alias, origin = %origin, "link expired"),
        Ok(false) => debug!(alias, origin = %origin, "expiry already recorded"),
        Err(e) => error!(alias, origin = %origin, error = %e, "failed to record expiry"),
    }
}
