use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::alias;
use crate::error::TypeError;

/// A mapping from a short alias to an origin with a time-bounded lifetime.
///
/// The origin is the primary key in durable storage; the alias is derived
/// once from `id` and is the key in the expiring cache. A link is never
/// deleted by normal operation: once its TTL lapses it is flagged `expired`
/// and a later request for the same origin revives it under the same alias.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Sequence number allocated once by the record store.
    pub id: u64,
    /// The mapped target.
    pub origin: String,
    /// Short opaque key derived from `id`.
    pub alias: String,
    /// Identifies the requester (for example a client address).
    pub owner: String,
    pub created_at: DateTime<Utc>,
    /// Advances on every revival.
    pub updated_at: DateTime<Utc>,
    /// Set once an eviction for this link has been observed and written back.
    pub expired: bool,
    #[serde(rename = "ttl_ms", with = "ttl_millis")]
    pub ttl: Duration,
}

impl Link {
    /// Create a fresh link for `origin`, deriving its alias from `id`.
    pub fn new(
        id: u64,
        origin: impl Into<String>,
        owner: impl Into<String>,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            origin: origin.into(),
            alias: alias::derive(id),
            owner: owner.into(),
            created_at: now,
            updated_at: now,
            expired: false,
            ttl,
        }
    }

    /// Instant at which the current lifetime ends.
    ///
    /// Returns `None` when `updated_at + ttl` is not representable, which is
    /// treated as never ending.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let ttl = TimeDelta::from_std(self.ttl).ok()?;
        self.updated_at.checked_add_signed(ttl)
    }

    /// Whether `updated_at + ttl` lies after `now`.
    ///
    /// This is computed from the stored timestamps and is the ground truth
    /// for liveness; the `expired` flag only reflects the last observed
    /// eviction.
    pub fn is_alive_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |at| at > now)
    }

    /// Whether the link should currently be resolvable through its alias.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.expired && self.is_alive_at(now)
    }

    /// Time left in the current lifetime, or `None` if it already ended.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.expires_at() {
            Some(at) if at > now => (at - now).to_std().ok(),
            Some(_) => None,
            None => Some(self.ttl),
        }
    }

    /// Start a new lifetime of `ttl` beginning at `now`.
    pub fn revive(&mut self, ttl: Duration, now: DateTime<Utc>) {
        self.expired = false;
        self.updated_at = now;
        self.ttl = ttl;
    }

    pub fn mark_expired(&mut self) {
        self.expired = true;
    }

    /// Serialize into the on-disk record format.
    pub fn encode(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Deserialize from the on-disk record format.
    pub fn decode(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Deserialization(e.to_string()))
    }
}

/// TTLs are stored as whole milliseconds.
mod ttl_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
