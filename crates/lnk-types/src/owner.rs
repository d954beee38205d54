use serde::{Deserialize, Serialize};

use crate::link::Link;

/// Every link ever created by one owner, expired ones included.
///
/// This is a read-only projection produced by a full scan of the record
/// store; it is never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOwnerView {
    pub owner: String,
    pub links: Vec<Link>,
}

impl LinkOwnerView {
    pub fn new(owner: impl Into<String>, links: Vec<Link>) -> Self {
        Self {
            owner: owner.into(),
            links,
        }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Links whose last observed state is not expired.
    pub fn active(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| !link.expired)
    }
}
