use std::ops::ControlFlow;

use lnk_store::RecordStore;
use lnk_types::Link;
use tracing::warn;

use crate::error::{LinkError, LinkResult};

/// Every link created by `owner`, expired ones included, in scan order.
///
/// Works directly on the record store, so it needs no running cache.
/// Records that fail to decode are logged and skipped.
pub fn scan_owner(records: &RecordStore, owner: &str) -> LinkResult<Vec<Link>> {
    records.view(|snap| {
        let mut links = Vec::new();
        snap.for_each(|origin, bytes| {
            match Link::decode(bytes) {
                Ok(link) if link.owner == owner => links.push(link),
                Ok(_) => {}
                Err(e) => warn!(origin, error = %e, "skipping undecodable record"),
            }
            ControlFlow::Continue(())
        });
        Ok(links)
    })
}

/// The stored record for `origin`, if any.
pub fn find_record(records: &RecordStore, origin: &str) -> LinkResult<Option<Link>> {
    records.view(|snap| {
        snap.get(origin)
            .map(|bytes| decode_record(origin, bytes))
            .transpose()
    })
}

pub(crate) fn decode_record(origin: &str, bytes: &[u8]) -> LinkResult<Link> {
    Link::decode(bytes).map_err(|source| LinkError::Decode {
        key: origin.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    fn seed(records: &RecordStore, links: &[Link]) {
        records
            .update(|tx| {
                for link in links {
                    tx.put(link.origin.clone(), link.encode().unwrap());
                }
                Ok::<_, LinkError>(())
            })
            .unwrap();
    }

    fn link(id: u64, origin: &str, owner: &str) -> Link {
        Link::new(id, origin, owner, Duration::from_secs(60), Utc::now())
    }

    #[test]
    fn filters_by_owner_in_key_order() {
        let records = RecordStore::in_memory();
        seed(
            &records,
            &[
                link(1, "https://c.example", "alice"),
                link(2, "https://a.example", "alice"),
                link(3, "https://b.example", "bob"),
            ],
        );

        let origins: Vec<String> = scan_owner(&records, "alice")
            .unwrap()
            .into_iter()
            .map(|l| l.origin)
            .collect();
        assert_eq!(origins, vec!["https://a.example", "https://c.example"]);
        assert!(scan_owner(&records, "carol").unwrap().is_empty());
    }

    #[test]
    fn undecodable_records_are_skipped() {
        let records = RecordStore::in_memory();
        seed(&records, &[link(1, "https://a.example", "alice")]);
        records
            .update(|tx| {
                tx.put("https://broken.example", b"not json".to_vec());
                Ok::<_, LinkError>(())
            })
            .unwrap();

        let links = scan_owner(&records, "alice").unwrap();
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn find_record_decodes_or_reports() {
        let records = RecordStore::in_memory();
        seed(&records, &[link(1, "https://a.example", "alice")]);
        records
            .update(|tx| {
                tx.put("https://broken.example", b"{".to_vec());
                Ok::<_, LinkError>(())
            })
            .unwrap();

        let found = find_record(&records, "https://a.example").unwrap().unwrap();
        assert_eq!(found.id, 1);
        assert!(find_record(&records, "https://missing.example").unwrap().is_none());
        assert!(matches!(
            find_record(&records, "https://broken.example"),
            Err(LinkError::Decode { .. })
        ));
    }
}
