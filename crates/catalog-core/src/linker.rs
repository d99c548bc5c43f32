//! Master-catalog linker.
//!
//! Two mutually exclusive modes per import run:
//!
//! - **Promotion** ([`promote_to_master`]): an office catalog becomes the
//!   master catalog. Every record gets a fresh synthetic id, moves to the
//!   master office, and keeps a single back-reference to its origin.
//! - **Linking** ([`link_to_master`]): each local record is matched against
//!   the existing master catalog. The first master record (in catalog
//!   iteration order) accepted by the [`MatchStrategy`] wins; there is no
//!   scoring and ambiguous matches are not reported.
//!
//! Linking mutates both sides in memory and returns the batch of
//! [`LinkedItemUpdate`]s the store must apply to the master catalog.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Catalog, ItemRecord, LinkedItemUpdate};

/// Decides whether a master record represents a local record.
pub trait MatchStrategy: Send + Sync {
    fn matches(&self, master: &ItemRecord, local: &ItemRecord) -> bool;
}

/// Accepts on equal description, equal item id, or an existing back-link.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstMatch;

impl MatchStrategy for FirstMatch {
    fn matches(&self, master: &ItemRecord, local: &ItemRecord) -> bool {
        master.item_description == local.item_description
            || master.item_id == local.item_id
            || master
                .linked_items
                .iter()
                .any(|k| k.record_id == local.record_id && k.office_id == local.office_id)
    }
}

/// Rebuild `catalog` as a master catalog owned by `master_office_id`.
pub fn promote_to_master(catalog: &Catalog, master_office_id: &str) -> Catalog {
    catalog
        .values()
        .map(|record| {
            let promoted = ItemRecord {
                record_id: Uuid::new_v4().simple().to_string(),
                office_id: master_office_id.to_string(),
                linked_items: vec![record.key()],
                ..record.clone()
            };
            (promoted.record_id.clone(), promoted)
        })
        .collect()
}

/// Link every record of `local` to the first accepting record of `master`.
///
/// On a match the local key is appended to the master record's
/// `linkedItems` (no dedup), the local record's `itemLinkedTo` and
/// `itemLinkedTimestamp` are set, and one update is queued carrying the
/// master record's full new `linkedItems`. Records with no match are left
/// alone.
pub fn link_to_master(
    local: &mut Catalog,
    master: &mut Catalog,
    strategy: &dyn MatchStrategy,
    linked_at: DateTime<Utc>,
) -> Vec<LinkedItemUpdate> {
    let mut updates = Vec::new();

    for record in local.values_mut() {
        let Some(master_record) = master.values_mut().find(|m| strategy.matches(m, record)) else {
            continue;
        };

        master_record.linked_items.push(record.key());
        let link_to = master_record.key();
        tracing::debug!(local = %record.key(), master = %link_to, "linked item to master");

        updates.push(LinkedItemUpdate {
            link_to: link_to.clone(),
            linked_items: master_record.linked_items.clone(),
        });
        record.item_linked_to = Some(link_to);
        record.item_linked_timestamp = Some(linked_at);
    }

    updates
}

/// Collapse a batch so each master record appears once, with its final `linkedItems`.
pub fn coalesce_updates(updates: Vec<LinkedItemUpdate>) -> Vec<LinkedItemUpdate> {
    let mut out: Vec<LinkedItemUpdate> = Vec::new();
    for update in updates {
        match out.iter_mut().find(|u| u.link_to == update.link_to) {
            Some(existing) => existing.linked_items = update.linked_items,
            None => out.push(update),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::record_id;

    fn record(office: &str, item_id: &str, description: &str) -> ItemRecord {
        ItemRecord {
            record_id: record_id(item_id, office),
            office_id: office.into(),
            item_id: item_id.into(),
            item_description: description.into(),
            ..Default::default()
        }
    }

    fn catalog(records: Vec<ItemRecord>) -> Catalog {
        records
            .into_iter()
            .map(|r| (r.record_id.clone(), r))
            .collect()
    }

    #[test]
    fn test_promotion_backlinks_origin() {
        let local = catalog(vec![record("NORTH", "1", "Gauze"), record("NORTH", "2", "Tape")]);
        let master = promote_to_master(&local, "MASTER");

        assert_eq!(master.len(), 2);
        for promoted in master.values() {
            assert_eq!(promoted.office_id, "MASTER");
            assert_eq!(promoted.linked_items.len(), 1);
            let origin = &promoted.linked_items[0];
            let original = &local[&origin.record_id];
            assert_eq!(origin.office_id, original.office_id);
            assert_eq!(promoted.item_id, original.item_id);
            assert_ne!(promoted.record_id, original.record_id);
        }
    }

    #[test]
    fn test_link_by_description() {
        let mut local = catalog(vec![record("NORTH", "10", "Saline 1L")]);
        let mut master = catalog(vec![record("MASTER", "99", "Saline 1L")]);

        let updates = link_to_master(&mut local, &mut master, &FirstMatch, Utc::now());

        assert_eq!(updates.len(), 1);
        let local_record = local.values().next().unwrap();
        let master_record = master.values().next().unwrap();
        assert_eq!(local_record.item_linked_to, Some(master_record.key()));
        assert!(local_record.item_linked_timestamp.is_some());
        assert_eq!(updates[0].link_to, master_record.key());
        assert_eq!(updates[0].linked_items, vec![local_record.key()]);
    }

    #[test]
    fn test_link_by_existing_backlink() {
        let mut local = catalog(vec![record("NORTH", "10", "Saline")]);
        let local_key = local.values().next().unwrap().key();
        let mut m = record("MASTER", "77", "Sodium chloride");
        m.linked_items.push(local_key.clone());
        let mut master = catalog(vec![m]);

        let updates = link_to_master(&mut local, &mut master, &FirstMatch, Utc::now());

        assert_eq!(updates.len(), 1);
        // Append is dedup-free.
        assert_eq!(updates[0].linked_items, vec![local_key.clone(), local_key]);
    }

    #[test]
    fn test_no_match_no_mutation() {
        let mut local = catalog(vec![record("NORTH", "10", "Saline")]);
        let mut master = catalog(vec![record("MASTER", "11", "Gauze")]);

        let updates = link_to_master(&mut local, &mut master, &FirstMatch, Utc::now());

        assert!(updates.is_empty());
        assert!(local.values().all(|r| r.item_linked_to.is_none()));
        assert!(master.values().all(|r| r.linked_items.is_empty()));
    }

    #[test]
    fn test_first_match_in_iteration_order() {
        let mut local = catalog(vec![record("NORTH", "10", "Saline")]);
        let mut master = catalog(vec![
            record("MASTER", "a", "Saline"),
            record("MASTER", "b", "Saline"),
        ]);
        let expected = master.values().next().unwrap().key();

        link_to_master(&mut local, &mut master, &FirstMatch, Utc::now());

        let linked = local.values().next().unwrap().item_linked_to.clone();
        assert_eq!(linked, Some(expected));
    }

    #[test]
    fn test_linked_records_present_in_master() {
        let mut local = catalog(vec![
            record("NORTH", "1", "Saline"),
            record("NORTH", "2", "Gauze"),
            record("NORTH", "3", "Unmatched"),
        ]);
        let mut master = catalog(vec![
            record("MASTER", "x", "Saline"),
            record("MASTER", "2", "Bandage"),
        ]);

        link_to_master(&mut local, &mut master, &FirstMatch, Utc::now());

        for r in local.values() {
            if let Some(target) = &r.item_linked_to {
                let listed = &master[&target.record_id].linked_items;
                assert!(listed.contains(&r.key()));
            }
        }
        assert_eq!(local.values().filter(|r| r.item_linked_to.is_some()).count(), 2);
    }

    #[test]
    fn test_coalesce_keeps_last_per_master() {
        let mut local = catalog(vec![
            record("NORTH", "1", "Saline"),
            record("NORTH", "2", "Saline"),
        ]);
        let mut master = catalog(vec![record("MASTER", "x", "Saline")]);

        let updates = link_to_master(&mut local, &mut master, &FirstMatch, Utc::now());
        assert_eq!(updates.len(), 2);

        let coalesced = coalesce_updates(updates);
        assert_eq!(coalesced.len(), 1);
        assert_eq!(coalesced[0].linked_items.len(), 2);
    }

    struct ItemIdOnly;

    impl MatchStrategy for ItemIdOnly {
        fn matches(&self, master: &ItemRecord, local: &ItemRecord) -> bool {
            master.item_id == local.item_id
        }
    }

    #[test]
    fn test_custom_strategy() {
        let mut local = catalog(vec![record("NORTH", "1", "Saline")]);
        let mut master = catalog(vec![record("MASTER", "9", "Saline")]);

        let updates = link_to_master(&mut local, &mut master, &ItemIdOnly, Utc::now());
        assert!(updates.is_empty());
    }
}
