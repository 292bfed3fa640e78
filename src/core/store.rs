use indexmap::IndexMap;

use crate::core::models::{EmailId, EmailRecord};

/// In-memory, ordered set of email records keyed by id.
///
/// Every change to the dashboard's email list goes through the four `apply_*`
/// methods, whether it comes from a snapshot fetch, a push event, or a
/// confirmed mutation. Each returns `true` when the contents changed; a
/// `false` return is a reconciliation no-op (duplicate insert, update or
/// delete for an unknown id).
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: IndexMap<EmailId, EmailRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection, keeping snapshot order.
    ///
    /// Duplicate ids in the snapshot keep their first occurrence.
    pub fn apply_snapshot(&mut self, records: Vec<EmailRecord>) -> bool {
        let mut next = IndexMap::with_capacity(records.len());
        for record in records {
            if next.contains_key(&record.id) {
                log::debug!("Snapshot repeats email {}, keeping first", record.id);
                continue;
            }
            next.insert(record.id, record);
        }
        self.records = next;
        true
    }

    /// Prepend a record not already present. Duplicates are dropped.
    pub fn apply_insert(&mut self, record: EmailRecord) -> bool {
        if self.records.contains_key(&record.id) {
            log::debug!("Insert for known email {} dropped", record.id);
            return false;
        }
        self.records.shift_insert(0, record.id, record);
        true
    }

    /// Replace the record with the same id, keeping its position.
    pub fn apply_update(&mut self, record: EmailRecord) -> bool {
        match self.records.get_mut(&record.id) {
            Some(slot) => {
                if *slot == record {
                    return false;
                }
                *slot = record;
                true
            }
            None => {
                log::debug!("Update for unknown email {} ignored", record.id);
                false
            }
        }
    }

    /// Remove the record with this id, keeping the order of the rest.
    pub fn apply_delete(&mut self, id: EmailId) -> bool {
        if self.records.shift_remove(&id).is_some() {
            true
        } else {
            log::debug!("Delete for unknown email {} ignored", id);
            false
        }
    }

    /// Drop everything (full reload).
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in display order (most recently streamed first).
    pub fn iter(&self) -> impl Iterator<Item = &EmailRecord> {
        self.records.values()
    }

    /// The first `limit` records in display order.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &EmailRecord> {
        self.records.values().take(limit)
    }

    #[cfg(test)]
    pub fn get(&self, id: EmailId) -> Option<&EmailRecord> {
        self.records.get(&id)
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<EmailId> {
        self.records.keys().copied().collect()
    }

    #[cfg(test)]
    pub fn records(&self) -> Vec<EmailRecord> {
        self.records.values().cloned().collect()
    }

}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(id: EmailId) -> EmailRecord {
        EmailRecord {
            id,
            sender: format!("sender{id}@example.com"),
            subject: Some(format!("Subject {id}")),
            is_spam: false,
            is_phishing: false,
            category: None,
            email_date: None,
            is_important: false,
            is_archived: false,
            is_read: false,
            priority_level: 0,
            has_attachment: false,
        }
    }

    fn store_of(ids: &[EmailId]) -> RecordStore {
        let mut store = RecordStore::new();
        store.apply_snapshot(ids.iter().map(|&id| record(id)).collect());
        store
    }

    #[test]
    fn snapshot_replaces_contents_in_order() {
        let mut store = store_of(&[1, 2, 3]);
        store.apply_snapshot(vec![record(9), record(8)]);
        assert_eq!(store.ids(), vec![9, 8]);
    }

    #[test]
    fn snapshot_drops_repeated_ids() {
        let mut first = record(1);
        first.is_spam = true;
        let mut store = RecordStore::new();
        store.apply_snapshot(vec![first, record(2), record(1)]);
        assert_eq!(store.ids(), vec![1, 2]);
        assert!(store.get(1).unwrap().is_spam);
    }

    #[test]
    fn insert_prepends_new_record() {
        let mut store = store_of(&[1, 2]);
        assert!(store.apply_insert(record(3)));
        assert_eq!(store.ids(), vec![3, 1, 2]);
    }

    #[test]
    fn insert_of_known_id_is_dropped() {
        let mut store = store_of(&[1, 2]);
        let mut dup = record(2);
        dup.is_read = true;
        let before = store.records();
        assert!(!store.apply_insert(dup));
        assert_eq!(store.ids(), vec![1, 2]);
        assert!(!store.get(2).unwrap().is_read);
        assert_eq!(store.records(), before);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut store = store_of(&[1, 2, 3]);
        let mut updated = record(2);
        updated.is_important = true;
        assert!(store.apply_update(updated));
        assert_eq!(store.ids(), vec![1, 2, 3]);
        assert!(store.get(2).unwrap().is_important);
    }

    #[test]
    fn update_of_unknown_id_is_noop() {
        let mut store = store_of(&[1, 2]);
        let before = store.records();
        assert!(!store.apply_update(record(5)));
        assert_eq!(store.ids(), vec![1, 2]);
        assert_eq!(store.records(), before);
    }

    #[test]
    fn identical_update_reports_no_change() {
        let mut store = store_of(&[1]);
        let before = store.records();
        assert!(!store.apply_update(record(1)));
        assert_eq!(store.records(), before);
    }

    #[test]
    fn delete_twice_equals_delete_once() {
        let mut once = store_of(&[1, 2, 3]);
        once.apply_delete(2);

        let mut twice = store_of(&[1, 2, 3]);
        assert!(twice.apply_delete(2));
        assert!(!twice.apply_delete(2));

        assert_eq!(once.ids(), twice.ids());
        assert_eq!(twice.ids(), vec![1, 3]);
    }

    #[test]
    fn ids_stay_unique_under_mixed_operations() {
        let mut store = RecordStore::new();
        // Deterministic pseudo-random op sequence over a small id space.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let id = (seed % 8) as EmailId;
            match (seed >> 8) % 4 {
                0 => {
                    store.apply_insert(record(id));
                }
                1 => {
                    let mut r = record(id);
                    r.is_read = seed & 1 == 1;
                    store.apply_update(r);
                }
                2 => {
                    store.apply_delete(id);
                }
                _ => {
                    store.apply_insert(record(id));
                    store.apply_insert(record(id));
                }
            }
            let mut ids = store.ids();
            let before = ids.len();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), before, "duplicate id in store");
        }
    }

    #[test]
    fn recent_limits_in_display_order() {
        let store = store_of(&[5, 4, 3, 2, 1]);
        let ids: Vec<EmailId> = store.recent(3).map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }

    #[test]
    fn clear_empties_store() {
        let mut store = store_of(&[1, 2]);
        store.clear();
        assert!(store.is_empty());
    }
}
