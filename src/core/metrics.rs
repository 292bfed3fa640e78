use crate::core::models::EmailRecord;

/// Category label the backend assigns to malware-bearing mail.
const MALWARE_CATEGORY: &str = "Malware";

/// Aggregate detection counts over the record store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total: usize,
    pub spam: usize,
    pub phishing: usize,
    pub important: usize,
    pub malware: usize,
}

impl Metrics {
    /// Recount from scratch. Called on every render, never cached.
    pub fn project<'a>(records: impl IntoIterator<Item = &'a EmailRecord>) -> Self {
        records.into_iter().fold(Metrics::default(), |mut m, r| {
            m.total += 1;
            m.spam += usize::from(r.is_spam);
            m.phishing += usize::from(r.is_phishing);
            m.important += usize::from(r.is_important);
            m.malware += usize::from(r.category.as_deref() == Some(MALWARE_CATEGORY));
            m
        })
    }

    /// Card title / count pairs in dashboard order.
    pub fn cards(&self) -> [(&'static str, usize); 5] {
        [
            ("Malware", self.malware),
            ("Phishing", self.phishing),
            ("Total Detections", self.total),
            ("Spam", self.spam),
            ("Important", self.important),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::tests::record;
    use crate::core::store::RecordStore;

    fn recount(store: &RecordStore) -> Metrics {
        let mut m = Metrics::default();
        for r in store.iter() {
            m.total += 1;
            if r.is_spam {
                m.spam += 1;
            }
            if r.is_phishing {
                m.phishing += 1;
            }
            if r.is_important {
                m.important += 1;
            }
            if r.category.as_deref() == Some("Malware") {
                m.malware += 1;
            }
        }
        m
    }

    #[test]
    fn snapshot_scenario_counts() {
        let mut spam = record(1);
        spam.is_spam = true;
        let mut store = RecordStore::new();
        store.apply_snapshot(vec![spam, record(2)]);

        let m = Metrics::project(store.iter());
        assert_eq!(m.total, 2);
        assert_eq!(m.spam, 1);
        assert_eq!(m.phishing, 0);
    }

    #[test]
    fn insert_recomputes_total() {
        let mut store = RecordStore::new();
        store.apply_snapshot(vec![record(1), record(2)]);
        store.apply_insert(record(3));
        assert_eq!(Metrics::project(store.iter()).total, 3);
    }

    #[test]
    fn projection_tracks_any_interleaving() {
        let mut store = RecordStore::new();
        let mut seed: u64 = 88172645463325252;
        for step in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let id = (seed % 12) as i64;
            let mut r = record(id);
            r.is_spam = seed & 0b1 != 0;
            r.is_phishing = seed & 0b10 != 0;
            r.is_important = seed & 0b100 != 0;
            if seed & 0b1000 != 0 {
                r.category = Some("Malware".into());
            }
            match (seed >> 16) % 3 {
                0 => {
                    store.apply_insert(r);
                }
                1 => {
                    store.apply_update(r);
                }
                _ => {
                    store.apply_delete(id);
                }
            }
            assert_eq!(
                Metrics::project(store.iter()),
                recount(&store),
                "drift at step {step}"
            );
        }
    }

    #[test]
    fn cards_order() {
        let m = Metrics {
            total: 4,
            spam: 1,
            phishing: 2,
            important: 3,
            malware: 0,
        };
        let titles: Vec<&str> = m.cards().iter().map(|(t, _)| *t).collect();
        assert_eq!(
            titles,
            vec!["Malware", "Phishing", "Total Detections", "Spam", "Important"]
        );
    }
}
