// ── Smart refresh reconciliation ──
//
// Compares each incoming page against the last page that was emitted
// downstream. Semantically identical pages are suppressed; pages whose
// records merely changed fields are merged into the previous records in
// place, so subscribers holding record handles observe the update
// without a new page emission.

use crate::model::Page;
use crate::path::FieldPath;

/// Stateful filter over successive [`Page`] emissions.
///
/// Records are matched across pages by the value at `unique` (default
/// `"id"`); paths traversing arrays use the LAST match as the key.
#[derive(Debug)]
pub struct SmartRefresh {
    unique: FieldPath,
    previous: Option<Page>,
}

impl SmartRefresh {
    pub fn new(unique: &str) -> Self {
        Self {
            unique: FieldPath::parse(unique),
            previous: None,
        }
    }

    /// Reconcile an incoming page.
    ///
    /// Returns the page to emit downstream, or `None` when the emission
    /// is suppressed as a duplicate. Suppression may still merge changed
    /// fields into the previously emitted records.
    pub fn apply(&mut self, page: Page) -> Option<Page> {
        let Some(previous) = &self.previous else {
            self.previous = Some(page.clone());
            return Some(page);
        };

        if self.is_changed(previous, &page) {
            self.previous = Some(page.clone());
            return Some(page);
        }

        None
    }

    /// Forget the previously emitted page (the next page always emits).
    pub(crate) fn reset(&mut self) {
        self.previous = None;
    }

    fn is_changed(&self, previous: &Page, current: &Page) -> bool {
        if previous.data.len() != current.data.len() {
            return true;
        }

        if let (Some(prev_pg), Some(cur_pg)) = (previous.pagination(), current.pagination()) {
            if prev_pg.current_page != cur_pg.current_page {
                return true;
            }
        }

        for record in &previous.data {
            let key = record.get(&self.unique);
            let matched = current
                .data
                .iter()
                .find(|candidate| candidate.get(&self.unique) == key);

            let Some(matched) = matched else {
                // A previous record with no counterpart: real change.
                return true;
            };

            if !record.deep_eq(matched) {
                record.merge_from(matched);
            }
        }

        false
    }
}

impl Default for SmartRefresh {
    fn default() -> Self {
        Self::new("id")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Meta, Pagination, Record};
    use serde_json::json;

    fn page(records: &[serde_json::Value]) -> Page {
        Page {
            data: records.iter().cloned().map(Record::new).collect(),
            meta: None,
            extra: serde_json::Map::new(),
        }
    }

    fn with_page_index(mut page: Page, current_page: u64) -> Page {
        page.meta = Some(Meta {
            pagination: Some(Pagination {
                per_page: 10,
                current_page,
                total: 100,
            }),
            extra: serde_json::Map::new(),
        });
        page
    }

    #[test]
    fn first_page_always_emits() {
        let mut refresh = SmartRefresh::default();
        assert!(refresh.apply(page(&[json!({"id": 1})])).is_some());
    }

    #[test]
    fn identical_page_is_suppressed() {
        let mut refresh = SmartRefresh::default();
        refresh.apply(page(&[json!({"id": 1, "name": "A"})]));
        assert!(refresh.apply(page(&[json!({"id": 1, "name": "A"})])).is_none());
    }

    #[test]
    fn count_change_emits() {
        let mut refresh = SmartRefresh::default();
        refresh.apply(page(&[json!({"id": 1})]));
        let emitted = refresh.apply(page(&[json!({"id": 1}), json!({"id": 2})]));
        assert_eq!(emitted.unwrap().data.len(), 2);
    }

    #[test]
    fn page_index_change_emits() {
        let mut refresh = SmartRefresh::default();
        refresh.apply(with_page_index(page(&[json!({"id": 1})]), 1));
        let emitted = refresh.apply(with_page_index(page(&[json!({"id": 1})]), 2));
        assert!(emitted.is_some());
    }

    #[test]
    fn missing_counterpart_emits_the_new_page() {
        let mut refresh = SmartRefresh::default();
        refresh.apply(page(&[json!({"id": 1})]));
        let emitted = refresh.apply(page(&[json!({"id": 2})]));
        assert_eq!(emitted.unwrap().data[0].id(), Some(json!(2)));
    }

    #[test]
    fn changed_record_is_merged_in_place_and_suppressed() {
        let mut refresh = SmartRefresh::default();
        let first = refresh.apply(page(&[json!({"id": 1, "name": "A"})])).unwrap();
        let held = first.data[0].clone();

        let second = refresh.apply(page(&[json!({"id": 1, "name": "B"})]));

        // No new emission, but the held record observed the change.
        assert!(second.is_none());
        assert_eq!(held.value()["name"], json!("B"));
        assert!(held.ptr_eq(&first.data[0]));
    }

    #[test]
    fn idempotent_across_repeated_applies() {
        let mut refresh = SmartRefresh::default();
        let p = with_page_index(page(&[json!({"id": 1}), json!({"id": 2})]), 1);
        assert!(refresh.apply(p.clone()).is_some());
        assert!(refresh.apply(p.clone()).is_none());
        assert!(refresh.apply(p).is_none());
    }

    #[test]
    fn custom_unique_path_with_array_uses_last_match() {
        let mut refresh = SmartRefresh::new("keys[value]");
        refresh.apply(page(&[json!({"keys": [{"value": "a"}, {"value": "b"}]})]));
        // Same last key "b", different first key: still matched, merged.
        let emitted = refresh.apply(page(&[json!({"keys": [{"value": "c"}, {"value": "b"}]})]));
        assert!(emitted.is_none());
    }

    #[test]
    fn reset_forces_the_next_emission() {
        let mut refresh = SmartRefresh::default();
        let p = page(&[json!({"id": 1})]);
        refresh.apply(p.clone());
        refresh.reset();
        assert!(refresh.apply(p).is_some());
    }
}
