//! Snapshot and index state behind the consistency cache.
//!
//! All three views share `Arc<Record>` entries, so a record is stored once and
//! every mutation replaces it in all three places together.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use steelcat_core::{BulkSelector, Record, RecordId, RecordKey, Timestamp};
use thiserror::Error;

/// A broken agreement between the snapshot and its indexes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoherenceViolation {
    #[error("Index sizes disagree: snapshot={snapshot}, by_spec={by_spec}, by_id={by_id}")]
    SizeMismatch {
        snapshot: usize,
        by_spec: usize,
        by_id: usize,
    },

    #[error("Record {id} appears more than once in the snapshot")]
    DuplicateInSnapshot { id: RecordId },

    #[error("Record {id} is missing from the id index")]
    MissingFromIdIndex { id: RecordId },

    #[error("Spec {spec} does not resolve to record {id}")]
    MissingFromSpecIndex { spec: String, id: RecordId },

    #[error("Indexed content for record {id} differs from the snapshot")]
    ContentMismatch { id: RecordId },

    #[error("Cache is not loaded but holds {count} records")]
    UnloadedNotEmpty { count: usize },
}

/// Point-in-time description of the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub loaded: bool,
    pub record_count: usize,
    pub last_sync: Option<Timestamp>,
}

/// Outcome of a successful full reload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReloadReport {
    pub record_count: usize,
    pub last_sync: Timestamp,
    pub elapsed: Duration,
    /// Specs held by more than one stored record; only the first is indexed
    pub duplicate_specs: Vec<String>,
}

#[derive(Debug, Default)]
pub(crate) struct CacheState {
    pub(crate) snapshot: Vec<Arc<Record>>,
    by_spec: HashMap<String, Arc<Record>>,
    by_id: HashMap<RecordId, Arc<Record>>,
    pub(crate) loaded: bool,
    pub(crate) last_sync: Option<Timestamp>,
}

impl CacheState {
    /// Build a loaded state from a full scan. The snapshot is ordered by id.
    ///
    /// Returns the state and any specs that occurred more than once.
    pub(crate) fn build(mut records: Vec<Record>, synced_at: Timestamp) -> (Self, Vec<String>) {
        records.sort_by_key(|r| r.id);
        records.dedup_by_key(|r| r.id);

        let mut state = Self {
            snapshot: Vec::with_capacity(records.len()),
            by_spec: HashMap::with_capacity(records.len()),
            by_id: HashMap::with_capacity(records.len()),
            loaded: true,
            last_sync: Some(synced_at),
        };
        let mut duplicates = Vec::new();
        for record in records {
            let record = Arc::new(record);
            if state.by_spec.contains_key(&record.spec) {
                duplicates.push(record.spec.clone());
            } else {
                state.by_spec.insert(record.spec.clone(), Arc::clone(&record));
            }
            state.by_id.insert(record.id, Arc::clone(&record));
            state.snapshot.push(record);
        }
        (state, duplicates)
    }

    pub(crate) fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub(crate) fn lookup(&self, key: &RecordKey) -> Option<&Arc<Record>> {
        match key {
            RecordKey::Id(id) => self.by_id.get(id),
            RecordKey::Spec(spec) => self.by_spec.get(spec),
        }
    }

    pub(crate) fn spec_holder(&self, spec: &str) -> Option<RecordId> {
        self.by_spec.get(spec).map(|r| r.id)
    }

    /// Append a newly created record.
    pub(crate) fn insert(&mut self, record: Record) {
        let record = Arc::new(record);
        self.by_spec.insert(record.spec.clone(), Arc::clone(&record));
        self.by_id.insert(record.id, Arc::clone(&record));
        self.snapshot.push(record);
    }

    /// Replace a record in place, moving its spec entry if the spec changed.
    ///
    /// A record the cache has never seen is appended instead.
    pub(crate) fn replace(&mut self, record: Record) {
        let Some(previous) = self.by_id.get(&record.id).cloned() else {
            self.insert(record);
            return;
        };
        self.unlink_spec(&previous);

        let record = Arc::new(record);
        self.by_spec.insert(record.spec.clone(), Arc::clone(&record));
        self.by_id.insert(record.id, Arc::clone(&record));
        if let Some(slot) = self.snapshot.iter_mut().find(|r| r.id == record.id) {
            *slot = record;
        }
    }

    /// Remove a record by id from all three views.
    pub(crate) fn remove(&mut self, id: RecordId) -> Option<Arc<Record>> {
        let removed = self.by_id.remove(&id)?;
        self.unlink_spec(&removed);
        self.snapshot.retain(|r| r.id != id);
        Some(removed)
    }

    /// Remove every record addressed by `selector`. Returns how many were removed.
    pub(crate) fn remove_selected(&mut self, selector: &BulkSelector) -> usize {
        let doomed: Vec<RecordId> = self
            .snapshot
            .iter()
            .filter(|r| selector.selects(r))
            .map(|r| r.id)
            .collect();
        if doomed.is_empty() {
            return 0;
        }

        let doomed_set: HashSet<RecordId> = doomed.iter().copied().collect();
        for id in &doomed {
            if let Some(removed) = self.by_id.remove(id) {
                self.unlink_spec(&removed);
            }
        }
        self.snapshot.retain(|r| !doomed_set.contains(&r.id));
        doomed.len()
    }

    /// Drop the spec entry only if it still points at this record.
    fn unlink_spec(&mut self, record: &Record) {
        if self.by_spec.get(&record.spec).is_some_and(|r| r.id == record.id) {
            self.by_spec.remove(&record.spec);
        }
    }

    pub(crate) fn status(&self) -> CacheStatus {
        CacheStatus {
            loaded: self.loaded,
            record_count: self.snapshot.len(),
            last_sync: self.last_sync,
        }
    }

    /// Check that the snapshot and both indexes describe the same records.
    pub(crate) fn verify(&self) -> Result<(), CoherenceViolation> {
        if !self.loaded {
            let count = self.snapshot.len().max(self.by_id.len()).max(self.by_spec.len());
            return if count == 0 {
                Ok(())
            } else {
                Err(CoherenceViolation::UnloadedNotEmpty { count })
            };
        }

        if self.by_spec.len() != self.snapshot.len() || self.by_id.len() != self.snapshot.len() {
            return Err(CoherenceViolation::SizeMismatch {
                snapshot: self.snapshot.len(),
                by_spec: self.by_spec.len(),
                by_id: self.by_id.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.snapshot.len());
        for record in &self.snapshot {
            if !seen.insert(record.id) {
                return Err(CoherenceViolation::DuplicateInSnapshot { id: record.id });
            }
            let by_id = self
                .by_id
                .get(&record.id)
                .ok_or(CoherenceViolation::MissingFromIdIndex { id: record.id })?;
            let by_spec = self
                .by_spec
                .get(&record.spec)
                .filter(|r| r.id == record.id)
                .ok_or_else(|| CoherenceViolation::MissingFromSpecIndex {
                    spec: record.spec.clone(),
                    id: record.id,
                })?;
            if **by_id != **record || **by_spec != **record {
                return Err(CoherenceViolation::ContentMismatch { id: record.id });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use steelcat_core::{NewRecord, RecordChanges};

    fn record(spec: &str) -> Record {
        Record::from_new(RecordId::now_v7(), NewRecord::new(spec, 1.0))
    }

    fn loaded(records: Vec<Record>) -> CacheState {
        CacheState::build(records, Utc::now()).0
    }

    #[test]
    fn test_empty_state_is_coherent() {
        let state = CacheState::default();
        assert!(!state.loaded);
        assert_eq!(state.verify(), Ok(()));
    }

    #[test]
    fn test_build_orders_by_id() {
        let first = record("A");
        let second = record("B");
        let state = loaded(vec![second.clone(), first.clone()]);

        let ids: Vec<_> = state.snapshot.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(state.verify(), Ok(()));
        assert!(state.last_sync.is_some());
    }

    #[test]
    fn test_build_reports_duplicate_specs() {
        let first = record("SS400-10");
        let second = record("SS400-10");
        let (state, duplicates) = CacheState::build(vec![first.clone(), second], Utc::now());

        assert_eq!(duplicates, vec!["SS400-10".to_string()]);
        assert_eq!(state.spec_holder("SS400-10"), Some(first.id));
        assert!(matches!(
            state.verify(),
            Err(CoherenceViolation::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_insert_replace_remove_stay_coherent() {
        let mut state = loaded(vec![record("A"), record("B")]);
        let created = record("C");
        state.insert(created.clone());
        assert_eq!(state.verify(), Ok(()));
        assert_eq!(state.snapshot.last().map(|r| r.id), Some(created.id));

        let renamed = created.with_changes(&RecordChanges::new().spec("C2").wpm(2.0));
        state.replace(renamed.clone());
        assert_eq!(state.verify(), Ok(()));
        assert!(state.lookup(&RecordKey::Spec("C".into())).is_none());
        assert_eq!(
            state.lookup(&RecordKey::Spec("C2".into())).map(|r| r.wpm),
            Some(2.0)
        );
        assert_eq!(state.snapshot.last().map(|r| r.spec.as_str()), Some("C2"));

        assert!(state.remove(renamed.id).is_some());
        assert!(state.remove(renamed.id).is_none());
        assert_eq!(state.len(), 2);
        assert_eq!(state.verify(), Ok(()));
    }

    #[test]
    fn test_remove_selected() {
        let keep = record("KEEP");
        let mut state = loaded(vec![record("X"), keep.clone(), record("Y")]);

        let selector = BulkSelector::Specs(vec!["X".into(), "Y".into(), "Z".into()]);
        assert_eq!(state.remove_selected(&selector), 2);
        assert_eq!(state.len(), 1);
        assert_eq!(state.snapshot[0].id, keep.id);
        assert_eq!(state.verify(), Ok(()));
    }

    #[test]
    fn test_verify_detects_stale_index() {
        let target = record("A");
        let mut state = loaded(vec![target.clone()]);
        let mut changed = target.clone();
        changed.wpm = 99.0;
        state.by_id.insert(target.id, Arc::new(changed));

        assert_eq!(
            state.verify(),
            Err(CoherenceViolation::ContentMismatch { id: target.id })
        );
    }
}
