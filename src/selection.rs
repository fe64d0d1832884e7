//! Selection algebra over the currently loaded collection.
//!
//! A selection is scoped to exactly one entity kind at a time and never
//! contains an id absent from the loaded collection; every operation
//! re-intersects with it. Switching the active kind clears the selection
//! (the session enforces that, see `session.rs`).

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::entities::{AnyStatus, Entity, EntityKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    kind: EntityKind,
    ids: HashSet<i64>,
}

impl SelectionSet {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            ids: HashSet::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Selected ids in no particular order.
    pub fn ids(&self) -> Vec<i64> {
        self.ids.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// `on = true` selects every loaded id; `on = false` clears.
    pub fn select_all(&mut self, collection: &[Entity], on: bool) {
        if on {
            self.ids = Self::matching_ids(self.kind, collection, |_| true);
        } else {
            self.ids.clear();
        }
    }

    /// Selects exactly the ids passing the active filter predicate —
    /// replaces the current selection, never unions into it.
    pub fn select_filtered(&mut self, filtered: &[Entity]) {
        self.ids = Self::matching_ids(self.kind, filtered, |_| true);
    }

    /// Selects by status across the whole loaded collection, ignoring any
    /// active filter.
    pub fn select_by_status(&mut self, collection: &[Entity], status: AnyStatus) {
        self.ids = Self::matching_ids(self.kind, collection, |e| e.status() == status);
    }

    /// Selects by the kind's grouping facet: platform for posts, category
    /// for insights, source kind for transcripts.
    pub fn select_by_facet(&mut self, collection: &[Entity], facet: &str) {
        self.ids = Self::matching_ids(self.kind, collection, |e| e.facet() == facet);
    }

    /// Selects ids whose `created_at` falls in `[start, end]` inclusive.
    pub fn select_by_date_range(
        &mut self,
        collection: &[Entity],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        self.ids = Self::matching_ids(self.kind, collection, |e| {
            let at = e.created_at();
            at >= start && at <= end
        });
    }

    /// True set complement against the loaded ids, not a per-item toggle.
    pub fn invert(&mut self, collection: &[Entity]) {
        let all = Self::matching_ids(self.kind, collection, |_| true);
        self.ids = all.difference(&self.ids).copied().collect();
    }

    /// Drops ids no longer present in the loaded collection. Called after
    /// a page swap or refetch so the selection invariant holds.
    pub fn retain_loaded(&mut self, collection: &[Entity]) {
        let loaded = Self::matching_ids(self.kind, collection, |_| true);
        self.ids.retain(|id| loaded.contains(id));
    }

    fn matching_ids<F>(kind: EntityKind, collection: &[Entity], predicate: F) -> HashSet<i64>
    where
        F: Fn(&Entity) -> bool,
    {
        collection
            .iter()
            .filter(|e| e.kind() == kind)
            .filter(|e| predicate(e))
            .map(|e| e.id())
            .collect()
    }
}
