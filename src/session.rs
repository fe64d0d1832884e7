//! Pipeline session state.
//!
//! One explicitly constructed session owns the active entity kind, its
//! selection, and the derived load plan — the dashboard's per-view state
//! without a hidden global store. Switching the active kind tears the
//! selection down, so stale ids can never feed a cross-kind bulk action.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::entities::{Entity, EntityKind};
use crate::error::Result;
use crate::mutation::BulkOperationResult;
use crate::selection::SelectionSet;
use crate::store::{PrefsStore, ViewPreferences};
use crate::strategy::{DataLoadPlan, DeviceClass, LoadStrategy, StrategyThresholds};

/// Per-status counts for the dashboard header.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub total: usize,
    pub by_status: HashMap<&'static str, usize>,
}

pub struct PipelineSession {
    active_kind: EntityKind,
    selection: SelectionSet,
    device: DeviceClass,
    thresholds: StrategyThresholds,
    forced_strategy: Option<LoadStrategy>,
    total_items: usize,
    plan: DataLoadPlan,
    prefs: Arc<PrefsStore>,
}

impl PipelineSession {
    pub fn new(
        prefs: Arc<PrefsStore>,
        device: DeviceClass,
        thresholds: StrategyThresholds,
        forced_strategy: Option<LoadStrategy>,
    ) -> Self {
        let active_kind = EntityKind::Transcript;
        Self {
            active_kind,
            selection: SelectionSet::new(active_kind),
            device,
            thresholds,
            forced_strategy,
            total_items: 0,
            plan: DataLoadPlan::build(0, device, &thresholds, forced_strategy),
            prefs,
        }
    }

    pub fn active_kind(&self) -> EntityKind {
        self.active_kind
    }

    pub fn plan(&self) -> DataLoadPlan {
        self.plan
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    /// Switches the active view. The selection is always discarded —
    /// even when switching back — so bulk actions can never run on ids
    /// from another kind's view.
    pub fn set_active_kind(&mut self, kind: EntityKind) {
        if kind != self.active_kind {
            log::info!("active view: {} -> {}", self.active_kind, kind);
        }
        self.active_kind = kind;
        self.selection = SelectionSet::new(kind);
        self.total_items = 0;
        self.rebuild_plan();
    }

    /// Records a new total for the active collection and recomputes the
    /// load plan from it.
    pub fn set_total_items(&mut self, total: usize) -> DataLoadPlan {
        self.total_items = total;
        self.rebuild_plan();
        self.plan
    }

    pub fn set_device(&mut self, device: DeviceClass) -> DataLoadPlan {
        self.device = device;
        self.rebuild_plan();
        self.plan
    }

    fn rebuild_plan(&mut self) {
        self.plan = DataLoadPlan::build(
            self.total_items,
            self.device,
            &self.thresholds,
            self.forced_strategy,
        );
    }

    /// Re-intersects the selection with the loaded collection after a
    /// page swap or refetch.
    pub fn sync_selection(&mut self, collection: &[Entity]) {
        self.selection.retain_loaded(collection);
    }

    /// Called when a bulk action is reported complete. The selection
    /// clears regardless of partial failure — the caller has the
    /// [`BulkOperationResult`] and decides how to present it.
    pub fn on_bulk_complete(&mut self, result: &BulkOperationResult) {
        log::info!(
            "bulk action complete on {}s: {}",
            self.active_kind,
            result.summary()
        );
        self.selection.clear();
    }

    pub fn view_preferences(&self) -> Result<ViewPreferences> {
        Ok(self.prefs.view_preferences(self.active_kind)?)
    }

    pub fn save_view_preferences(&self, prefs: &ViewPreferences) -> Result<()> {
        Ok(self.prefs.save_view_preferences(prefs)?)
    }

    /// Aggregates per-status counts over the loaded collection.
    pub fn stats(&self, collection: &[Entity]) -> PipelineStats {
        let mut by_status: HashMap<&'static str, usize> = HashMap::new();
        let mut total = 0;
        for entity in collection.iter().filter(|e| e.kind() == self.active_kind) {
            *by_status.entry(entity.status_name()).or_insert(0) += 1;
            total += 1;
        }
        PipelineStats { total, by_status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{InsightStatus, PostStatus};
    use crate::testutil::{insight, post};
    use tempfile::TempDir;

    fn session() -> (PipelineSession, TempDir) {
        let temp = TempDir::new().unwrap();
        let prefs = Arc::new(PrefsStore::new(&temp.path().join("test.db")).unwrap());
        let session = PipelineSession::new(
            prefs,
            DeviceClass::Desktop,
            StrategyThresholds::default(),
            None,
        );
        (session, temp)
    }

    #[test]
    fn test_kind_switch_clears_selection() {
        let (mut session, _temp) = session();
        session.set_active_kind(EntityKind::Post);

        let collection = vec![
            Entity::Post(post(1, PostStatus::Approved)),
            Entity::Post(post(2, PostStatus::Approved)),
        ];
        session.selection_mut().select_all(&collection, true);
        assert_eq!(session.selection().len(), 2);

        session.set_active_kind(EntityKind::Insight);
        assert!(session.selection().is_empty());
        assert_eq!(session.selection().kind(), EntityKind::Insight);

        // Switching back does not resurrect the old selection.
        session.set_active_kind(EntityKind::Post);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_total_change_rebuilds_plan() {
        let (mut session, _temp) = session();
        assert_eq!(session.plan().strategy, LoadStrategy::Client);

        let plan = session.set_total_items(600);
        assert_eq!(plan.strategy, LoadStrategy::Hybrid);

        let plan = session.set_device(DeviceClass::Mobile);
        assert_eq!(plan.strategy, LoadStrategy::Server);
    }

    #[test]
    fn test_bulk_complete_clears_selection_despite_failures() {
        let (mut session, _temp) = session();
        session.set_active_kind(EntityKind::Post);

        let collection = vec![Entity::Post(post(1, PostStatus::Approved))];
        session.selection_mut().select_all(&collection, true);

        let result = BulkOperationResult {
            successful_ids: vec![],
            failed_ids: vec![1],
            errors_by_id: HashMap::new(),
        };
        session.on_bulk_complete(&result);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_stats_counts_by_status() {
        let (mut session, _temp) = session();
        session.set_active_kind(EntityKind::Insight);

        let collection = vec![
            Entity::Insight(insight(1, InsightStatus::NeedsReview)),
            Entity::Insight(insight(2, InsightStatus::NeedsReview)),
            Entity::Insight(insight(3, InsightStatus::Approved)),
            // Other kinds are not counted in this view.
            Entity::Post(post(4, PostStatus::Approved)),
        ];
        let stats = session.stats(&collection);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status.get("needs_review"), Some(&2));
        assert_eq!(stats.by_status.get("approved"), Some(&1));
    }

    #[test]
    fn test_preferences_roundtrip_through_session() {
        let (mut session, _temp) = session();
        session.set_active_kind(EntityKind::Post);

        let mut prefs = session.view_preferences().unwrap();
        prefs.status_filter = Some("scheduled".into());
        session.save_view_preferences(&prefs).unwrap();

        let loaded = session.view_preferences().unwrap();
        assert_eq!(loaded.status_filter.as_deref(), Some("scheduled"));
    }
}
