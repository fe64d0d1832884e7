//! Optimistic mutation coordination.
//!
//! Single-item updates apply the validated change to every cached page
//! immediately, then issue the real request: the authoritative server
//! value overwrites the optimistic one on success, and the pre-mutation
//! snapshot is restored on failure. Bulk actions fan out independent
//! requests with all-settled semantics — one failure never aborts the
//! rest — and aggregate into a [`BulkOperationResult`] that always
//! partitions the input ids exactly.


use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;

use crate::api::{ApiTransport, EntityPatch};
use crate::entities::{self, AnyStatus, Entity, EntityKind, InsightStatus, Post, PostStatus, TranscriptStatus};
use crate::error::{AppError, Result};
use crate::pages::SharedPageCache;
use crate::schedule;

// ============================================================================
// Bulk actions and results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Approve,
    Reject,
    Archive,
    RequestReview,
    Unschedule,
    MarkProcessing,
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Archive => "archive",
            Self::RequestReview => "request_review",
            Self::Unschedule => "unschedule",
            Self::MarkProcessing => "mark_processing",
            Self::Delete => "delete",
        }
    }

    /// The status this action drives entities of `kind` toward. Actions
    /// that don't exist for a kind fail per-id, before any network call.
    fn target_status(&self, kind: EntityKind) -> Result<AnyStatus> {
        let target = match (self, kind) {
            (Self::Approve, EntityKind::Insight) => AnyStatus::Insight(InsightStatus::Approved),
            (Self::Approve, EntityKind::Post) => AnyStatus::Post(PostStatus::Approved),
            (Self::Reject, EntityKind::Insight) => AnyStatus::Insight(InsightStatus::Rejected),
            (Self::Reject, EntityKind::Post) => AnyStatus::Post(PostStatus::Rejected),
            (Self::Archive, EntityKind::Insight) => AnyStatus::Insight(InsightStatus::Archived),
            (Self::Archive, EntityKind::Post) => AnyStatus::Post(PostStatus::Archived),
            (Self::RequestReview, EntityKind::Insight) => {
                AnyStatus::Insight(InsightStatus::NeedsReview)
            }
            (Self::RequestReview, EntityKind::Post) => AnyStatus::Post(PostStatus::NeedsReview),
            (Self::Unschedule, EntityKind::Post) => AnyStatus::Post(PostStatus::Approved),
            (Self::MarkProcessing, EntityKind::Transcript) => {
                AnyStatus::Transcript(TranscriptStatus::Processing)
            }
            (action, kind) => {
                return Err(AppError::Validation(format!(
                    "action {} does not apply to {}s",
                    action.as_str(),
                    kind
                )))
            }
        };
        Ok(target)
    }
}

/// Aggregated outcome of a multi-id action. The two id lists are disjoint
/// and their union is exactly the input — partial failure is a result
/// shape here, never an exception.
#[derive(Debug, Clone, Serialize)]
pub struct BulkOperationResult {
    pub successful_ids: Vec<i64>,
    pub failed_ids: Vec<i64>,
    pub errors_by_id: HashMap<i64, String>,
}

impl BulkOperationResult {
    fn from_outcomes(outcomes: Vec<(i64, Result<()>)>) -> Self {
        let mut result = Self {
            successful_ids: Vec::new(),
            failed_ids: Vec::new(),
            errors_by_id: HashMap::new(),
        };
        for (id, outcome) in outcomes {
            match outcome {
                Ok(()) => result.successful_ids.push(id),
                Err(e) => {
                    result.failed_ids.push(id);
                    result.errors_by_id.insert(id, e.to_string());
                }
            }
        }
        result
    }

    pub fn total(&self) -> usize {
        self.successful_ids.len() + self.failed_ids.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed_ids.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.successful_ids.len(),
            self.failed_ids.len()
        )
    }
}

// ============================================================================
// Coordinator
// ============================================================================

pub struct MutationCoordinator<T: ApiTransport> {
    transport: Arc<T>,
    cache: SharedPageCache,
}

impl<T: ApiTransport> MutationCoordinator<T> {
    pub fn new(transport: Arc<T>, cache: SharedPageCache) -> Self {
        Self { transport, cache }
    }

    /// Single-entity status change: optimistic cache overwrite, then the
    /// real request. Rolls the cached value back to the pre-mutation
    /// snapshot if the request fails; the error still propagates.
    pub async fn update_status(&self, entity: &Entity, target: AnyStatus) -> Result<Entity> {
        let optimistic = entities::request_transition(entity, target)?;
        self.cache.write().await.apply_entity(&optimistic);

        let patch = EntityPatch::from_transition(&optimistic);
        match self.transport.update(entity.kind(), entity.id(), &patch).await {
            Ok(authoritative) => {
                self.cache.write().await.apply_entity(&authoritative);
                Ok(authoritative)
            }
            Err(e) => {
                self.cache.write().await.apply_entity(entity);
                log::warn!(
                    "status update for {} {} rolled back: {}",
                    entity.kind(),
                    entity.id(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Edits a post's title/content. Validation failures resolve before
    /// any network call.
    pub async fn update_post_content(
        &self,
        post: &Post,
        title: &str,
        content: &str,
    ) -> Result<Entity> {
        Post::validate_content(title, content)?;

        let mut optimistic = post.clone();
        optimistic.title = title.to_string();
        optimistic.content = content.to_string();
        optimistic.char_count = content.chars().count() as i64;

        let snapshot = Entity::Post(post.clone());
        self.cache
            .write()
            .await
            .apply_entity(&Entity::Post(optimistic.clone()));

        let patch = EntityPatch {
            title: Some(optimistic.title.clone()),
            content: Some(optimistic.content.clone()),
            char_count: Some(optimistic.char_count),
            ..Default::default()
        };
        match self
            .transport
            .update(EntityKind::Post, post.id, &patch)
            .await
        {
            Ok(authoritative) => {
                self.cache.write().await.apply_entity(&authoritative);
                Ok(authoritative)
            }
            Err(e) => {
                self.cache.write().await.apply_entity(&snapshot);
                Err(e)
            }
        }
    }

    /// Applies one action to many entities with all-settled semantics.
    /// Ids that fail local transition validation fail fast without
    /// touching the network; the rest fan out concurrently.
    pub async fn bulk_update(&self, action: BulkAction, targets: &[Entity]) -> BulkOperationResult {
        if action == BulkAction::Delete {
            return self.bulk_delete(targets).await;
        }

        let mut outcomes: Vec<(i64, Result<()>)> = Vec::new();
        let mut prepared: Vec<(Entity, Entity)> = Vec::new();

        for entity in targets {
            let transition = action
                .target_status(entity.kind())
                .and_then(|target| entities::request_transition(entity, target));
            match transition {
                Ok(optimistic) => prepared.push((entity.clone(), optimistic)),
                Err(e) => outcomes.push((entity.id(), Err(e))),
            }
        }

        // All optimistic values land before any request is issued.
        {
            let mut cache = self.cache.write().await;
            for (_, optimistic) in &prepared {
                cache.apply_entity(optimistic);
            }
        }

        let settled = join_all(prepared.into_iter().map(|(snapshot, optimistic)| async move {
            let id = optimistic.id();
            let patch = EntityPatch::from_transition(&optimistic);
            match self.transport.update(optimistic.kind(), id, &patch).await {
                Ok(authoritative) => {
                    self.cache.write().await.apply_entity(&authoritative);
                    (id, Ok(()))
                }
                Err(e) => {
                    self.cache.write().await.apply_entity(&snapshot);
                    (id, Err(e))
                }
            }
        }))
        .await;

        outcomes.extend(settled);
        let result = BulkOperationResult::from_outcomes(outcomes);
        log::info!(
            "bulk {} over {} ids: {}",
            action.as_str(),
            result.total(),
            result.summary()
        );
        result
    }

    /// Schedules one post at a zone-local wall time.
    pub async fn schedule_post(&self, post: &Post, local_input: &str, zone: &str) -> Result<Post> {
        let instant = schedule::local_input_to_utc(local_input, zone)?;

        let mut candidate = post.clone();
        candidate.scheduled_for = Some(instant);
        let optimistic = candidate.with_status(PostStatus::Scheduled)?;

        self.cache
            .write()
            .await
            .apply_entity(&Entity::Post(optimistic));

        match self.transport.schedule(post.id, instant).await {
            Ok(authoritative) => {
                self.cache
                    .write()
                    .await
                    .apply_entity(&Entity::Post(authoritative.clone()));
                Ok(authoritative)
            }
            Err(e) => {
                self.cache
                    .write()
                    .await
                    .apply_entity(&Entity::Post(post.clone()));
                log::warn!("scheduling post {} rolled back: {}", post.id, e);
                Err(e)
            }
        }
    }

    /// Bulk scheduling: each (post, wall time) pair converts through the
    /// time converter first — conversion and transition failures resolve
    /// locally — then valid pairs go through the same all-settled path.
    /// A post transitions to `scheduled` only when its request succeeds.
    pub async fn bulk_schedule(
        &self,
        jobs: &[(Post, String)],
        zone: &str,
    ) -> BulkOperationResult {
        let mut outcomes: Vec<(i64, Result<()>)> = Vec::new();
        let mut prepared: Vec<(Post, Post, chrono::DateTime<chrono::Utc>)> = Vec::new();

        for (post, local_input) in jobs {
            let validated = schedule::local_input_to_utc(local_input, zone).and_then(|instant| {
                let mut candidate = post.clone();
                candidate.scheduled_for = Some(instant);
                candidate
                    .with_status(PostStatus::Scheduled)
                    .map(|optimistic| (optimistic, instant))
            });
            match validated {
                Ok((optimistic, instant)) => prepared.push((post.clone(), optimistic, instant)),
                Err(e) => outcomes.push((post.id, Err(e))),
            }
        }

        {
            let mut cache = self.cache.write().await;
            for (_, optimistic, _) in &prepared {
                cache.apply_entity(&Entity::Post(optimistic.clone()));
            }
        }

        let settled = join_all(prepared.into_iter().map(|(snapshot, optimistic, instant)| async move {
            let id = optimistic.id;
            match self.transport.schedule(id, instant).await {
                Ok(authoritative) => {
                    self.cache
                        .write()
                        .await
                        .apply_entity(&Entity::Post(authoritative));
                    (id, Ok(()))
                }
                Err(e) => {
                    self.cache
                        .write()
                        .await
                        .apply_entity(&Entity::Post(snapshot));
                    (id, Err(e))
                }
            }
        }))
        .await;

        outcomes.extend(settled);
        let result = BulkOperationResult::from_outcomes(outcomes);
        log::info!(
            "bulk schedule over {} posts: {}",
            result.total(),
            result.summary()
        );
        result
    }

    /// Deletes apply on confirmation only — a removed row can't be
    /// restored into its page, so there is no optimistic removal.
    pub async fn delete(&self, entity: &Entity) -> Result<()> {
        self.transport.delete(entity.kind(), entity.id()).await?;
        self.cache
            .write()
            .await
            .remove_entity(entity.kind(), entity.id());
        Ok(())
    }

    async fn bulk_delete(&self, targets: &[Entity]) -> BulkOperationResult {
        let settled = join_all(targets.iter().map(|entity| async move {
            (entity.id(), self.delete(entity).await)
        }))
        .await;

        let result = BulkOperationResult::from_outcomes(settled);
        log::info!(
            "bulk delete over {} ids: {}",
            result.total(),
            result.summary()
        );
        result
    }
}
