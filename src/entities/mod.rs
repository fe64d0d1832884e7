//! Entity models and the per-kind status state machines.
//!
//! The three pipeline kinds share one closed dispatch surface (`Entity` /
//! `EntityKind`) so the selection engine, page cache and mutation
//! coordinator are written once instead of three parallel copies.

pub mod models;


pub use models::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

// ============================================================================
// Kind dispatch
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Transcript,
    Insight,
    Post,
}

impl EntityKind {
    /// Path segment used by the dashboard API (`/entities/{kind}`).
    pub fn as_path(&self) -> &'static str {
        match self {
            Self::Transcript => "transcripts",
            Self::Insight => "insights",
            Self::Post => "posts",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Insight => "insight",
            Self::Post => "post",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transcript" | "transcripts" => Ok(Self::Transcript),
            "insight" | "insights" => Ok(Self::Insight),
            "post" | "posts" => Ok(Self::Post),
            other => Err(AppError::Validation(format!(
                "unknown entity kind: {}",
                other
            ))),
        }
    }
}

/// A status value tagged with the kind it belongs to, for call sites that
/// operate across kinds (bulk actions, selection by status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnyStatus {
    Transcript(TranscriptStatus),
    Insight(InsightStatus),
    Post(PostStatus),
}

impl AnyStatus {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Transcript(_) => EntityKind::Transcript,
            Self::Insight(_) => EntityKind::Insight,
            Self::Post(_) => EntityKind::Post,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcript(s) => s.as_str(),
            Self::Insight(s) => s.as_str(),
            Self::Post(s) => s.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entity {
    Transcript(Transcript),
    Insight(Insight),
    Post(Post),
}

impl Entity {
    pub fn id(&self) -> i64 {
        match self {
            Self::Transcript(t) => t.id,
            Self::Insight(i) => i.id,
            Self::Post(p) => p.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Transcript(_) => EntityKind::Transcript,
            Self::Insight(_) => EntityKind::Insight,
            Self::Post(_) => EntityKind::Post,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Transcript(t) => &t.title,
            Self::Insight(i) => &i.title,
            Self::Post(p) => &p.title,
        }
    }

    pub fn status(&self) -> AnyStatus {
        match self {
            Self::Transcript(t) => AnyStatus::Transcript(t.status),
            Self::Insight(i) => AnyStatus::Insight(i.status),
            Self::Post(p) => AnyStatus::Post(p.status),
        }
    }

    pub fn status_name(&self) -> &'static str {
        self.status().as_str()
    }

    /// The secondary grouping facet the dashboard filters on: platform
    /// for posts, category for insights, source kind for transcripts.
    pub fn facet(&self) -> &str {
        match self {
            Self::Transcript(t) => t.source.as_str(),
            Self::Insight(i) => &i.category,
            Self::Post(p) => p.platform.as_str(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Transcript(t) => t.created_at,
            Self::Insight(i) => i.created_at,
            Self::Post(p) => p.created_at,
        }
    }
}

// ============================================================================
// Transition tables
// ============================================================================

impl TranscriptStatus {
    /// Legal edges: raw → cleaned → processing → insights_generated →
    /// posts_created, plus raw → processing (clean in flight).
    /// `posts_created` is terminal.
    pub fn can_transition_to(self, target: TranscriptStatus) -> bool {
        use TranscriptStatus::*;
        matches!(
            (self, target),
            (Raw, Cleaned)
                | (Raw, Processing)
                | (Cleaned, Processing)
                | (Processing, InsightsGenerated)
                | (InsightsGenerated, PostsCreated)
        )
    }
}

impl InsightStatus {
    /// needs_review ⇄ approved, needs_review → rejected, rejected →
    /// needs_review (re-review), approved/rejected → archived.
    pub fn can_transition_to(self, target: InsightStatus) -> bool {
        use InsightStatus::*;
        matches!(
            (self, target),
            (NeedsReview, Approved)
                | (Approved, NeedsReview)
                | (NeedsReview, Rejected)
                | (Rejected, NeedsReview)
                | (Approved, Archived)
                | (Rejected, Archived)
        )
    }
}

impl PostStatus {
    /// needs_review → approved → scheduled → published, needs_review →
    /// rejected, approved/scheduled → archived. Unscheduling returns to
    /// `approved`; scheduled → needs_review stays disallowed because
    /// scheduling is end-of-review.
    pub fn can_transition_to(self, target: PostStatus) -> bool {
        use PostStatus::*;
        matches!(
            (self, target),
            (NeedsReview, Approved)
                | (Approved, Scheduled)
                | (Scheduled, Published)
                | (Scheduled, Approved)
                | (NeedsReview, Rejected)
                | (Approved, Archived)
                | (Scheduled, Archived)
        )
    }
}

// ============================================================================
// Pure transition application
// ============================================================================

impl Transcript {
    pub fn with_status(&self, target: TranscriptStatus) -> Result<Transcript> {
        if !self.status.can_transition_to(target) {
            return Err(AppError::InvalidTransition(format!(
                "transcript {}: {} -> {}",
                self.id, self.status, target
            )));
        }
        let mut next = self.clone();
        next.status = target;
        Ok(next)
    }
}

impl Insight {
    pub fn with_status(&self, target: InsightStatus) -> Result<Insight> {
        if !self.status.can_transition_to(target) {
            return Err(AppError::InvalidTransition(format!(
                "insight {}: {} -> {}",
                self.id, self.status, target
            )));
        }
        let mut next = self.clone();
        next.status = target;
        Ok(next)
    }
}

impl Post {
    pub fn with_status(&self, target: PostStatus) -> Result<Post> {
        if !self.status.can_transition_to(target) {
            return Err(AppError::InvalidTransition(format!(
                "post {}: {} -> {}",
                self.id, self.status, target
            )));
        }
        if target == PostStatus::Scheduled && self.scheduled_for.is_none() {
            return Err(AppError::Validation(format!(
                "post {}: scheduled status requires a scheduled_for instant",
                self.id
            )));
        }
        let mut next = self.clone();
        next.status = target;
        // Leaving `scheduled` for anything but `published` resets the
        // queued instant (unschedule, archive).
        if !matches!(target, PostStatus::Scheduled | PostStatus::Published) {
            next.scheduled_for = None;
        }
        Ok(next)
    }

    /// Pre-submit validation: the dashboard never sends empty content to
    /// the API.
    pub fn validate_content(title: &str, content: &str) -> Result<()> {
        if title.trim().is_empty() {
            return Err(AppError::Validation("post title is empty".into()));
        }
        if content.trim().is_empty() {
            return Err(AppError::Validation("post content is empty".into()));
        }
        Ok(())
    }
}

/// Applies a validated status change to an entity, returning the new
/// value. Pure: no network, no clock, no cache writes — callers apply the
/// result optimistically and issue the API request separately.
pub fn request_transition(entity: &Entity, target: AnyStatus) -> Result<Entity> {
    match (entity, target) {
        (Entity::Transcript(t), AnyStatus::Transcript(s)) => {
            Ok(Entity::Transcript(t.with_status(s)?))
        }
        (Entity::Insight(i), AnyStatus::Insight(s)) => Ok(Entity::Insight(i.with_status(s)?)),
        (Entity::Post(p), AnyStatus::Post(s)) => Ok(Entity::Post(p.with_status(s)?)),
        (entity, target) => Err(AppError::Validation(format!(
            "{} status does not apply to a {}",
            target.kind(),
            entity.kind()
        ))),
    }
}
