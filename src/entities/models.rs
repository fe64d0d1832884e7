use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ============================================================================
// Status enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    Raw,
    Cleaned,
    Processing,
    InsightsGenerated,
    PostsCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    NeedsReview,
    Approved,
    Rejected,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    NeedsReview,
    Approved,
    Scheduled,
    Published,
    Rejected,
    Archived,
}

impl TranscriptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Cleaned => "cleaned",
            Self::Processing => "processing",
            Self::InsightsGenerated => "insights_generated",
            Self::PostsCreated => "posts_created",
        }
    }
}

impl InsightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsReview => "needs_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NeedsReview => "needs_review",
            Self::Approved => "approved",
            Self::Scheduled => "scheduled",
            Self::Published => "published",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
        }
    }
}

impl std::fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for InsightStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TranscriptStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Self::Raw),
            "cleaned" => Ok(Self::Cleaned),
            "processing" => Ok(Self::Processing),
            "insights_generated" => Ok(Self::InsightsGenerated),
            "posts_created" => Ok(Self::PostsCreated),
            other => Err(AppError::Validation(format!(
                "unknown transcript status: {}",
                other
            ))),
        }
    }
}

impl std::str::FromStr for InsightStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_review" => Ok(Self::NeedsReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "archived" => Ok(Self::Archived),
            other => Err(AppError::Validation(format!(
                "unknown insight status: {}",
                other
            ))),
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_review" => Ok(Self::NeedsReview),
            "approved" => Ok(Self::Approved),
            "scheduled" => Ok(Self::Scheduled),
            "published" => Ok(Self::Published),
            "rejected" => Ok(Self::Rejected),
            "archived" => Ok(Self::Archived),
            other => Err(AppError::Validation(format!(
                "unknown post status: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Supporting value types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Audio,
    Video,
    Text,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Linkedin,
    Instagram,
    Facebook,
    Tiktok,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Linkedin => "linkedin",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Tiktok => "tiktok",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Text,
    Thread,
    Carousel,
    Reel,
}

/// Four sub-scores plus the computed total an insight was graded with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    pub relevance: f32,
    pub clarity: f32,
    pub engagement: f32,
    pub originality: f32,
    pub total: f32,
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub id: i64,
    pub title: String,
    pub raw_content: String,
    pub cleaned_content: Option<String>,
    pub word_count: i64,
    pub duration_secs: Option<f64>,
    pub source: SourceKind,
    pub status: TranscriptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    pub title: String,
    pub summary: String,
    pub category: String,
    pub post_type: PostType,
    pub scores: ScoreVector,
    pub status: InsightStatus,
    /// Weak back-reference to the originating transcript: id plus a
    /// denormalized title, never ownership.
    pub transcript_id: Option<i64>,
    pub transcript_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub platform: Platform,
    pub char_count: i64,
    pub status: PostStatus,
    /// UTC instant the post is queued for. `Some` iff status is
    /// `scheduled` (kept through `published`); reset when the post
    /// leaves `scheduled` any other way.
    pub scheduled_for: Option<DateTime<Utc>>,
    pub insight_id: Option<i64>,
    pub transcript_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
