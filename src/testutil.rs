//! Shared fixtures and an in-memory transport for tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::api::{ApiTransport, EntityPage, EntityPatch, EntityQuery};
use crate::entities::{
    Entity, EntityKind, Insight, InsightStatus, Platform, Post, PostStatus, PostType, ScoreVector,
    SourceKind, Transcript, TranscriptStatus,
};
use crate::error::{AppError, Result};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn transcript(id: i64, status: TranscriptStatus) -> Transcript {
    let created = base_time() + Duration::days(id);
    Transcript {
        id,
        title: format!("Transcript {}", id),
        raw_content: "um so today we're going to talk about onboarding".into(),
        cleaned_content: None,
        word_count: 1200,
        duration_secs: Some(1800.0),
        source: SourceKind::Audio,
        status,
        created_at: created,
        updated_at: created,
    }
}

pub fn insight(id: i64, status: InsightStatus) -> Insight {
    let created = base_time() + Duration::days(id);
    Insight {
        id,
        title: format!("Insight {}", id),
        summary: "Users drop off at step three of onboarding".into(),
        category: "growth".into(),
        post_type: PostType::Thread,
        scores: ScoreVector {
            relevance: 8.0,
            clarity: 7.5,
            engagement: 8.5,
            originality: 6.0,
            total: 30.0,
        },
        status,
        transcript_id: Some(1),
        transcript_title: Some("Transcript 1".into()),
        created_at: created,
        updated_at: created,
    }
}

pub fn post(id: i64, status: PostStatus) -> Post {
    let created = base_time() + Duration::days(id);
    Post {
        id,
        title: format!("Post {}", id),
        content: "Three onboarding fixes that doubled our activation rate".into(),
        platform: Platform::Twitter,
        char_count: 54,
        status,
        // Keep the scheduled/scheduled_for invariant in fixtures too.
        scheduled_for: (status == PostStatus::Scheduled)
            .then(|| base_time() + Duration::days(id) + Duration::hours(6)),
        insight_id: Some(1),
        transcript_id: Some(1),
        created_at: created,
        updated_at: created,
    }
}

pub fn post_collection(n: i64) -> Vec<Entity> {
    (1..=n)
        .map(|id| Entity::Post(post(id, PostStatus::Approved)))
        .collect()
}

// ============================================================================
// Mock transport
// ============================================================================

/// In-memory [`ApiTransport`] with scriptable per-id failures.
pub struct MockTransport {
    entities: Mutex<HashMap<i64, Entity>>,
    fail_ids: Mutex<HashSet<i64>>,
    pub list_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            entities: Mutex::new(HashMap::new()),
            fail_ids: Mutex::new(HashSet::new()),
            list_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entities(entities: Vec<Entity>) -> Self {
        let transport = Self::new();
        for entity in entities {
            transport.seed(entity);
        }
        transport
    }

    pub fn seed(&self, entity: Entity) {
        self.entities.lock().unwrap().insert(entity.id(), entity);
    }

    /// Marks an id so its next requests fail with a network error.
    pub fn fail(&self, id: i64) {
        self.fail_ids.lock().unwrap().insert(id);
    }

    pub fn get(&self, id: i64) -> Option<Entity> {
        self.entities.lock().unwrap().get(&id).cloned()
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_fail(&self, id: i64) -> Result<()> {
        if self.fail_ids.lock().unwrap().contains(&id) {
            return Err(AppError::Network(format!("simulated failure for {}", id)));
        }
        Ok(())
    }

    fn apply_patch(entity: &mut Entity, patch: &EntityPatch) -> Result<()> {
        if let Some(status) = &patch.status {
            match entity {
                Entity::Transcript(t) => t.status = status.parse()?,
                Entity::Insight(i) => i.status = status.parse()?,
                Entity::Post(p) => p.status = status.parse()?,
            }
        }
        if let Entity::Post(p) = entity {
            if let Some(scheduled_for) = patch.scheduled_for {
                p.scheduled_for = scheduled_for;
            }
            if let Some(title) = &patch.title {
                p.title = title.clone();
            }
            if let Some(content) = &patch.content {
                p.content = content.clone();
            }
            if let Some(char_count) = patch.char_count {
                p.char_count = char_count;
            }
        }
        Ok(())
    }
}

impl ApiTransport for MockTransport {
    async fn list(&self, kind: EntityKind, query: &EntityQuery) -> Result<EntityPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let mut matching: Vec<Entity> = self
            .entities
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.kind() == kind)
            .filter(|e| {
                query
                    .status
                    .as_deref()
                    .map_or(true, |s| e.status_name() == s)
            })
            .filter(|e| query.facet.as_deref().map_or(true, |f| e.facet() == f))
            .filter(|e| {
                query
                    .search
                    .as_deref()
                    .map_or(true, |s| e.title().to_lowercase().contains(&s.to_lowercase()))
            })
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.id());

        let total = matching.len() as u64;
        let limit = query.limit.unwrap_or(matching.len().max(1) as u32);
        let offset = query.offset.unwrap_or(0) as usize;
        let page = if limit > 0 { offset as u32 / limit } else { 0 };
        let total_pages = ((total as f64) / (limit.max(1) as f64)).ceil() as u32;

        let entities: Vec<Entity> = matching
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect();

        Ok(EntityPage {
            entities,
            page,
            total,
            total_pages,
        })
    }

    async fn update(&self, _kind: EntityKind, id: i64, patch: &EntityPatch) -> Result<Entity> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail(id)?;

        let mut entities = self.entities.lock().unwrap();
        let entity = entities
            .get_mut(&id)
            .ok_or_else(|| AppError::Api(format!("entity {} not found", id)))?;
        Self::apply_patch(entity, patch)?;
        match entity {
            Entity::Transcript(t) => t.updated_at = Utc::now(),
            Entity::Insight(i) => i.updated_at = Utc::now(),
            Entity::Post(p) => p.updated_at = Utc::now(),
        }
        Ok(entity.clone())
    }

    async fn schedule(&self, id: i64, scheduled_for: DateTime<Utc>) -> Result<Post> {
        self.check_fail(id)?;

        let mut entities = self.entities.lock().unwrap();
        match entities.get_mut(&id) {
            Some(Entity::Post(p)) => {
                p.scheduled_for = Some(scheduled_for);
                p.status = PostStatus::Scheduled;
                p.updated_at = Utc::now();
                Ok(p.clone())
            }
            Some(_) => Err(AppError::Api(format!("entity {} is not a post", id))),
            None => Err(AppError::Api(format!("post {} not found", id))),
        }
    }

    async fn delete(&self, _kind: EntityKind, id: i64) -> Result<()> {
        self.check_fail(id)?;
        self.entities.lock().unwrap().remove(&id);
        Ok(())
    }
}
