//! Page cache and prefetch management.
//!
//! Consumes a [`DataLoadPlan`] and keeps a bounded window of prefetched
//! pages around the user's position. Cache entries are keyed by
//! (kind, page index, filter signature); a fetch issued under old filters
//! completes into a key nobody reads, so late results never clobber the
//! active view. The debounce timer and all pending prefetch tasks hang
//! off cancellation tokens owned here and released by `dispose()`.


use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiTransport, EntityQuery};
use crate::entities::{Entity, EntityKind};
use crate::error::Result;
use crate::strategy::DataLoadPlan;

/// Delay before a navigation actually issues prefetches, so rapid paging
/// does not turn into a fetch storm.
pub const PREFETCH_DEBOUNCE_MS: u64 = 300;

// ============================================================================
// Page cache
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub kind: EntityKind,
    pub page: u32,
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct CachedPage {
    pub entities: Vec<Entity>,
    pub total: u64,
    pub total_pages: u32,
    pub fetched_at: Instant,
}

/// (kind, page, signature)-keyed page store with passive expiry.
pub struct PageCache {
    entries: HashMap<PageKey, CachedPage>,
    cache_time: Duration,
}

impl PageCache {
    pub fn new(cache_time_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            cache_time: Duration::from_millis(cache_time_ms),
        }
    }

    pub fn set_cache_time(&mut self, cache_time_ms: u64) {
        self.cache_time = Duration::from_millis(cache_time_ms);
    }

    /// Returns the entry unless it has passively expired; an expired
    /// entry reads as a miss so the caller refetches instead of serving
    /// stale data.
    pub fn get_fresh(&self, key: &PageKey) -> Option<CachedPage> {
        self.entries
            .get(key)
            .filter(|page| page.fetched_at.elapsed() < self.cache_time)
            .cloned()
    }

    pub fn contains_fresh(&self, key: &PageKey) -> bool {
        self.get_fresh(key).is_some()
    }

    pub fn insert(&mut self, key: PageKey, page: CachedPage) {
        self.entries.insert(key, page);
    }

    /// Id-keyed overwrite in every cached page that contains the entity —
    /// how optimistic values and authoritative server values are
    /// reconciled into the view.
    pub fn apply_entity(&mut self, entity: &Entity) {
        for (key, page) in self.entries.iter_mut() {
            if key.kind != entity.kind() {
                continue;
            }
            for slot in page.entities.iter_mut() {
                if slot.id() == entity.id() {
                    *slot = entity.clone();
                }
            }
        }
    }

    pub fn remove_entity(&mut self, kind: EntityKind, id: i64) {
        for (key, page) in self.entries.iter_mut() {
            if key.kind == kind {
                page.entities.retain(|e| e.id() != id);
            }
        }
    }

    pub fn purge(&mut self, key: &PageKey) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub type SharedPageCache = Arc<RwLock<PageCache>>;

pub fn shared_cache(cache_time_ms: u64) -> SharedPageCache {
    Arc::new(RwLock::new(PageCache::new(cache_time_ms)))
}

// ============================================================================
// Prefetch manager
// ============================================================================

struct ManagerState {
    kind: EntityKind,
    query: EntityQuery,
    signature: String,
    plan: DataLoadPlan,
    current_page: u32,
    last_total_pages: u32,
    /// Pages known to be prefetched under the current signature; bounded
    /// at 4×prefetch_distance by eviction.
    prefetched: HashSet<u32>,
    debounce_token: Option<CancellationToken>,
}

/// Owns the prefetch window for one entity view. Navigation goes through
/// [`PrefetchManager::page`]; everything else is plumbing around it.
pub struct PrefetchManager<T: ApiTransport> {
    transport: Arc<T>,
    cache: SharedPageCache,
    state: Mutex<ManagerState>,
    root: CancellationToken,
    debounce: Duration,
}

impl<T: ApiTransport> PrefetchManager<T> {
    pub fn new(
        transport: Arc<T>,
        cache: SharedPageCache,
        kind: EntityKind,
        plan: DataLoadPlan,
    ) -> Arc<Self> {
        Arc::new(Self {
            transport,
            cache,
            state: Mutex::new(ManagerState {
                kind,
                query: EntityQuery::default(),
                signature: EntityQuery::default().filter_signature(kind),
                plan,
                current_page: 0,
                last_total_pages: 0,
                prefetched: HashSet::new(),
                debounce_token: None,
            }),
            root: CancellationToken::new(),
            debounce: Duration::from_millis(PREFETCH_DEBOUNCE_MS),
        })
    }

    #[cfg(test)]
    fn with_debounce(
        transport: Arc<T>,
        cache: SharedPageCache,
        kind: EntityKind,
        plan: DataLoadPlan,
        debounce: Duration,
    ) -> Arc<Self> {
        let manager = Self::new(transport, cache, kind, plan);
        let mut manager = Arc::into_inner(manager).expect("freshly built manager is unshared");
        manager.debounce = debounce;
        Arc::new(manager)
    }

    /// Swaps the active filters. Invalidates the signature (in-flight
    /// prefetches complete into unread keys), cancels the pending
    /// debounce and resets the tracking window.
    pub fn set_query(&self, query: EntityQuery) {
        let mut state = self.state.lock().unwrap();
        state.signature = query.filter_signature(state.kind);
        state.query = query;
        state.current_page = 0;
        state.prefetched.clear();
        if let Some(token) = state.debounce_token.take() {
            token.cancel();
        }
    }

    /// Switches the view to another entity kind, with fresh filters.
    pub fn set_kind(&self, kind: EntityKind, query: EntityQuery) {
        {
            let mut state = self.state.lock().unwrap();
            state.kind = kind;
        }
        self.set_query(query);
    }

    /// Applies a recomputed load plan (total or device class changed).
    pub fn set_plan(&self, plan: DataLoadPlan) {
        let mut state = self.state.lock().unwrap();
        state.plan = plan;
        state.prefetched.clear();
    }

    pub fn plan(&self) -> DataLoadPlan {
        self.state.lock().unwrap().plan
    }

    /// Page count reported by the most recent navigation, for the pager.
    pub fn total_pages(&self) -> u32 {
        self.state.lock().unwrap().last_total_pages
    }

    /// Navigates to page `index`: serves the cached page when fresh,
    /// fetches otherwise, then schedules the prefetch window around it.
    pub async fn page(self: &Arc<Self>, index: u32) -> Result<CachedPage> {
        let (kind, query, signature, plan) = {
            let mut state = self.state.lock().unwrap();
            state.current_page = index;
            (
                state.kind,
                state.query.clone(),
                state.signature.clone(),
                state.plan,
            )
        };

        let key = PageKey {
            kind,
            page: index,
            signature: signature.clone(),
        };

        if let Some(hit) = self.cache.read().await.get_fresh(&key) {
            self.note_total_pages(hit.total_pages);
            self.schedule_prefetch(index, hit.total_pages);
            return Ok(hit);
        }

        let fetched = Self::fetch_page(&self.transport, kind, &query, plan, index).await?;
        self.cache.write().await.insert(key, fetched.clone());
        self.note_total_pages(fetched.total_pages);
        self.schedule_prefetch(index, fetched.total_pages);
        Ok(fetched)
    }

    fn note_total_pages(&self, total_pages: u32) {
        self.state.lock().unwrap().last_total_pages = total_pages;
    }

    async fn fetch_page(
        transport: &Arc<T>,
        kind: EntityKind,
        query: &EntityQuery,
        plan: DataLoadPlan,
        index: u32,
    ) -> Result<CachedPage> {
        let mut query = query.clone();
        if plan.should_paginate {
            query.limit = Some(plan.page_size);
            query.offset = Some(index * plan.page_size);
        } else {
            // Client strategy: the whole filtered collection is one page.
            query.limit = None;
            query.offset = None;
        }

        let page = transport.list(kind, &query).await?;
        Ok(CachedPage {
            entities: page.entities,
            total: page.total,
            total_pages: page.total_pages,
            fetched_at: Instant::now(),
        })
    }

    /// Debounced: reschedules on every navigation, so only a paused user
    /// actually triggers the window fetch.
    fn schedule_prefetch(self: &Arc<Self>, page: u32, total_pages: u32) {
        let child = {
            let mut state = self.state.lock().unwrap();
            if !state.plan.should_paginate {
                return;
            }
            if let Some(token) = state.debounce_token.take() {
                token.cancel();
            }
            let child = self.root.child_token();
            state.debounce_token = Some(child.clone());
            child
        };

        let manager = Arc::clone(self);
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(debounce) => {
                    manager.prefetch_window(page, total_pages).await;
                }
            }
        });
    }

    /// Fetches the next `prefetch_distance` pages plus the single
    /// previous page, concurrently, then evicts tracking entries that
    /// drifted too far from the current position.
    async fn prefetch_window(self: Arc<Self>, page: u32, total_pages: u32) {
        let (kind, query, signature, plan, known) = {
            let state = self.state.lock().unwrap();
            (
                state.kind,
                state.query.clone(),
                state.signature.clone(),
                state.plan,
                state.prefetched.clone(),
            )
        };

        let mut candidates: Vec<u32> = (1..=plan.prefetch_distance)
            .map(|step| page + step)
            .filter(|candidate| *candidate < total_pages)
            .collect();
        if let Some(previous) = page.checked_sub(1) {
            candidates.push(previous);
        }
        candidates.retain(|candidate| !known.contains(candidate));

        let mut fetches = Vec::new();
        for candidate in candidates {
            let key = PageKey {
                kind,
                page: candidate,
                signature: signature.clone(),
            };
            if self.cache.read().await.contains_fresh(&key) {
                continue;
            }
            let transport = Arc::clone(&self.transport);
            let cache = Arc::clone(&self.cache);
            let root = self.root.clone();
            let query = query.clone();
            fetches.push(async move {
                if root.is_cancelled() {
                    return None;
                }
                match Self::fetch_page(&transport, kind, &query, plan, candidate).await {
                    Ok(page) => {
                        // Keyed by the signature at issue time: if filters
                        // changed mid-flight this populates an unread key.
                        if !root.is_cancelled() {
                            cache.write().await.insert(key, page);
                        }
                        Some(candidate)
                    }
                    Err(e) => {
                        log::warn!("prefetch of page {} failed: {}", candidate, e);
                        None
                    }
                }
            });
        }

        let completed = join_all(fetches).await;

        let purge: Vec<PageKey> = {
            let mut state = self.state.lock().unwrap();
            if state.signature != signature {
                // Filters changed while fetching; results landed on
                // unread keys and the tracking reset already happened.
                return;
            }
            for candidate in completed.into_iter().flatten() {
                state.prefetched.insert(candidate);
            }

            // Bound the tracking set for long browsing sessions: past
            // 4×distance, drop pages farther than 2×distance from the
            // current position and purge their cache entries.
            if state.prefetched.len() > (plan.prefetch_distance * 4) as usize {
                let current = state.current_page;
                let max_distance = plan.prefetch_distance * 2;
                let far: Vec<u32> = state
                    .prefetched
                    .iter()
                    .copied()
                    .filter(|p| p.abs_diff(current) > max_distance)
                    .collect();
                for p in &far {
                    state.prefetched.remove(p);
                }
                far.iter()
                    .map(|p| PageKey {
                        kind,
                        page: *p,
                        signature: signature.clone(),
                    })
                    .collect()
            } else {
                Vec::new()
            }
        };

        if !purge.is_empty() {
            let mut cache = self.cache.write().await;
            for key in &purge {
                cache.purge(key);
            }
            log::debug!("evicted {} prefetched pages", purge.len());
        }
    }

    /// Releases the pending debounce timer and stops further prefetch
    /// issuance. In-flight network calls are not aborted; their results
    /// are dropped on arrival.
    pub fn dispose(&self) {
        self.root.cancel();
        let mut state = self.state.lock().unwrap();
        state.debounce_token = None;
    }
}
