//! Postdeck pipeline core.
//!
//! The non-visual half of the content dashboard: transcripts are cleaned,
//! transcripts yield scored insights, insights yield social posts, and
//! posts get scheduled against external platforms. This crate owns the
//! status state machines, the selection algebra, the adaptive
//! load-strategy planning, the page prefetch cache, the optimistic
//! mutation coordinator and the scheduling time conversion; rendering,
//! routing and the platform publishers live elsewhere and talk to it
//! through [`App`] and the [`api::ApiTransport`] seam.

pub mod api;
pub mod config;
pub mod entities;
pub mod error;
pub mod mutation;
pub mod pages;
pub mod schedule;
pub mod selection;
pub mod session;
pub mod store;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testutil;

pub use api::{ApiTransport, EntityPage, EntityPatch, EntityQuery, HttpTransport, SortOrder};
pub use config::AppConfig;
pub use entities::{
    request_transition, AnyStatus, Entity, EntityKind, Insight, InsightStatus, Platform, Post,
    PostStatus, PostType, ScoreVector, SourceKind, Transcript, TranscriptStatus,
};
pub use error::{AppError, Result};
pub use mutation::{BulkAction, BulkOperationResult, MutationCoordinator};
pub use pages::{PrefetchManager, SharedPageCache};
pub use selection::SelectionSet;
pub use session::{PipelineSession, PipelineStats};
pub use store::{PrefsStore, ViewPreferences};
pub use strategy::{DataLoadPlan, DeviceClass, LoadStrategy, StrategyThresholds};

use std::sync::Arc;
use std::time::Duration;

/// The fully wired dashboard core: one session, one shared page cache,
/// one prefetch manager and one mutation coordinator over the same
/// transport. Construct once at startup, `dispose` at teardown.
pub struct App {
    pub config: AppConfig,
    pub prefs: Arc<PrefsStore>,
    pub session: PipelineSession,
    pub cache: SharedPageCache,
    pub pages: Arc<PrefetchManager<HttpTransport>>,
    pub mutations: MutationCoordinator<HttpTransport>,
}

impl App {
    /// Wires the core against the default preference store location.
    pub fn init(config: AppConfig) -> Result<Self> {
        let prefs = Arc::new(PrefsStore::open_default()?);
        Self::with_store(config, prefs)
    }

    pub fn with_store(config: AppConfig, prefs: Arc<PrefsStore>) -> Result<Self> {
        let device = config.device_class();
        let session = PipelineSession::new(
            Arc::clone(&prefs),
            device,
            config.strategy_thresholds,
            config.forced_strategy,
        );
        let plan = session.plan();

        let transport = Arc::new(HttpTransport::with_timeout(
            &config.api_base_url,
            Duration::from_secs(config.request_timeout_secs),
        ));
        let cache = pages::shared_cache(plan.cache_time_ms);
        let pages = PrefetchManager::new(
            Arc::clone(&transport),
            Arc::clone(&cache),
            session.active_kind(),
            plan,
        );
        let mutations = MutationCoordinator::new(transport, Arc::clone(&cache));

        log::info!(
            "postdeck core initialized: {:?} device, api {}, thresholds {}/{}/{}",
            device,
            config.api_base_url,
            config.strategy_thresholds.mobile,
            config.strategy_thresholds.tablet,
            config.strategy_thresholds.desktop,
        );

        Ok(Self {
            config,
            prefs,
            session,
            cache,
            pages,
            mutations,
        })
    }

    /// Releases pending timers and prefetch tasks. The preference store
    /// flushes on drop.
    pub fn dispose(&self) {
        self.pages.dispose();
        log::info!("postdeck core disposed");
    }
}
