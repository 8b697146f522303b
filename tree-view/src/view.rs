use log::{error, info};
use referral_shared::api::ReferralApi;
use referral_shared::config::ClientConfig;
use referral_shared::error::ApiError;
use referral_shared::models::{Forest, InvitationNode};
use referral_shared::stats::TreeStats;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::ForestCache;
use crate::render::render_outline;

#[derive(Error, Debug)]
pub enum TreeViewError {
    #[error("Failed to load invitation tree: {0}")]
    Fetch(#[from] ApiError),
}

/// The invitation tree as shown to the user, with its statistics.
///
/// Loads once on `mount` and again whenever the reload key changes. A
/// failed load keeps whatever was shown before.
pub struct TreeView<A: ReferralApi> {
    api: Arc<A>,
    cache: Arc<ForestCache>,
    title: String,
    forest: Arc<Forest>,
    stats: TreeStats,
    reload_key: Option<u64>,
}

impl<A: ReferralApi> TreeView<A> {
    pub fn new(api: Arc<A>, cache: Arc<ForestCache>, config: &ClientConfig) -> Self {
        Self {
            api,
            cache,
            title: config.tree_title.clone(),
            forest: Arc::default(),
            stats: TreeStats::default(),
            reload_key: None,
        }
    }

    pub async fn mount(&mut self, reload_key: u64) -> Result<(), TreeViewError> {
        self.reload_key = Some(reload_key);
        self.load().await
    }

    /// Refetches (bypassing the cache) if `reload_key` differs from the
    /// last one. Returns whether a reload happened.
    pub async fn set_reload_key(&mut self, reload_key: u64) -> Result<bool, TreeViewError> {
        if self.reload_key == Some(reload_key) {
            return Ok(false);
        }

        info!("Reload key changed to {}, refetching tree", reload_key);
        self.reload_key = Some(reload_key);
        self.cache.invalidate();
        self.load().await?;
        Ok(true)
    }

    /// Reads through the cache; only hits the API if the cache was
    /// invalidated or expired.
    pub async fn refresh(&mut self) -> Result<(), TreeViewError> {
        self.load().await
    }

    pub fn forest(&self) -> &[InvitationNode] {
        &self.forest
    }

    pub fn stats(&self) -> TreeStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.forest.is_empty()
    }

    pub fn render(&self) -> String {
        render_outline(&self.title, &self.forest, &self.stats)
    }

    async fn load(&mut self) -> Result<(), TreeViewError> {
        match self.cache.get(self.api.as_ref()).await {
            Ok(forest) => {
                self.stats = TreeStats::from_forest(&forest);
                self.forest = forest;
                Ok(())
            }
            Err(e) => {
                error!("Could not load invitation tree: {}", e);
                Err(e.into())
            }
        }
    }
}
