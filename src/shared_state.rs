use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::services::engine::RecommendationEngine;
use crate::services::narrative::Narrator;

/// Read-only state shared by all handlers. Requests never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
    pub narrator: Arc<Narrator>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: &Config, narrator: Narrator) -> Self {
        Self {
            engine: Arc::new(RecommendationEngine::from_config(config)),
            narrator: Arc::new(narrator),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
