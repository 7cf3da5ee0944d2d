use std::{sync::Arc, time::Duration};

use marquee_dal::Pool;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner { pool, app_config }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub version: String,
    /// Request bodies above this size are rejected
    pub max_body_bytes: usize,
    pub query_timeout: Duration,
}
