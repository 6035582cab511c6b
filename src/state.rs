use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::SpotStore;

/// Shared handler state: the spot store and the effective configuration
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SpotStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: Arc<dyn SpotStore>, config: AppConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}
