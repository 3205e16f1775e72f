//! Application state

use std::sync::Arc;

use crate::config::Config;
use crate::registry::Registry;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry: Arc::new(Registry::seeded()),
        })
    }
}
