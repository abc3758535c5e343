//! Process configuration, assembled from each crate's `from_env`.

use crate::client::ClientConfig;
use crate::core::CoordinatorConfig;
use crate::logging::LogConfig;

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub coordinator: CoordinatorConfig,
    pub log: LogConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            client: ClientConfig::from_env(),
            coordinator: CoordinatorConfig::from_env(),
            log: LogConfig::from_env(),
        }
    }
}
