//! Engine configuration.
//!
//! Fixed for the lifetime of the process; every auction created by the
//! registry copies what it needs from here.

use gavel_types::{catalog::default_catalog, Item};
use thiserror::Error;

/// Quiet period a lot stays open after the latest valid bid.
pub const DEFAULT_BID_WINDOW_MS: u64 = 30_000;

/// Configuration for the auction engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sliding bid window in milliseconds: every accepted bid pushes the
    /// lot's deadline this far into the future.
    pub bid_window_ms: u64,
    /// The item catalog each auction draws from (shuffled per auction).
    pub catalog: Vec<Item>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bid_window_ms: DEFAULT_BID_WINDOW_MS,
            catalog: default_catalog(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bid_window_ms == 0 {
            return Err(ConfigError::ZeroBidWindow);
        }
        if self.catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if let Some(item) = self.catalog.iter().find(|item| item.base_price == 0) {
            return Err(ConfigError::ZeroBasePrice(item.name.clone()));
        }
        Ok(())
    }
}

/// Errors that can occur validating an [`EngineConfig`].
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Bid window cannot be zero")]
    ZeroBidWindow,

    #[error("Catalog cannot be empty")]
    EmptyCatalog,

    #[error("Catalog item has zero base price: {0}")]
    ZeroBasePrice(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_bid_window_rejected() {
        let config = EngineConfig {
            bid_window_ms: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroBidWindow)));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        let config = EngineConfig {
            catalog: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyCatalog)));
    }

    #[test]
    fn test_zero_base_price_rejected() {
        let config = EngineConfig {
            catalog: vec![Item::new("Free Agent", 0)],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroBasePrice(name)) if name == "Free Agent"
        ));
    }
}
