use std::collections::HashMap;

use crate::core::{EntityId, Result, StoreError};
use crate::env::EnvironmentTag;

/// Configuration for one environment's datastore backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Human-readable backend label, used in diagnostics.
    pub label: String,

    /// First identifier the backend's id sequence hands out.
    pub id_seed: EntityId,
}

impl BackendConfig {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            id_seed: 1,
        }
    }

    /// Set the starting identifier for the backend's id sequence.
    pub fn id_seed(mut self, id_seed: EntityId) -> Self {
        self.id_seed = id_seed;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.label.is_empty() {
            return Err(StoreError::Configuration(
                "Backend label cannot be empty".to_string(),
            ));
        }

        if self.id_seed < 1 {
            return Err(StoreError::Configuration(
                "id_seed must be >= 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Per-environment backend configuration for the whole store.
///
/// An environment missing from this map is a deployment misconfiguration:
/// connecting to it fails fast with a configuration error and is never
/// retried.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    environments: HashMap<EnvironmentTag, BackendConfig>,
}

impl StoreConfig {
    /// Empty configuration; add environments with [`StoreConfig::environment`].
    pub fn new() -> Self {
        Self {
            environments: HashMap::new(),
        }
    }

    /// Both environments with default backends, the usual deployment shape.
    pub fn dual() -> Self {
        Self::new()
            .environment(EnvironmentTag::Dev, BackendConfig::new("dev"))
            .environment(EnvironmentTag::Prod, BackendConfig::new("prod"))
    }

    pub fn environment(mut self, tag: EnvironmentTag, config: BackendConfig) -> Self {
        self.environments.insert(tag, config);
        self
    }

    pub fn dev(self, config: BackendConfig) -> Self {
        self.environment(EnvironmentTag::Dev, config)
    }

    pub fn prod(self, config: BackendConfig) -> Self {
        self.environment(EnvironmentTag::Prod, config)
    }

    pub fn get(&self, tag: EnvironmentTag) -> Option<&BackendConfig> {
        self.environments.get(&tag)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.environments.is_empty() {
            return Err(StoreError::Configuration(
                "At least one environment must be configured".to_string(),
            ));
        }

        for config in self.environments.values() {
            config.validate()?;
        }

        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::dual()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dual_config() {
        let config = StoreConfig::dual();
        assert!(config.get(EnvironmentTag::Dev).is_some());
        assert!(config.get(EnvironmentTag::Prod).is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = StoreConfig::new()
            .dev(BackendConfig::new("dev-box").id_seed(1000))
            .prod(BackendConfig::new("prod-box"));

        assert_eq!(config.get(EnvironmentTag::Dev).unwrap().id_seed, 1000);
        assert_eq!(config.get(EnvironmentTag::Prod).unwrap().label, "prod-box");
    }

    #[test]
    fn test_validate() {
        assert!(StoreConfig::new().validate().is_err());

        let empty_label = StoreConfig::new().dev(BackendConfig::new(""));
        assert!(empty_label.validate().is_err());

        let bad_seed = StoreConfig::new().dev(BackendConfig::new("dev").id_seed(0));
        assert!(bad_seed.validate().is_err());
    }
}
