// Engine configuration, loaded from JSON with every field optional

use std::path::Path;

use serde::Deserialize;

use crate::{
    error::ConfigError,
    route_cache::RouteKey,
    route_computer::{SearchConstraints, MAX_HOPS_LIMIT},
};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchDefaults,
    pub max_hops_limit: u32,
    // 0 disables the timer; rebuilds then run on explicit triggers only
    pub rebuild_interval_secs: u64,
    pub inventory_timeout_ms: u64,
    pub warm: WarmConfig,
    pub notification_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search: SearchDefaults::default(),
            max_hops_limit: 4,
            rebuild_interval_secs: 300,
            inventory_timeout_ms: 5000,
            warm: WarmConfig::default(),
            notification_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub max_hops: u32,
    pub min_connection_minutes: i64,
    pub max_connection_minutes: i64,
    pub min_seats: i64,
}

impl Default for SearchDefaults {
    fn default() -> Self {
        let constraints = SearchConstraints::default();
        Self {
            max_hops: constraints.max_hops,
            min_connection_minutes: constraints.min_connection_minutes,
            max_connection_minutes: constraints.max_connection_minutes,
            min_seats: constraints.min_seats,
        }
    }
}

impl SearchDefaults {
    pub fn constraints(&self) -> SearchConstraints {
        SearchConstraints {
            max_hops: self.max_hops,
            min_connection_minutes: self.min_connection_minutes,
            max_connection_minutes: self.max_connection_minutes,
            min_seats: self.min_seats,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WarmConfig {
    pub pairs: Vec<RouteKey>,
    pub recent_capacity: usize,
}

impl Default for WarmConfig {
    fn default() -> Self {
        Self {
            pairs: vec![],
            recent_capacity: 64,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hops_limit == 0 || self.max_hops_limit > MAX_HOPS_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_hops_limit must be between 1 and {}",
                MAX_HOPS_LIMIT
            )));
        }
        if self.inventory_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "inventory_timeout_ms must be positive".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid(
                "notification_capacity must be positive".to_string(),
            ));
        }

        self.search
            .constraints()
            .validate(self.max_hops_limit)
            .map_err(|e| ConfigError::Invalid(format!("search defaults: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.constraints(), SearchConstraints::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{
                "search": { "min_connection_minutes": 45 },
                "rebuild_interval_secs": 0,
                "warm": { "pairs": [{ "source": "LHR", "destination": "JFK" }] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.search.min_connection_minutes, 45);
        assert_eq!(config.search.max_hops, 2);
        assert_eq!(config.rebuild_interval_secs, 0);
        assert_eq!(config.warm.pairs, vec![RouteKey::new("LHR", "JFK")]);
        assert_eq!(config.warm.recent_capacity, 64);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "max_hops_limit": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{ "search": { "max_hops": 5 } }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::load("/definitely/missing/engine.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
