use serde::{Deserialize, Serialize};
use anyhow::Result;

use crate::optimizer::OptimizerConfig;
use crate::profiler::ProfilerConfig;
use crate::simulator::SimulatorConfig;
use crate::types::{Chain, ExecutionPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    pub chain: Chain,
    pub rpc_url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Per-call budget for any single provider round trip.
    pub provider_timeout_ms: u64,
    /// 이력 프로파일 캐시 우회 플래그 (운영 진단용)
    #[serde(default)]
    pub bypass_profile_cache: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 1_500,
            bypass_profile_cache: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    pub core: CoreConfig,
    pub simulator: SimulatorConfig,
    pub profiler: ProfilerConfig,
    pub optimizer: OptimizerConfig,
    /// Policy applied when the policy provider has nothing for a trader.
    pub default_policy: ExecutionPolicy,
    pub chains: Vec<ChainSettings>,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            simulator: SimulatorConfig::default(),
            profiler: ProfilerConfig::default(),
            optimizer: OptimizerConfig::default(),
            default_policy: ExecutionPolicy::default(),
            chains: Chain::all()
                .iter()
                .map(|chain| ChainSettings {
                    chain: *chain,
                    rpc_url: format!(
                        "https://{}.example-rpc.com/v2/YOUR_API_KEY",
                        chain.name().to_lowercase()
                    ),
                    enabled: true,
                })
                .collect(),
        }
    }
}

impl ShieldConfig {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let mut config: ShieldConfig = toml::from_str(&content)?;
        config.apply_env_overrides();
        config.default_policy = config.default_policy.clone().clamped();
        Ok(config)
    }

    /// 민감하거나 자주 바꾸는 값들은 환경 변수로 덮어쓴다.
    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var("SHIELD_PROVIDER_TIMEOUT_MS") {
            if let Ok(value) = raw.parse::<u64>() {
                self.core.provider_timeout_ms = value;
            }
        }
        if let Ok(raw) = std::env::var("SHIELD_PROFILE_CACHE_TTL_SECS") {
            if let Ok(value) = raw.parse::<u64>() {
                self.profiler.cache_ttl_secs = value;
            }
        }
        if let Ok(raw) = std::env::var("SHIELD_CHUNK_JITTER") {
            if let Ok(value) = raw.parse::<bool>() {
                self.optimizer.chunk_jitter = value;
            }
        }
    }

    pub fn load_test_config() -> Self {
        let mut config = Self::default();
        config.core.provider_timeout_ms = 200;
        config.profiler.cache_ttl_secs = 1;
        config
    }

    pub fn enabled_chains(&self) -> Vec<Chain> {
        self.chains
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.chain)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_complete() {
        let config = ShieldConfig::default();
        assert_eq!(config.chains.len(), Chain::all().len());
        assert!(config.core.provider_timeout_ms > 0);
        assert!(!config.core.bypass_profile_cache);
    }

    #[tokio::test]
    async fn test_round_trips_through_toml() {
        let config = ShieldConfig::default();
        let serialized = toml::to_string(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serialized.as_bytes()).unwrap();

        let loaded = ShieldConfig::load(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(loaded.core.provider_timeout_ms, config.core.provider_timeout_ms);
        assert_eq!(loaded.chains.len(), config.chains.len());
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        assert!(ShieldConfig::load("/nonexistent/shield.toml").await.is_err());
    }
}
