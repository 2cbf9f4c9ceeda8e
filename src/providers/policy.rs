use async_trait::async_trait;
use alloy::primitives::Address;
use dashmap::DashMap;

use crate::types::ExecutionPolicy;

use super::traits::{PolicyProvider, ProviderResult};

/// 인메모리 정책 제공자. 트레이더별 오버라이드가 없으면 기본 정책을
/// 돌려주며, 모든 정책은 반환 전에 안전 범위로 클램핑된다.
pub struct StaticPolicyProvider {
    default_policy: ExecutionPolicy,
    overrides: DashMap<Address, ExecutionPolicy>,
}

impl StaticPolicyProvider {
    pub fn new(default_policy: ExecutionPolicy) -> Self {
        Self {
            default_policy: default_policy.clamped(),
            overrides: DashMap::new(),
        }
    }

    pub fn set_policy(&self, trader: Address, policy: ExecutionPolicy) {
        self.overrides.insert(trader, policy);
    }
}

impl Default for StaticPolicyProvider {
    fn default() -> Self {
        Self::new(ExecutionPolicy::default())
    }
}

#[async_trait]
impl PolicyProvider for StaticPolicyProvider {
    async fn get_policy(&self, trader: Address) -> ProviderResult<ExecutionPolicy> {
        let policy = self
            .overrides
            .get(&trader)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(|| self.default_policy.clone());
        Ok(policy.clamped())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskProfile;

    #[tokio::test]
    async fn test_default_policy_when_unset() {
        let provider = StaticPolicyProvider::default();
        let policy = provider.get_policy(Address::ZERO).await.unwrap();
        assert_eq!(policy, ExecutionPolicy::default());
    }

    #[tokio::test]
    async fn test_override_is_clamped_on_read() {
        let provider = StaticPolicyProvider::default();
        let trader = Address::repeat_byte(0xAA);
        provider.set_policy(
            trader,
            ExecutionPolicy {
                private_threshold_usd: 1.0, // below documented minimum
                split_enabled: false,
                risk_profile: RiskProfile::Conservative,
                max_chunks: 99,
                slippage_tolerance_bps: 5,
            },
        );

        let policy = provider.get_policy(trader).await.unwrap();
        assert_eq!(
            policy.private_threshold_usd,
            ExecutionPolicy::MIN_PRIVATE_THRESHOLD_USD
        );
        assert_eq!(policy.max_chunks, ExecutionPolicy::MAX_CHUNK_LIMIT);
        assert!(!policy.split_enabled);
    }
}
