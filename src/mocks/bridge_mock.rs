use async_trait::async_trait;
use alloy::primitives::Address;
use dashmap::{DashMap, DashSet};

use crate::providers::{BridgeCostEstimate, BridgeQuoteProvider, ProviderError, ProviderResult};
use crate::types::Chain;

/// Canned bridge quotes: a flat base fee plus a proportional component
/// per route. Routes can be marked unavailable.
pub struct MockBridgeQuoteProvider {
    base_fees: DashMap<(Chain, Chain), BridgeCostEstimate>,
    proportional_fee_bps: f64,
    unavailable_routes: DashSet<(Chain, Chain)>,
    failing: DashSet<Chain>,
}

impl MockBridgeQuoteProvider {
    pub fn new(proportional_fee_bps: f64) -> Self {
        Self {
            base_fees: DashMap::new(),
            proportional_fee_bps,
            unavailable_routes: DashSet::new(),
            failing: DashSet::new(),
        }
    }

    /// 모든 체인 쌍에 그럴듯한 기본 견적을 깔아둔 프리셋 (5bps 비례 수수료).
    pub fn default_routes() -> Self {
        let provider = Self::new(5.0);
        for from in Chain::all() {
            for to in Chain::all() {
                if from != to {
                    provider.set_route(
                        *from,
                        *to,
                        BridgeCostEstimate {
                            fees_usd: 3.0,
                            gas_usd: 2.0,
                            execution_seconds: 300,
                        },
                    );
                }
            }
        }
        provider
    }

    pub fn set_route(&self, from: Chain, to: Chain, estimate: BridgeCostEstimate) {
        self.base_fees.insert((from, to), estimate);
    }

    pub fn set_route_unavailable(&self, from: Chain, to: Chain) {
        self.unavailable_routes.insert((from, to));
    }

    pub fn fail_chain(&self, chain: Chain) {
        self.failing.insert(chain);
    }
}

#[async_trait]
impl BridgeQuoteProvider for MockBridgeQuoteProvider {
    async fn quote(
        &self,
        from: Chain,
        to: Chain,
        _token: Address,
        amount_usd: f64,
    ) -> ProviderResult<Option<BridgeCostEstimate>> {
        if self.failing.contains(&from) || self.failing.contains(&to) {
            return Err(ProviderError::NetworkError("mock bridge offline".into()));
        }
        if self.unavailable_routes.contains(&(from, to)) {
            return Ok(None);
        }

        let Some(base) = self.base_fees.get(&(from, to)) else {
            return Err(ProviderError::UnsupportedRoute { from, to });
        };

        let proportional = amount_usd.max(0.0) * self.proportional_fee_bps / 10_000.0;
        Ok(Some(BridgeCostEstimate {
            fees_usd: base.fees_usd + proportional,
            gas_usd: base.gas_usd,
            execution_seconds: base.execution_seconds,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_quote_scales_with_amount() {
        let provider = MockBridgeQuoteProvider::default_routes();
        let small = provider
            .quote(Chain::Ethereum, Chain::Arbitrum, Address::ZERO, 1_000.0)
            .await
            .unwrap()
            .unwrap();
        let large = provider
            .quote(Chain::Ethereum, Chain::Arbitrum, Address::ZERO, 100_000.0)
            .await
            .unwrap()
            .unwrap();
        assert!(large.fees_usd > small.fees_usd);
        assert_eq!(small.gas_usd, large.gas_usd);
    }

    #[tokio::test]
    async fn test_unavailable_route_is_none_not_error() {
        let provider = MockBridgeQuoteProvider::default_routes();
        provider.set_route_unavailable(Chain::Ethereum, Chain::Polygon);

        let quote = provider
            .quote(Chain::Ethereum, Chain::Polygon, Address::ZERO, 1_000.0)
            .await
            .unwrap();
        assert!(quote.is_none());
    }
}
