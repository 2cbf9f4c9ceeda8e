//! 체인별 실행 가격 수집
//!
//! 체인들은 서로 독립적으로 병렬 조회된다. 한 체인의 실패가 다른
//! 체인을 막지 않으며, 실패한 체인은 available=false로 기록되어
//! 비용 탐색에서 제외될 뿐 치명적 에러가 아니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::common::formatting::u256_to_f64;
use crate::constants::SWAP_GAS_UNITS;
use crate::providers::{ChainDataProvider, ProviderError, ProviderResult};
use crate::types::{Chain, ChainPricing};

pub struct PricingFetcher {
    chain_data: Arc<dyn ChainDataProvider>,
    timeout: Duration,
}

impl PricingFetcher {
    pub fn new(chain_data: Arc<dyn ChainDataProvider>, timeout: Duration) -> Self {
        Self { chain_data, timeout }
    }

    /// 모든 체인을 동시 조회하고 합류한다.
    pub async fn fetch_all(&self, chains: &[Chain]) -> Vec<ChainPricing> {
        join_all(chains.iter().map(|chain| self.fetch_one(*chain))).await
    }

    async fn fetch_one(&self, chain: Chain) -> ChainPricing {
        match self.try_fetch(chain).await {
            Ok(pricing) => pricing,
            Err(e) => {
                warn!("⚠️ {} 가격 조회 실패, 탐색에서 제외: {}", chain, e);
                ChainPricing::unavailable(chain)
            }
        }
    }

    async fn try_fetch(&self, chain: Chain) -> ProviderResult<ChainPricing> {
        if !self.chain_data.chain_available(chain).await {
            return Err(ProviderError::ChainUnavailable(chain));
        }

        let gas_price_wei = self
            .with_retry(|| self.chain_data.get_gas_price(chain))
            .await?;
        let native_price_usd = self
            .with_retry(|| self.chain_data.get_native_price_usd(chain))
            .await?;
        let liquidity_depth_usd = self
            .with_retry(|| self.chain_data.get_liquidity_depth_usd(chain))
            .await?;

        let swap_gas_cost_usd =
            u256_to_f64(gas_price_wei) * SWAP_GAS_UNITS as f64 / 1e18 * native_price_usd;

        let pricing = ChainPricing {
            chain,
            gas_price_wei,
            swap_gas_cost_usd,
            sandwich_gas_cost_usd: swap_gas_cost_usd * 2.0,
            safe_threshold_usd: (liquidity_depth_usd * 0.001).max(100.0),
            liquidity_depth_usd,
            available: true,
        };
        debug!(
            "⛽ {} 스왑 가스 ${:.2}, 깊이 ${:.0}",
            chain, pricing.swap_gas_cost_usd, pricing.liquidity_depth_usd
        );
        Ok(pricing)
    }

    /// 타임아웃 + 1회 재시도 후 강등. 어떤 조회도 무한정 막히지 않는다.
    async fn with_retry<T, F, Fut>(&self, mut call: F) -> ProviderResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProviderResult<T>>,
    {
        let mut last_error = ProviderError::Timeout(self.timeout.as_millis() as u64);
        for _attempt in 0..2 {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_error = e,
                Err(_) => {
                    last_error = ProviderError::Timeout(self.timeout.as_millis() as u64);
                }
            }
        }
        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockChainDataProvider;

    #[tokio::test]
    async fn test_all_chains_priced_in_parallel() {
        let provider = Arc::new(MockChainDataProvider::mainnet_defaults());
        let fetcher = PricingFetcher::new(provider, Duration::from_millis(500));

        let pricing = fetcher.fetch_all(Chain::all()).await;
        assert_eq!(pricing.len(), Chain::all().len());
        assert!(pricing.iter().all(|p| p.available));

        let ethereum = pricing.iter().find(|p| p.chain == Chain::Ethereum).unwrap();
        // 30 gwei * 200k gas * $2500 = $15
        assert!((ethereum.swap_gas_cost_usd - 15.0).abs() < 0.01);
        assert!((ethereum.sandwich_gas_cost_usd - 30.0).abs() < 0.02);
    }

    #[tokio::test]
    async fn test_one_failed_chain_does_not_block_the_rest() {
        let provider = Arc::new(MockChainDataProvider::mainnet_defaults());
        provider.fail_chain(Chain::Polygon);
        let fetcher = PricingFetcher::new(provider, Duration::from_millis(500));

        let pricing = fetcher.fetch_all(Chain::all()).await;
        let polygon = pricing.iter().find(|p| p.chain == Chain::Polygon).unwrap();
        assert!(!polygon.available);
        assert_eq!(pricing.iter().filter(|p| p.available).count(), 4);
    }
}
