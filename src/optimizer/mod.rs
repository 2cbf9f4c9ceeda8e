//! 실행 채널 최적화기
//!
//! 체인별 실시간 가스/유동성, AMM 곡률 기반 릴레이 비용 모델,
//! 프로파일러의 위험 승수를 결합해 (프라이빗 비율 × 퍼블릭 청크 수)
//! 격자에서 최저 총비용 계획을 찾는다.

pub mod pricing;
pub mod relay_cost;
pub mod search;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::TtlCache;
use crate::providers::{BridgeQuoteProvider, ChainDataProvider};
use crate::types::{Chain, ExecutionPolicy, OptimizerOutcome, PoolMevProfile};

pub use pricing::PricingFetcher;
pub use search::{HybridSearch, SearchContext};

/// 최적화기 설정. 릴레이 모델 상수와 격자/가드 파라미터.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Coefficient on the quadratic arbitrage the trade's distortion creates.
    pub arb_coefficient: f64,
    /// Fraction of the theoretical arbitrage a searcher captures.
    pub searcher_capture: f64,
    /// Fixed gas floor netted out of the searcher's capture, USD.
    pub searcher_gas_floor_usd: f64,
    /// Fraction of net capture the searcher bids to the builder.
    pub builder_bid_fraction: f64,
    /// Premium over the competing bid the user pays for inclusion.
    pub inclusion_premium: f64,
    pub min_relay_tip_usd: f64,
    /// Per-chunk quadratic MEV model coefficient.
    pub chunk_mev_coefficient: f64,
    /// Priority-fee competition factor for later public chunks.
    pub gas_escalation_volatility: f64,
    /// Per-block price volatility for the timing-risk term.
    pub per_block_volatility: f64,
    pub liquidity_hard_fraction: f64,
    pub liquidity_warn_fraction: f64,
    /// Skip the grid when MEV is below this multiple of one swap's gas.
    pub early_exit_gas_multiple: f64,
    pub private_ratio_steps: usize,
    /// Cosmetic chunk-size variance; never relied on for safety.
    pub chunk_jitter: bool,
    pub bridge_quote_ttl_secs: u64,
    pub pricing_timeout_ms: u64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            arb_coefficient: 0.5,
            searcher_capture: 0.8,
            searcher_gas_floor_usd: 15.0,
            builder_bid_fraction: 0.9,
            inclusion_premium: 0.15,
            min_relay_tip_usd: 2.0,
            chunk_mev_coefficient: 0.5,
            gas_escalation_volatility: 0.1,
            per_block_volatility: 0.002,
            liquidity_hard_fraction: 0.15,
            liquidity_warn_fraction: 0.05,
            early_exit_gas_multiple: 2.0,
            private_ratio_steps: 10,
            chunk_jitter: false,
            bridge_quote_ttl_secs: 300,
            pricing_timeout_ms: 1_500,
        }
    }
}

/// 가격 수집 + 브리지 견적 + 격자 탐색을 묶는 오케스트레이터.
pub struct ExecutionOptimizer {
    config: OptimizerConfig,
    pricing_fetcher: PricingFetcher,
    bridges: Arc<dyn BridgeQuoteProvider>,
    bridge_cache: TtlCache<(Chain, Chain), Option<f64>>,
}

impl ExecutionOptimizer {
    pub fn new(
        chain_data: Arc<dyn ChainDataProvider>,
        bridges: Arc<dyn BridgeQuoteProvider>,
        config: OptimizerConfig,
    ) -> Self {
        let pricing_fetcher = PricingFetcher::new(
            chain_data,
            Duration::from_millis(config.pricing_timeout_ms),
        );
        let bridge_cache = TtlCache::new(Duration::from_secs(config.bridge_quote_ttl_secs));
        Self { config, pricing_fetcher, bridges, bridge_cache }
    }

    pub async fn optimize(
        &self,
        trade_usd: Decimal,
        home_chain: Chain,
        token: Address,
        unmitigated_mev_usd: f64,
        profile: &PoolMevProfile,
        policy: &ExecutionPolicy,
    ) -> OptimizerOutcome {
        let pricing = self.pricing_fetcher.fetch_all(Chain::all()).await;

        let bridge_costs = self
            .collect_bridge_costs(trade_usd, home_chain, token, &pricing)
            .await;

        let search = HybridSearch::new(self.config.clone());
        let ctx = SearchContext {
            trade_usd,
            home_chain,
            unmitigated_mev_usd,
            profile,
            pricing: &pricing,
            policy,
            bridge_costs: &bridge_costs,
        };
        search.optimize(&ctx)
    }

    /// 사용 가능한 외부 체인마다 전체 거래 금액 기준 브리지 비용을
    /// 견적한다. 견적 불가 경로는 맵에서 빠져 청크 배치 대상에서
    /// 제외될 뿐이다. 견적은 TTL 캐시된다.
    async fn collect_bridge_costs(
        &self,
        trade_usd: Decimal,
        home_chain: Chain,
        token: Address,
        pricing: &[crate::types::ChainPricing],
    ) -> HashMap<Chain, f64> {
        use rust_decimal::prelude::ToPrimitive;
        let trade_f = trade_usd.to_f64().unwrap_or(0.0);

        let mut costs = HashMap::new();
        for entry in pricing.iter().filter(|p| p.available && p.chain != home_chain) {
            let to = entry.chain;
            let quoted = self
                .bridge_cache
                .get_or_compute((home_chain, to), || async {
                    match self.bridges.quote(home_chain, to, token, trade_f).await {
                        Ok(Some(estimate)) => {
                            debug!(
                                "🌉 {} → {} 브리지 견적 ${:.2}",
                                home_chain,
                                to,
                                estimate.total_usd()
                            );
                            Ok::<_, std::convert::Infallible>(Some(estimate.total_usd()))
                        }
                        Ok(None) => Ok(None),
                        Err(e) => {
                            warn!("⚠️ {} → {} 브리지 견적 실패: {}", home_chain, to, e);
                            Ok(None)
                        }
                    }
                })
                .await
                .unwrap_or(None);

            if let Some(cost) = quoted {
                costs.insert(to, cost);
            }
        }
        costs
    }
}
