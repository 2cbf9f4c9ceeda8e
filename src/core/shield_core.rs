//! 요청 오케스트레이터
//!
//! 인바운드 TradeIntent 하나를 받아 시뮬레이션 → 프로파일 → 최적화
//! → 전략 결정을 순서대로 돌리고 직렬화 가능한 TradeAssessment를
//! 돌려준다. 수급 실패는 어디서든 degraded 경로로 강등될 뿐, 이
//! 경로는 절대 호출자에게 에러를 던지지 않는다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use chrono::Utc;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::common::formatting::u256_to_f64;
use crate::config::ShieldConfig;
use crate::constants::{DEGRADED_ETH_PRICE_USD, DEGRADED_GAS_PRICE_GWEI};
use crate::decision::DecisionEngine;
use crate::optimizer::ExecutionOptimizer;
use crate::profiler::MevProfiler;
use crate::providers::{
    BridgeQuoteProvider, ChainDataProvider, PolicyProvider, ProviderError, ProviderResult,
    SwapHistoryProvider,
};
use crate::simulator::{PriceContext, SandwichSimulator};
use crate::types::{
    Channel, ChunkInstruction, ExecutionPolicy, PoolMevProfile, ReservePair,
    SandwichSimulationResult, SimulationMode, Strategy, TradeAssessment, TradeIntent,
};

/// One fully-resolved market view for a single assessment.
struct MarketData {
    pool: Address,
    reserves: ReservePair,
    gas_price_wei: U256,
    prices: PriceContext,
    /// Gas or price lookups fell back to assumed defaults. The
    /// assessment is still computed, but marked Degraded so consumers
    /// can tell computed from assumed.
    degraded_prices: bool,
}

pub struct ShieldCore {
    config: Arc<ShieldConfig>,
    chain_data: Arc<dyn ChainDataProvider>,
    policies: Arc<dyn PolicyProvider>,
    simulator: SandwichSimulator,
    profiler: MevProfiler,
    optimizer: ExecutionOptimizer,
}

impl ShieldCore {
    pub fn new(
        config: Arc<ShieldConfig>,
        chain_data: Arc<dyn ChainDataProvider>,
        history: Arc<dyn SwapHistoryProvider>,
        bridges: Arc<dyn BridgeQuoteProvider>,
        policies: Arc<dyn PolicyProvider>,
    ) -> Self {
        info!("🔧 ShieldCore 초기화 중...");
        let simulator = SandwichSimulator::new(config.simulator.clone());
        let profiler = MevProfiler::new(history, config.profiler.clone());
        let optimizer = ExecutionOptimizer::new(
            Arc::clone(&chain_data),
            bridges,
            config.optimizer.clone(),
        );
        Self { config, chain_data, policies, simulator, profiler, optimizer }
    }

    /// 인바운드 계약: TradeIntent 하나 → {시뮬레이션, 계획, 전략}.
    pub async fn assess(&self, intent: TradeIntent) -> TradeAssessment {
        let request_id = Uuid::new_v4();
        info!(
            "📨 평가 요청 {}: {} 체인, 입력 {}",
            request_id, intent.chain, intent.amount_in
        );

        let policy = self.resolve_policy(intent.trader).await;

        let market = match self.fetch_market_data(&intent).await {
            Ok(market) => market,
            Err(e) => {
                warn!("⚠️ 시장 데이터 수급 실패 ({}), degraded 평가로 강등", e);
                return self.degraded_assessment(request_id, intent, policy);
            }
        };

        let mut simulation =
            self.simulator
                .simulate(&intent, market.reserves, market.gas_price_wei, &market.prices);
        if market.degraded_prices {
            simulation.mode = SimulationMode::Degraded;
        }

        let trade_usd = trade_size_usd(&intent, &market.prices);
        let trade_usd_dec = Decimal::from_f64(trade_usd)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2);

        let profile = self
            .profiler
            .profile(market.pool, market.reserves, self.config.core.bypass_profile_cache)
            .await;

        let outcome = if DecisionEngine::needs_optimizer(&simulation, trade_usd, &policy) {
            Some(
                self.optimizer
                    .optimize(
                        trade_usd_dec,
                        intent.chain,
                        intent.token_in,
                        simulation.user_loss_usd,
                        &profile,
                        &policy,
                    )
                    .await,
            )
        } else {
            None
        };

        let strategy = DecisionEngine::decide(&simulation, trade_usd, &policy, outcome.as_ref());
        let chunk_instructions =
            self.build_instructions(&strategy, &simulation, trade_usd_dec, &intent, &policy);

        info!(
            "✅ 평가 완료 {}: 전략 {} (위험 {}, 손실 ${:.2})",
            request_id, strategy, simulation.risk, simulation.user_loss_usd
        );

        TradeAssessment {
            request_id,
            intent,
            simulation,
            profile,
            outcome,
            strategy,
            chunk_instructions,
            generated_at: Utc::now(),
        }
    }

    async fn resolve_policy(&self, trader: Address) -> ExecutionPolicy {
        let timeout = Duration::from_millis(self.config.core.provider_timeout_ms);
        match with_retry(timeout, || self.policies.get_policy(trader)).await {
            Ok(policy) => policy.clamped(),
            Err(e) => {
                warn!("⚠️ 정책 조회 실패, 기본 정책 사용: {}", e);
                self.config.default_policy.clone().clamped()
            }
        }
    }

    async fn fetch_market_data(&self, intent: &TradeIntent) -> ProviderResult<MarketData> {
        let timeout = Duration::from_millis(self.config.core.provider_timeout_ms);
        let chain = intent.chain;

        let pool = with_retry(timeout, || {
            self.chain_data
                .get_pair_address(chain, intent.token_in, intent.token_out)
        })
        .await?
        .ok_or(ProviderError::PoolNotFound(intent.token_in))?;

        let reserves = with_retry(timeout, || self.chain_data.get_reserves(chain, pool)).await?;

        // 풀 데이터 없이는 평가가 성립하지 않지만, 가스/가격은 가정값
        // 으로 대체하고 결과를 Degraded로 표기한다 (조용한 기본값 금지).
        let mut degraded_prices = false;

        let gas_price_wei = match with_retry(timeout, || self.chain_data.get_gas_price(chain)).await
        {
            Ok(value) => value,
            Err(e) => {
                warn!("⚠️ 가스 조회 실패, {} gwei 가정: {}", DEGRADED_GAS_PRICE_GWEI, e);
                degraded_prices = true;
                PriceContext::degraded_gas_price_wei()
            }
        };
        let native_price_usd =
            match with_retry(timeout, || self.chain_data.get_native_price_usd(chain)).await {
                Ok(value) => value,
                Err(e) => {
                    warn!("⚠️ 네이티브 가격 조회 실패, ${} 가정: {}", DEGRADED_ETH_PRICE_USD, e);
                    degraded_prices = true;
                    DEGRADED_ETH_PRICE_USD
                }
            };
        let input_token_price_usd = match with_retry(timeout, || {
            self.chain_data.get_token_price_usd(chain, intent.token_in)
        })
        .await
        {
            Ok(value) => value,
            Err(_) => {
                degraded_prices = true;
                DEGRADED_ETH_PRICE_USD
            }
        };
        let input_token_decimals = match with_retry(timeout, || {
            self.chain_data.get_token_decimals(chain, intent.token_in)
        })
        .await
        {
            Ok(value) => value,
            Err(_) => {
                degraded_prices = true;
                18
            }
        };

        Ok(MarketData {
            pool,
            reserves,
            gas_price_wei,
            prices: PriceContext {
                native_price_usd,
                input_token_price_usd,
                input_token_decimals,
            },
            degraded_prices,
        })
    }

    /// 데이터가 없을 때의 평가: 명시적 degraded 시뮬레이션 + 중립
    /// 프로파일. 전략은 엔진 규칙대로 DIRECT로 수렴하지만, 모드
    /// 표기 덕에 "계산된" 결과와 구분된다.
    fn degraded_assessment(
        &self,
        request_id: Uuid,
        intent: TradeIntent,
        policy: ExecutionPolicy,
    ) -> TradeAssessment {
        let simulation = self.simulator.degraded_fallback("market data unavailable");
        let profile = PoolMevProfile::degraded_default(
            Address::ZERO,
            self.config.profiler.default_safe_threshold_usd,
        );
        let strategy = DecisionEngine::decide(&simulation, 0.0, &policy, None);
        let chunk_instructions =
            self.build_instructions(&strategy, &simulation, Decimal::ZERO, &intent, &policy);

        TradeAssessment {
            request_id,
            intent,
            simulation,
            profile,
            outcome: None,
            strategy,
            chunk_instructions,
            generated_at: Utc::now(),
        }
    }

    /// 외부 실행기에 넘길 청크 상세. 최소 허용 출력은 클린 출력의
    /// 청크 지분에서 슬리피지 허용치를 뺀 값이다.
    fn build_instructions(
        &self,
        strategy: &Strategy,
        simulation: &SandwichSimulationResult,
        trade_usd: Decimal,
        intent: &TradeIntent,
        policy: &ExecutionPolicy,
    ) -> Vec<ChunkInstruction> {
        let bps = policy.slippage_tolerance_bps;

        match strategy {
            Strategy::Direct => vec![ChunkInstruction {
                amount_usd: trade_usd,
                chain: intent.chain,
                channel: Channel::Public,
                min_acceptable_output: apply_slippage(simulation.clean_output, bps),
            }],
            Strategy::MevRoute | Strategy::Private => vec![ChunkInstruction {
                amount_usd: trade_usd,
                chain: intent.chain,
                channel: Channel::PrivateRelay,
                min_acceptable_output: apply_slippage(simulation.clean_output, bps),
            }],
            Strategy::Split(plan) | Strategy::FullShield(plan) => plan
                .chunks
                .iter()
                .map(|chunk| ChunkInstruction {
                    amount_usd: chunk.amount_usd,
                    chain: chunk.chain,
                    channel: chunk.channel,
                    min_acceptable_output: apply_slippage(
                        share_of_output(simulation.clean_output, chunk.amount_usd, trade_usd),
                        bps,
                    ),
                })
                .collect(),
        }
    }
}

/// 타임아웃 + 1회 재시도. 어떤 수급 호출도 무한정 막히지 않는다.
async fn with_retry<T, F, Fut>(timeout: Duration, mut call: F) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut last_error = ProviderError::Timeout(timeout.as_millis() as u64);
    for _attempt in 0..2 {
        match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => last_error = e,
            Err(_) => last_error = ProviderError::Timeout(timeout.as_millis() as u64),
        }
    }
    Err(last_error)
}

fn trade_size_usd(intent: &TradeIntent, prices: &PriceContext) -> f64 {
    let unit = 10f64.powi(prices.input_token_decimals as i32);
    u256_to_f64(intent.amount_in) / unit * prices.input_token_price_usd
}

fn apply_slippage(output: U256, slippage_bps: u32) -> U256 {
    output * U256::from(10_000u32.saturating_sub(slippage_bps)) / U256::from(10_000u32)
}

/// clean_output의 청크 지분, 센트 단위 정수 비율로 계산.
fn share_of_output(clean_output: U256, chunk_usd: Decimal, total_usd: Decimal) -> U256 {
    let chunk_cents = (chunk_usd * Decimal::from(100))
        .round_dp(0)
        .to_u128()
        .unwrap_or(0);
    let total_cents = (total_usd * Decimal::from(100))
        .round_dp(0)
        .to_u128()
        .unwrap_or(0);
    if total_cents == 0 {
        return U256::ZERO;
    }
    clean_output * U256::from(chunk_cents) / U256::from(total_cents)
}
