use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::serde_helpers::u256_dec;

/// Supported execution chains
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Chain {
    Ethereum,
    Arbitrum,
    Optimism,
    Base,
    Polygon,
}

impl Chain {
    pub fn chain_id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Arbitrum => 42161,
            Chain::Optimism => 10,
            Chain::Base => 8453,
            Chain::Polygon => 137,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum",
            Chain::Arbitrum => "Arbitrum",
            Chain::Optimism => "Optimism",
            Chain::Base => "Base",
            Chain::Polygon => "Polygon",
        }
    }

    pub fn block_time_secs(&self) -> u64 {
        match self {
            Chain::Ethereum => 12,
            Chain::Arbitrum => 1,
            Chain::Optimism => 2,
            Chain::Base => 2,
            Chain::Polygon => 2,
        }
    }

    pub fn all() -> &'static [Chain] {
        &[
            Chain::Ethereum,
            Chain::Arbitrum,
            Chain::Optimism,
            Chain::Base,
            Chain::Polygon,
        ]
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 실행 대기 중인 사용자 스왑 (불변)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeIntent {
    pub trader: Address,
    pub token_in: Address,
    pub token_out: Address,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    pub chain: Chain,
}

/// Pool reserves at a point in time. AMM math never mutates these in
/// place; swap application returns a new pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservePair {
    #[serde(with = "u256_dec")]
    pub reserve_in: U256,
    #[serde(with = "u256_dec")]
    pub reserve_out: U256,
}

impl ReservePair {
    pub fn new(reserve_in: U256, reserve_out: U256) -> Self {
        Self { reserve_in, reserve_out }
    }

    pub fn is_valid(&self) -> bool {
        !self.reserve_in.is_zero() && !self.reserve_out.is_zero()
    }
}

/// 시뮬레이션 위험 등급 (결정 엔진 입력)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
            RiskLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// 풀 MEV 온도 등급 (0-100 점수 기반)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PoolRiskTier {
    Low,
    Medium,
    High,
    Extreme,
}

impl PoolRiskTier {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            PoolRiskTier::Extreme
        } else if score >= 50.0 {
            PoolRiskTier::High
        } else if score >= 25.0 {
            PoolRiskTier::Medium
        } else {
            PoolRiskTier::Low
        }
    }
}

impl std::fmt::Display for PoolRiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PoolRiskTier::Low => write!(f, "LOW"),
            PoolRiskTier::Medium => write!(f, "MEDIUM"),
            PoolRiskTier::High => write!(f, "HIGH"),
            PoolRiskTier::Extreme => write!(f, "EXTREME"),
        }
    }
}

/// Whether a result was computed from live data or assumed from
/// degraded-mode defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SimulationMode {
    Computed,
    Degraded,
}

/// 샌드위치 시뮬레이션 결과 (요청마다 재계산, 저장하지 않음)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SandwichSimulationResult {
    #[serde(with = "u256_dec")]
    pub clean_output: U256,
    #[serde(with = "u256_dec")]
    pub attacked_output: U256,
    #[serde(with = "u256_dec")]
    pub user_loss: U256,
    #[serde(with = "u256_dec")]
    pub attacker_profit: U256,
    #[serde(with = "u256_dec")]
    pub optimal_frontrun_amount: U256,
    pub user_loss_usd: f64,
    pub attacker_profit_usd: f64,
    pub loss_pct: f64,
    pub sandwich_gas_cost_usd: f64,
    pub attack_viable: bool,
    pub risk: RiskLevel,
    pub mode: SimulationMode,
}

impl SandwichSimulationResult {
    /// 데이터 수급 실패 시 보수적 폴백: MEDIUM 위험, 공격 불가, 제로 경제성
    pub fn degraded() -> Self {
        Self {
            clean_output: U256::ZERO,
            attacked_output: U256::ZERO,
            user_loss: U256::ZERO,
            attacker_profit: U256::ZERO,
            optimal_frontrun_amount: U256::ZERO,
            user_loss_usd: 0.0,
            attacker_profit_usd: 0.0,
            loss_pct: 0.0,
            sandwich_gas_cost_usd: 0.0,
            attack_viable: false,
            risk: RiskLevel::Medium,
            mode: SimulationMode::Degraded,
        }
    }
}

/// Swap direction relative to the pool's (token0 -> token1) orientation.
/// Buy adds to reserve_in and drains reserve_out; Sell is the reverse.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    Buy,
    Sell,
}

impl SwapDirection {
    pub fn opposite(&self) -> Self {
        match self {
            SwapDirection::Buy => SwapDirection::Sell,
            SwapDirection::Sell => SwapDirection::Buy,
        }
    }
}

/// Historical swap record as returned by the history provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSwapRecord {
    pub block_number: u64,
    pub log_index: u32,
    pub sender: Address,
    pub direction: SwapDirection,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    pub amount_in_usd: f64,
    pub amount_out_usd: f64,
}

/// Pagination cursor for the history provider, ordered by
/// (block_number, log_index).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwapCursor {
    pub block_number: u64,
    pub log_index: u32,
}

/// One page of historical swaps. A partial page signals exhaustion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapPage {
    pub records: Vec<RawSwapRecord>,
    pub next_cursor: Option<SwapCursor>,
}

/// 정규화된 과거 스왑 + 역산 리저브 + 분석 주석
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedSwap {
    pub block_number: u64,
    pub log_index: u32,
    pub sender: Address,
    pub direction: SwapDirection,
    #[serde(with = "u256_dec")]
    pub amount_in: U256,
    #[serde(with = "u256_dec")]
    pub amount_out: U256,
    pub amount_in_usd: f64,
    pub amount_out_usd: f64,
    /// Reserves immediately before this swap executed (reconstructed).
    #[serde(with = "u256_dec")]
    pub pre_reserve_in: U256,
    #[serde(with = "u256_dec")]
    pub pre_reserve_out: U256,
    /// Output the swap should have produced against its pre-trade reserves.
    #[serde(with = "u256_dec")]
    pub expected_out: U256,
    pub slippage_pct: f64,
    pub loss_usd: f64,
    pub sandwiched: bool,
    pub attacker: Option<Address>,
}

impl NormalizedSwap {
    pub fn ordering_key(&self) -> (u64, u32) {
        (self.block_number, self.log_index)
    }
}

/// Per-attacker aggregate over a profiling window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttackerStats {
    pub address: Address,
    pub attack_count: u32,
    pub extracted_usd: f64,
}

/// 풀 MEV 프로파일 (TTL 캐시 대상, 소비자에게는 읽기 전용)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoolMevProfile {
    pub pool: Address,
    pub score: f64,
    pub tier: PoolRiskTier,
    pub mev_cost_multiplier: f64,
    pub safe_threshold_usd: f64,
    pub victim_rate: f64,
    pub sandwich_count: u32,
    pub top_attackers: Vec<AttackerStats>,
    pub sample_size: usize,
    pub generated_at: DateTime<Utc>,
    pub degraded: bool,
}

impl PoolMevProfile {
    /// 이력 수급 실패 시 중립 프로파일 (multiplier 1.0, 기본 안전 임계값)
    pub fn degraded_default(pool: Address, default_safe_threshold_usd: f64) -> Self {
        Self {
            pool,
            score: 0.0,
            tier: PoolRiskTier::Low,
            mev_cost_multiplier: 1.0,
            safe_threshold_usd: default_safe_threshold_usd,
            victim_rate: 0.0,
            sandwich_count: 0,
            top_attackers: Vec::new(),
            sample_size: 0,
            generated_at: Utc::now(),
            degraded: true,
        }
    }
}

/// Per-chain execution pricing, refreshed once per optimization call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainPricing {
    pub chain: Chain,
    #[serde(with = "u256_dec")]
    pub gas_price_wei: U256,
    pub swap_gas_cost_usd: f64,
    pub sandwich_gas_cost_usd: f64,
    pub safe_threshold_usd: f64,
    pub liquidity_depth_usd: f64,
    pub available: bool,
}

impl ChainPricing {
    /// 조회 실패 체인: 비용 탐색에서 제외
    pub fn unavailable(chain: Chain) -> Self {
        Self {
            chain,
            gas_price_wei: U256::ZERO,
            swap_gas_cost_usd: 0.0,
            sandwich_gas_cost_usd: 0.0,
            safe_threshold_usd: 0.0,
            liquidity_depth_usd: 0.0,
            available: false,
        }
    }
}

/// Submission channel for one chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Channel {
    Public,
    PrivateRelay,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Public => write!(f, "PUBLIC"),
            Channel::PrivateRelay => write!(f, "PRIVATE_RELAY"),
        }
    }
}

/// 분할 실행의 한 조각
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSpec {
    pub amount_usd: Decimal,
    pub chain: Chain,
    pub channel: Channel,
    pub mev_exposure_usd: f64,
    pub gas_cost_usd: f64,
    pub bridge_cost_usd: f64,
    pub relay_cost_usd: f64,
    pub is_safe: bool,
}

/// Aggregate cost of a full plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub mev_exposure: f64,
    pub gas_fees: f64,
    pub bridge_fees: f64,
    pub relay_fees: f64,
    pub timing_risk: f64,
    pub total_cost: f64,
    pub savings: f64,
}

impl CostBreakdown {
    pub fn zero() -> Self {
        Self {
            mev_exposure: 0.0,
            gas_fees: 0.0,
            bridge_fees: 0.0,
            relay_fees: 0.0,
            timing_risk: 0.0,
            total_cost: 0.0,
            savings: 0.0,
        }
    }
}

/// 실행 계획: 청크 목록 + 비용 집계. 청크 금액의 합은 항상 원 거래
/// 금액과 정확히 일치한다 (Decimal 연산).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPlan {
    pub chunks: Vec<ChunkSpec>,
    pub cost: CostBreakdown,
    pub feasible: bool,
    pub warnings: Vec<String>,
}

impl ExecutionPlan {
    pub fn total_amount_usd(&self) -> Decimal {
        self.chunks.iter().map(|c| c.amount_usd).sum()
    }

    pub fn has_unsafe_chunk(&self) -> bool {
        self.chunks.iter().any(|c| !c.is_safe)
    }
}

/// Which evaluation won the optimizer's comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlanWinner {
    Direct,
    Private,
    Hybrid,
}

/// 최적화 결과: 최저 비용 계획 + 두 기준선 (투명한 비교를 위해 함께 노출)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptimizerOutcome {
    pub best: ExecutionPlan,
    pub direct_baseline: CostBreakdown,
    pub private_baseline: CostBreakdown,
    pub winner: PlanWinner,
    pub unmitigated_mev_usd: f64,
    /// Best plan with its largest unsafe chunk forced through the
    /// private relay. Present only when the best plan has an unsafe
    /// chunk; consumed by the decision engine for FULL_SHIELD.
    pub full_shield: Option<ExecutionPlan>,
}

/// 최종 실행 전략
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Strategy {
    Direct,
    MevRoute,
    Private,
    Split(ExecutionPlan),
    FullShield(ExecutionPlan),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Direct => "DIRECT",
            Strategy::MevRoute => "MEV_ROUTE",
            Strategy::Private => "PRIVATE",
            Strategy::Split(_) => "SPLIT",
            Strategy::FullShield(_) => "FULL_SHIELD",
        }
    }

    pub fn plan(&self) -> Option<&ExecutionPlan> {
        match self {
            Strategy::Split(plan) | Strategy::FullShield(plan) => Some(plan),
            _ => None,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// User risk appetite, from policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskProfile {
    Conservative,
    Balanced,
    Aggressive,
}

/// 사용자 실행 정책. 범위를 벗어난 값은 거부하지 않고 안전 범위로
/// 클램핑한다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionPolicy {
    pub private_threshold_usd: f64,
    pub split_enabled: bool,
    pub risk_profile: RiskProfile,
    pub max_chunks: usize,
    pub slippage_tolerance_bps: u32,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            private_threshold_usd: 10_000.0,
            split_enabled: true,
            risk_profile: RiskProfile::Balanced,
            max_chunks: 8,
            slippage_tolerance_bps: 50,
        }
    }
}

impl ExecutionPolicy {
    pub const MIN_PRIVATE_THRESHOLD_USD: f64 = 100.0;
    pub const MAX_PRIVATE_THRESHOLD_USD: f64 = 10_000_000.0;
    pub const MAX_CHUNK_LIMIT: usize = 20;
    pub const MAX_SLIPPAGE_BPS: u32 = 1_000;

    /// Clamp user-supplied values into documented safe ranges.
    pub fn clamped(mut self) -> Self {
        self.private_threshold_usd = self
            .private_threshold_usd
            .clamp(Self::MIN_PRIVATE_THRESHOLD_USD, Self::MAX_PRIVATE_THRESHOLD_USD);
        self.max_chunks = self.max_chunks.clamp(1, Self::MAX_CHUNK_LIMIT);
        self.slippage_tolerance_bps = self.slippage_tolerance_bps.min(Self::MAX_SLIPPAGE_BPS);
        self
    }
}

/// Per-chunk detail handed to the external executor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkInstruction {
    pub amount_usd: Decimal,
    pub chain: Chain,
    pub channel: Channel,
    #[serde(with = "u256_dec")]
    pub min_acceptable_output: U256,
}

/// 인바운드 요청에 대한 직렬화 가능한 최종 응답
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeAssessment {
    pub request_id: Uuid,
    pub intent: TradeIntent,
    pub simulation: SandwichSimulationResult,
    pub profile: PoolMevProfile,
    pub outcome: Option<OptimizerOutcome>,
    pub strategy: Strategy,
    pub chunk_instructions: Vec<ChunkInstruction>,
    pub generated_at: DateTime<Utc>,
}
