//! 샌드위치 시뮬레이터
//!
//! 하나의 TradeIntent와 현재 리저브에 대해 3단계 시뮬레이션
//! (frontrun → victim swap → backrun)을 수행하여 클린/공격 출력,
//! 공격자 이익, 공격 성립 여부를 계산한다.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::amm;
use crate::common::formatting::{format_usd, u256_to_f64};
use crate::constants::{
    DEGRADED_ETH_PRICE_USD, DEGRADED_GAS_PRICE_GWEI, DEFAULT_POOL_FEE_BPS, SANDWICH_GAS_UNITS,
};
use crate::types::{
    ReservePair, RiskLevel, SandwichSimulationResult, SimulationMode, TradeIntent,
};

/// 시뮬레이터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub pool_fee_bps: u32,
    /// Loss-percentage tiers, applied only when the attack is viable.
    pub critical_loss_pct: f64,
    pub high_loss_pct: f64,
    pub medium_loss_pct: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            pool_fee_bps: DEFAULT_POOL_FEE_BPS,
            critical_loss_pct: 5.0,
            high_loss_pct: 2.0,
            medium_loss_pct: 0.5,
        }
    }
}

/// USD 환산 컨텍스트. RPC 실패 시 degraded() 값이 대신 쓰이고 결과에
/// Degraded 모드가 표기된다 (조용한 기본값 금지).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceContext {
    /// Price of the chain's gas asset, for gas-cost conversion.
    pub native_price_usd: f64,
    /// Price of the trade's input token.
    pub input_token_price_usd: f64,
    pub input_token_decimals: u8,
}

impl PriceContext {
    pub fn degraded() -> Self {
        Self {
            native_price_usd: DEGRADED_ETH_PRICE_USD,
            input_token_price_usd: DEGRADED_ETH_PRICE_USD,
            input_token_decimals: 18,
        }
    }

    pub fn degraded_gas_price_wei() -> U256 {
        U256::from(DEGRADED_GAS_PRICE_GWEI) * U256::from(1_000_000_000u64)
    }
}

pub struct SandwichSimulator {
    config: SimulatorConfig,
}

impl SandwichSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    /// 클린 스왑과 최적 공격 스왑을 동일 리저브에서 순차 시뮬레이션한다.
    /// 리저브 상태는 단계마다 새로 계산된 값을 이어받는다 (절대 이전
    /// 상태를 다시 읽지 않음).
    pub fn simulate(
        &self,
        intent: &TradeIntent,
        reserves: ReservePair,
        gas_price_wei: U256,
        prices: &PriceContext,
    ) -> SandwichSimulationResult {
        let fee = self.config.pool_fee_bps;

        // 1. 공격자 개입이 없는 클린 출력
        let clean_output =
            amm::amount_out(intent.amount_in, reserves.reserve_in, reserves.reserve_out, fee);
        if clean_output.is_zero() {
            debug!("⚪ 스왑 불가 입력 - 시뮬레이션 생략");
            return self.not_viable(U256::ZERO, U256::ZERO, gas_price_wei, prices);
        }

        // 2. 닫힌 해 최적 프런트런. 0이면 공격 자체가 성립하지 않는다.
        let frontrun = amm::optimal_frontrun_amount(reserves.reserve_in, intent.amount_in, fee);
        if frontrun.is_zero() {
            return self.not_viable(clean_output, clean_output, gas_price_wei, prices);
        }

        // 3. frontrun → victim → backrun, 리저브 순차 누적
        let (frontrun_output, after_frontrun) = amm::apply_swap(frontrun, reserves, fee);
        let (attacked_output, after_victim) = amm::apply_swap(intent.amount_in, after_frontrun, fee);

        let backrun_reserves =
            ReservePair::new(after_victim.reserve_out, after_victim.reserve_in);
        let (backrun_revenue, _) = amm::apply_swap(frontrun_output, backrun_reserves, fee);

        // 4. 이익/손실 (0으로 클램핑)
        let attacker_profit = backrun_revenue.saturating_sub(frontrun);
        let user_loss = clean_output.saturating_sub(attacked_output);

        // 5. USD 환산: 외부 오라클 대신 풀 상태와 자기 일관적인
        //    내재 가격 (clean_output / amount_in)을 사용한다.
        let loss_in_input_units = if clean_output.is_zero() {
            U256::ZERO
        } else {
            user_loss
                .checked_mul(intent.amount_in)
                .map(|v| v / clean_output)
                .unwrap_or(U256::ZERO)
        };

        let input_unit = 10f64.powi(prices.input_token_decimals as i32);
        let user_loss_usd =
            u256_to_f64(loss_in_input_units) / input_unit * prices.input_token_price_usd;
        let attacker_profit_usd =
            u256_to_f64(attacker_profit) / input_unit * prices.input_token_price_usd;

        let loss_pct = if clean_output.is_zero() {
            0.0
        } else {
            u256_to_f64(user_loss) / u256_to_f64(clean_output) * 100.0
        };

        // 6. 공격 성립 게이트: 공격자 이익이 샌드위치 가스 비용
        //    (온체인 트랜잭션 2개)을 넘어야 한다.
        let sandwich_gas_cost_usd = sandwich_gas_cost_usd(gas_price_wei, prices.native_price_usd);
        let attack_viable = attacker_profit_usd > sandwich_gas_cost_usd;

        // 7. 성립하지 않는 공격은 이론적 슬리피지와 무관하게 LOW
        let risk = if attack_viable {
            self.classify_loss(loss_pct)
        } else {
            RiskLevel::Low
        };

        if attack_viable {
            debug!(
                "🥪 샌드위치 성립: 공격자 이익 {} > 가스 {} (손실 {:.2}%)",
                format_usd(attacker_profit_usd),
                format_usd(sandwich_gas_cost_usd),
                loss_pct
            );
        }

        SandwichSimulationResult {
            clean_output,
            attacked_output,
            user_loss,
            attacker_profit,
            optimal_frontrun_amount: frontrun,
            user_loss_usd,
            attacker_profit_usd,
            loss_pct,
            sandwich_gas_cost_usd,
            attack_viable,
            risk,
            mode: SimulationMode::Computed,
        }
    }

    /// 데이터 수급 실패용 폴백. 호출자를 막지 않고 보수적 결과를 돌려준다.
    pub fn degraded_fallback(&self, reason: &str) -> SandwichSimulationResult {
        warn!("⚠️ 시뮬레이션 degraded 모드: {}", reason);
        SandwichSimulationResult::degraded()
    }

    fn not_viable(
        &self,
        clean_output: U256,
        attacked_output: U256,
        gas_price_wei: U256,
        prices: &PriceContext,
    ) -> SandwichSimulationResult {
        SandwichSimulationResult {
            clean_output,
            attacked_output,
            user_loss: U256::ZERO,
            attacker_profit: U256::ZERO,
            optimal_frontrun_amount: U256::ZERO,
            user_loss_usd: 0.0,
            attacker_profit_usd: 0.0,
            loss_pct: 0.0,
            sandwich_gas_cost_usd: sandwich_gas_cost_usd(gas_price_wei, prices.native_price_usd),
            attack_viable: false,
            risk: RiskLevel::Low,
            mode: SimulationMode::Computed,
        }
    }

    fn classify_loss(&self, loss_pct: f64) -> RiskLevel {
        if loss_pct >= self.config.critical_loss_pct {
            RiskLevel::Critical
        } else if loss_pct >= self.config.high_loss_pct {
            RiskLevel::High
        } else if loss_pct >= self.config.medium_loss_pct {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Gas cost of the two attacker transactions, in USD.
pub fn sandwich_gas_cost_usd(gas_price_wei: U256, native_price_usd: f64) -> f64 {
    let total_wei = gas_price_wei.saturating_mul(U256::from(SANDWICH_GAS_UNITS));
    u256_to_f64(total_wei) / 1e18 * native_price_usd
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use crate::types::Chain;

    fn eth(value: u64) -> U256 {
        U256::from(value) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn usdc(value: u64) -> U256 {
        U256::from(value) * U256::from(10u64).pow(U256::from(6u64))
    }

    fn intent(amount_in: U256) -> TradeIntent {
        TradeIntent {
            trader: Address::ZERO,
            token_in: Address::ZERO,
            token_out: Address::ZERO,
            amount_in,
            chain: Chain::Ethereum,
        }
    }

    fn gwei(value: u64) -> U256 {
        U256::from(value) * U256::from(1_000_000_000u64)
    }

    fn eth_prices() -> PriceContext {
        PriceContext {
            native_price_usd: 2_500.0,
            input_token_price_usd: 2_500.0,
            input_token_decimals: 18,
        }
    }

    #[test]
    fn test_whale_victim_makes_attack_viable() {
        // 1,000,000 USDC / 500 ETH pool, 20 ETH victim, 30 gwei, ETH $2500
        let simulator = SandwichSimulator::new(SimulatorConfig::default());
        let reserves = ReservePair::new(eth(500), usdc(1_000_000));

        let result = simulator.simulate(&intent(eth(20)), reserves, gwei(30), &eth_prices());

        assert!(result.optimal_frontrun_amount > U256::ZERO);
        assert!(result.attacker_profit > U256::ZERO);
        assert!(result.attacker_profit_usd > result.sandwich_gas_cost_usd);
        assert!(result.attack_viable);
        assert!(
            result.risk == RiskLevel::High || result.risk == RiskLevel::Critical,
            "expected HIGH or CRITICAL, got {}",
            result.risk
        );
        assert_eq!(result.mode, SimulationMode::Computed);
    }

    #[test]
    fn test_small_trade_computes_frontrun_but_is_not_viable() {
        // $100 trade (0.04 ETH at $2500) against the same pool
        let simulator = SandwichSimulator::new(SimulatorConfig::default());
        let reserves = ReservePair::new(eth(500), usdc(1_000_000));
        let small = U256::from(40_000_000_000_000_000u64); // 0.04 ETH

        let result = simulator.simulate(&intent(small), reserves, gwei(30), &eth_prices());

        assert!(result.optimal_frontrun_amount > U256::ZERO);
        assert!(result.attacker_profit_usd < result.sandwich_gas_cost_usd);
        assert!(!result.attack_viable);
        assert_eq!(result.risk, RiskLevel::Low);
    }

    #[test]
    fn test_clean_output_dominates_attacked_output() {
        // 무작위 양수 리저브/거래 크기에 대해 clean >= attacked
        let simulator = SandwichSimulator::new(SimulatorConfig::default());
        let mut rng = fastrand::Rng::with_seed(0x5eed);

        for _ in 0..200 {
            let reserve_in = eth(rng.u64(10..5_000));
            let reserve_out = usdc(rng.u64(10_000..50_000_000));
            let amount_in = eth(rng.u64(1..500));

            let result = simulator.simulate(
                &intent(amount_in),
                ReservePair::new(reserve_in, reserve_out),
                gwei(30),
                &eth_prices(),
            );

            if result.optimal_frontrun_amount > U256::ZERO {
                assert!(
                    result.clean_output >= result.attacked_output,
                    "clean {} < attacked {} (reserves {} / {})",
                    result.clean_output,
                    result.attacked_output,
                    reserve_in,
                    reserve_out
                );
            }
        }
    }

    #[test]
    fn test_zero_amount_short_circuits() {
        let simulator = SandwichSimulator::new(SimulatorConfig::default());
        let reserves = ReservePair::new(eth(500), usdc(1_000_000));

        let result = simulator.simulate(&intent(U256::ZERO), reserves, gwei(30), &eth_prices());
        assert_eq!(result.clean_output, U256::ZERO);
        assert!(!result.attack_viable);
        assert_eq!(result.risk, RiskLevel::Low);
    }

    #[test]
    fn test_invalid_reserves_short_circuit() {
        let simulator = SandwichSimulator::new(SimulatorConfig::default());
        let reserves = ReservePair::new(U256::ZERO, usdc(1_000_000));

        let result = simulator.simulate(&intent(eth(1)), reserves, gwei(30), &eth_prices());
        assert!(!result.attack_viable);
        assert_eq!(result.optimal_frontrun_amount, U256::ZERO);
    }

    #[test]
    fn test_degraded_fallback_is_medium_risk() {
        let simulator = SandwichSimulator::new(SimulatorConfig::default());
        let result = simulator.degraded_fallback("rpc timeout");
        assert_eq!(result.risk, RiskLevel::Medium);
        assert!(!result.attack_viable);
        assert_eq!(result.mode, SimulationMode::Degraded);
    }

    #[test]
    fn test_gas_cost_scales_with_gas_price() {
        let cheap = sandwich_gas_cost_usd(gwei(10), 2_500.0);
        let dear = sandwich_gas_cost_usd(gwei(100), 2_500.0);
        assert!((dear / cheap - 10.0).abs() < 1e-9);
    }
}
