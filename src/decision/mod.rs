//! 결정 엔진
//!
//! (공격 성립, 위험 등급, 거래 크기, 정책, 최적화 결과) → 다섯 가지
//! 전략 중 하나. 호출 간 숨은 상태가 없는 순수 전함수라 동일 입력은
//! 언제나 동일한 전략을 낳는다.

use tracing::debug;

use crate::types::{
    ExecutionPolicy, OptimizerOutcome, RiskLevel, SandwichSimulationResult, Strategy,
};

pub struct DecisionEngine;

impl DecisionEngine {
    /// 최적화기 실행이 필요한 입력인지. ShieldCore는 이 판정이 참일
    /// 때만 비용 탐색을 돌린다.
    pub fn needs_optimizer(
        simulation: &SandwichSimulationResult,
        trade_usd: f64,
        policy: &ExecutionPolicy,
    ) -> bool {
        if !simulation.attack_viable {
            return false;
        }
        match simulation.risk {
            RiskLevel::Low => false,
            RiskLevel::Medium => trade_usd > policy.private_threshold_usd,
            RiskLevel::High | RiskLevel::Critical => true,
        }
    }

    /// 전략 결정. 상태 기계의 전이는 위에서 아래로 한 번만 읽힌다.
    pub fn decide(
        simulation: &SandwichSimulationResult,
        trade_usd: f64,
        policy: &ExecutionPolicy,
        outcome: Option<&OptimizerOutcome>,
    ) -> Strategy {
        // 수지가 맞지 않는 공격은 위험이 아니다
        if !simulation.attack_viable {
            return Strategy::Direct;
        }

        if simulation.risk == RiskLevel::Low {
            return Strategy::Direct;
        }

        if simulation.risk == RiskLevel::Medium && trade_usd <= policy.private_threshold_usd {
            debug!(
                "🛡️ MEDIUM 위험 소액 거래 (${:.0} ≤ ${:.0}) → MEV_ROUTE",
                trade_usd, policy.private_threshold_usd
            );
            return Strategy::MevRoute;
        }

        // 여기부터는 최적화 결과가 필요하다. 없으면 가장 보수적인
        // 단일 채널 보호로 강등한다.
        let Some(outcome) = outcome else {
            return Strategy::Private;
        };

        // 분할이 완화하는 것보다 비싸면 분할할 이유가 없다
        if outcome.best.cost.total_cost >= outcome.unmitigated_mev_usd {
            return Strategy::Private;
        }

        if simulation.risk == RiskLevel::Critical && outcome.best.has_unsafe_chunk() {
            if let Some(shielded) = &outcome.full_shield {
                return Strategy::FullShield(shielded.clone());
            }
            return Strategy::Private;
        }

        Strategy::Split(outcome.best.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Channel, ChunkSpec, CostBreakdown, ExecutionPlan, PlanWinner, SimulationMode,
    };
    use alloy::primitives::U256;
    use rust_decimal::Decimal;

    fn simulation(viable: bool, risk: RiskLevel) -> SandwichSimulationResult {
        SandwichSimulationResult {
            clean_output: U256::from(1_000u64),
            attacked_output: U256::from(950u64),
            user_loss: U256::from(50u64),
            attacker_profit: U256::from(40u64),
            optimal_frontrun_amount: U256::from(500u64),
            user_loss_usd: 500.0,
            attacker_profit_usd: 400.0,
            loss_pct: 5.0,
            sandwich_gas_cost_usd: 30.0,
            attack_viable: viable,
            risk,
            mode: SimulationMode::Computed,
        }
    }

    fn chunk(amount: i64, channel: Channel, is_safe: bool) -> ChunkSpec {
        ChunkSpec {
            amount_usd: Decimal::from(amount),
            chain: crate::types::Chain::Ethereum,
            channel,
            mev_exposure_usd: if is_safe { 0.0 } else { 100.0 },
            gas_cost_usd: 15.0,
            bridge_cost_usd: 0.0,
            relay_cost_usd: 0.0,
            is_safe,
        }
    }

    fn outcome(total_cost: f64, unmitigated: f64, unsafe_chunks: bool) -> OptimizerOutcome {
        let plan = ExecutionPlan {
            chunks: vec![
                chunk(10_000, Channel::Public, true),
                chunk(10_000, Channel::Public, !unsafe_chunks),
            ],
            cost: CostBreakdown {
                total_cost,
                ..CostBreakdown::zero()
            },
            feasible: true,
            warnings: Vec::new(),
        };
        let full_shield = if unsafe_chunks {
            let mut shielded = plan.clone();
            shielded.chunks[1].channel = Channel::PrivateRelay;
            shielded.chunks[1].is_safe = true;
            shielded.chunks[1].mev_exposure_usd = 0.0;
            Some(shielded)
        } else {
            None
        };
        OptimizerOutcome {
            best: plan,
            direct_baseline: CostBreakdown::zero(),
            private_baseline: CostBreakdown::zero(),
            winner: PlanWinner::Hybrid,
            unmitigated_mev_usd: unmitigated,
            full_shield,
        }
    }

    fn policy() -> ExecutionPolicy {
        ExecutionPolicy::default() // private threshold $10,000
    }

    #[test]
    fn test_not_viable_is_direct() {
        let strategy =
            DecisionEngine::decide(&simulation(false, RiskLevel::Critical), 50_000.0, &policy(), None);
        assert_eq!(strategy, Strategy::Direct);
    }

    #[test]
    fn test_viable_low_risk_is_direct() {
        let strategy =
            DecisionEngine::decide(&simulation(true, RiskLevel::Low), 50_000.0, &policy(), None);
        assert_eq!(strategy, Strategy::Direct);
    }

    #[test]
    fn test_viable_medium_small_trade_is_mev_route() {
        let strategy =
            DecisionEngine::decide(&simulation(true, RiskLevel::Medium), 5_000.0, &policy(), None);
        assert_eq!(strategy, Strategy::MevRoute);
    }

    #[test]
    fn test_costly_plan_falls_back_to_private() {
        // plan costs more than the unmitigated MEV: splitting adds no value
        let outcome = outcome(1_000.0, 800.0, false);
        let strategy = DecisionEngine::decide(
            &simulation(true, RiskLevel::High),
            50_000.0,
            &policy(),
            Some(&outcome),
        );
        assert_eq!(strategy, Strategy::Private);
    }

    #[test]
    fn test_critical_with_unsafe_chunk_is_full_shield() {
        let outcome = outcome(300.0, 800.0, true);
        let strategy = DecisionEngine::decide(
            &simulation(true, RiskLevel::Critical),
            50_000.0,
            &policy(),
            Some(&outcome),
        );
        match strategy {
            Strategy::FullShield(plan) => {
                assert!(plan.chunks.iter().any(|c| c.channel == Channel::PrivateRelay));
            }
            other => panic!("expected FULL_SHIELD, got {}", other),
        }
    }

    #[test]
    fn test_profitable_split_is_split() {
        let outcome = outcome(300.0, 800.0, false);
        let strategy = DecisionEngine::decide(
            &simulation(true, RiskLevel::High),
            50_000.0,
            &policy(),
            Some(&outcome),
        );
        assert!(matches!(strategy, Strategy::Split(_)));
    }

    #[test]
    fn test_decision_is_pure() {
        let outcome = outcome(300.0, 800.0, true);
        let simulation = simulation(true, RiskLevel::Critical);
        let first =
            DecisionEngine::decide(&simulation, 50_000.0, &policy(), Some(&outcome));
        let second =
            DecisionEngine::decide(&simulation, 50_000.0, &policy(), Some(&outcome));
        assert_eq!(first, second);
    }

    #[test]
    fn test_needs_optimizer_gating() {
        let policy = policy();
        assert!(!DecisionEngine::needs_optimizer(
            &simulation(false, RiskLevel::Critical),
            50_000.0,
            &policy
        ));
        assert!(!DecisionEngine::needs_optimizer(
            &simulation(true, RiskLevel::Low),
            50_000.0,
            &policy
        ));
        assert!(!DecisionEngine::needs_optimizer(
            &simulation(true, RiskLevel::Medium),
            5_000.0,
            &policy
        ));
        assert!(DecisionEngine::needs_optimizer(
            &simulation(true, RiskLevel::Medium),
            50_000.0,
            &policy
        ));
        assert!(DecisionEngine::needs_optimizer(
            &simulation(true, RiskLevel::High),
            500.0,
            &policy
        ));
    }
}
