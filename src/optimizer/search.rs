//! 하이브리드 (프라이빗 비율 × 퍼블릭 청크 수) 탐색
//!
//! 비용 평가는 순수 계산이므로 rayon으로 격자를 병렬 평가하지만,
//! 최종 선택은 (비용, 비율, 청크 수) 전순서 비교라 병렬 여부와
//! 무관하게 결정적이다. 기준선 두 개 (직접, 전량 프라이빗)도 같은
//! 평가기로 계산하므로 격자가 기준선보다 "더 좋은" 비용을 보고하는
//! 일은 구조적으로 불가능하다.

use std::collections::HashMap;

use rayon::prelude::*;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::types::{
    Chain, ChainPricing, Channel, ChunkSpec, CostBreakdown, ExecutionPlan, ExecutionPolicy,
    OptimizerOutcome, PlanWinner, PoolMevProfile,
};

use super::relay_cost::{chunk_mev_exposure_usd, private_relay_cost_usd};
use super::OptimizerConfig;

/// Inputs shared by every grid point of one optimization call.
pub struct SearchContext<'a> {
    pub trade_usd: Decimal,
    pub home_chain: Chain,
    pub unmitigated_mev_usd: f64,
    pub profile: &'a PoolMevProfile,
    pub pricing: &'a [ChainPricing],
    pub policy: &'a ExecutionPolicy,
    /// Cost of bridging the full trade to each foreign chain; a chunk
    /// routed there pays its proportional share. Missing entry = chain
    /// not reachable for chunk placement.
    pub bridge_costs: &'a HashMap<Chain, f64>,
}

impl<'a> SearchContext<'a> {
    fn trade_f64(&self) -> f64 {
        self.trade_usd.to_f64().unwrap_or(0.0)
    }

    fn home_pricing(&self) -> Option<&ChainPricing> {
        self.pricing
            .iter()
            .find(|p| p.chain == self.home_chain && p.available)
    }
}

pub struct HybridSearch {
    config: OptimizerConfig,
}

impl HybridSearch {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// 최저 비용 계획 + 두 기준선. §의 다섯 전략 결정은 여기서 하지
    /// 않는다 - 결정 엔진의 몫이다.
    pub fn optimize(&self, ctx: &SearchContext<'_>) -> OptimizerOutcome {
        let Some(home) = ctx.home_pricing() else {
            return self.home_unavailable_outcome(ctx);
        };

        let direct = self.evaluate(0, 1, ctx);
        let private = self.evaluate(100, 1, ctx);

        // 조기 종료: 노출이 자체 오버헤드(스왑 가스 2회분)보다 작으면
        // 청크 분할이 도움이 될 수 없다. 두 기준선만 비교한다.
        if ctx.unmitigated_mev_usd <= self.config.early_exit_gas_multiple * home.swap_gas_cost_usd {
            debug!(
                "⏩ 조기 종료: MEV ${:.2} ≤ {}x 스왑 가스",
                ctx.unmitigated_mev_usd, self.config.early_exit_gas_multiple
            );
            return self.pick_baseline_only(direct, private, ctx);
        }

        let max_chunks = self.max_chunks_for(ctx.trade_f64(), ctx.policy);
        let steps = self.config.private_ratio_steps.max(1);
        let ratios: Vec<u32> = if ctx.policy.split_enabled {
            (0..=steps).map(|step| (step * 100 / steps) as u32).collect()
        } else {
            vec![0, 100]
        };

        let combos: Vec<(u32, usize)> = ratios
            .iter()
            .flat_map(|&ratio| (1..=max_chunks).map(move |count| (ratio, count)))
            .collect();

        let mut evaluated: Vec<(u32, usize, ExecutionPlan)> = combos
            .par_iter()
            .map(|&(ratio, count)| (ratio, count, self.evaluate(ratio, count, ctx)))
            .collect();

        // 결정적 선택: 실행 가능 우선, 그다음 (비용, 비율, 청크 수)
        evaluated.sort_by(|a, b| {
            b.2.feasible
                .cmp(&a.2.feasible)
                .then(a.2.cost.total_cost.total_cmp(&b.2.cost.total_cost))
                .then(a.0.cmp(&b.0))
                .then(a.1.cmp(&b.1))
        });
        let (best_ratio, best_count, mut best) = match evaluated.into_iter().next() {
            Some(entry) => entry,
            // grid always contains (0, 1); direct is the safe stand-in
            None => (0, 1, direct.clone()),
        };

        let winner = if best_ratio == 0 && best_count == 1 {
            PlanWinner::Direct
        } else if best_ratio == 100 {
            PlanWinner::Private
        } else {
            PlanWinner::Hybrid
        };

        if self.config.chunk_jitter {
            self.apply_cosmetic_jitter(&mut best, ctx);
        }

        best.cost.savings = direct.cost.total_cost - best.cost.total_cost;
        let mut private_cost = private.cost.clone();
        private_cost.savings = direct.cost.total_cost - private_cost.total_cost;

        let full_shield = self.build_full_shield(&best, ctx);

        info!(
            "🧮 최적화 완료: {:?} 승리, 비용 ${:.2} (직접 ${:.2} / 프라이빗 ${:.2})",
            winner, best.cost.total_cost, direct.cost.total_cost, private_cost.total_cost
        );

        OptimizerOutcome {
            best,
            direct_baseline: direct.cost,
            private_baseline: private_cost,
            winner,
            unmitigated_mev_usd: ctx.unmitigated_mev_usd,
            full_shield,
        }
    }

    /// 단일 그리드 포인트 평가. ratio는 프라이빗으로 보낼 퍼센트,
    /// chunk_count는 퍼블릭 잔량을 쪼갤 조각 수.
    pub fn evaluate(&self, ratio_pct: u32, chunk_count: usize, ctx: &SearchContext<'_>) -> ExecutionPlan {
        let mut warnings = Vec::new();
        let mut feasible = true;

        let Some(home) = ctx.home_pricing() else {
            return ExecutionPlan {
                chunks: Vec::new(),
                cost: CostBreakdown {
                    total_cost: f64::INFINITY,
                    ..CostBreakdown::zero()
                },
                feasible: false,
                warnings: vec![format!("home chain {} unavailable", ctx.home_chain)],
            };
        };

        let trade_f = ctx.trade_f64();

        // 유동성 가드: 풀 깊이 대비 과대 거래는 조용히 잘못 가격을
        // 매기는 대신 가시적으로 거부/경고한다.
        if trade_f > self.config.liquidity_hard_fraction * home.liquidity_depth_usd {
            feasible = false;
            warnings.push(format!(
                "trade ${:.0} exceeds {:.0}% of {} pool depth",
                trade_f,
                self.config.liquidity_hard_fraction * 100.0,
                home.chain
            ));
        } else if trade_f > self.config.liquidity_warn_fraction * home.liquidity_depth_usd {
            warnings.push(format!(
                "trade ${:.0} is above {:.0}% of {} pool depth",
                trade_f,
                self.config.liquidity_warn_fraction * 100.0,
                home.chain
            ));
        }

        // Decimal 분할: 합계는 항상 원 금액과 정확히 일치
        let ratio = Decimal::from(ratio_pct) / Decimal::from(100u32);
        let private_amount = (ctx.trade_usd * ratio).round_dp(2).min(ctx.trade_usd);
        let public_amount = ctx.trade_usd - private_amount;

        let mut chunks = Vec::new();

        if public_amount > Decimal::ZERO {
            let count = Decimal::from(chunk_count as u64);
            let per_chunk = (public_amount / count).round_dp(2);

            for index in 0..chunk_count {
                let amount = if index == chunk_count - 1 {
                    public_amount - per_chunk * Decimal::from((chunk_count - 1) as u64)
                } else {
                    per_chunk
                };
                let chunk =
                    self.cost_public_chunk(amount, index, ctx, home, &mut warnings, &mut feasible);
                chunks.push(chunk);
            }
        }

        if private_amount > Decimal::ZERO {
            chunks.push(self.cost_private_chunk(private_amount, ctx, home));
        }

        let cost = self.aggregate_cost(&chunks, trade_f);
        ExecutionPlan { chunks, cost, feasible, warnings }
    }

    /// 퍼블릭 청크 비용 산정 + 체인 배치. 분할이 허용되면 (가스 +
    /// MEV + 브리지 몫)이 가장 싼 체인으로 보낸다.
    fn cost_public_chunk(
        &self,
        amount: Decimal,
        index: usize,
        ctx: &SearchContext<'_>,
        home: &ChainPricing,
        warnings: &mut Vec<String>,
        feasible: &mut bool,
    ) -> ChunkSpec {
        let chunk_f = amount.to_f64().unwrap_or(0.0);
        let trade_f = ctx.trade_f64();

        // 우선순위 수수료 경쟁 모델: 실행이 블록들로 퍼질수록 비싸진다
        let escalation = 1.0 + self.config.gas_escalation_volatility * (index as f64).sqrt();

        let candidate = if ctx.policy.split_enabled {
            ctx.pricing
                .iter()
                .filter(|p| p.available)
                .filter(|p| {
                    p.chain == ctx.home_chain || ctx.bridge_costs.contains_key(&p.chain)
                })
                .filter(|p| chunk_f <= self.config.liquidity_hard_fraction * p.liquidity_depth_usd)
                .map(|p| {
                    let gas = p.swap_gas_cost_usd * escalation;
                    let mev = chunk_mev_exposure_usd(
                        chunk_f,
                        p.liquidity_depth_usd,
                        ctx.profile.mev_cost_multiplier,
                        ctx.profile.safe_threshold_usd,
                        &self.config,
                    );
                    let bridge = if p.chain == ctx.home_chain {
                        0.0
                    } else {
                        ctx.bridge_costs
                            .get(&p.chain)
                            .map(|full| full * chunk_f / trade_f.max(1.0))
                            .unwrap_or(0.0)
                    };
                    (p, gas, mev, bridge)
                })
                .min_by(|a, b| {
                    (a.1 + a.2 + a.3)
                        .total_cmp(&(b.1 + b.2 + b.3))
                        .then(a.0.chain.chain_id().cmp(&b.0.chain.chain_id()))
                })
        } else {
            None
        };

        let (pricing, gas_cost, mev_exposure, bridge_cost) = match candidate {
            Some((p, gas, mev, bridge)) => (p, gas, mev, bridge),
            None => {
                // 어느 체인에도 안 들어가는 청크: 홈 체인에 두되 보이게 표시
                let gas = home.swap_gas_cost_usd * escalation;
                let mev = chunk_mev_exposure_usd(
                    chunk_f,
                    home.liquidity_depth_usd,
                    ctx.profile.mev_cost_multiplier,
                    ctx.profile.safe_threshold_usd,
                    &self.config,
                );
                if ctx.policy.split_enabled
                    && chunk_f > self.config.liquidity_hard_fraction * home.liquidity_depth_usd
                {
                    *feasible = false;
                    warnings.push(format!(
                        "chunk ${:.0} exceeds the liquidity guard on every chain",
                        chunk_f
                    ));
                }
                (home, gas, mev, 0.0)
            }
        };

        ChunkSpec {
            amount_usd: amount,
            chain: pricing.chain,
            channel: Channel::Public,
            mev_exposure_usd: mev_exposure,
            gas_cost_usd: gas_cost,
            bridge_cost_usd: bridge_cost,
            relay_cost_usd: 0.0,
            is_safe: mev_exposure == 0.0,
        }
    }

    /// 프라이빗 조각은 홈 체인에서 릴레이로 나간다. 멤풀 노출이
    /// 없으므로 MEV 0, 가스 에스컬레이션 없음.
    fn cost_private_chunk(
        &self,
        amount: Decimal,
        ctx: &SearchContext<'_>,
        home: &ChainPricing,
    ) -> ChunkSpec {
        let chunk_f = amount.to_f64().unwrap_or(0.0);
        let relay_cost =
            private_relay_cost_usd(chunk_f, home.liquidity_depth_usd, &self.config);

        ChunkSpec {
            amount_usd: amount,
            chain: home.chain,
            channel: Channel::PrivateRelay,
            mev_exposure_usd: 0.0,
            gas_cost_usd: home.swap_gas_cost_usd,
            bridge_cost_usd: 0.0,
            relay_cost_usd: relay_cost,
            is_safe: true,
        }
    }

    fn aggregate_cost(&self, chunks: &[ChunkSpec], trade_f: f64) -> CostBreakdown {
        let mev_exposure: f64 = chunks.iter().map(|c| c.mev_exposure_usd).sum();
        let gas_fees: f64 = chunks.iter().map(|c| c.gas_cost_usd).sum();
        let bridge_fees: f64 = chunks.iter().map(|c| c.bridge_cost_usd).sum();
        let relay_fees: f64 = chunks.iter().map(|c| c.relay_cost_usd).sum();

        // 실행이 여러 블록에 걸치는 동안의 가격 드리프트, 계획당 한 번
        let timing_risk =
            trade_f * self.config.per_block_volatility * (chunks.len().max(1) as f64).sqrt();

        CostBreakdown {
            mev_exposure,
            gas_fees,
            bridge_fees,
            relay_fees,
            timing_risk,
            total_cost: mev_exposure + gas_fees + bridge_fees + relay_fees + timing_risk,
            savings: 0.0,
        }
    }

    /// 고래 등급별 최대 청크 수, 정책 상한으로 클램핑.
    fn max_chunks_for(&self, trade_usd: f64, policy: &ExecutionPolicy) -> usize {
        if !policy.split_enabled {
            return 1;
        }
        let tier_max = if trade_usd < 10_000.0 {
            3
        } else if trade_usd < 100_000.0 {
            5
        } else if trade_usd < 1_000_000.0 {
            8
        } else {
            12
        };
        tier_max.min(policy.max_chunks).max(1)
    }

    fn pick_baseline_only(
        &self,
        direct: ExecutionPlan,
        private: ExecutionPlan,
        ctx: &SearchContext<'_>,
    ) -> OptimizerOutcome {
        let direct_cost = direct.cost.clone();
        let mut private_cost = private.cost.clone();
        private_cost.savings = direct_cost.total_cost - private_cost.total_cost;

        let (winner, mut best) =
            if private.cost.total_cost < direct.cost.total_cost && private.feasible {
                (PlanWinner::Private, private)
            } else {
                (PlanWinner::Direct, direct)
            };
        best.cost.savings = direct_cost.total_cost - best.cost.total_cost;

        let full_shield = self.build_full_shield(&best, ctx);
        OptimizerOutcome {
            best,
            direct_baseline: direct_cost,
            private_baseline: private_cost,
            winner,
            unmitigated_mev_usd: ctx.unmitigated_mev_usd,
            full_shield,
        }
    }

    fn home_unavailable_outcome(&self, ctx: &SearchContext<'_>) -> OptimizerOutcome {
        let plan = self.evaluate(0, 1, ctx); // carries the warning + infeasible flag
        OptimizerOutcome {
            direct_baseline: plan.cost.clone(),
            private_baseline: plan.cost.clone(),
            winner: PlanWinner::Direct,
            unmitigated_mev_usd: ctx.unmitigated_mev_usd,
            full_shield: None,
            best: plan,
        }
    }

    /// 최적 계획에서 가장 큰 위험 청크를 릴레이로 돌린 변형.
    /// CRITICAL 위험에서 결정 엔진이 FULL_SHIELD로 쓴다.
    fn build_full_shield(
        &self,
        best: &ExecutionPlan,
        ctx: &SearchContext<'_>,
    ) -> Option<ExecutionPlan> {
        if !best.has_unsafe_chunk() {
            return None;
        }
        let home = ctx.home_pricing()?;

        let mut shielded = best.clone();
        let target = shielded
            .chunks
            .iter_mut()
            .filter(|c| !c.is_safe)
            .max_by(|a, b| a.amount_usd.cmp(&b.amount_usd))?;

        let chunk_f = target.amount_usd.to_f64().unwrap_or(0.0);
        target.channel = Channel::PrivateRelay;
        target.chain = ctx.home_chain;
        target.mev_exposure_usd = 0.0;
        target.bridge_cost_usd = 0.0;
        target.gas_cost_usd = home.swap_gas_cost_usd;
        target.relay_cost_usd =
            private_relay_cost_usd(chunk_f, home.liquidity_depth_usd, &self.config);
        target.is_safe = true;

        let trade_f = ctx.trade_f64();
        shielded.cost = self.aggregate_cost(&shielded.chunks, trade_f);
        shielded.cost.savings = best.cost.total_cost - shielded.cost.total_cost;
        Some(shielded)
    }

    /// 선택이 끝난 뒤에만 적용되는 외형적 분산. 패턴 탐지 회피용
    /// 장식이지 안전 보장이 아니며, 합계는 정확히 보존된다.
    fn apply_cosmetic_jitter(&self, plan: &mut ExecutionPlan, ctx: &SearchContext<'_>) {
        let public_indices: Vec<usize> = plan
            .chunks
            .iter()
            .enumerate()
            .filter(|(_, c)| c.channel == Channel::Public)
            .map(|(i, _)| i)
            .collect();
        if public_indices.len() < 2 {
            return;
        }

        let Some(home) = ctx.home_pricing() else { return };

        for pair in public_indices.chunks(2) {
            let [a, b] = pair else { continue };
            let limit = plan.chunks[*a].amount_usd.min(plan.chunks[*b].amount_usd);
            let jitter_pct = Decimal::from(fastrand::u32(0..=20) as i64 - 10) / Decimal::from(100);
            let delta = (limit * jitter_pct).round_dp(2);

            plan.chunks[*a].amount_usd += delta;
            plan.chunks[*b].amount_usd -= delta;
        }

        // 금액이 바뀐 청크만 재산정 (배치 체인은 유지)
        let trade_f = ctx.trade_f64();
        for index in public_indices {
            let chunk = &mut plan.chunks[index];
            let chunk_f = chunk.amount_usd.to_f64().unwrap_or(0.0);
            let depth = ctx
                .pricing
                .iter()
                .find(|p| p.chain == chunk.chain)
                .map(|p| p.liquidity_depth_usd)
                .unwrap_or(home.liquidity_depth_usd);
            chunk.mev_exposure_usd = chunk_mev_exposure_usd(
                chunk_f,
                depth,
                ctx.profile.mev_cost_multiplier,
                ctx.profile.safe_threshold_usd,
                &self.config,
            );
            chunk.is_safe = chunk.mev_exposure_usd == 0.0;
        }
        plan.cost = self.aggregate_cost(&plan.chunks, trade_f);
    }
}
