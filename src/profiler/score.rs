//! 0-100 MEV 온도 집계
//!
//! 세 성분의 합: 희생자 비율 (최대 40점), 희생자 평균 슬리피지
//! (최대 30점), 샌드위치 밀도 (최대 30점). 밀도는 직접 탐지 빈도와
//! 손실/거래량 비율 중 큰 쪽을 쓴다 - 탐지가 놓친 풀이라도 손실
//! 신호만으로 뜨거운 풀을 드러낼 수 있게 하는 의도적 OR다.

use alloy::primitives::Address;
use chrono::Utc;
use tracing::info;

use crate::types::{NormalizedSwap, PoolMevProfile, PoolRiskTier};

use super::detector::DetectionSummary;
use super::ProfilerConfig;

pub fn aggregate(
    pool: Address,
    swaps: &[NormalizedSwap],
    detection: &DetectionSummary,
    config: &ProfilerConfig,
) -> PoolMevProfile {
    let sample_size = swaps.len();
    if sample_size == 0 {
        return PoolMevProfile::degraded_default(pool, config.default_safe_threshold_usd);
    }

    let victims: Vec<&NormalizedSwap> = swaps.iter().filter(|s| s.sandwiched).collect();
    let victim_rate = victims.len() as f64 / sample_size as f64;

    // (a) 희생자 비율 성분
    let victim_component = (victim_rate * 100.0 * 0.8).min(40.0);

    // (b) 희생자 평균 슬리피지 성분
    let avg_victim_slippage = if victims.is_empty() {
        0.0
    } else {
        victims.iter().map(|s| s.slippage_pct).sum::<f64>() / victims.len() as f64
    };
    let slippage_component = (avg_victim_slippage * 10.0).min(30.0);

    // (c) 밀도 성분: 탐지 빈도와 손실/거래량 비율 중 큰 쪽
    let sandwich_per_100 = detection.sandwich_count as f64 / sample_size as f64 * 100.0;
    let total_volume_usd: f64 = swaps.iter().map(|s| s.amount_in_usd).sum();
    let total_loss_usd: f64 = victims.iter().map(|s| s.loss_usd).sum();
    let loss_to_volume_pct = if total_volume_usd > 0.0 {
        total_loss_usd / total_volume_usd * 100.0
    } else {
        0.0
    };
    let density_component = (sandwich_per_100.max(loss_to_volume_pct) * 3.0).min(30.0);

    let score = victim_component + slippage_component + density_component;
    let tier = PoolRiskTier::from_score(score);

    let safe_threshold_usd = empirical_safe_threshold(&victims, config);

    let profile = PoolMevProfile {
        pool,
        score,
        tier,
        mev_cost_multiplier: 1.0 + score / 50.0,
        safe_threshold_usd,
        victim_rate,
        sandwich_count: detection.sandwich_count,
        top_attackers: detection.top_attackers(config.top_attacker_limit),
        sample_size,
        generated_at: Utc::now(),
        degraded: false,
    };

    info!(
        "🌡️ 풀 {} MEV 온도 {:.1} ({}) - 샌드위치 {}건 / 표본 {}건",
        pool, profile.score, profile.tier, profile.sandwich_count, profile.sample_size
    );

    profile
}

/// 과거 희생자 거래 크기의 10번째 백분위수. 그 아래 크기의 거래는
/// 역사적으로 공격을 피해 왔다. 희생자가 10건 미만이면 백분위수가
/// 통계적으로 무의미하므로 고정 기본값으로 폴백한다.
fn empirical_safe_threshold(victims: &[&NormalizedSwap], config: &ProfilerConfig) -> f64 {
    if victims.len() < config.min_victims_for_percentile {
        return config.default_safe_threshold_usd;
    }

    let mut sizes: Vec<f64> = victims.iter().map(|s| s.amount_in_usd).collect();
    sizes.sort_by(|a, b| a.total_cmp(b));
    let index = (sizes.len() as f64 * 0.10).floor() as usize;
    sizes[index.min(sizes.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SwapDirection;
    use alloy::primitives::U256;
    use std::collections::HashMap;

    fn victim(usd: f64, slippage_pct: f64) -> NormalizedSwap {
        NormalizedSwap {
            block_number: 1,
            log_index: 0,
            sender: Address::repeat_byte(1),
            direction: SwapDirection::Buy,
            amount_in: U256::from(1u64),
            amount_out: U256::from(1u64),
            amount_in_usd: usd,
            amount_out_usd: usd,
            pre_reserve_in: U256::ONE,
            pre_reserve_out: U256::ONE,
            expected_out: U256::ONE,
            slippage_pct,
            loss_usd: usd * slippage_pct / 100.0,
            sandwiched: true,
            attacker: Some(Address::repeat_byte(9)),
        }
    }

    fn bystander(usd: f64) -> NormalizedSwap {
        let mut s = victim(usd, 0.0);
        s.sandwiched = false;
        s.attacker = None;
        s.loss_usd = 0.0;
        s
    }

    fn config() -> ProfilerConfig {
        ProfilerConfig::default()
    }

    #[test]
    fn test_empty_sample_degrades() {
        let profile = aggregate(Address::ZERO, &[], &DetectionSummary::default(), &config());
        assert!(profile.degraded);
        assert_eq!(profile.mev_cost_multiplier, 1.0);
    }

    #[test]
    fn test_quiet_pool_scores_low() {
        let swaps: Vec<NormalizedSwap> = (0..50).map(|_| bystander(1_000.0)).collect();
        let profile = aggregate(Address::ZERO, &swaps, &DetectionSummary::default(), &config());

        assert_eq!(profile.score, 0.0);
        assert_eq!(profile.tier, PoolRiskTier::Low);
        assert_eq!(profile.mev_cost_multiplier, 1.0);
        assert_eq!(profile.victim_rate, 0.0);
    }

    #[test]
    fn test_hot_pool_scores_extreme_and_components_cap() {
        // 전원 희생자 + 높은 슬리피지: 각 성분이 상한에서 멈춰야 한다
        let swaps: Vec<NormalizedSwap> = (0..40).map(|_| victim(10_000.0, 20.0)).collect();
        let mut detection = DetectionSummary::default();
        detection.sandwich_count = 40;
        detection
            .attacker_totals
            .insert(Address::repeat_byte(9), (40, 50_000.0));

        let profile = aggregate(Address::ZERO, &swaps, &detection, &config());

        assert_eq!(profile.score, 100.0); // 40 + 30 + 30, capped
        assert_eq!(profile.tier, PoolRiskTier::Extreme);
        assert!((profile.mev_cost_multiplier - 3.0).abs() < 1e-9);
        assert_eq!(profile.top_attackers.len(), 1);
    }

    #[test]
    fn test_density_or_takes_the_larger_signal() {
        // 탐지 0건이어도 손실/거래량 비율이 밀도 성분을 끌어올린다
        let mut swaps: Vec<NormalizedSwap> = (0..10).map(|_| bystander(100.0)).collect();
        let mut heavy_loss = victim(100.0, 50.0);
        heavy_loss.loss_usd = 50.0;
        swaps.push(heavy_loss);

        let profile = aggregate(Address::ZERO, &swaps, &DetectionSummary::default(), &config());
        // loss/volume = 50/1100 ~ 4.5% -> density > 0 despite zero detections
        assert!(profile.score > 0.0);
    }

    #[test]
    fn test_safe_threshold_is_tenth_percentile() {
        let mut swaps: Vec<NormalizedSwap> = Vec::new();
        for i in 1..=20 {
            swaps.push(victim(i as f64 * 100.0, 2.0));
        }
        let profile = aggregate(Address::ZERO, &swaps, &DetectionSummary::default(), &config());
        // sizes 100..2000, 10th percentile lands at index 2 -> $300
        assert_eq!(profile.safe_threshold_usd, 300.0);
    }

    #[test]
    fn test_safe_threshold_falls_back_below_ten_victims() {
        let mut swaps: Vec<NormalizedSwap> = (0..30).map(|_| bystander(1_000.0)).collect();
        for _ in 0..5 {
            swaps.push(victim(50.0, 2.0));
        }
        let profile = aggregate(Address::ZERO, &swaps, &DetectionSummary::default(), &config());
        assert_eq!(
            profile.safe_threshold_usd,
            config().default_safe_threshold_usd
        );
    }

    #[test]
    fn test_attacker_totals_type_is_stable() {
        // HashMap<Address, (count, usd)> contract used by score + profiler
        let mut totals: HashMap<Address, (u32, f64)> = HashMap::new();
        totals.insert(Address::ZERO, (1, 10.0));
        let summary = DetectionSummary {
            sandwich_count: 1,
            attacker_totals: totals,
        };
        assert_eq!(summary.top_attackers(5).len(), 1);
    }
}
