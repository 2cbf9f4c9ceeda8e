//! 프라이빗 릴레이 비용 모델
//!
//! 릴레이 비용은 희생자의 샌드위치 손실이 아니라 AMM 곡률이 만드는
//! 경쟁 아비트리지 번들의 가치에서 유도된다. 릴레이의 기회비용은
//! 사용자의 손실이 아니라 그 블록 공간을 살 수 있는 최고 경쟁
//! 번들이기 때문이다. 결과 비용은 거래 크기의 제곱에 비례하고 풀
//! 깊이에 반비례한다: 깊은 풀에서는 싸고 얕은 풀에서는 비싸다.

use super::OptimizerConfig;

/// Inclusion cost of one private-relay submission, in USD.
pub fn private_relay_cost_usd(trade_usd: f64, pool_depth_usd: f64, config: &OptimizerConfig) -> f64 {
    if trade_usd <= 0.0 {
        return 0.0;
    }
    if pool_depth_usd <= 0.0 {
        // 깊이를 모르는 풀: 유동성 가드가 어차피 막는다. 최소 팁만 청구.
        return config.min_relay_tip_usd;
    }

    let half_depth = pool_depth_usd / 2.0;

    // 가격 왜곡과 그것이 만드는 이론적 아비트리지 (크기 제곱, 깊이 반비례)
    let distortion = trade_usd / half_depth;
    let theoretical_arb_usd = config.arb_coefficient * half_depth * distortion * distortion;

    // 서쳐는 그중 일정 비율을 가스 바닥을 제하고 가져간다
    let searcher_net_usd =
        (theoretical_arb_usd * config.searcher_capture - config.searcher_gas_floor_usd).max(0.0);

    // 서쳐가 빌더에게 내는 입찰, 그 위에 포함 보장 프리미엄
    let builder_bid_usd = searcher_net_usd * config.builder_bid_fraction;
    (builder_bid_usd * (1.0 + config.inclusion_premium)).max(config.min_relay_tip_usd)
}

/// 청크 하나의 MEV 노출 (USD). 크기 제곱 / 깊이 반비례 모델에
/// 프로파일의 비용 승수를 곱한다. 경험적 안전 임계값 아래의 청크는
/// 역사적으로 공격이 수지에 맞지 않았으므로 노출 0으로 본다.
pub fn chunk_mev_exposure_usd(
    chunk_usd: f64,
    pool_depth_usd: f64,
    mev_cost_multiplier: f64,
    safe_threshold_usd: f64,
    config: &OptimizerConfig,
) -> f64 {
    if chunk_usd <= 0.0 || chunk_usd <= safe_threshold_usd {
        return 0.0;
    }
    if pool_depth_usd <= 0.0 {
        // conservative ceiling: a chunk cannot lose more than itself
        return chunk_usd;
    }

    let exposure = config.chunk_mev_coefficient * chunk_usd * chunk_usd / pool_depth_usd;
    (exposure * mev_cost_multiplier).min(chunk_usd)
}
