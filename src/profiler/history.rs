//! 과거 스왑 정규화 + 리저브 역산
//!
//! 현재 리저브에서 출발해 정렬된 스왑 목록을 역방향으로 걸으며 각
//! 스왑의 체결 직전 리저브를 복원한다. 블록별 아카이브 RPC 없이
//! 전체 이력의 리저브 스냅샷을 얻는 방법이다.

use alloy::primitives::U256;
use tracing::debug;

use crate::amm;
use crate::types::{NormalizedSwap, RawSwapRecord, ReservePair, SwapDirection};

/// Drop obviously broken records and order the survivors
/// chronologically by (block_number, log_index). That ordering is
/// load-bearing for reconstruction and detection alike.
pub fn normalize(records: Vec<RawSwapRecord>, sanity_ratio_floor: f64) -> Vec<NormalizedSwap> {
    let total = records.len();
    let mut swaps: Vec<NormalizedSwap> = records
        .into_iter()
        .filter(|r| {
            if r.amount_in.is_zero() || r.amount_out.is_zero() {
                return false;
            }
            if r.amount_in_usd <= 0.0 || r.amount_out_usd <= 0.0 {
                return false;
            }
            // 디코딩 아티팩트 필터: 출력/입력 달러 비율이 바닥 미만이면 버린다
            r.amount_out_usd / r.amount_in_usd >= sanity_ratio_floor
        })
        .map(|r| NormalizedSwap {
            block_number: r.block_number,
            log_index: r.log_index,
            sender: r.sender,
            direction: r.direction,
            amount_in: r.amount_in,
            amount_out: r.amount_out,
            amount_in_usd: r.amount_in_usd,
            amount_out_usd: r.amount_out_usd,
            pre_reserve_in: U256::ZERO,
            pre_reserve_out: U256::ZERO,
            expected_out: U256::ZERO,
            slippage_pct: 0.0,
            loss_usd: 0.0,
            sandwiched: false,
            attacker: None,
        })
        .collect();

    swaps.sort_by_key(|s| s.ordering_key());

    if swaps.len() < total {
        debug!("🧹 스왑 정규화: {}건 중 {}건 통과", total, swaps.len());
    }
    swaps
}

fn floor_one(value: U256) -> U256 {
    if value.is_zero() {
        U256::ONE
    } else {
        value
    }
}

/// Walk the sorted swaps in reverse from the pool's current reserves,
/// undoing each swap to fill in its pre-trade snapshot. Reserves are
/// floored at 1 to keep later divisions defined.
pub fn reconstruct_reserves(swaps: &mut [NormalizedSwap], current: ReservePair) {
    let mut reserve_in = current.reserve_in;
    let mut reserve_out = current.reserve_out;

    for swap in swaps.iter_mut().rev() {
        // (reserve_in, reserve_out)는 이 스왑 직후의 상태. 효과를 되돌린다.
        let (pre_in, pre_out) = match swap.direction {
            SwapDirection::Buy => (
                floor_one(reserve_in.saturating_sub(swap.amount_in)),
                reserve_out.saturating_add(swap.amount_out),
            ),
            SwapDirection::Sell => (
                reserve_in.saturating_add(swap.amount_out),
                floor_one(reserve_out.saturating_sub(swap.amount_in)),
            ),
        };

        swap.pre_reserve_in = pre_in;
        swap.pre_reserve_out = pre_out;
        reserve_in = pre_in;
        reserve_out = pre_out;
    }
}

/// Replay the reconstructed swaps forward from the earliest pre-trade
/// state. Exact integer arithmetic: the result must equal the current
/// reserves the reconstruction started from.
pub fn replay_forward(swaps: &[NormalizedSwap]) -> Option<ReservePair> {
    let first = swaps.first()?;
    let mut reserve_in = first.pre_reserve_in;
    let mut reserve_out = first.pre_reserve_out;

    for swap in swaps {
        match swap.direction {
            SwapDirection::Buy => {
                reserve_in = reserve_in.saturating_add(swap.amount_in);
                reserve_out = reserve_out.saturating_sub(swap.amount_out);
            }
            SwapDirection::Sell => {
                reserve_out = reserve_out.saturating_add(swap.amount_in);
                reserve_in = reserve_in.saturating_sub(swap.amount_out);
            }
        }
    }
    Some(ReservePair::new(reserve_in, reserve_out))
}

/// Annotate each swap with the output it should have produced against
/// its own pre-trade reserves, the realized slippage, and a dollar
/// loss estimate. Slippage is clamped to reject outliers.
pub fn annotate(swaps: &mut [NormalizedSwap], fee_bps: u32, slippage_ceiling_pct: f64) {
    use crate::common::formatting::u256_to_f64;

    for swap in swaps.iter_mut() {
        let (reserve_in, reserve_out) = match swap.direction {
            SwapDirection::Buy => (swap.pre_reserve_in, swap.pre_reserve_out),
            SwapDirection::Sell => (swap.pre_reserve_out, swap.pre_reserve_in),
        };

        swap.expected_out = amm::amount_out(swap.amount_in, reserve_in, reserve_out, fee_bps);
        if swap.expected_out.is_zero() {
            swap.slippage_pct = 0.0;
            swap.loss_usd = 0.0;
            continue;
        }

        let shortfall = swap.expected_out.saturating_sub(swap.amount_out);
        let raw_pct = u256_to_f64(shortfall) / u256_to_f64(swap.expected_out) * 100.0;
        swap.slippage_pct = raw_pct.clamp(0.0, slippage_ceiling_pct);
        swap.loss_usd = swap.slippage_pct / 100.0 * swap.amount_out_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    fn record(
        block: u64,
        index: u32,
        sender: u8,
        direction: SwapDirection,
        amount_in: u64,
        amount_out: u64,
    ) -> RawSwapRecord {
        RawSwapRecord {
            block_number: block,
            log_index: index,
            sender: Address::repeat_byte(sender),
            direction,
            amount_in: U256::from(amount_in),
            amount_out: U256::from(amount_out),
            amount_in_usd: amount_in as f64,
            amount_out_usd: amount_out as f64,
        }
    }

    #[test]
    fn test_normalize_filters_and_sorts() {
        let records = vec![
            record(10, 2, 1, SwapDirection::Buy, 100, 99),
            record(9, 5, 2, SwapDirection::Sell, 50, 49),
            record(10, 1, 3, SwapDirection::Buy, 80, 79),
            // zero amounts -> dropped
            record(11, 0, 4, SwapDirection::Buy, 0, 10),
            // ratio below sanity floor -> dropped
            record(11, 1, 5, SwapDirection::Buy, 1_000, 5),
        ];

        let swaps = normalize(records, 0.10);
        assert_eq!(swaps.len(), 3);
        assert_eq!(
            swaps.iter().map(|s| s.ordering_key()).collect::<Vec<_>>(),
            vec![(9, 5), (10, 1), (10, 2)]
        );
    }

    #[test]
    fn test_reconstruction_round_trip_is_exact() {
        // deterministic mixed-direction history, then verify forward
        // replay lands exactly on the current reserves
        let mut rng = fastrand::Rng::with_seed(7);
        let mut records = Vec::new();
        for i in 0..50u64 {
            let direction = if rng.bool() {
                SwapDirection::Buy
            } else {
                SwapDirection::Sell
            };
            records.push(record(
                100 + i / 4,
                (i % 4) as u32,
                (i % 7) as u8 + 1,
                direction,
                rng.u64(1_000..50_000),
                rng.u64(900..45_000),
            ));
        }

        let mut swaps = normalize(records, 0.0);
        let current = ReservePair::new(U256::from(10_000_000u64), U256::from(20_000_000u64));
        reconstruct_reserves(&mut swaps, current);

        let replayed = replay_forward(&swaps).unwrap();
        assert_eq!(replayed, current, "forward replay must reproduce current reserves");
    }

    #[test]
    fn test_reconstruction_floors_at_one() {
        let records = vec![record(1, 0, 1, SwapDirection::Buy, 1_000_000, 10)];
        let mut swaps = normalize(records, 0.0);
        // current reserve_in smaller than the undone amount_in
        reconstruct_reserves(&mut swaps, ReservePair::new(U256::from(5u64), U256::from(100u64)));
        assert_eq!(swaps[0].pre_reserve_in, U256::ONE);
    }

    #[test]
    fn test_annotate_computes_slippage_against_pre_reserves() {
        let records = vec![record(1, 0, 1, SwapDirection::Buy, 10_000, 9_000)];
        let mut swaps = normalize(records, 0.0);
        swaps[0].pre_reserve_in = U256::from(1_000_000u64);
        swaps[0].pre_reserve_out = U256::from(1_000_000u64);

        annotate(&mut swaps, 30, 50.0);

        assert!(swaps[0].expected_out > swaps[0].amount_out);
        assert!(swaps[0].slippage_pct > 0.0);
        assert!(swaps[0].slippage_pct <= 50.0);
        assert!(swaps[0].loss_usd > 0.0);
    }

    #[test]
    fn test_annotate_clamps_outliers() {
        let records = vec![record(1, 0, 1, SwapDirection::Buy, 10_000, 1)];
        let mut swaps = normalize(records, 0.0);
        swaps[0].pre_reserve_in = U256::from(1_000_000u64);
        swaps[0].pre_reserve_out = U256::from(1_000_000u64);

        annotate(&mut swaps, 30, 50.0);
        assert_eq!(swaps[0].slippage_pct, 50.0);
    }
}
