//! Constant-product (x * y = k) pool math.
//!
//! 거래 수학 경로는 전부 U256 정수 연산이다. 부동소수점 금지.
//! 퇴화 입력(0 리저브, 0 금액, 오버플로)은 에러 대신 0을 반환하는
//! no-op 계약이며, 모든 호출자는 0을 "거래 불가"로 해석한다.

use alloy::primitives::U256;

use crate::constants::FEE_DENOMINATOR_BPS;
use crate::types::ReservePair;

fn fee_denominator() -> U256 {
    U256::from(FEE_DENOMINATOR_BPS)
}

/// Calculate AMM output amount using the x*y=k formula, with the
/// proportional fee deducted from the input side before the invariant
/// is applied.
pub fn amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256, fee_bps: u32) -> U256 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return U256::ZERO;
    }
    if fee_bps as u128 >= FEE_DENOMINATOR_BPS {
        return U256::ZERO;
    }

    let fee_numerator = U256::from(FEE_DENOMINATOR_BPS - fee_bps as u128);

    let amount_in_with_fee = match amount_in.checked_mul(fee_numerator) {
        Some(v) => v,
        None => return U256::ZERO,
    };
    let numerator = match amount_in_with_fee.checked_mul(reserve_out) {
        Some(v) => v,
        None => return U256::ZERO,
    };
    let denominator = match reserve_in
        .checked_mul(fee_denominator())
        .and_then(|v| v.checked_add(amount_in_with_fee))
    {
        Some(v) => v,
        None => return U256::ZERO,
    };

    numerator / denominator
}

/// Apply one swap and return (amount_out, new reserves). Reserves are
/// never mutated in place; sequential application models ordered swaps.
pub fn apply_swap(amount_in: U256, reserves: ReservePair, fee_bps: u32) -> (U256, ReservePair) {
    let out = amount_out(amount_in, reserves.reserve_in, reserves.reserve_out, fee_bps);
    if out.is_zero() {
        return (U256::ZERO, reserves);
    }
    let shifted = ReservePair::new(
        reserves.reserve_in.saturating_add(amount_in),
        reserves.reserve_out.saturating_sub(out),
    );
    (out, shifted)
}

/// Babylonian integer square root.
pub fn isqrt(value: U256) -> U256 {
    if value < U256::from(2u64) {
        return value;
    }
    let mut z = value;
    let mut x = (value >> 1) + U256::ONE;
    while x < z {
        z = x;
        x = (value / x + x) >> 1;
    }
    z
}

/// 단일 프런트런/백런 쌍에 대한 공격자 이익 극대화의 닫힌 해:
/// γ·(√(R·(R+Δ)) − R), γ = 1 − fee.
///
/// Returns 0 whenever the closed form is not well-defined; the caller
/// treats 0 as "no profitable attack".
pub fn optimal_frontrun_amount(reserve_in: U256, victim_amount_in: U256, fee_bps: u32) -> U256 {
    if reserve_in.is_zero() || victim_amount_in.is_zero() {
        return U256::ZERO;
    }
    if fee_bps as u128 >= FEE_DENOMINATOR_BPS {
        return U256::ZERO;
    }

    let sum = match reserve_in.checked_add(victim_amount_in) {
        Some(v) => v,
        None => return U256::ZERO,
    };
    let product = match reserve_in.checked_mul(sum) {
        Some(v) => v,
        None => return U256::ZERO,
    };

    let root = isqrt(product);
    if root <= reserve_in {
        return U256::ZERO;
    }

    let gamma_numerator = U256::from(FEE_DENOMINATOR_BPS - fee_bps as u128);
    let raw = root - reserve_in;
    match raw.checked_mul(gamma_numerator) {
        Some(scaled) => scaled / fee_denominator(),
        None => U256::ZERO,
    }
}

/// Price impact of a trade against the current reserves, as a fraction
/// (0.03 = 3%). Analytics only - not part of the integer trade path.
pub fn price_impact_pct(amount_in: U256, reserves: ReservePair, fee_bps: u32) -> f64 {
    use crate::common::formatting::u256_to_f64;

    if !reserves.is_valid() || amount_in.is_zero() {
        return 0.0;
    }

    let original_price = u256_to_f64(reserves.reserve_out) / u256_to_f64(reserves.reserve_in);
    let (out, shifted) = apply_swap(amount_in, reserves, fee_bps);
    if out.is_zero() {
        return 1.0;
    }

    let new_price = u256_to_f64(shifted.reserve_out) / u256_to_f64(shifted.reserve_in);
    ((original_price - new_price) / original_price).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(value: u64) -> U256 {
        U256::from(value) * U256::from(10u64).pow(U256::from(18u64))
    }

    #[test]
    fn test_amount_out_degenerate_inputs_return_zero() {
        let r = U256::from(1_000_000u64);
        assert_eq!(amount_out(U256::ZERO, r, r, 30), U256::ZERO);
        assert_eq!(amount_out(r, U256::ZERO, r, 30), U256::ZERO);
        assert_eq!(amount_out(r, r, U256::ZERO, 30), U256::ZERO);
        assert_eq!(amount_out(r, r, r, 10_000), U256::ZERO);
    }

    #[test]
    fn test_amount_out_monotonically_increasing_in_amount_in() {
        let reserve_in = eth(500);
        let reserve_out = U256::from(1_000_000u64) * U256::from(10u64).pow(U256::from(6u64));

        let mut previous = U256::ZERO;
        for input_eth in [1u64, 2, 5, 10, 20, 50, 100, 250] {
            let out = amount_out(eth(input_eth), reserve_in, reserve_out, 30);
            assert!(out > previous, "output must grow with input");
            previous = out;
        }
    }

    #[test]
    fn test_fee_always_costs_the_trader() {
        let reserve_in = eth(500);
        let reserve_out = eth(1_000_000);
        let amount_in = eth(10);

        let with_fee = amount_out(amount_in, reserve_in, reserve_out, 30);
        let no_fee = amount_out(amount_in, reserve_in, reserve_out, 0);
        assert!(with_fee < no_fee);

        // strictly below the proportional spot amount as well
        let proportional = amount_in * reserve_out / reserve_in;
        assert!(with_fee < proportional);
    }

    #[test]
    fn test_apply_swap_preserves_value_flow() {
        let reserves = ReservePair::new(eth(500), eth(1_000_000));
        let (out, shifted) = apply_swap(eth(10), reserves, 30);

        assert!(out > U256::ZERO);
        assert_eq!(shifted.reserve_in, reserves.reserve_in + eth(10));
        assert_eq!(shifted.reserve_out, reserves.reserve_out - out);
    }

    #[test]
    fn test_isqrt_exact_squares_and_neighbors() {
        assert_eq!(isqrt(U256::ZERO), U256::ZERO);
        assert_eq!(isqrt(U256::ONE), U256::ONE);
        assert_eq!(isqrt(U256::from(4u64)), U256::from(2u64));
        assert_eq!(isqrt(U256::from(15u64)), U256::from(3u64));
        assert_eq!(isqrt(U256::from(16u64)), U256::from(4u64));
        assert_eq!(isqrt(U256::from(17u64)), U256::from(4u64));

        let big = U256::from(10u64).pow(U256::from(36u64));
        assert_eq!(isqrt(big), U256::from(10u64).pow(U256::from(18u64)));
    }

    #[test]
    fn test_no_victim_trade_means_no_frontrun() {
        assert_eq!(
            optimal_frontrun_amount(eth(500), U256::ZERO, 30),
            U256::ZERO
        );
        assert_eq!(
            optimal_frontrun_amount(U256::ZERO, eth(20), 30),
            U256::ZERO
        );
    }

    #[test]
    fn test_optimal_frontrun_closed_form_scenario() {
        // R = 500 ETH, victim = 20 ETH, fee 0.3%
        // gamma * (sqrt(500 * 520) - 500) = 0.997 * 9.90195... ~ 9.872 ETH
        let frontrun = optimal_frontrun_amount(eth(500), eth(20), 30);
        assert!(frontrun > eth(9), "frontrun too small: {frontrun}");
        assert!(frontrun < eth(10), "frontrun too large: {frontrun}");
    }

    #[test]
    fn test_price_impact_grows_with_size() {
        let reserves = ReservePair::new(eth(500), eth(1_000_000));
        let small = price_impact_pct(eth(1), reserves, 30);
        let large = price_impact_pct(eth(50), reserves, 30);
        assert!(large > small);
        assert!(small > 0.0);
    }
}
