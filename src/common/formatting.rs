use alloy::primitives::U256;

/// Format wei amount to ETH with specified decimals
pub fn format_eth(wei: U256, decimals: usize) -> String {
    let eth = u256_to_f64(wei) / 1e18;
    format!("{:.1$}", eth, decimals)
}

/// Format gas price from wei to gwei
pub fn format_gas_price_gwei(gas_price_wei: U256) -> String {
    let gwei = u256_to_f64(gas_price_wei) / 1_000_000_000.0;
    format!("{:.2} gwei", gwei)
}

/// Format a USD figure
pub fn format_usd(value: f64) -> String {
    format!("${:.2}", value)
}

/// Format percentage
pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Lossy U256 -> f64 conversion for USD/percentage analytics.
/// 거래 수학 경로에서는 사용 금지 - 분석 표시 전용.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0f64, |acc, &limb| acc * 2f64.powi(64) + limb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eth() {
        let one_eth = U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(format_eth(one_eth, 2), "1.00");
        assert_eq!(format_eth(U256::ZERO, 4), "0.0000");
    }

    #[test]
    fn test_format_gas_price() {
        let thirty_gwei = U256::from(30_000_000_000u64);
        assert_eq!(format_gas_price_gwei(thirty_gwei), "30.00 gwei");
    }

    #[test]
    fn test_u256_to_f64_monotone() {
        let a = u256_to_f64(U256::from(1_000u64));
        let b = u256_to_f64(U256::from(2_000u64));
        assert!(b > a);
    }
}
