use alloy::primitives::Address;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::str::FromStr;

// Gas units
pub const SWAP_GAS_UNITS: u64 = 200_000;
/// A sandwich spends two transactions (front-run + back-run).
pub const SANDWICH_GAS_UNITS: u64 = SWAP_GAS_UNITS * 2;

// Time constants (in seconds)
pub const ETH_BLOCK_TIME: u64 = 12;

// Constant-product pool fee (basis points)
pub const DEFAULT_POOL_FEE_BPS: u32 = 30;
pub const FEE_DENOMINATOR_BPS: u128 = 10_000;

// Degraded-mode assumptions. RPC 실패 시 명시적으로 이 값들이 사용되며,
// 결과에는 Degraded 모드가 표기된다.
pub const DEGRADED_ETH_PRICE_USD: f64 = 2_500.0;
pub const DEGRADED_GAS_PRICE_GWEI: u64 = 30;

// Profiler defaults
pub const DEFAULT_SAFE_THRESHOLD_USD: f64 = 1_000.0;

// Common token addresses (mainnet)
pub const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";
pub const USDC: &str = "0xA0b86a33E6417f8C681A1fFE6954e127c9cd8e46";
pub const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";
pub const DAI: &str = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
pub const WBTC: &str = "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599";

static TOKEN_ADDRESSES: Lazy<HashMap<&'static str, Address>> = Lazy::new(|| {
    let mut tokens = HashMap::new();
    tokens.insert("WETH", Address::from_str(WETH).unwrap());
    tokens.insert("USDC", Address::from_str(USDC).unwrap());
    tokens.insert("USDT", Address::from_str(USDT).unwrap());
    tokens.insert("DAI", Address::from_str(DAI).unwrap());
    tokens.insert("WBTC", Address::from_str(WBTC).unwrap());
    tokens
});

// Helper function to get token addresses
pub fn get_token_address(symbol: &str) -> Option<Address> {
    TOKEN_ADDRESSES.get(symbol.to_uppercase().as_str()).copied()
}
