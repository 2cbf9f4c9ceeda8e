use async_trait::async_trait;
use alloy::primitives::{Address, U256};
use dashmap::{DashMap, DashSet};

use crate::providers::{ChainDataProvider, ProviderError, ProviderResult};
use crate::types::{Chain, ReservePair};

/// Configurable in-memory chain data source. Every lookup can be
/// seeded per chain, and whole chains can be failed to exercise the
/// degraded paths.
pub struct MockChainDataProvider {
    reserves: DashMap<(Chain, Address), ReservePair>,
    pair_addresses: DashMap<(Chain, Address, Address), Address>,
    gas_prices: DashMap<Chain, U256>,
    native_prices: DashMap<Chain, f64>,
    token_prices: DashMap<(Chain, Address), f64>,
    token_decimals: DashMap<(Chain, Address), u8>,
    liquidity_depths: DashMap<Chain, f64>,
    failed_chains: DashSet<Chain>,
}

impl MockChainDataProvider {
    pub fn new() -> Self {
        Self {
            reserves: DashMap::new(),
            pair_addresses: DashMap::new(),
            gas_prices: DashMap::new(),
            native_prices: DashMap::new(),
            token_prices: DashMap::new(),
            token_decimals: DashMap::new(),
            liquidity_depths: DashMap::new(),
            failed_chains: DashSet::new(),
        }
    }

    /// 오프라인 데모용 프리셋: 메인넷 30 gwei / ETH $2,500 기준의
    /// 그럴듯한 체인별 수치들.
    pub fn mainnet_defaults() -> Self {
        let provider = Self::new();
        let gwei = |v: u64| U256::from(v) * U256::from(1_000_000_000u64);
        let milligwei = |v: u64| U256::from(v) * U256::from(1_000_000u64);

        provider.set_gas_price(Chain::Ethereum, gwei(30));
        provider.set_gas_price(Chain::Arbitrum, milligwei(100));
        provider.set_gas_price(Chain::Optimism, milligwei(50));
        provider.set_gas_price(Chain::Base, milligwei(50));
        provider.set_gas_price(Chain::Polygon, gwei(80));

        for chain in Chain::all() {
            provider.set_native_price(*chain, match chain {
                Chain::Polygon => 0.75,
                _ => 2_500.0,
            });
        }

        provider.set_liquidity_depth(Chain::Ethereum, 5_000_000.0);
        provider.set_liquidity_depth(Chain::Arbitrum, 1_500_000.0);
        provider.set_liquidity_depth(Chain::Optimism, 800_000.0);
        provider.set_liquidity_depth(Chain::Base, 600_000.0);
        provider.set_liquidity_depth(Chain::Polygon, 400_000.0);

        provider
    }

    pub fn set_reserves(&self, chain: Chain, pool: Address, reserves: ReservePair) {
        self.reserves.insert((chain, pool), reserves);
    }

    pub fn set_pair_address(&self, chain: Chain, token_a: Address, token_b: Address, pool: Address) {
        self.pair_addresses.insert((chain, token_a, token_b), pool);
        self.pair_addresses.insert((chain, token_b, token_a), pool);
    }

    pub fn set_gas_price(&self, chain: Chain, gas_price: U256) {
        self.gas_prices.insert(chain, gas_price);
    }

    pub fn set_native_price(&self, chain: Chain, price_usd: f64) {
        self.native_prices.insert(chain, price_usd);
    }

    pub fn set_token_price(&self, chain: Chain, token: Address, price_usd: f64) {
        self.token_prices.insert((chain, token), price_usd);
    }

    pub fn set_token_decimals(&self, chain: Chain, token: Address, decimals: u8) {
        self.token_decimals.insert((chain, token), decimals);
    }

    pub fn set_liquidity_depth(&self, chain: Chain, depth_usd: f64) {
        self.liquidity_depths.insert(chain, depth_usd);
    }

    /// 이 체인의 모든 조회가 실패한다 (가용성 false 포함).
    pub fn fail_chain(&self, chain: Chain) {
        self.failed_chains.insert(chain);
    }

    pub fn restore_chain(&self, chain: Chain) {
        self.failed_chains.remove(&chain);
    }

    fn check_chain(&self, chain: Chain) -> ProviderResult<()> {
        if self.failed_chains.contains(&chain) {
            Err(ProviderError::ChainUnavailable(chain))
        } else {
            Ok(())
        }
    }
}

impl Default for MockChainDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainDataProvider for MockChainDataProvider {
    async fn get_reserves(&self, chain: Chain, pool: Address) -> ProviderResult<ReservePair> {
        self.check_chain(chain)?;
        self.reserves
            .get(&(chain, pool))
            .map(|entry| *entry.value())
            .ok_or(ProviderError::PoolNotFound(pool))
    }

    async fn get_gas_price(&self, chain: Chain) -> ProviderResult<U256> {
        self.check_chain(chain)?;
        self.gas_prices
            .get(&chain)
            .map(|entry| *entry.value())
            .ok_or(ProviderError::ChainUnavailable(chain))
    }

    async fn get_pair_address(
        &self,
        chain: Chain,
        token_a: Address,
        token_b: Address,
    ) -> ProviderResult<Option<Address>> {
        self.check_chain(chain)?;
        Ok(self
            .pair_addresses
            .get(&(chain, token_a, token_b))
            .map(|entry| *entry.value()))
    }

    async fn get_token_decimals(&self, chain: Chain, token: Address) -> ProviderResult<u8> {
        self.check_chain(chain)?;
        Ok(self
            .token_decimals
            .get(&(chain, token))
            .map(|entry| *entry.value())
            .unwrap_or(18))
    }

    async fn get_token_price_usd(&self, chain: Chain, token: Address) -> ProviderResult<f64> {
        self.check_chain(chain)?;
        if let Some(price) = self.token_prices.get(&(chain, token)) {
            return Ok(*price.value());
        }
        // unseeded tokens fall back to the native asset price
        self.get_native_price_usd(chain).await
    }

    async fn get_native_price_usd(&self, chain: Chain) -> ProviderResult<f64> {
        self.check_chain(chain)?;
        self.native_prices
            .get(&chain)
            .map(|entry| *entry.value())
            .ok_or(ProviderError::ChainUnavailable(chain))
    }

    async fn get_liquidity_depth_usd(&self, chain: Chain) -> ProviderResult<f64> {
        self.check_chain(chain)?;
        self.liquidity_depths
            .get(&chain)
            .map(|entry| *entry.value())
            .ok_or(ProviderError::ChainUnavailable(chain))
    }

    async fn chain_available(&self, chain: Chain) -> bool {
        !self.failed_chains.contains(&chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_chain_reports_unavailable() {
        let provider = MockChainDataProvider::mainnet_defaults();
        provider.fail_chain(Chain::Arbitrum);

        assert!(!provider.chain_available(Chain::Arbitrum).await);
        assert!(matches!(
            provider.get_gas_price(Chain::Arbitrum).await,
            Err(ProviderError::ChainUnavailable(Chain::Arbitrum))
        ));

        // 다른 체인은 영향 없음
        assert!(provider.get_gas_price(Chain::Ethereum).await.is_ok());

        provider.restore_chain(Chain::Arbitrum);
        assert!(provider.get_gas_price(Chain::Arbitrum).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_pool_is_explicit() {
        let provider = MockChainDataProvider::mainnet_defaults();
        let missing = Address::repeat_byte(0x42);
        assert!(matches!(
            provider.get_reserves(Chain::Ethereum, missing).await,
            Err(ProviderError::PoolNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_pair_address_is_direction_agnostic() {
        let provider = MockChainDataProvider::new();
        let (a, b, pool) = (
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            Address::repeat_byte(3),
        );
        provider.set_pair_address(Chain::Ethereum, a, b, pool);

        assert_eq!(
            provider.get_pair_address(Chain::Ethereum, b, a).await.unwrap(),
            Some(pool)
        );
    }
}
