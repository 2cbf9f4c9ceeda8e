use anyhow::Result;
use async_trait::async_trait;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::types::{Chain, ExecutionPolicy, ReservePair, SwapCursor, SwapPage};

/// Provider operation result type
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Collaborator-specific errors. Unavailability is a value, not a
/// panic - callers degrade on it instead of failing the request.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Chain unavailable: {0}")]
    ChainUnavailable(Chain),

    #[error("Pool not found: {0}")]
    PoolNotFound(Address),

    #[error("Route unsupported: {from} -> {to}")]
    UnsupportedRoute { from: Chain, to: Chain },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// 온체인 데이터 수급자. 체인별 가용성은 예외가 아니라 명시적 상태로
/// 보고해야 한다.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    async fn get_reserves(&self, chain: Chain, pool: Address) -> ProviderResult<ReservePair>;

    async fn get_gas_price(&self, chain: Chain) -> ProviderResult<U256>;

    async fn get_pair_address(
        &self,
        chain: Chain,
        token_a: Address,
        token_b: Address,
    ) -> ProviderResult<Option<Address>>;

    async fn get_token_decimals(&self, chain: Chain, token: Address) -> ProviderResult<u8>;

    async fn get_token_price_usd(&self, chain: Chain, token: Address) -> ProviderResult<f64>;

    async fn get_native_price_usd(&self, chain: Chain) -> ProviderResult<f64>;

    /// Estimated depth of the relevant pool/market on this chain.
    async fn get_liquidity_depth_usd(&self, chain: Chain) -> ProviderResult<f64>;

    async fn chain_available(&self, chain: Chain) -> bool;
}

/// 과거 스왑 이력 수급자. (block, log_index) 커서로 페이지네이션하며
/// 재시도에 멱등해야 한다. 요청보다 적은 레코드는 소진 신호이지
/// 에러가 아니다.
#[async_trait]
pub trait SwapHistoryProvider: Send + Sync {
    async fn fetch_swaps(
        &self,
        pool: Address,
        count: usize,
        cursor: Option<SwapCursor>,
    ) -> ProviderResult<SwapPage>;
}

/// Cross-chain transfer cost estimate. Bridging is modeled as a cost
/// only; nothing is ever executed here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeCostEstimate {
    pub fees_usd: f64,
    pub gas_usd: f64,
    pub execution_seconds: u64,
}

impl BridgeCostEstimate {
    pub fn total_usd(&self) -> f64 {
        self.fees_usd + self.gas_usd
    }
}

#[async_trait]
pub trait BridgeQuoteProvider: Send + Sync {
    /// None = route quoted but unavailable right now.
    async fn quote(
        &self,
        from: Chain,
        to: Chain,
        token: Address,
        amount_usd: f64,
    ) -> ProviderResult<Option<BridgeCostEstimate>>;
}

/// 사용자 정책 수급자. 정책이 없으면 문서화된 기본값을 돌려준다.
#[async_trait]
pub trait PolicyProvider: Send + Sync {
    async fn get_policy(&self, trader: Address) -> ProviderResult<ExecutionPolicy>;
}
