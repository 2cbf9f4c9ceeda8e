pub mod policy;
pub mod traits;

pub use policy::StaticPolicyProvider;
pub use traits::{
    BridgeCostEstimate, BridgeQuoteProvider, ChainDataProvider, PolicyProvider, ProviderError,
    ProviderResult, SwapHistoryProvider,
};
