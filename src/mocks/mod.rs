//! Mock collaborators for tests and offline mode.
//!
//! 외부 수급자(체인 데이터, 스왑 이력, 브리지 견적)를 실제 연결 없이
//! 흉내낸다. 실패 주입을 지원해 degraded 경로 테스트에 쓰인다.

pub mod bridge_mock;
pub mod chain_mock;
pub mod history_mock;

pub use bridge_mock::MockBridgeQuoteProvider;
pub use chain_mock::MockChainDataProvider;
pub use history_mock::MockSwapHistoryProvider;
