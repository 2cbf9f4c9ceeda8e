use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use alloy::primitives::Address;

use crate::providers::{ProviderError, ProviderResult, SwapHistoryProvider};
use crate::types::{RawSwapRecord, SwapCursor, SwapPage};

/// Canned swap history, paginated by (block_number, log_index) cursor
/// exactly like a real indexer. Idempotent under retry.
pub struct MockSwapHistoryProvider {
    records: Vec<RawSwapRecord>,
    page_cap: Option<usize>,
    fail: AtomicBool,
    fetch_count: AtomicUsize,
}

impl MockSwapHistoryProvider {
    pub fn new(mut records: Vec<RawSwapRecord>) -> Self {
        records.sort_by_key(|r| (r.block_number, r.log_index));
        Self {
            records,
            page_cap: None,
            fail: AtomicBool::new(false),
            fetch_count: AtomicUsize::new(0),
        }
    }

    /// Provider that fails every fetch (degraded-path tests).
    pub fn failing() -> Self {
        let provider = Self::new(Vec::new());
        provider.fail.store(true, Ordering::SeqCst);
        provider
    }

    /// Server-side page cap, regardless of the requested count.
    pub fn with_page_size(mut self, cap: usize) -> Self {
        self.page_cap = Some(cap);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwapHistoryProvider for MockSwapHistoryProvider {
    async fn fetch_swaps(
        &self,
        _pool: Address,
        count: usize,
        cursor: Option<SwapCursor>,
    ) -> ProviderResult<SwapPage> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::NetworkError("mock history offline".into()));
        }

        let start = match cursor {
            Some(c) => self
                .records
                .partition_point(|r| (r.block_number, r.log_index) <= (c.block_number, c.log_index)),
            None => 0,
        };

        let limit = self.page_cap.map_or(count, |cap| cap.min(count));
        let page: Vec<RawSwapRecord> =
            self.records[start..].iter().take(limit).cloned().collect();

        let next_cursor = page.last().map(|r| SwapCursor {
            block_number: r.block_number,
            log_index: r.log_index,
        });

        Ok(SwapPage { records: page, next_cursor })
    }
}
