//! 과거 MEV 프로파일러
//!
//! 풀 하나의 과거 스왑 이력을 받아 리저브를 역산하고 샌드위치
//! 패턴을 탐지해 0-100 위험 점수와 경험적 안전 거래 크기를 만든다.
//! 결과는 TTL 캐시에 저장되어 히트 시 재계산을 완전히 건너뛴다.

pub mod detector;
pub mod history;
pub mod score;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::common::TtlCache;
use crate::constants::{DEFAULT_POOL_FEE_BPS, DEFAULT_SAFE_THRESHOLD_USD};
use crate::providers::SwapHistoryProvider;
use crate::types::{PoolMevProfile, RawSwapRecord, ReservePair};

pub use detector::{DetectionSummary, DetectorConfig};

/// 프로파일러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Output/input USD ratio below this is a decoding artifact.
    pub sanity_ratio_floor: f64,
    /// Per-swap slippage clamp, percent.
    pub slippage_ceiling_pct: f64,
    pub detector: DetectorConfig,
    pub pool_fee_bps: u32,
    /// Percentile needs at least this many victims to be meaningful.
    pub min_victims_for_percentile: usize,
    pub default_safe_threshold_usd: f64,
    pub top_attacker_limit: usize,
    pub cache_ttl_secs: u64,
    pub page_size: usize,
    pub max_pages: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sanity_ratio_floor: 0.10,
            slippage_ceiling_pct: 50.0,
            detector: DetectorConfig::default(),
            pool_fee_bps: DEFAULT_POOL_FEE_BPS,
            min_victims_for_percentile: 10,
            default_safe_threshold_usd: DEFAULT_SAFE_THRESHOLD_USD,
            top_attacker_limit: 5,
            cache_ttl_secs: 600,
            page_size: 500,
            max_pages: 20,
        }
    }
}

pub struct MevProfiler {
    history: Arc<dyn SwapHistoryProvider>,
    cache: TtlCache<Address, PoolMevProfile>,
    config: ProfilerConfig,
}

impl MevProfiler {
    pub fn new(history: Arc<dyn SwapHistoryProvider>, config: ProfilerConfig) -> Self {
        let cache = TtlCache::new(Duration::from_secs(config.cache_ttl_secs));
        Self { history, cache, config }
    }

    /// 풀 프로파일 조회. 캐시 히트면 재계산 없이 반환하고,
    /// bypass_cache면 강제로 다시 계산한다. 이력 수급 실패는 중립
    /// degraded 프로파일로 강등되며 캐시에 남기지 않는다.
    pub async fn profile(
        &self,
        pool: Address,
        current_reserves: ReservePair,
        bypass_cache: bool,
    ) -> PoolMevProfile {
        if !bypass_cache {
            if let Some(cached) = self.cache.get(&pool) {
                debug!("📦 프로파일 캐시 히트: {}", pool);
                return cached;
            }
        }

        let records = match self.fetch_history(pool).await {
            Ok(records) => records,
            Err(e) => {
                warn!("⚠️ 이력 수급 실패, 중립 프로파일 강등: {} ({})", pool, e);
                return PoolMevProfile::degraded_default(
                    pool,
                    self.config.default_safe_threshold_usd,
                );
            }
        };

        let profile = self.build_profile(pool, records, current_reserves);
        self.cache.insert(pool, profile.clone());
        profile
    }

    pub fn invalidate(&self, pool: &Address) {
        self.cache.invalidate(pool);
    }

    /// Pure profiling pipeline over an already-fetched history.
    pub fn build_profile(
        &self,
        pool: Address,
        records: Vec<RawSwapRecord>,
        current_reserves: ReservePair,
    ) -> PoolMevProfile {
        let mut swaps = history::normalize(records, self.config.sanity_ratio_floor);
        history::reconstruct_reserves(&mut swaps, current_reserves);
        history::annotate(&mut swaps, self.config.pool_fee_bps, self.config.slippage_ceiling_pct);
        let detection = detector::detect(&mut swaps, &self.config.detector);
        score::aggregate(pool, &swaps, &detection, &self.config)
    }

    /// 커서 페이지네이션 루프. 요청보다 적게 돌아온 페이지는 소진
    /// 신호다 (에러 아님).
    async fn fetch_history(
        &self,
        pool: Address,
    ) -> Result<Vec<RawSwapRecord>, crate::providers::ProviderError> {
        let mut records = Vec::new();
        let mut cursor = None;

        for page_index in 0..self.config.max_pages {
            let page = self
                .history
                .fetch_swaps(pool, self.config.page_size, cursor)
                .await?;

            let fetched = page.records.len();
            records.extend(page.records);

            if fetched < self.config.page_size || page.next_cursor.is_none() {
                debug!(
                    "📥 이력 수급 완료: {}건 ({}페이지)",
                    records.len(),
                    page_index + 1
                );
                break;
            }
            cursor = page.next_cursor;
        }

        info!("📊 풀 {} 이력 {}건 수집", pool, records.len());
        Ok(records)
    }
}
