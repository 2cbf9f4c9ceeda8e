use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;

/// 생성자 주입 TTL 캐시. 읽기 위주 맵 + 재계산 시 스탬피드를 줄이기
/// 위한 단일 비동기 잠금 (엄밀한 exactly-once 보장은 요구되지 않음).
pub struct TtlCache<K, V> {
    entries: DashMap<K, (Instant, V)>,
    ttl: Duration,
    recompute_lock: Mutex<()>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            recompute_lock: Mutex::new(()),
        }
    }

    /// Fresh entry or None. Expired entries are evicted on read.
    pub fn get(&self, key: &K) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            let (inserted_at, value) = entry.value();
            if inserted_at.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        self.entries.remove(key);
        None
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 캐시 미스 시 compute를 실행해 채워 넣는다. 잠금을 들고 한 번 더
    /// 캐시를 확인하므로 동시 미스는 대부분 한 번의 재계산으로 수렴한다.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let _guard = self.recompute_lock.lock().await;
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}
