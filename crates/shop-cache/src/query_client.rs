//! 查詢快取客戶端
//!
//! 每個查詢鍵的狀態：
//! - `Fresh`：資料在新鮮期內，不需重新抓取
//! - `Stale`：沒有資料、已被失效或超過新鮮期，下次讀取時重新抓取
//! - `Fetching`：有抓取進行中；舊資料保持可見，不會被清空
//!
//! 抓取以 [`FetchTicket`] 表示。結果只有在票券仍是該鍵目前的抓取時才會
//! 套用：被放棄、被新抓取取代或早於失效的票券，其結果一律忽略。

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shop_core::{AdminError, Result};

use crate::clock::{Clock, SystemClock};
use crate::query_key::{QueryFilter, QueryKey};

/// 快取策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// 資料保持新鮮的時間
    pub stale_time: Duration,
    /// 無觀察者的項目保留時間
    pub gc_time: Duration,
}

impl CachePolicy {
    pub fn new(stale_time: Duration, gc_time: Duration) -> Self {
        Self { stale_time, gc_time }
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stale_time: Duration::zero(),
            gc_time: Duration::minutes(5),
        }
    }
}

/// 查詢狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Fresh,
    Stale,
    Fetching,
}

/// 觀察者（已掛載的視圖）識別
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// 進行中的抓取
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
    initiator: Option<ObserverId>,
}

impl FetchTicket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn initiator(&self) -> Option<ObserverId> {
        self.initiator
    }
}

/// 結果被忽略的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// 發起的視圖已卸載
    Abandoned,
    /// 之後有新的抓取或失效
    Superseded,
    /// 快取項目已被回收
    Evicted,
}

/// 抓取完成的處理結果
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Applied,
    Failed(AdminError),
    Ignored(IgnoreReason),
}

/// 視圖讀到的查詢結果
#[derive(Debug, Clone)]
pub struct QuerySnapshot<V> {
    pub data: Option<Arc<V>>,
    pub state: QueryState,
    /// 資料來自切換前的查詢鍵
    pub is_placeholder: bool,
    pub error: Option<AdminError>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<V> QuerySnapshot<V> {
    /// 首次載入中（沒有任何可顯示的資料）
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.state == QueryState::Fetching
    }

    /// 失敗且沒有資料可顯示；視圖應顯示可重試的錯誤，而非空清單
    pub fn is_error(&self) -> bool {
        self.error.is_some() && self.data.is_none()
    }
}

struct Entry<V> {
    data: Option<Arc<V>>,
    updated_at: Option<DateTime<Utc>>,
    error: Option<AdminError>,
    invalidated: bool,
    generation: u64,
    in_flight: Option<(u64, Option<ObserverId>)>,
    observers: BTreeSet<ObserverId>,
    idle_since: Option<DateTime<Utc>>,
    policy: CachePolicy,
}

impl<V> Entry<V> {
    fn new(policy: CachePolicy, now: DateTime<Utc>) -> Self {
        Self {
            data: None,
            updated_at: None,
            error: None,
            invalidated: false,
            generation: 0,
            in_flight: None,
            observers: BTreeSet::new(),
            idle_since: Some(now),
            policy,
        }
    }

    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.updated_at {
            _ if self.data.is_none() || self.invalidated => true,
            Some(at) => now - at >= self.policy.stale_time,
            None => true,
        }
    }

    fn state(&self, now: DateTime<Utc>) -> QueryState {
        if self.in_flight.is_some() {
            QueryState::Fetching
        } else if self.is_stale(now) {
            QueryState::Stale
        } else {
            QueryState::Fresh
        }
    }
}

struct Observer<V> {
    key: QueryKey,
    placeholder: Option<Arc<V>>,
}

/// 查詢快取客戶端
pub struct QueryClient<V> {
    entries: HashMap<QueryKey, Entry<V>>,
    observers: HashMap<ObserverId, Observer<V>>,
    next_observer: u64,
    /// 全域遞增，項目回收後重建也不會重複
    next_generation: u64,
    default_policy: CachePolicy,
    policies: HashMap<String, CachePolicy>,
    clock: Box<dyn Clock>,
}

impl<V> QueryClient<V> {
    /// 創建使用系統時鐘的客戶端
    pub fn new(default_policy: CachePolicy) -> Self {
        Self::with_clock(default_policy, Box::new(SystemClock))
    }

    pub fn with_clock(default_policy: CachePolicy, clock: Box<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            observers: HashMap::new(),
            next_observer: 0,
            next_generation: 0,
            default_policy,
            policies: HashMap::new(),
            clock,
        }
    }

    /// 設置某資源的快取策略（之後建立的項目生效）
    pub fn set_policy(&mut self, resource: &str, policy: CachePolicy) {
        self.policies.insert(resource.to_string(), policy);
    }

    pub fn policy_for(&self, resource: &str) -> CachePolicy {
        self.policies
            .get(resource)
            .copied()
            .unwrap_or(self.default_policy)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn entry_mut(&mut self, key: &QueryKey) -> &mut Entry<V> {
        let now = self.clock.now();
        let policy = self.policy_for(key.resource());
        self.entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(policy, now))
    }

    /// 讀取快取資料（不觸發抓取）
    pub fn get_cached(&self, key: &QueryKey) -> Option<Arc<V>> {
        self.entries.get(key).and_then(|e| e.data.clone())
    }

    /// 直接寫入快取資料，視為新鮮
    pub fn set_cached(&mut self, key: &QueryKey, value: V) {
        let now = self.clock.now();
        let entry = self.entry_mut(key);
        entry.data = Some(Arc::new(value));
        entry.updated_at = Some(now);
        entry.error = None;
        entry.invalidated = false;
    }

    /// 資料是否過期（不考慮是否正在抓取）
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        let now = self.clock.now();
        self.entries.get(key).map(|e| e.is_stale(now)).unwrap_or(true)
    }

    pub fn state(&self, key: &QueryKey) -> QueryState {
        let now = self.clock.now();
        self.entries
            .get(key)
            .map(|e| e.state(now))
            .unwrap_or(QueryState::Stale)
    }

    /// 需要開始抓取：過期且沒有進行中的抓取
    pub fn needs_fetch(&self, key: &QueryKey) -> bool {
        self.state(key) == QueryState::Stale
    }

    /// 將符合範圍的查詢標記為過期
    ///
    /// 進行中的抓取被視為已過時並被取代。回傳有觀察者、需要立即
    /// 重新抓取的查詢鍵（已排序）。
    pub fn invalidate(&mut self, filter: &QueryFilter) -> Vec<QueryKey> {
        let mut eager = Vec::new();

        for (key, entry) in self.entries.iter_mut().filter(|(k, _)| filter.matches(k)) {
            entry.invalidated = true;
            if entry.in_flight.take().is_some() {
                self.next_generation += 1;
                entry.generation = self.next_generation;
                tracing::debug!("查詢 {} 的進行中抓取已被失效取代", key);
            }
            if !entry.observers.is_empty() {
                eager.push(key.clone());
            }
        }

        eager.sort();
        tracing::debug!("失效 {}：{} 個查詢需要立即重新抓取", filter, eager.len());
        eager
    }

    /// 開始抓取；舊資料在完成前保持可見
    pub fn begin_fetch(&mut self, key: &QueryKey, initiator: Option<ObserverId>) -> FetchTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        let entry = self.entry_mut(key);
        entry.generation = generation;
        entry.in_flight = Some((generation, initiator));

        tracing::debug!("開始抓取 {} (generation {})", key, generation);
        FetchTicket {
            key: key.clone(),
            generation,
            initiator,
        }
    }

    /// 手動重新抓取（例如使用者按下「重試」），不論目前狀態
    pub fn refetch(&mut self, key: &QueryKey, initiator: Option<ObserverId>) -> FetchTicket {
        self.begin_fetch(key, initiator)
    }

    /// 完成抓取
    ///
    /// 失敗時保留原有資料並記錄錯誤。
    pub fn complete_fetch(&mut self, ticket: FetchTicket, result: Result<V>) -> FetchOutcome {
        let now = self.clock.now();
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            tracing::debug!("忽略 {} 的抓取結果：項目已回收", ticket.key);
            return FetchOutcome::Ignored(IgnoreReason::Evicted);
        };

        if entry.in_flight.map(|(g, _)| g) != Some(ticket.generation) {
            let reason = if entry.generation > ticket.generation {
                IgnoreReason::Superseded
            } else {
                IgnoreReason::Abandoned
            };
            tracing::debug!("忽略 {} 的抓取結果：{:?}", ticket.key, reason);
            return FetchOutcome::Ignored(reason);
        }

        entry.in_flight = None;
        match result {
            Ok(value) => {
                entry.data = Some(Arc::new(value));
                entry.updated_at = Some(now);
                entry.error = None;
                entry.invalidated = false;
                tracing::debug!("抓取 {} 完成", ticket.key);
                FetchOutcome::Applied
            }
            Err(err) => {
                tracing::warn!("抓取 {} 失敗: {}", ticket.key, err);
                entry.error = Some(err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }

    /// 放棄抓取；之後到達的結果會被忽略
    pub fn abandon(&mut self, ticket: &FetchTicket) {
        if let Some(entry) = self.entries.get_mut(&ticket.key) {
            if entry.in_flight.map(|(g, _)| g) == Some(ticket.generation) {
                entry.in_flight = None;
                tracing::debug!("放棄抓取 {} (generation {})", ticket.key, ticket.generation);
            }
        }
    }

    /// 需要時同步抓取，回傳目前資料
    pub fn fetch_with<F>(&mut self, key: &QueryKey, initiator: Option<ObserverId>, fetch: F) -> Result<Arc<V>>
    where
        F: FnOnce(&QueryKey) -> Result<V>,
    {
        if !self.needs_fetch(key) {
            if let Some(data) = self.get_cached(key) {
                return Ok(data);
            }
        }

        let ticket = self.begin_fetch(key, initiator);
        match self.complete_fetch(ticket, fetch(key)) {
            FetchOutcome::Failed(err) => Err(err),
            _ => self
                .get_cached(key)
                .ok_or_else(|| AdminError::Transport(format!("查詢 {} 沒有資料", key))),
        }
    }

    /// 掛載觀察者
    pub fn mount(&mut self, key: &QueryKey) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;

        let entry = self.entry_mut(key);
        entry.observers.insert(id);
        entry.idle_since = None;

        self.observers.insert(
            id,
            Observer {
                key: key.clone(),
                placeholder: None,
            },
        );
        id
    }

    /// 觀察者目前的查詢鍵
    pub fn observed_key(&self, observer: ObserverId) -> Option<&QueryKey> {
        self.observers.get(&observer).map(|o| &o.key)
    }

    /// 觀察者切換查詢鍵（換頁、改篩選條件）
    ///
    /// 新鍵尚無資料時，舊鍵的資料作為預留資料繼續顯示。
    pub fn switch_key(&mut self, observer: ObserverId, key: &QueryKey) {
        let Some(old_key) = self.observers.get(&observer).map(|o| o.key.clone()) else {
            return;
        };
        if old_key == *key {
            return;
        }

        let previous = self.get_cached(&old_key);
        self.detach(observer, &old_key);

        let entry = self.entry_mut(key);
        entry.observers.insert(observer);
        entry.idle_since = None;

        if let Some(obs) = self.observers.get_mut(&observer) {
            obs.key = key.clone();
            if previous.is_some() {
                obs.placeholder = previous;
            }
        }
    }

    /// 卸載觀察者；它發起且無人再等待的抓取會被放棄
    pub fn unmount(&mut self, observer: ObserverId) {
        if let Some(obs) = self.observers.remove(&observer) {
            self.detach(observer, &obs.key);
        }
    }

    fn detach(&mut self, observer: ObserverId, key: &QueryKey) {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get_mut(key) {
            entry.observers.remove(&observer);
            if entry.observers.is_empty() {
                entry.idle_since = Some(now);
                if matches!(entry.in_flight, Some((_, Some(init))) if init == observer) {
                    entry.in_flight = None;
                    tracing::debug!("觀察者卸載，放棄 {} 的抓取", key);
                }
            }
        }
    }

    /// 觀察者讀取目前結果
    pub fn read(&self, observer: ObserverId) -> Option<QuerySnapshot<V>> {
        let obs = self.observers.get(&observer)?;
        let mut snapshot = self.snapshot(&obs.key);
        if snapshot.data.is_none() && obs.placeholder.is_some() {
            snapshot.data = obs.placeholder.clone();
            snapshot.is_placeholder = true;
        }
        Some(snapshot)
    }

    /// 依查詢鍵讀取目前結果
    pub fn snapshot(&self, key: &QueryKey) -> QuerySnapshot<V> {
        let now = self.clock.now();
        match self.entries.get(key) {
            Some(entry) => QuerySnapshot {
                data: entry.data.clone(),
                state: entry.state(now),
                is_placeholder: false,
                error: entry.error.clone(),
                updated_at: entry.updated_at,
            },
            None => QuerySnapshot {
                data: None,
                state: QueryState::Stale,
                is_placeholder: false,
                error: None,
                updated_at: None,
            },
        }
    }

    /// 某查詢鍵的觀察者數量
    pub fn observer_count(&self, key: &QueryKey) -> usize {
        self.entries.get(key).map(|e| e.observers.len()).unwrap_or(0)
    }

    /// 回收閒置超過保留時間的項目；回傳回收數量
    pub fn collect_garbage(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            let expired = entry.observers.is_empty()
                && entry.in_flight.is_none()
                && entry
                    .idle_since
                    .map(|since| now - since >= entry.policy.gc_time)
                    .unwrap_or(false);
            !expired
        });

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!("回收 {} 個閒置查詢", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }
}
