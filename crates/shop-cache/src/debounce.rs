//! 搜尋輸入防抖
//!
//! 輸入停止一段時間後才產生新的查詢鍵，避免每次按鍵都抓取。

use chrono::{DateTime, Duration, Utc};

/// 防抖後的值
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    settled: T,
    pending: Option<(T, DateTime<Utc>)>,
    delay: Duration,
}

impl<T: Clone + PartialEq> Debounced<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            settled: initial,
            pending: None,
            delay,
        }
    }

    /// 記錄新的輸入；重新開始計時
    pub fn set(&mut self, value: T, now: DateTime<Utc>) {
        self.pending = Some((value, now));
    }

    /// 延遲已過時採用最後的輸入；值確實改變時回傳新值
    pub fn poll(&mut self, now: DateTime<Utc>) -> Option<&T> {
        let ready = matches!(&self.pending, Some((_, at)) if now - *at >= self.delay);
        if !ready {
            return None;
        }

        let (value, _) = self.pending.take()?;
        if value == self.settled {
            return None;
        }
        self.settled = value;
        Some(&self.settled)
    }

    /// 目前已生效的值
    pub fn value(&self) -> &T {
        &self.settled
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
