//! 髒欄位追蹤
//!
//! 以編輯開始時的快照為基準，記錄使用者修改過的欄位，並產生只包含
//! 變更欄位的補丁。所有操作都是同步、純本地的狀態轉換，不會失敗。

use std::collections::BTreeSet;

use shop_core::{FieldName, FieldValue, Patch, Record, Snapshot};

/// 編輯工作階段的識別
///
/// 每次 `reset`/`close` 都會開始新的工作階段；舊的識別不再有效，
/// 用於忽略工作階段結束後才回來的非同步結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(u64);

/// 髒欄位追蹤器
#[derive(Debug, Clone)]
pub struct DirtyTracker<F: FieldName> {
    /// 編輯開始時的快照
    baseline: Option<Snapshot<F>>,
    /// 工作副本
    current: Option<Snapshot<F>>,
    /// 與快照不同的欄位
    dirty_fields: BTreeSet<F>,
    epoch: u64,
}

impl<F: FieldName> DirtyTracker<F> {
    /// 創建新的追蹤器（沒有進行中的記錄）
    pub fn new() -> Self {
        Self {
            baseline: None,
            current: None,
            dirty_fields: BTreeSet::new(),
            epoch: 0,
        }
    }

    /// 以快照開始編輯
    pub fn with_snapshot(snapshot: Snapshot<F>) -> Self {
        let mut tracker = Self::new();
        tracker.reset(Some(snapshot));
        tracker
    }

    /// 替換基準與工作副本，清除所有髒標記
    ///
    /// `None` 表示沒有進行中的記錄。
    pub fn reset(&mut self, snapshot: Option<Snapshot<F>>) {
        self.current = snapshot.clone();
        self.baseline = snapshot;
        self.dirty_fields.clear();
        self.epoch += 1;
    }

    /// 以記錄的快照重設
    pub fn reset_record<R>(&mut self, record: Option<&R>)
    where
        R: Record<Field = F>,
    {
        self.reset(record.map(Record::snapshot));
    }

    /// 僅在工作階段仍有效時重設；回傳是否已套用
    pub fn reset_if_current(&mut self, token: SessionToken, snapshot: Option<Snapshot<F>>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.reset(snapshot);
        true
    }

    /// 結束工作階段（關閉編輯視窗）
    pub fn close(&mut self) {
        self.reset(None);
    }

    /// 目前工作階段的識別
    pub fn token(&self) -> SessionToken {
        SessionToken(self.epoch)
    }

    pub fn is_current(&self, token: SessionToken) -> bool {
        token.0 == self.epoch
    }

    /// 修改欄位
    ///
    /// 未呼叫 `reset` 時工作副本由空映射開始，基準仍不存在，
    /// 因此每個修改過的欄位都視為髒。
    pub fn on_change(&mut self, field: F, value: impl Into<FieldValue>) {
        let value = value.into();

        let unchanged = self
            .baseline
            .as_ref()
            .and_then(|baseline| baseline.get(&field))
            .map(|original| original.same_as(&value))
            .unwrap_or(false);

        if unchanged {
            self.dirty_fields.remove(&field);
        } else {
            self.dirty_fields.insert(field);
        }

        self.current.get_or_insert_with(Snapshot::new).insert(field, value);
    }

    /// 取得只含變更欄位的補丁
    ///
    /// - 沒有工作副本：`None`
    /// - 有工作副本但沒有基準：整份工作副本（空則 `None`）
    /// - 沒有髒欄位：`None`
    pub fn changes(&self) -> Option<Patch<F>> {
        let current = self.current.as_ref()?;

        if self.baseline.is_none() {
            return Patch::from_map(current.clone());
        }

        let changed = self
            .dirty_fields
            .iter()
            .filter_map(|field| current.get(field).map(|value| (*field, value.clone())))
            .collect();
        Patch::from_map(changed)
    }

    /// 目前的工作副本
    pub fn current(&self) -> Option<&Snapshot<F>> {
        self.current.as_ref()
    }

    /// 編輯開始時的快照
    pub fn baseline(&self) -> Option<&Snapshot<F>> {
        self.baseline.as_ref()
    }

    /// 工作副本中的欄位值
    pub fn value(&self, field: F) -> Option<&FieldValue> {
        self.current.as_ref().and_then(|current| current.get(&field))
    }

    /// 是否有任何髒欄位（例如控制「儲存」按鈕）
    pub fn is_dirty(&self) -> bool {
        !self.dirty_fields.is_empty()
    }

    /// 檢查欄位是否為髒
    pub fn is_field_dirty(&self, field: F) -> bool {
        self.dirty_fields.contains(&field)
    }

    /// 獲取所有髒欄位
    pub fn dirty_fields(&self) -> &BTreeSet<F> {
        &self.dirty_fields
    }

    /// 是否有進行中的記錄
    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

impl<F: FieldName> Default for DirtyTracker<F> {
    fn default() -> Self {
        Self::new()
    }
}
