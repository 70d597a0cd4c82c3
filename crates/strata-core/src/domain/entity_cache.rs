//! EntityCache - list entity に付随するキャッシュの抽象化
//!
//! Codec はこの trait の `dump()` だけに依存します。
//! 具体的なキャッシュ型（LRU など）は利用側が自由に実装できます。
//!
//! # 学習ポイント
//! - trait object（`Arc<dyn EntityCache>`）による動的な capability
//! - 内部可変性（`Mutex`）で `&self` のまま更新する

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// CacheRecord はキャッシュ 1 件分の dump 形式
///
/// LRU キャッシュの dump 形式（`{ k, v, e }`）に合わせています。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(rename = "k")]
    pub key: String,

    #[serde(rename = "v")]
    pub value: serde_json::Value,

    /// 有効期限（epoch millis、0 は期限なし）
    #[serde(rename = "e", default)]
    pub expires_at: i64,
}

impl CacheRecord {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
            expires_at: 0,
        }
    }
}

/// EntityCache は record 列への dump をサポートするキャッシュ
///
/// # Thread Safety
/// - `Send + Sync` を要求（Model は複数タスクから参照される）
pub trait EntityCache: Send + Sync + std::fmt::Debug {
    /// 現在の内容を record 列として返す（順序は実装が決める）
    fn dump(&self) -> Vec<CacheRecord>;
}

/// RecordCache は record 列をそのまま保持する参照実装
///
/// 最近使ったものが先頭に来る（LRU の dump 順）。
#[derive(Debug, Default)]
pub struct RecordCache {
    records: Mutex<Vec<CacheRecord>>,
}

impl RecordCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// dump された record 列から再構築
    pub fn from_records(records: Vec<CacheRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// 値を追加（既存キーは置き換えて先頭へ移動）
    pub fn insert(&self, record: CacheRecord) {
        let mut records = self.lock();
        records.retain(|r| r.key != record.key);
        records.insert(0, record);
    }

    /// キーで検索（見つかれば先頭へ移動）
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let mut records = self.lock();
        let pos = records.iter().position(|r| r.key == key)?;
        let record = records.remove(pos);
        let value = record.value.clone();
        records.insert(0, record);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CacheRecord>> {
        // poison されても中身は record 列なので、そのまま使う
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EntityCache for RecordCache {
    fn dump(&self) -> Vec<CacheRecord> {
        self.lock().clone()
    }
}
