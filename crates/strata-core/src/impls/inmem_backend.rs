//! InMemoryBackend - 開発・テスト用の StorageBackend
//!
//! # 学習ポイント
//! - `tokio::sync::RwLock` による読み書きの排他
//! - Clock の注入で更新日時を決定的にする
//! - 同じ更新日時の並びを書き込み順（sequence）で安定させる

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::glob::ListingFilter;
use crate::ports::{
    BackendError, Clock, ListingOptions, SortColumn, StorageBackend, SystemClock,
};

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    modified_on: DateTime<Utc>,
    /// 書き込み順（同時刻の tie-break 用）
    sequence: u64,
}

#[derive(Debug, Default)]
struct InMemoryState {
    /// (directory, name) -> file
    files: HashMap<(String, String), StoredFile>,
    next_sequence: u64,
}

/// InMemoryBackend はプロセス内の HashMap にファイルを保持する
///
/// # 使用例
/// ```ignore
/// let backend = InMemoryBackend::new();
/// backend.upsert_file("./models", "h1.en.model", &bytes).await?;
/// let names = backend
///     .directory_listing("./models", "*.en.model", &ListingOptions::default())
///     .await?;
/// ```
pub struct InMemoryBackend {
    state: RwLock<InMemoryState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(InMemoryState::default()),
            clock,
        }
    }

    /// 保存されているファイル数（全ディレクトリ）
    pub async fn len(&self) -> usize {
        self.state.read().await.files.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 更新日時を取得（テスト・診断用）
    pub async fn modified_on(&self, directory: &str, name: &str) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .await
            .files
            .get(&key(directory, name))
            .map(|file| file.modified_on)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn key(directory: &str, name: &str) -> (String, String) {
    (directory.to_string(), name.to_string())
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn file_exists(&self, directory: &str, name: &str) -> Result<bool, BackendError> {
        Ok(self
            .state
            .read()
            .await
            .files
            .contains_key(&key(directory, name)))
    }

    async fn read_file_as_buffer(
        &self,
        directory: &str,
        name: &str,
    ) -> Result<Vec<u8>, BackendError> {
        self.state
            .read()
            .await
            .files
            .get(&key(directory, name))
            .map(|file| file.content.clone())
            .ok_or_else(|| BackendError::NotFound(format!("{directory}/{name}")))
    }

    async fn upsert_file(
        &self,
        directory: &str,
        name: &str,
        content: &[u8],
    ) -> Result<(), BackendError> {
        let modified_on = self.clock.now();
        let mut state = self.state.write().await;
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.files.insert(
            key(directory, name),
            StoredFile {
                content: content.to_vec(),
                modified_on,
                sequence,
            },
        );
        Ok(())
    }

    async fn delete_file(&self, directory: &str, name: &str) -> Result<(), BackendError> {
        self.state
            .write()
            .await
            .files
            .remove(&key(directory, name))
            .map(|_| ())
            .ok_or_else(|| BackendError::NotFound(format!("{directory}/{name}")))
    }

    async fn directory_listing(
        &self,
        directory: &str,
        pattern: &str,
        options: &ListingOptions,
    ) -> Result<Vec<String>, BackendError> {
        let filter = ListingFilter::new(
            pattern,
            options.exclude.as_deref(),
            &options.paths_to_omit,
        )?;

        let state = self.state.read().await;
        let mut entries: Vec<(&String, &StoredFile)> = state
            .files
            .iter()
            .filter(|((dir, name), _)| dir == directory && filter.accepts(name))
            .map(|((_, name), file)| (name, file))
            .collect();

        match options.sort_order {
            Some(order) => {
                entries.sort_by(|(a_name, a), (b_name, b)| {
                    let ordering = match order.column {
                        SortColumn::ModifiedOn => (a.modified_on, a.sequence)
                            .cmp(&(b.modified_on, b.sequence)),
                        SortColumn::Name => a_name.cmp(b_name),
                    };
                    if order.desc { ordering.reverse() } else { ordering }
                });
            }
            // HashMap の順序を外に漏らさないよう、指定が無くても名前順にする
            None => entries.sort_by(|(a, _), (b, _)| a.cmp(b)),
        }

        Ok(entries.into_iter().map(|(name, _)| name.clone()).collect())
    }
}
