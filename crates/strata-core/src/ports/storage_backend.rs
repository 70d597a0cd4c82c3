//! StorageBackend port - ファイルストレージの抽象化
//!
//! ModelStore はこの trait だけを通して読み書きします。
//! transaction や lock は提供されない前提です（一覧・読み・書き・削除のみ）。
//!
//! # 実装
//! - `impls::InMemoryBackend`: 開発・テスト用
//! - `impls::LocalFsBackend`: ローカルディレクトリ

use async_trait::async_trait;

/// BackendError は backend の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// 一覧のソート列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    Name,
    #[default]
    ModifiedOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: SortColumn,
    pub desc: bool,
}

impl SortOrder {
    /// 更新日時の新しい順（index 0 が最新）
    pub fn newest_first() -> Self {
        Self {
            column: SortColumn::ModifiedOn,
            desc: true,
        }
    }
}

/// directory_listing のオプション
#[derive(Debug, Clone, Default)]
pub struct ListingOptions {
    /// 除外する glob
    pub exclude: Option<String>,

    /// 除外するファイル名
    pub paths_to_omit: Vec<String>,

    /// `None` の場合、順序は実装依存
    pub sort_order: Option<SortOrder>,
}

impl ListingOptions {
    pub fn sorted(sort_order: SortOrder) -> Self {
        Self {
            sort_order: Some(sort_order),
            ..Self::default()
        }
    }
}

/// StorageBackend はディレクトリ + ファイル名で bytes を保存する
///
/// # 設計原則
/// - `directory` は論理的なルート（例: `./models`）
/// - `upsert_file` は 1 回の書き込み単位（部分書き込みを見せない）
/// - 同時書き込みの調停はしない
///
/// # Thread Safety
/// - `Send + Sync` を要求（`Arc<dyn StorageBackend>` で共有する）
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn file_exists(&self, directory: &str, name: &str) -> Result<bool, BackendError>;

    async fn read_file_as_buffer(&self, directory: &str, name: &str)
    -> Result<Vec<u8>, BackendError>;

    async fn upsert_file(
        &self,
        directory: &str,
        name: &str,
        content: &[u8],
    ) -> Result<(), BackendError>;

    async fn delete_file(&self, directory: &str, name: &str) -> Result<(), BackendError>;

    /// `pattern`（glob）に一致するファイル名を返す
    async fn directory_listing(
        &self,
        directory: &str,
        pattern: &str,
        options: &ListingOptions,
    ) -> Result<Vec<String>, BackendError>;
}
