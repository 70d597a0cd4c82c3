//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ファイルシステム, Blob storage など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。

pub mod storage_backend;
pub mod clock;

// 主要な trait を再エクスポート
pub use self::storage_backend::{
    BackendError, ListingOptions, SortColumn, SortOrder, StorageBackend,
};
pub use self::clock::{Clock, FixedClock, SystemClock};
