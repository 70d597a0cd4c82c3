//! App - アプリケーション層
//!
//! このモジュールは、ports と codec を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **ModelStore**: save / get / get_latest / list / prune
//! - **retention**: 保持件数を超えた artifact の削除
//! - **StoreConfig**: 保存先と保持件数の設定

pub mod config;
pub mod store;
pub mod retention;
mod listing;

// 主要な型を再エクスポート
pub use self::config::{ConfigError, DEFAULT_MODELS_DIR, StoreConfig};
pub use self::store::{ModelStore, SaveReport};
