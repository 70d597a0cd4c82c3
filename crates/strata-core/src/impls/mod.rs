//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryBackend**: 開発・テスト用の StorageBackend
//! - **LocalFsBackend**: ローカルディレクトリの StorageBackend
//!
//! # 本番用実装
//! S3 など他のストレージは別クレートで StorageBackend を実装します。

pub mod glob;
pub mod inmem_backend;
pub mod local_fs_backend;

// 主要な型を再エクスポート
pub use self::glob::GlobPattern;
pub use self::inmem_backend::InMemoryBackend;
pub use self::local_fs_backend::LocalFsBackend;
