//! strata-core
//!
//! 学習済みモデル artifact のバージョン付きストア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, artifact_name, model, entity_cache, retention, errors）
//! - **ports**: 抽象化レイヤー（StorageBackend, Clock）
//! - **codec**: Model ⇔ JSON bytes ⇔ tar.gz
//! - **app**: アプリケーションロジック（ModelStore, retention, config）
//! - **impls**: ports の実装（InMemoryBackend, LocalFsBackend）

pub mod domain;
pub mod ports;
pub mod codec;
pub mod app;
pub mod impls;

pub use app::{ModelStore, SaveReport, StoreConfig};
pub use domain::{ContentHash, LanguageCode, Model, StoreError, StoredModel};
