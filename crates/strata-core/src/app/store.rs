//! ModelStore - モデル artifact の保存・取得・一覧・保持件数管理
//!
//! # データフロー
//! - save: Model → model_codec::serialize → Archiver::pack → backend.upsert_file → prune
//! - get:  backend.read_file_as_buffer → Archiver::unpack → model_codec::deserialize
//!
//! # 失敗時の方針
//! - 読み込みは「無い」に倒す（破損した artifact は削除して `None`）
//! - ホスト側の失敗（staging など）では削除せずエラーを返す
//! - 書き込みは失敗をそのまま返す
//! - prune の失敗は save を失敗させない（SaveReport に載せる）
//!
//! # 並行性
//! lock も transaction も無いので、同じ言語への書き込みは呼び出し側で直列化してください。

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::StoreConfig;
use super::listing::list_for_language;
use super::retention;
use crate::codec::{Archiver, model_codec};
use crate::domain::{
    ArtifactName, ContentHash, LanguageCode, Model, PruneReport, RetentionPolicy, StoreError,
    StoredModel,
};
use crate::ports::StorageBackend;

/// SaveReport は save 1 回分の結果
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub artifact: ArtifactName,

    /// `None` は一覧の取得に失敗して prune できなかったことを表す（ログ済み）
    pub prune: Option<PruneReport>,
}

/// ModelStore は `(contentHash, languageCode)` をキーに artifact を管理する
///
/// # 使用例
/// ```ignore
/// let store = ModelStore::new(Arc::new(InMemoryBackend::new()), StoreConfig::default());
/// store.save(&model, &ContentHash::new("h1")?).await?;
/// let latest = store.get_latest(&LanguageCode::new("en")?).await?;
/// ```
pub struct ModelStore {
    backend: Arc<dyn StorageBackend>,
    models_dir: String,
    policy: RetentionPolicy,
    archiver: Archiver,
}

impl ModelStore {
    pub fn new(backend: Arc<dyn StorageBackend>, config: StoreConfig) -> Self {
        Self {
            backend,
            models_dir: config.models_dir,
            policy: RetentionPolicy::new(config.max_models_to_keep),
            archiver: Archiver::default(),
        }
    }

    /// archive の staging 先などを差し替える
    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = archiver;
        self
    }

    pub fn models_dir(&self) -> &str {
        &self.models_dir
    }

    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// モデルを保存し、その言語の保持件数を適用する
    pub async fn save(
        &self,
        model: &Model,
        content_hash: &ContentHash,
    ) -> Result<SaveReport, StoreError> {
        let artifact = ArtifactName::new(content_hash.clone(), model.language_code.clone());
        let name = artifact.to_string();

        let payload = model_codec::serialize(model).map_err(StoreError::Encode)?;
        let archive = self
            .archiver
            .pack(payload)
            .await
            .map_err(StoreError::Archive)?;

        self.backend
            .upsert_file(&self.models_dir, &name, &archive)
            .await
            .map_err(|source| StoreError::write(&name, source))?;
        info!(artifact = %name, bytes = archive.len(), "saved model");

        let prune = match self.prune(&model.language_code).await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(language = %model.language_code, error = %err, "retention skipped after save");
                None
            }
        };

        Ok(SaveReport { artifact, prune })
    }

    /// `(contentHash, languageCode)` の artifact を読み込む
    ///
    /// 存在しなければ `Ok(None)`。
    /// 破損していれば backend から削除したうえで `Ok(None)`。
    pub async fn get(
        &self,
        content_hash: &ContentHash,
        language: &LanguageCode,
    ) -> Result<Option<StoredModel>, StoreError> {
        let artifact = ArtifactName::new(content_hash.clone(), language.clone());
        let name = artifact.to_string();

        let exists = self
            .backend
            .file_exists(&self.models_dir, &name)
            .await
            .map_err(|source| StoreError::read(&name, source))?;
        if !exists {
            debug!(artifact = %name, "model not found");
            return Ok(None);
        }

        let bytes = self
            .backend
            .read_file_as_buffer(&self.models_dir, &name)
            .await
            .map_err(|source| StoreError::read(&name, source))?;

        match self.decode(&artifact, bytes).await {
            Ok(model) => {
                debug!(artifact = %name, "loaded model");
                Ok(Some(model))
            }
            Err(err) if err.is_corruption() => {
                warn!(artifact = %name, error = %err, "evicting corrupt model");
                if let Err(delete_err) = self.backend.delete_file(&self.models_dir, &name).await {
                    warn!(artifact = %name, error = %delete_err, "failed to evict corrupt model");
                }
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// 言語ごとの最新の artifact を読み込む
    pub async fn get_latest(
        &self,
        language: &LanguageCode,
    ) -> Result<Option<StoredModel>, StoreError> {
        let Some(newest) = self.list(language).await?.into_iter().next() else {
            debug!(language = %language, "no model for language");
            return Ok(None);
        };
        self.get(newest.content_hash(), language).await
    }

    /// 言語ごとの artifact 名（更新日時の新しい順）
    pub async fn list(&self, language: &LanguageCode) -> Result<Vec<ArtifactName>, StoreError> {
        list_for_language(self.backend.as_ref(), &self.models_dir, language).await
    }

    /// 保持件数を超えた artifact を削除する
    pub async fn prune(&self, language: &LanguageCode) -> Result<PruneReport, StoreError> {
        retention::prune(self.backend.as_ref(), &self.models_dir, &self.policy, language).await
    }

    async fn decode(
        &self,
        artifact: &ArtifactName,
        archive: Vec<u8>,
    ) -> Result<StoredModel, StoreError> {
        let payload = self
            .archiver
            .unpack(archive)
            .await
            .map_err(|source| StoreError::unpack(artifact, source))?;
        model_codec::deserialize(&payload).map_err(|source| StoreError::CorruptArtifact {
            name: artifact.clone(),
            source,
        })
    }
}
