//! Model - 学習済みモデルの in-memory 表現と保存表現
//!
//! - [`Model`]: 学習パイプラインが作る「生きた」モデル（キャッシュは trait object）
//! - [`StoredModel`]: 保存・読み込みされる形（キャッシュは record 列、
//!   `intents` と `trainingSession` を含まない）
//!
//! Model → StoredModel の変換は Codec が行い、元の Model は変更しません。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::binary::BinaryBlob;
use super::entity_cache::{CacheRecord, EntityCache};
use super::ids::LanguageCode;

/// list entity の定義部分（キャッシュを除く）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDefinition {
    pub id: String,

    pub entity_name: String,

    #[serde(default)]
    pub fuzzy_tolerance: f64,

    #[serde(default)]
    pub sensitive: bool,

    /// canonical value -> synonyms
    #[serde(default)]
    pub mappings: BTreeMap<String, Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EntityDefinition {
    pub fn new(id: impl Into<String>, entity_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_name: entity_name.into(),
            fuzzy_tolerance: 0.0,
            sensitive: false,
            mappings: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

/// 学習済みの list entity（キャッシュ付き）
#[derive(Debug, Clone)]
pub struct ListEntity {
    pub definition: EntityDefinition,
    pub cache: Option<Arc<dyn EntityCache>>,
}

impl ListEntity {
    pub fn new(definition: EntityDefinition) -> Self {
        Self {
            definition,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn EntityCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelInput {
    /// 学習セッションの一時状態（保存しない）
    pub training_session: Option<Value>,

    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelOutput {
    /// 派生データ（保存しない）
    pub intents: Vec<Value>,

    pub list_entities: Vec<ListEntity>,

    pub slots_model: Vec<u8>,

    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub input: ModelInput,
    pub output: ModelOutput,
}

/// 学習パイプラインから渡される in-memory のモデル
#[derive(Debug, Clone)]
pub struct Model {
    pub language_code: LanguageCode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub data: ModelData,

    /// 上記以外のフィールド（そのまま保存される）
    pub extra: Map<String, Value>,
}

impl Model {
    pub fn new(language_code: LanguageCode) -> Self {
        let now = Utc::now();
        Self {
            language_code,
            started_at: now,
            finished_at: now,
            data: ModelData::default(),
            extra: Map::new(),
        }
    }
}

// ========================================
// 保存表現
// ========================================

/// 保存された list entity（キャッシュは dump 済みの record 列）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredListEntity {
    #[serde(flatten)]
    pub definition: EntityDefinition,

    #[serde(default)]
    pub cache: Vec<CacheRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModelOutput {
    pub list_entities: Vec<StoredListEntity>,

    pub slots_model: BinaryBlob,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModelData {
    #[serde(default)]
    pub input: Map<String, Value>,

    pub output: StoredModelOutput,
}

/// 保存・読み込みされるモデル
///
/// `get` / `get_latest` はこの型を返します。
/// キャッシュを生きたオブジェクトに戻すのは利用側の責務です（[`StoredModel::into_model`]）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredModel {
    pub language_code: LanguageCode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub data: StoredModelData,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoredModel {
    pub fn slots_model(&self) -> &[u8] {
        self.data.output.slots_model.as_bytes()
    }

    pub fn list_entities(&self) -> &[StoredListEntity] {
        &self.data.output.list_entities
    }

    /// in-memory の Model に戻す
    ///
    /// `restore` は entity ごとに呼ばれ、dump 済み record からキャッシュを再構築します。
    /// `None` を返した entity はキャッシュなしになります。
    /// `intents` と `trainingSession` は保存されていないため空になります。
    pub fn into_model<F>(self, mut restore: F) -> Model
    where
        F: FnMut(&EntityDefinition, Vec<CacheRecord>) -> Option<Arc<dyn EntityCache>>,
    {
        let list_entities = self
            .data
            .output
            .list_entities
            .into_iter()
            .map(|stored| {
                let cache = restore(&stored.definition, stored.cache);
                ListEntity {
                    definition: stored.definition,
                    cache,
                }
            })
            .collect();

        Model {
            language_code: self.language_code,
            started_at: self.started_at,
            finished_at: self.finished_at,
            data: ModelData {
                input: ModelInput {
                    training_session: None,
                    extra: self.data.input,
                },
                output: ModelOutput {
                    intents: Vec::new(),
                    list_entities,
                    slots_model: self.data.output.slots_model.into_inner(),
                    extra: self.data.output.extra,
                },
            },
            extra: self.extra,
        }
    }
}

impl fmt::Display for StoredModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "model(lang={}, entities={}, slots_model={}B, finished_at={})",
            self.language_code,
            self.data.output.list_entities.len(),
            self.data.output.slots_model.len(),
            self.finished_at.to_rfc3339()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity_cache::RecordCache;
    use serde_json::json;

    fn stored() -> StoredModel {
        serde_json::from_value(json!({
            "languageCode": "en",
            "startedAt": "2024-01-01T12:00:00Z",
            "finishedAt": "2024-01-01T12:05:00Z",
            "hash": "abc",
            "data": {
                "input": {"language": "en"},
                "output": {
                    "list_entities": [{
                        "id": "fruit",
                        "entityName": "fruit",
                        "fuzzyTolerance": 0.8,
                        "sensitive": false,
                        "mappings": {"apple": ["apples", "pomme"]},
                        "type": "custom.list",
                        "cache": [{"k": "apple", "v": [1], "e": 0}]
                    }],
                    "slots_model": {"type": "Buffer", "data": [1, 2, 3]},
                    "tfidf": {"apple": 1.5}
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn unknown_fields_are_kept_as_extra() {
        let model = stored();
        assert_eq!(model.extra.get("hash"), Some(&json!("abc")));
        assert_eq!(model.data.output.extra.get("tfidf"), Some(&json!({"apple": 1.5})));

        let entity = &model.list_entities()[0];
        assert_eq!(entity.definition.extra.get("type"), Some(&json!("custom.list")));
        assert_eq!(entity.cache.len(), 1);
        assert_eq!(model.slots_model(), &[1, 2, 3]);
    }

    #[test]
    fn into_model_rebuilds_caches_with_callback() {
        let model = stored().into_model(|definition, records| {
            assert_eq!(definition.id, "fruit");
            Some(Arc::new(RecordCache::from_records(records)) as Arc<dyn EntityCache>)
        });

        assert_eq!(model.language_code.as_str(), "en");
        assert!(model.data.output.intents.is_empty());
        assert!(model.data.input.training_session.is_none());
        assert_eq!(model.data.output.slots_model, vec![1, 2, 3]);

        let cache = model.data.output.list_entities[0].cache.as_ref().unwrap();
        assert_eq!(cache.dump()[0].key, "apple");
    }

    #[test]
    fn missing_slots_model_is_rejected() {
        let result: Result<StoredModel, _> = serde_json::from_value(json!({
            "languageCode": "en",
            "startedAt": "2024-01-01T12:00:00Z",
            "finishedAt": "2024-01-01T12:05:00Z",
            "data": {"output": {"list_entities": []}}
        }));
        assert!(result.is_err());
    }
}
