//! ModelCodec - Model と bytes（JSON）の相互変換
//!
//! # シリアライズフロー
//! 1. Model から新しい StoredModel を組み立てる（元の Model は変更しない）
//! 2. entity のキャッシュは `dump()` の結果に置き換える（無ければ空）
//! 3. `intents` と `trainingSession` は含めない
//!    - `extra` に型付きフィールドと同名のキーがあれば捨てる（型付きフィールドが優先）
//! 4. serde_json で bytes にする（`slots_model` は byte 配列として埋め込む）

use serde_json::{Map, Value};

use crate::domain::{
    BinaryBlob, EntityDefinition, Model, StoredListEntity, StoredModel, StoredModelData,
    StoredModelOutput,
};

/// StoredModel の型付きフィールド
const MODEL_RESERVED: &[&str] = &["languageCode", "startedAt", "finishedAt", "data"];
/// 保存しない input のキー
const INPUT_RESERVED: &[&str] = &["trainingSession"];
/// StoredModelOutput の型付きフィールドと保存しない `intents`
const OUTPUT_RESERVED: &[&str] = &["list_entities", "slots_model", "intents"];
/// StoredListEntity（flatten された EntityDefinition を含む）の型付きフィールド
const ENTITY_RESERVED: &[&str] = &[
    "id",
    "entityName",
    "fuzzyTolerance",
    "sensitive",
    "mappings",
    "cache",
];

/// CodecError は encode / decode のエラー
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("json encode: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("json decode: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Model を保存表現に変換
pub fn to_stored(model: &Model) -> StoredModel {
    let output = &model.data.output;

    let list_entities = output
        .list_entities
        .iter()
        .map(|entity| StoredListEntity {
            definition: without_keys(&entity.definition, ENTITY_RESERVED),
            cache: entity
                .cache
                .as_ref()
                .map(|cache| cache.dump())
                .unwrap_or_default(),
        })
        .collect();

    StoredModel {
        language_code: model.language_code.clone(),
        started_at: model.started_at,
        finished_at: model.finished_at,
        data: StoredModelData {
            input: strip(&model.data.input.extra, INPUT_RESERVED),
            output: StoredModelOutput {
                list_entities,
                slots_model: BinaryBlob::new(output.slots_model.clone()),
                extra: strip(&output.extra, OUTPUT_RESERVED),
            },
        },
        extra: strip(&model.extra, MODEL_RESERVED),
    }
}

/// Model を bytes にする
pub fn serialize(model: &Model) -> Result<Vec<u8>, CodecError> {
    encode(&to_stored(model))
}

/// StoredModel を bytes にする
pub fn encode(stored: &StoredModel) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(stored).map_err(CodecError::Encode)
}

/// bytes から StoredModel を復元
///
/// キャッシュは record 列のまま返します（再構築は利用側）。
pub fn deserialize(bytes: &[u8]) -> Result<StoredModel, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

fn strip(map: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| !keys.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn without_keys(definition: &EntityDefinition, keys: &[&str]) -> EntityDefinition {
    EntityDefinition {
        extra: strip(&definition.extra, keys),
        ..definition.clone()
    }
}
