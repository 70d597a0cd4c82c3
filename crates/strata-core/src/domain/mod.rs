//! Domain model (identifiers, models, caches, retention, errors).

pub mod ids;
pub mod artifact_name;
pub mod binary;
pub mod entity_cache;
pub mod model;
pub mod retention;
pub mod errors;

pub use self::ids::{ContentHash, IdError, LanguageCode};
pub use self::artifact_name::{ArtifactName, MODEL_EXTENSION};
pub use self::binary::BinaryBlob;
pub use self::entity_cache::{CacheRecord, EntityCache, RecordCache};
pub use self::model::{
    EntityDefinition, ListEntity, Model, ModelData, ModelInput, ModelOutput, StoredListEntity,
    StoredModel, StoredModelData, StoredModelOutput,
};
pub use self::retention::{
    MAX_MODELS_TO_KEEP, PruneFailure, PruneReport, RetentionPlan, RetentionPolicy,
};
pub use self::errors::{ErrorKind, StoreError};
