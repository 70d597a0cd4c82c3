//! 言語ごとの artifact 一覧（newest-first）
//!
//! `get_latest` と retention はどちらも「index 0 が最新」に依存します。

use tracing::warn;

use crate::domain::{ArtifactName, LanguageCode, StoreError};
use crate::ports::{ListingOptions, SortOrder, StorageBackend};

/// `*.<lang>.model` に一致する artifact を更新日時の新しい順で返す
///
/// glob に一致してもこのストアの命名規則で解析できない名前は、
/// 自分が作ったものではないので無視します（prune の対象にもならない）。
pub(crate) async fn list_for_language(
    backend: &dyn StorageBackend,
    models_dir: &str,
    language: &LanguageCode,
) -> Result<Vec<ArtifactName>, StoreError> {
    let pattern = ArtifactName::language_glob(language);
    let names = backend
        .directory_listing(
            models_dir,
            &pattern,
            &ListingOptions::sorted(SortOrder::newest_first()),
        )
        .await
        .map_err(|source| StoreError::read(&pattern, source))?;

    Ok(names
        .into_iter()
        .filter_map(|name| match ArtifactName::parse(&name) {
            Some(parsed) if parsed.language_code() == language => Some(parsed),
            _ => {
                warn!(artifact = %name, language = %language, "ignoring foreign file in models dir");
                None
            }
        })
        .collect())
}
