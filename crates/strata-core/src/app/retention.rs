//! Retention - 保持件数を超えた artifact の削除
//!
//! # フロー
//! 1. 言語ごとの一覧を newest-first で取得
//! 2. RetentionPolicy で keep / delete に振り分け
//! 3. delete を独立に発行（1 件の失敗で他を止めない、rollback しない）
//! 4. 結果を PruneReport にまとめる

use futures::future::join_all;
use tracing::{info, warn};

use super::listing::list_for_language;
use crate::domain::{LanguageCode, PruneFailure, PruneReport, RetentionPolicy, StoreError};
use crate::ports::StorageBackend;

/// 言語 `language` の artifact を `policy` に従って間引く
///
/// 一覧の取得に失敗した場合のみ Err。個々の削除失敗は report.failures に入ります。
pub async fn prune(
    backend: &dyn StorageBackend,
    models_dir: &str,
    policy: &RetentionPolicy,
    language: &LanguageCode,
) -> Result<PruneReport, StoreError> {
    let listing = list_for_language(backend, models_dir, language).await?;
    let plan = policy.plan(listing);

    let mut report = PruneReport {
        language: language.to_string(),
        kept: plan.keep.iter().map(ToString::to_string).collect(),
        ..PruneReport::default()
    };
    if plan.delete.is_empty() {
        return Ok(report);
    }

    let deletions = plan.delete.iter().map(|artifact| async move {
        let name = artifact.to_string();
        let result = backend.delete_file(models_dir, &name).await;
        (name, result)
    });

    for (name, result) in join_all(deletions).await {
        match result {
            Ok(()) => report.deleted.push(name),
            Err(err) => {
                warn!(artifact = %name, language = %language, error = %err, "failed to prune model");
                report.failures.push(PruneFailure {
                    artifact: name,
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        language = %language,
        kept = report.kept.len(),
        deleted = report.deleted.len(),
        failed = report.failures.len(),
        "pruned models"
    );
    Ok(report)
}
