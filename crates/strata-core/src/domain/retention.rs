//! Retention - 言語ごとに何件残すかの判断
//!
//! I/O を含まない純粋な判断ロジックです。
//! 実際の削除は `app::retention` が backend に対して行います。

use serde::Serialize;

use super::artifact_name::ArtifactName;

/// 言語ごとに残すモデル数（デフォルト）
pub const MAX_MODELS_TO_KEEP: usize = 2;

/// RetentionPolicy は言語ごとの保持件数の上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    max_models_to_keep: usize,
}

/// RetentionPlan は keep / delete の振り分け結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub keep: Vec<ArtifactName>,
    pub delete: Vec<ArtifactName>,
}

impl RetentionPolicy {
    /// 上限 0 は「全部消す」になってしまうため 1 に切り上げる
    pub fn new(max_models_to_keep: usize) -> Self {
        Self {
            max_models_to_keep: max_models_to_keep.max(1),
        }
    }

    pub fn max_models_to_keep(&self) -> usize {
        self.max_models_to_keep
    }

    /// newest-first の一覧を keep / delete に分ける
    ///
    /// 先頭 `max_models_to_keep` 件を残し、それ以降を削除対象にします。
    /// 件数が上限以下なら何も削除しません。
    pub fn plan(&self, newest_first: Vec<ArtifactName>) -> RetentionPlan {
        let mut keep = newest_first;
        let delete = if keep.len() > self.max_models_to_keep {
            keep.split_off(self.max_models_to_keep)
        } else {
            Vec::new()
        };
        RetentionPlan { keep, delete }
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(MAX_MODELS_TO_KEEP)
    }
}

/// PruneFailure は削除に失敗した 1 件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    pub artifact: String,
    pub error: String,
}

/// PruneReport は prune 1 回分の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub language: String,
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    pub failures: Vec<PruneFailure>,
}

impl PruneReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ContentHash, LanguageCode};
    use rstest::rstest;

    fn names(count: usize) -> Vec<ArtifactName> {
        (0..count)
            .map(|i| {
                ArtifactName::new(
                    ContentHash::new(format!("h{i}")).unwrap(),
                    LanguageCode::new("en").unwrap(),
                )
            })
            .collect()
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, 1, 0)]
    #[case(2, 2, 0)]
    #[case(3, 2, 1)]
    #[case(5, 2, 3)]
    fn default_policy_keeps_two(
        #[case] total: usize,
        #[case] kept: usize,
        #[case] deleted: usize,
    ) {
        let plan = RetentionPolicy::default().plan(names(total));
        assert_eq!(plan.keep.len(), kept);
        assert_eq!(plan.delete.len(), deleted);
    }

    #[test]
    fn keeps_the_newest_entries() {
        let plan = RetentionPolicy::new(2).plan(names(4));
        let kept: Vec<_> = plan.keep.iter().map(|n| n.content_hash().to_string()).collect();
        let deleted: Vec<_> = plan
            .delete
            .iter()
            .map(|n| n.content_hash().to_string())
            .collect();
        assert_eq!(kept, vec!["h0", "h1"]);
        assert_eq!(deleted, vec!["h2", "h3"]);
    }

    #[test]
    fn zero_limit_is_clamped() {
        let policy = RetentionPolicy::new(0);
        assert_eq!(policy.max_models_to_keep(), 1);
        assert_eq!(policy.plan(names(3)).keep.len(), 1);
    }
}
