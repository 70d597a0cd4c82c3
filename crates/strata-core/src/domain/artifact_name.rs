//! ArtifactName - 保存名 `"<contentHash>.<languageCode>.model"` の生成と解析

use std::fmt;

use super::ids::{ContentHash, LanguageCode};

/// 保存名の拡張子
pub const MODEL_EXTENSION: &str = "model";

/// ArtifactName は `(contentHash, languageCode)` を一意に表す保存名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    content_hash: ContentHash,
    language_code: LanguageCode,
}

impl ArtifactName {
    pub fn new(content_hash: ContentHash, language_code: LanguageCode) -> Self {
        Self {
            content_hash,
            language_code,
        }
    }

    /// 保存名を解析
    ///
    /// 識別子はどちらも `.` を含まないため、分割は一意に決まります。
    /// このストアが作ったものでない名前（例: `a.b.en.model`）は `None`。
    pub fn parse(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(MODEL_EXTENSION)?.strip_suffix('.')?;
        let (hash, lang) = stem.split_once('.')?;
        let content_hash = ContentHash::new(hash).ok()?;
        let language_code = LanguageCode::new(lang).ok()?;
        Some(Self::new(content_hash, language_code))
    }

    /// 言語ごとの一覧に使う glob（`*.<lang>.model`）
    pub fn language_glob(language_code: &LanguageCode) -> String {
        format!("*.{language_code}.{MODEL_EXTENSION}")
    }

    pub fn content_hash(&self) -> &ContentHash {
        &self.content_hash
    }

    pub fn language_code(&self) -> &LanguageCode {
        &self.language_code
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{MODEL_EXTENSION}",
            self.content_hash, self.language_code
        )
    }
}
