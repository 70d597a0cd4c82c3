//! Errors - エラー型と分類
//!
//! # 方針
//! - 読み込みは「無い」に倒す（破損は evict して `None`）
//! - ホスト側の失敗（staging, blocking pool）は破損ではないので evict しない
//! - 書き込みは失敗をそのまま返す
//! - retry はしない（呼び出し側の責務）

use crate::codec::{ArchiveError, CodecError};
use crate::ports::BackendError;

use super::artifact_name::ArtifactName;

/// ErrorKind は StoreError の運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// backend からの読み込み・一覧・存在確認の失敗
    BackendRead,
    /// backend への書き込みの失敗
    BackendWrite,
    /// payload が parse できない
    CorruptArtifact,
    /// archive が展開できない
    CorruptArchive,
    /// staging や blocking pool などホスト側の失敗
    Host,
}

/// StoreError は ModelStore の操作エラー
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read '{name}' from backend: {source}")]
    BackendRead {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to write '{name}' to backend: {source}")]
    BackendWrite {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to encode model: {0}")]
    Encode(#[source] CodecError),

    #[error("corrupt artifact '{name}': {source}")]
    CorruptArtifact {
        name: ArtifactName,
        #[source]
        source: CodecError,
    },

    #[error("model archive: {0}")]
    Archive(#[source] ArchiveError),

    #[error("corrupt archive '{name}': {source}")]
    CorruptArchive {
        name: ArtifactName,
        #[source]
        source: ArchiveError,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::BackendRead { .. } => ErrorKind::BackendRead,
            StoreError::BackendWrite { .. } => ErrorKind::BackendWrite,
            StoreError::Encode(_) | StoreError::CorruptArtifact { .. } => {
                ErrorKind::CorruptArtifact
            }
            StoreError::CorruptArchive { .. } => ErrorKind::CorruptArchive,
            StoreError::Archive(_) => ErrorKind::Host,
        }
    }

    /// 読み込み時に evict して `None` に倒すべきエラーか
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            StoreError::CorruptArtifact { .. } | StoreError::CorruptArchive { .. }
        )
    }

    pub(crate) fn read(name: impl ToString, source: BackendError) -> Self {
        StoreError::BackendRead {
            name: name.to_string(),
            source,
        }
    }

    /// unpack の失敗を分類する（archive 自体の破損だけを CorruptArchive にする）
    pub(crate) fn unpack(name: &ArtifactName, source: ArchiveError) -> Self {
        if source.is_corruption() {
            StoreError::CorruptArchive {
                name: name.clone(),
                source,
            }
        } else {
            StoreError::Archive(source)
        }
    }

    pub(crate) fn write(name: impl ToString, source: BackendError) -> Self {
        StoreError::BackendWrite {
            name: name.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::{ContentHash, LanguageCode};

    #[test]
    fn corruption_errors_are_classified() {
        let name = ArtifactName::new(
            ContentHash::new("h1").unwrap(),
            LanguageCode::new("en").unwrap(),
        );
        let err = StoreError::CorruptArchive {
            name,
            source: ArchiveError::MissingEntry("model".into()),
        };
        assert!(err.is_corruption());
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
        assert!(err.to_string().contains("h1.en.model"));

        let err = StoreError::write("h1.en.model", BackendError::Other("disk full".into()));
        assert!(!err.is_corruption());
        assert_eq!(err.kind(), ErrorKind::BackendWrite);
    }

    #[test]
    fn only_damaged_archives_count_as_corruption() {
        let name = ArtifactName::new(
            ContentHash::new("h1").unwrap(),
            LanguageCode::new("en").unwrap(),
        );

        let err = StoreError::unpack(&name, ArchiveError::NotAFile("model".into()));
        assert!(err.is_corruption());

        let staging = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "tmp");
        let err = StoreError::unpack(&name, ArchiveError::Staging(staging));
        assert!(!err.is_corruption());
        assert_eq!(err.kind(), ErrorKind::Host);

        let err = StoreError::unpack(&name, ArchiveError::Join("unpack: cancelled".into()));
        assert!(!err.is_corruption());
    }
}
