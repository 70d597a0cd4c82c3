//! Domain identifiers (strongly-typed, validated strings).
//!
//! # ContentHash / LanguageCode
//! 保存名 `"<contentHash>.<languageCode>.model"` は両方の値をそのまま埋め込むため、
//! 区切り文字（`.`）やパス区切り、glob のメタ文字を含む値は受け付けません。
//! これにより異なる `(hash, lang)` の組が同じファイル名になることはありません。
//!
//! ## Phantom Type パターン
//! `Ident<T>` で検証・Display・serde の実装を共通化しつつ、
//! `T`（マーカー型）でコンパイル時に ContentHash と LanguageCode を区別します。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// 保存名の中で意味を持つ文字（区切り・パス・glob）
const RESERVED_CHARS: &[char] = &['.', '/', '\\', '*', '?'];

/// IdError は識別子の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} '{value}' contains reserved character '{ch}'")]
    ReservedChar {
        kind: &'static str,
        value: String,
        ch: char,
    },

    #[error("{kind} '{value}' contains invalid character '{ch}'")]
    InvalidChar {
        kind: &'static str,
        value: String,
        ch: char,
    },
}

/// IdentKind は各識別子型のマーカー trait
///
/// 種類ごとの名前（エラーメッセージ用）と追加の文字制約を提供します。
pub trait IdentKind: Send + Sync + 'static {
    /// エラーメッセージで使う名前（例: "content hash"）
    fn kind() -> &'static str;

    /// 予約文字以外に許可する文字か
    fn allows(ch: char) -> bool;
}

/// ジェネリック識別子型
///
/// 生成は `Ident::new` のみで、常に検証済みの値を保持します。
pub struct Ident<T: IdentKind> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdentKind> Ident<T> {
    /// 値を検証して Ident を作成
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(IdError::Empty { kind: T::kind() });
        }
        if let Some(ch) = value.chars().find(|c| RESERVED_CHARS.contains(c)) {
            return Err(IdError::ReservedChar {
                kind: T::kind(),
                value,
                ch,
            });
        }
        if let Some(ch) = value.chars().find(|c| !T::allows(*c)) {
            return Err(IdError::InvalidChar {
                kind: T::kind(),
                value,
                ch,
            });
        }
        Ok(Self {
            value,
            _marker: PhantomData,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

// derive だとマーカー型にも境界が付くため手書きする
impl<T: IdentKind> Clone for Ident<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: IdentKind> PartialEq for Ident<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: IdentKind> Eq for Ident<T> {}

impl<T: IdentKind> std::hash::Hash for Ident<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: IdentKind> fmt::Debug for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(T::kind()).field(&self.value).finish()
    }
}

impl<T: IdentKind> fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdentKind> std::str::FromStr for Ident<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<T: IdentKind> Serialize for Ident<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdentKind> Deserialize<'de> for Ident<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(raw).map_err(serde::de::Error::custom)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// ContentHash のマーカー型
pub enum Hash {}

impl IdentKind for Hash {
    fn kind() -> &'static str {
        "content hash"
    }

    fn allows(ch: char) -> bool {
        !ch.is_whitespace() && !ch.is_control()
    }
}

/// LanguageCode のマーカー型
pub enum Language {}

impl IdentKind for Language {
    fn kind() -> &'static str {
        "language code"
    }

    fn allows(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
    }
}

/// Identifier of the training input/config that produced a model.
pub type ContentHash = Ident<Hash>;

/// Language a model was trained for (e.g. `en`, `fr`, `pt-BR`).
pub type LanguageCode = Ident<Language>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("en")]
    #[case("pt-BR")]
    #[case("zh_hant")]
    fn valid_language_codes(#[case] raw: &str) {
        let lang = LanguageCode::new(raw).unwrap();
        assert_eq!(lang.as_str(), raw);
        assert_eq!(lang.to_string(), raw);
    }

    #[rstest]
    #[case("", "empty")]
    #[case("en.us", "reserved")]
    #[case("e*", "reserved")]
    #[case("en us", "invalid")]
    #[case("日本", "invalid")]
    fn invalid_language_codes(#[case] raw: &str, #[case] expected: &str) {
        let err = LanguageCode::new(raw).unwrap_err();
        let matches = match expected {
            "empty" => matches!(err, IdError::Empty { .. }),
            "reserved" => matches!(err, IdError::ReservedChar { .. }),
            _ => matches!(err, IdError::InvalidChar { .. }),
        };
        assert!(matches, "unexpected error for {raw:?}: {err:?}");
    }

    #[test]
    fn content_hash_rejects_separator() {
        // "a.b" + "c" と "a" + "b.c" が同じ保存名にならないこと
        assert!(ContentHash::new("a.b").is_err());
        assert!(ContentHash::new("9f86d081884c7d65").is_ok());
        assert!(ContentHash::new("dir/hash").is_err());
    }

    #[test]
    fn idents_roundtrip_through_serde() {
        let lang = LanguageCode::new("fr").unwrap();
        let json = serde_json::to_string(&lang).unwrap();
        assert_eq!(json, "\"fr\"");
        let back: LanguageCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lang);

        let bad: Result<LanguageCode, _> = serde_json::from_str("\"f.r\"");
        assert!(bad.is_err());
    }
}
