//! GlobPattern - directory_listing 用の簡易 glob
//!
//! `*`（0 文字以上）と `?`（1 文字）のみをサポートし、
//! それ以外の文字はリテラルとして扱います。ファイル名全体に一致させます。

use regex::Regex;

use crate::ports::BackendError;

#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Result<Self, BackendError> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => expr.push_str("[^/]*"),
                '?' => expr.push_str("[^/]"),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| BackendError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// pattern / exclude / paths_to_omit をまとめて判定する
#[derive(Debug, Clone)]
pub(crate) struct ListingFilter<'a> {
    include: GlobPattern,
    exclude: Option<GlobPattern>,
    omit: &'a [String],
}

impl<'a> ListingFilter<'a> {
    pub(crate) fn new(
        pattern: &str,
        exclude: Option<&str>,
        omit: &'a [String],
    ) -> Result<Self, BackendError> {
        Ok(Self {
            include: GlobPattern::new(pattern)?,
            exclude: exclude.map(GlobPattern::new).transpose()?,
            omit,
        })
    }

    pub(crate) fn accepts(&self, name: &str) -> bool {
        self.include.is_match(name)
            && !self.exclude.as_ref().is_some_and(|ex| ex.is_match(name))
            && !self.omit.iter().any(|omitted| omitted == name)
    }
}
