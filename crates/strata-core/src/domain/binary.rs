//! BinaryBlob - JSON の中で bytes をそのまま運ぶための型
//!
//! wire 形式は `{"type":"Buffer","data":[...]}`。
//! 読み込み時は素の byte 配列（`[...]`）も受け付けます。

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const BUFFER_TAG: &str = "Buffer";

/// BinaryBlob は text として解釈しない byte 列
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BinaryBlob(Vec<u8>);

impl BinaryBlob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for BinaryBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for BinaryBlob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Serialize)]
struct BufferRef<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a [u8],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlobRepr {
    Buffer {
        #[serde(rename = "type")]
        kind: String,
        data: Vec<u8>,
    },
    Bytes(Vec<u8>),
}

impl Serialize for BinaryBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BufferRef {
            kind: BUFFER_TAG,
            data: &self.0,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BinaryBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match BlobRepr::deserialize(deserializer)? {
            BlobRepr::Buffer { kind, data } if kind == BUFFER_TAG => Ok(Self(data)),
            BlobRepr::Buffer { kind, .. } => Err(serde::de::Error::custom(format!(
                "unexpected binary tag '{kind}', expected '{BUFFER_TAG}'"
            ))),
            BlobRepr::Bytes(data) => Ok(Self(data)),
        }
    }
}
