//! Codec - Model ⇔ bytes ⇔ archive
//!
//! - **model_codec**: Model を JSON bytes に変換（一時フィールドの除外、キャッシュの dump）
//! - **archive**: bytes を 1 エントリの tar.gz に詰める / 取り出す

pub mod model_codec;
pub mod archive;

// 主要な型を再エクスポート
pub use self::model_codec::CodecError;
pub use self::archive::{ArchiveError, Archiver, MODEL_ENTRY};
