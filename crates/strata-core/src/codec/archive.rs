//! Archive - payload を 1 エントリの tar.gz に詰める / 取り出す
//!
//! # 形式
//! - gzip 圧縮の tar、エントリは 1 つ（既定名 `"model"`）
//! - header は deterministic（uid/gid/mtime をホストに依存させない）
//!   → 同じ入力からは同じ bytes が得られる
//!
//! # 学習ポイント
//! - pack は `tempfile::TempDir` で staging し、Drop で後片付けする（エラー経路でも消える）
//! - unpack は entry をメモリ上で読むだけ（symlink などの非通常ファイルは拒否）
//! - 同期 I/O を async から使うための `spawn_blocking`

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder, HeaderMode};
use tempfile::TempDir;

/// 既定のエントリ名
pub const MODEL_ENTRY: &str = "model";

/// ArchiveError は pack / unpack のエラー
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive entry '{0}' not found")]
    MissingEntry(String),

    #[error("malformed archive: {0}")]
    Malformed(#[source] io::Error),

    #[error("archive entry '{0}' is not a regular file")]
    NotAFile(String),

    #[error("staging area: {0}")]
    Staging(#[source] io::Error),

    #[error("archive task failed: {0}")]
    Join(String),
}

impl ArchiveError {
    /// archive 自体が壊れているか（staging や blocking pool の失敗はホスト側の問題）
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ArchiveError::MissingEntry(_) | ArchiveError::NotAFile(_) | ArchiveError::Malformed(_)
        )
    }
}

/// payload を `entry_name` の 1 エントリとして tar.gz に詰める
pub fn pack(payload: &[u8], entry_name: &str) -> Result<Vec<u8>, ArchiveError> {
    pack_in(None, payload, entry_name)
}

/// `pack` と同じだが、staging を `staging_root` の下に作る（`None` はシステムの一時ディレクトリ）
pub fn pack_in(
    staging_root: Option<&Path>,
    payload: &[u8],
    entry_name: &str,
) -> Result<Vec<u8>, ArchiveError> {
    let staging = match staging_root {
        Some(root) => TempDir::new_in(root),
        None => TempDir::new(),
    }
    .map_err(ArchiveError::Staging)?;
    let entry_path = staging.path().join(entry_name);
    std::fs::write(&entry_path, payload).map_err(ArchiveError::Staging)?;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.mode(HeaderMode::Deterministic);
    builder
        .append_path_with_name(&entry_path, entry_name)
        .map_err(ArchiveError::Staging)?;

    let encoder = builder.into_inner().map_err(ArchiveError::Staging)?;
    encoder.finish().map_err(ArchiveError::Staging)
    // staging はここで drop されて削除される
}

/// tar.gz から `entry_name` の中身を取り出す
///
/// エントリが無い・通常ファイルでない・tar が壊れている・gzip の展開や CRC 検証に
/// 失敗した場合はいずれもエラーになります。
/// 展開はメモリ上で行い、ファイルシステムには触れません。
pub fn unpack(archive: &[u8], entry_name: &str) -> Result<Vec<u8>, ArchiveError> {
    let mut archive = Archive::new(GzDecoder::new(archive));

    let mut payload = None;
    for entry in archive.entries().map_err(ArchiveError::Malformed)? {
        let mut entry = entry.map_err(ArchiveError::Malformed)?;
        if entry.path().map_err(ArchiveError::Malformed)? != Path::new(entry_name) {
            continue;
        }
        if !entry.header().entry_type().is_file() {
            return Err(ArchiveError::NotAFile(entry_name.to_string()));
        }
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(ArchiveError::Malformed)?;
        payload = Some(bytes);
        break;
    }

    // strict: 残りも読み切って gzip の trailer / CRC を検証する
    let mut rest = archive.into_inner();
    io::copy(&mut rest, &mut io::sink()).map_err(ArchiveError::Malformed)?;

    payload.ok_or_else(|| ArchiveError::MissingEntry(entry_name.to_string()))
}

/// Archiver は pack / unpack を blocking pool で実行する
#[derive(Debug, Clone)]
pub struct Archiver {
    entry_name: String,
    staging_root: Option<PathBuf>,
}

impl Archiver {
    pub fn new(entry_name: impl Into<String>) -> Self {
        Self {
            entry_name: entry_name.into(),
            staging_root: None,
        }
    }

    /// pack の staging を作るディレクトリを指定
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    pub async fn pack(&self, payload: Vec<u8>) -> Result<Vec<u8>, ArchiveError> {
        let entry_name = self.entry_name.clone();
        let staging_root = self.staging_root.clone();
        tokio::task::spawn_blocking(move || {
            pack_in(staging_root.as_deref(), &payload, &entry_name)
        })
            .await
            .map_err(|e| ArchiveError::Join(format!("pack: {e}")))?
    }

    pub async fn unpack(&self, archive: Vec<u8>) -> Result<Vec<u8>, ArchiveError> {
        let entry_name = self.entry_name.clone();
        tokio::task::spawn_blocking(move || unpack(&archive, &entry_name))
            .await
            .map_err(|e| ArchiveError::Join(format!("unpack: {e}")))?
    }
}

impl Default for Archiver {
    fn default() -> Self {
        Self::new(MODEL_ENTRY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Vec<u8> {
        let mut bytes = br#"{"languageCode":"en","slots_model":{"type":"Buffer","data":[0,255]}}"#.to_vec();
        bytes.extend_from_slice(&[0x00, 0xFF, 0xC3, 0x28]);
        bytes
    }

    #[test]
    fn pack_unpack_roundtrip() {
        let archive = pack(&payload(), MODEL_ENTRY).unwrap();
        assert_eq!(unpack(&archive, MODEL_ENTRY).unwrap(), payload());
    }

    #[test]
    fn empty_payload_roundtrip() {
        let archive = pack(&[], MODEL_ENTRY).unwrap();
        assert!(unpack(&archive, MODEL_ENTRY).unwrap().is_empty());
    }

    #[test]
    fn packing_is_reproducible() {
        let first = pack(&payload(), MODEL_ENTRY).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let second = pack(&payload(), MODEL_ENTRY).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn archive_is_gzip() {
        let archive = pack(&payload(), MODEL_ENTRY).unwrap();
        assert_eq!(&archive[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn missing_entry_is_reported() {
        let archive = pack(&payload(), "other").unwrap();
        let err = unpack(&archive, MODEL_ENTRY).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingEntry(name) if name == MODEL_ENTRY));
    }

    #[test]
    fn truncated_archive_is_rejected() {
        let archive = pack(&vec![b'x'; 4096], MODEL_ENTRY).unwrap();
        let truncated = &archive[..archive.len() / 2];
        assert!(unpack(truncated, MODEL_ENTRY).is_err());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = unpack(b"definitely not a tarball", MODEL_ENTRY).unwrap_err();
        assert!(matches!(err, ArchiveError::Malformed(_)));
    }

    fn gzip_tar(build: impl FnOnce(&mut Builder<GzEncoder<Vec<u8>>>)) -> Vec<u8> {
        let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        build(&mut builder);
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn symlink_entry_is_rejected() {
        let archive = gzip_tar(|builder| {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder
                .append_link(&mut header, MODEL_ENTRY, "/etc/hostname")
                .unwrap();
        });

        let err = unpack(&archive, MODEL_ENTRY).unwrap_err();
        assert!(matches!(err, ArchiveError::NotAFile(ref name) if name == MODEL_ENTRY));
        assert!(err.is_corruption());
    }

    #[test]
    fn directory_entry_is_rejected() {
        let archive = gzip_tar(|builder| {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
            builder
                .append_data(&mut header, MODEL_ENTRY, io::empty())
                .unwrap();
        });

        assert!(matches!(
            unpack(&archive, MODEL_ENTRY),
            Err(ArchiveError::NotAFile(_))
        ));
    }

    #[test]
    fn unpack_does_not_need_a_staging_area() {
        let archive = pack(&payload(), MODEL_ENTRY).unwrap();
        let missing = std::env::temp_dir().join("strata-no-such-staging-root");
        // pack は staging を作れないと失敗するが、unpack は影響を受けない
        let err = pack_in(Some(&missing), &payload(), MODEL_ENTRY).unwrap_err();
        assert!(matches!(err, ArchiveError::Staging(_)));
        assert!(!err.is_corruption());
        assert_eq!(unpack(&archive, MODEL_ENTRY).unwrap(), payload());
    }

    #[test]
    fn host_side_failures_are_not_corruption() {
        assert!(!ArchiveError::Join("unpack: panicked".into()).is_corruption());
        assert!(ArchiveError::MissingEntry(MODEL_ENTRY.into()).is_corruption());
        assert!(
            ArchiveError::Malformed(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"))
                .is_corruption()
        );
    }

    #[tokio::test]
    async fn archiver_runs_on_blocking_pool() {
        let archiver = Archiver::default();
        let archive = archiver.pack(payload()).await.unwrap();
        assert_eq!(archiver.unpack(archive).await.unwrap(), payload());
    }
}
