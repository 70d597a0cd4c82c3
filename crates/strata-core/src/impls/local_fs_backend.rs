//! LocalFsBackend - ローカルディレクトリを使う StorageBackend
//!
//! `directory` はルート配下の相対パスとして解決します（`./models` → `<root>/models`）。
//! 書き込みは一時ファイルに書いてから rename するため、
//! 読み手が途中まで書かれたファイルを見ることはありません。
//!
//! # 更新日時
//! mtime の分解能が 1 秒のファイルシステムでも書き込み順で並ぶように、
//! 同じ backend からの書き込みは前回より `MTIME_STEP` 以上新しい mtime を付けます。
//! 連続で保存すると mtime が実時刻より少し先になることがあります。

use async_trait::async_trait;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use super::glob::ListingFilter;
use crate::ports::{BackendError, ListingOptions, SortColumn, StorageBackend};

/// 書き込み途中のファイルに付ける接尾辞
const PARTIAL_SUFFIX: &str = ".partial";

/// 連続した書き込みの mtime の最小間隔
const MTIME_STEP: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LocalFsBackend {
    root: PathBuf,
    last_stamp: Arc<Mutex<Option<SystemTime>>>,
}

impl LocalFsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            last_stamp: Arc::new(Mutex::new(None)),
        }
    }

    /// 次の書き込みに付ける mtime（前回より必ず新しい）
    fn next_stamp(&self) -> SystemTime {
        let mut last = self.last_stamp.lock().unwrap_or_else(PoisonError::into_inner);
        let now = SystemTime::now();
        let stamp = match *last {
            Some(prev) if now < prev + MTIME_STEP => prev + MTIME_STEP,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// ルートの外を指すパスは受け付けない
    fn resolve_dir(&self, directory: &str) -> Result<PathBuf, BackendError> {
        let mut resolved = self.root.clone();
        for component in Path::new(directory).components() {
            match component {
                Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                _ => {
                    return Err(BackendError::Other(format!(
                        "directory '{directory}' escapes the backend root"
                    )));
                }
            }
        }
        Ok(resolved)
    }

    fn resolve_file(&self, directory: &str, name: &str) -> Result<PathBuf, BackendError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.resolve_dir(directory)?.join(name)),
            _ => Err(BackendError::Other(format!("invalid file name '{name}'"))),
        }
    }
}

async fn write_stamped(path: &Path, content: &[u8], stamp: SystemTime) -> Result<(), BackendError> {
    tokio::fs::write(path, content).await?;
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)?
            .set_modified(stamp)
    })
    .await
    .map_err(|err| BackendError::Other(format!("mtime task failed: {err}")))??;
    Ok(())
}

fn not_found_or_io(err: std::io::Error, path: &Path) -> BackendError {
    if err.kind() == IoErrorKind::NotFound {
        BackendError::NotFound(path.display().to_string())
    } else {
        BackendError::Io(err)
    }
}

#[async_trait]
impl StorageBackend for LocalFsBackend {
    async fn file_exists(&self, directory: &str, name: &str) -> Result<bool, BackendError> {
        let path = self.resolve_file(directory, name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(false),
            Err(err) => Err(BackendError::Io(err)),
        }
    }

    async fn read_file_as_buffer(
        &self,
        directory: &str,
        name: &str,
    ) -> Result<Vec<u8>, BackendError> {
        let path = self.resolve_file(directory, name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|err| not_found_or_io(err, &path))
    }

    async fn upsert_file(
        &self,
        directory: &str,
        name: &str,
        content: &[u8],
    ) -> Result<(), BackendError> {
        let path = self.resolve_file(directory, name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = path.with_file_name(format!("{name}{PARTIAL_SUFFIX}"));
        if let Err(err) = write_stamped(&partial, content, self.next_stamp()).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(err);
        }
        if let Err(err) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(BackendError::Io(err));
        }
        Ok(())
    }

    async fn delete_file(&self, directory: &str, name: &str) -> Result<(), BackendError> {
        let path = self.resolve_file(directory, name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|err| not_found_or_io(err, &path))
    }

    async fn directory_listing(
        &self,
        directory: &str,
        pattern: &str,
        options: &ListingOptions,
    ) -> Result<Vec<String>, BackendError> {
        let filter = ListingFilter::new(
            pattern,
            options.exclude.as_deref(),
            &options.paths_to_omit,
        )?;
        let dir = self.resolve_dir(directory)?;

        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            // まだ何も保存されていない
            Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(BackendError::Io(err)),
        };

        let mut entries: Vec<(String, SystemTime)> = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.ends_with(PARTIAL_SUFFIX) || !filter.accepts(&name) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                // listing 中に削除された
                Err(err) if err.kind() == IoErrorKind::NotFound => continue,
                Err(err) => return Err(BackendError::Io(err)),
            };
            if !meta.is_file() {
                continue;
            }
            entries.push((name, meta.modified()?));
        }

        // 同じ mtime は名前順で安定させる
        entries.sort_by(|(a_name, _), (b_name, _)| a_name.cmp(b_name));
        if let Some(order) = options.sort_order {
            entries.sort_by(|(a_name, a_time), (b_name, b_time)| {
                let ordering = match order.column {
                    SortColumn::ModifiedOn => a_time.cmp(b_time),
                    SortColumn::Name => a_name.cmp(b_name),
                };
                if order.desc { ordering.reverse() } else { ordering }
            });
        }

        Ok(entries.into_iter().map(|(name, _)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SortOrder;
    use std::time::Duration;
    use tempfile::TempDir;

    const DIR: &str = "./models";

    fn backend() -> (LocalFsBackend, TempDir) {
        let root = TempDir::new().unwrap();
        (LocalFsBackend::new(root.path()), root)
    }

    #[tokio::test]
    async fn write_read_delete() {
        let (backend, root) = backend();
        backend.upsert_file(DIR, "h1.en.model", &[0, 1, 255]).await.unwrap();

        assert!(root.path().join("models/h1.en.model").is_file());
        assert!(backend.file_exists(DIR, "h1.en.model").await.unwrap());
        assert_eq!(
            backend.read_file_as_buffer(DIR, "h1.en.model").await.unwrap(),
            vec![0, 1, 255]
        );

        backend.delete_file(DIR, "h1.en.model").await.unwrap();
        assert!(!backend.file_exists(DIR, "h1.en.model").await.unwrap());
        assert!(matches!(
            backend.delete_file(DIR, "h1.en.model").await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn listing_missing_directory_is_empty() {
        let (backend, _root) = backend();
        let names = backend
            .directory_listing(DIR, "*.en.model", &ListingOptions::default())
            .await
            .unwrap();
        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn listing_orders_by_mtime() {
        let (backend, _root) = backend();
        backend.upsert_file(DIR, "old.en.model", b"1").await.unwrap();
        // mtime の分解能が粗いファイルシステム向けに間隔を空ける
        tokio::time::sleep(Duration::from_millis(1100)).await;
        backend.upsert_file(DIR, "new.en.model", b"2").await.unwrap();
        backend.upsert_file(DIR, "other.fr.model", b"3").await.unwrap();

        let names = backend
            .directory_listing(DIR, "*.en.model", &ListingOptions::sorted(SortOrder::newest_first()))
            .await
            .unwrap();
        assert_eq!(names, vec!["new.en.model", "old.en.model"]);
    }

    #[tokio::test]
    async fn burst_of_writes_lists_in_write_order() {
        let (backend, _root) = backend();
        // 名前順とは逆の順序で続けて書き込む
        for name in ["c.en.model", "b.en.model", "a.en.model"] {
            backend.upsert_file(DIR, name, b"x").await.unwrap();
        }

        let names = backend
            .directory_listing(DIR, "*.en.model", &ListingOptions::sorted(SortOrder::newest_first()))
            .await
            .unwrap();
        assert_eq!(names, vec!["a.en.model", "b.en.model", "c.en.model"]);
    }

    #[tokio::test]
    async fn rewriting_a_file_makes_it_newest() {
        let (backend, _root) = backend();
        backend.upsert_file(DIR, "h1.en.model", b"1").await.unwrap();
        backend.upsert_file(DIR, "h2.en.model", b"2").await.unwrap();
        backend.upsert_file(DIR, "h1.en.model", b"3").await.unwrap();

        let names = backend
            .directory_listing(DIR, "*.en.model", &ListingOptions::sorted(SortOrder::newest_first()))
            .await
            .unwrap();
        assert_eq!(names, vec!["h1.en.model", "h2.en.model"]);
    }

    #[tokio::test]
    async fn rejects_paths_outside_root() {
        let (backend, _root) = backend();
        assert!(backend.upsert_file("../escape", "x", b"1").await.is_err());
        assert!(backend.upsert_file(DIR, "../x", b"1").await.is_err());
        assert!(backend.read_file_as_buffer("/etc", "passwd").await.is_err());
    }
}
