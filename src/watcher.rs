//! 監視フォルダのポーリング
//!
//! 書き込み途中のファイルを拾わないよう、2回続けてサイズが変わらなかった
//! ファイルだけをキューに送る。同じ内容のファイルは（パス + SHA-256で）一度だけ処理する。

use crate::error::Result;
use crate::scanner::scan_folder;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

/// ファイル内容のSHA-256（16進）
pub fn file_hash(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Seen {
    size: u64,
    modified: Option<SystemTime>,
    hash: String,
}

/// 処理済みファイルの記録
#[derive(Debug, Default)]
pub struct ProcessedFiles {
    seen: HashMap<PathBuf, Seen>,
}

impl ProcessedFiles {
    /// サイズと更新日時が記録と同じなら未変更
    fn unchanged(&self, path: &Path, size: u64, modified: Option<SystemTime>) -> bool {
        self.seen
            .get(path)
            .is_some_and(|s| s.size == size && s.modified == modified)
    }

    /// 記録して、新しい内容なら true
    fn record(&mut self, path: &Path, size: u64, modified: Option<SystemTime>, hash: String) -> bool {
        let is_new = self.seen.get(path).map_or(true, |s| s.hash != hash);
        self.seen.insert(path.to_path_buf(), Seen { size, modified, hash });
        is_new
    }

    /// 監視フォルダから消えたファイルの記録を捨てる
    fn retain_present(&mut self, present: &HashSet<PathBuf>) {
        self.seen.retain(|path, _| present.contains(path));
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

pub struct FolderWatcher {
    folder: PathBuf,
    interval: Duration,
    /// 前回のポーリングで見たサイズ（安定待ち）
    pending: HashMap<PathBuf, u64>,
    processed: ProcessedFiles,
}

impl FolderWatcher {
    /// 監視フォルダがなければ作成
    pub fn new(folder: &Path, interval: Duration) -> Result<Self> {
        std::fs::create_dir_all(folder)?;
        Ok(Self {
            folder: folder.to_path_buf(),
            interval,
            pending: HashMap::new(),
            processed: ProcessedFiles::default(),
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// 既存のファイルを処理済みとして記録（起動前のファイルは処理しない）
    pub fn skip_existing(&mut self) -> Result<usize> {
        let files = scan_folder(&self.folder)?;
        for file in &files {
            let modified = modified_time(&file.path);
            match file_hash(&file.path) {
                Ok(hash) => {
                    self.processed.record(&file.path, file.size, modified, hash);
                }
                Err(e) => tracing::debug!(path = %file.path.display(), error = %e, "ハッシュ計算に失敗"),
            }
        }
        Ok(files.len())
    }

    /// 1回分のポーリング。処理すべきファイルを返す
    pub fn poll(&mut self) -> Result<Vec<PathBuf>> {
        let files = scan_folder(&self.folder)?;
        let present: HashSet<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        self.processed.retain_present(&present);

        let mut ready = Vec::new();
        let mut still_pending = HashMap::new();

        for file in files {
            let modified = modified_time(&file.path);
            if self.processed.unchanged(&file.path, file.size, modified) {
                continue;
            }

            match self.pending.get(&file.path) {
                Some(&last) if last == file.size => {}
                _ => {
                    // 初見またはサイズ変化: 次回まで待つ
                    still_pending.insert(file.path, file.size);
                    continue;
                }
            }

            let hash = match file_hash(&file.path) {
                Ok(hash) => hash,
                Err(e) => {
                    tracing::debug!(path = %file.path.display(), error = %e, "読み込み待ち");
                    still_pending.insert(file.path, file.size);
                    continue;
                }
            };

            if self.processed.record(&file.path, file.size, modified, hash) {
                tracing::debug!(path = %file.path.display(), "新しいログを検出");
                ready.push(file.path);
            } else {
                tracing::debug!(path = %file.path.display(), "内容が同じため処理済みとして扱います");
            }
        }

        self.pending = still_pending;
        Ok(ready)
    }

    /// 受信側が閉じるまでポーリングを続ける
    ///
    /// キューが満杯の間は `send` で待つ。
    pub async fn run(mut self, tx: mpsc::Sender<PathBuf>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let ready = match self.poll() {
                Ok(ready) => ready,
                Err(e) => {
                    tracing::warn!(folder = %self.folder.display(), error = %e, "監視フォルダの読み込みに失敗");
                    continue;
                }
            };

            for path in ready {
                if tx.send(path).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn watcher(dir: &Path) -> FolderWatcher {
        FolderWatcher::new(dir, Duration::from_millis(10)).unwrap()
    }

    #[test]
    fn test_file_hash() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "abc").unwrap();
        assert_eq!(
            file_hash(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_is_queued_after_stable_poll() {
        let dir = tempdir().unwrap();
        let mut w = watcher(dir.path());
        let path = dir.path().join("est.csv");
        fs::write(&path, "Serial No,1\n").unwrap();

        // 1回目は安定待ち
        assert!(w.poll().unwrap().is_empty());
        assert_eq!(w.poll().unwrap(), vec![path.clone()]);
        // 処理済み
        assert!(w.poll().unwrap().is_empty());
        assert!(w.poll().unwrap().is_empty());
    }

    #[test]
    fn test_growing_file_waits() {
        let dir = tempdir().unwrap();
        let mut w = watcher(dir.path());
        let path = dir.path().join("est.csv");

        fs::write(&path, "a").unwrap();
        assert!(w.poll().unwrap().is_empty());
        fs::write(&path, "ab").unwrap();
        assert!(w.poll().unwrap().is_empty());
        assert_eq!(w.poll().unwrap(), vec![path]);
    }

    #[test]
    fn test_skip_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("old.csv"), "x").unwrap();
        let mut w = watcher(dir.path());
        assert_eq!(w.skip_existing().unwrap(), 1);

        assert!(w.poll().unwrap().is_empty());
        assert!(w.poll().unwrap().is_empty());
    }

    #[test]
    fn test_non_log_files_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), "x").unwrap();
        let mut w = watcher(dir.path());
        assert!(w.poll().unwrap().is_empty());
        assert!(w.poll().unwrap().is_empty());
    }

    #[test]
    fn test_deleted_files_are_forgotten() {
        let dir = tempdir().unwrap();
        let mut w = watcher(dir.path());
        let path = dir.path().join("est.csv");
        fs::write(&path, "Serial No,1\n").unwrap();

        w.poll().unwrap();
        assert_eq!(w.poll().unwrap(), vec![path.clone()]);
        assert_eq!(w.processed.len(), 1);

        fs::remove_file(&path).unwrap();
        assert!(w.poll().unwrap().is_empty());
        assert!(w.processed.is_empty());
        assert!(w.pending.is_empty());
    }

    #[test]
    fn test_creates_missing_folder() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("incoming");
        let w = watcher(&folder);
        assert!(w.folder().is_dir());
    }
}
