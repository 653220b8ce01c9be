//! マスタ設定リストの読み込みと差し替え
//!
//! 照合中のスレッドは `snapshot()` で `Arc` を受け取るため、再読み込み中も
//! 古いインデックスを最後まで使える。新しいインデックスはロックの外で構築し、
//! 書き込みロックは差し替えの瞬間だけ取る。

use crate::error::{EstError, Result};
use crate::scanner::{decode_text, is_spreadsheet, read_first_sheet};
use est_verify_common::table::{detect_delimiter, split_line};
use est_verify_common::MasterIndex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// 読み込み済みのマスタ
#[derive(Debug)]
pub struct MasterSnapshot {
    pub path: PathBuf,
    pub index: MasterIndex,
    pub modified: Option<SystemTime>,
}

/// マスタファイルを読み込み（.xlsx 等は先頭シート、それ以外はCSV）
pub fn load_master(path: &Path) -> Result<MasterIndex> {
    if !path.is_file() {
        return Err(EstError::Common(est_verify_common::Error::FileNotFound(
            path.display().to_string(),
        )));
    }

    let rows = if is_spreadsheet(path) {
        read_first_sheet(path)?
    } else {
        read_csv_rows(path)?
    };

    let mut rows = rows.into_iter();
    let header = rows.next().unwrap_or_default();
    let index = MasterIndex::from_rows(&header, rows)?;

    let stats = index.stats();
    if stats.skipped_invalid_serial > 0 {
        tracing::warn!(
            skipped = stats.skipped_invalid_serial,
            "シリアル番号に数字がない行をスキップしました"
        );
    }
    if index.is_empty() {
        tracing::warn!(path = %path.display(), "マスタにエントリがありません");
    }
    tracing::info!(
        path = %path.display(),
        serials = stats.serials,
        entries = stats.entries,
        "マスタ読み込み完了"
    );

    Ok(index)
}

fn read_csv_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let text = decode_text(&std::fs::read(path)?);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let delimiter = lines.first().map(|l| detect_delimiter(l)).unwrap_or(',');
    Ok(lines.iter().map(|l| split_line(l, delimiter)).collect())
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// 差し替え可能なマスタ
#[derive(Debug)]
pub struct MasterStore {
    current: RwLock<Arc<MasterSnapshot>>,
}

impl MasterStore {
    pub fn open(path: &Path) -> Result<Self> {
        let snapshot = Self::build(path)?;
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// 構築済みのインデックスから作成
    pub fn from_index(path: &Path, index: MasterIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(MasterSnapshot {
                path: path.to_path_buf(),
                index,
                modified: modified_time(path),
            })),
        }
    }

    fn build(path: &Path) -> Result<MasterSnapshot> {
        let modified = modified_time(path);
        let index = load_master(path)?;
        Ok(MasterSnapshot {
            path: path.to_path_buf(),
            index,
            modified,
        })
    }

    /// 現在のマスタ
    pub fn snapshot(&self) -> Arc<MasterSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn path(&self) -> PathBuf {
        self.snapshot().path.clone()
    }

    /// 同じファイルを再読み込み（失敗時は現在のマスタを維持）
    pub fn reload(&self) -> Result<Arc<MasterSnapshot>> {
        let path = self.path();
        self.reload_from(&path)
    }

    /// 別のファイルに切り替え
    pub fn reload_from(&self, path: &Path) -> Result<Arc<MasterSnapshot>> {
        let fresh = Arc::new(Self::build(path)?);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::clone(&fresh);
        Ok(fresh)
    }

    /// 更新日時が変わっていれば再読み込み
    ///
    /// 再読み込みした場合は `Some`。
    pub fn reload_if_modified(&self) -> Result<Option<Arc<MasterSnapshot>>> {
        let current = self.snapshot();
        let modified = modified_time(&current.path);
        if modified.is_none() || modified == current.modified {
            return Ok(None);
        }
        self.reload_from(&current.path).map(Some)
    }
}
