//! ログファイルの検出と読み込み

pub mod spreadsheet;

use crate::error::{EstError, Result};
use est_verify_common::{read_log, FormatHint, LogFormat, LogRecord};
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub use spreadsheet::{is_spreadsheet, read_first_sheet};

#[derive(Debug, Clone)]
pub struct LogFileInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
}

/// ESTログとして扱う拡張子（小文字）
pub const LOG_EXTENSIONS: &[&str] = &["csv", "tsv", "txt", "log", "ini", "xlsx", "xlsm", "xls", "ods"];

lazy_static::lazy_static! {
    /// 出力済みの成果物（`{sn}_{YYYYMMDD_HHMMSS}_{suffix}.ext`）
    static ref ARTIFACT_RE: Regex =
        Regex::new(r"(?i)_\d{8}_\d{6}(-\d+)?_(pass|fail|unpass|parsed|log)\.[a-z0-9]+$").unwrap();
}

pub fn is_log_extension(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| LOG_EXTENSIONS.contains(&e.as_str()))
}

/// ログとして処理すべきファイルか
///
/// Officeのロックファイル（`~$`）、隠しファイル、出力済み成果物は除外する。
pub fn is_candidate(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return false,
    };
    if name.starts_with("~$") || name.starts_with('.') {
        return false;
    }
    is_log_extension(path) && !ARTIFACT_RE.is_match(&name)
}

/// フォルダ直下のログファイルを列挙（ファイル名順）
pub fn scan_folder(folder: &Path) -> Result<Vec<LogFileInfo>> {
    if !folder.is_dir() {
        return Err(EstError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<LogFileInfo> = WalkDir::new(folder)
        .max_depth(1) // 直下のみ（結果フォルダは見ない）
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_candidate(e.path()))
        .map(|e| LogFileInfo {
            path: e.path().to_path_buf(),
            file_name: e.file_name().to_string_lossy().to_string(),
            size: e.metadata().map(|m| m.len()).unwrap_or(0),
        })
        .collect();

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

/// バイト列をテキストに変換（BOM除去、不正なUTF-8は置換）
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// ログファイルの内容をテキストとして読み込み
pub fn read_log_text(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(EstError::FileNotFound(path.display().to_string()));
    }
    if is_spreadsheet(path) {
        return spreadsheet::sheet_to_text(path);
    }
    let bytes = std::fs::read(path)?;
    Ok(decode_text(&bytes))
}

pub fn format_hint(path: &Path) -> FormatHint {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    FormatHint::from_extension(&ext)
}

/// ログファイルを読み込んで正規化
pub fn read_log_file(path: &Path, declared: Option<LogFormat>) -> Result<LogRecord> {
    let text = read_log_text(path)?;
    let record = read_log(&text, declared, format_hint(path))?;
    tracing::debug!(
        path = %path.display(),
        format = %record.format(),
        entries = record.len(),
        serial = record.serial(),
        "ログ解析完了"
    );
    Ok(record)
}
