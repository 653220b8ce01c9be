//! 正規化済みログレコード
//!
//! (セクション, パラメータ) → 値 のマップ。挿入順を保持しつつ、
//! 同じキーが再出力された場合は後勝ちで値を上書きする。

use crate::error::{Error, Result};
use crate::table::join_line;
use crate::types::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 正規化テーブルのヘッダー
pub const NORMALIZED_HEADER: [&str; 3] = ["Section", "Parameter", "Value"];

/// ログの1エントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub section: String,
    pub parameter: String,
    pub value: String,
}

/// レポートに載せる機器情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogMetadata {
    pub model: Option<String>,
    pub software_version: Option<String>,
    pub firmware_version: Option<String>,
    pub date: Option<String>,
    pub tool_name: Option<String>,
    pub config_tag: Option<String>,
}

/// 照合用キー（trim + 小文字）
fn lookup_key(s: &str) -> String {
    s.trim().to_lowercase()
}

/// 英数字のみ・小文字化したキー名（メタデータ判定用）
pub(crate) fn compact(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// シリアル番号を表すキー名か
pub fn is_serial_key(key: &str) -> bool {
    let k = compact(key);
    matches!(k.as_str(), "sn" | "serial")
        || (k.contains("serial") && (k.contains("no") || k.contains("number")))
}

/// 1ファイル分のエントリを組み立てる
#[derive(Debug, Default)]
pub struct RecordBuilder {
    entries: Vec<LogEntry>,
    index: HashMap<(String, String), usize>,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// エントリを追加（同じキーは後勝ち、位置は最初の出現のまま）
    pub fn insert(&mut self, section: &str, parameter: &str, value: &str) {
        let parameter = parameter.trim();
        if parameter.is_empty() {
            return;
        }
        let section = section.trim();
        let value = value.trim();

        let key = (lookup_key(section), lookup_key(parameter));
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].value = value.to_string(),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(LogEntry {
                    section: section.to_string(),
                    parameter: parameter.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// シリアル番号を抽出してレコードを確定
    pub fn finish(self, format: LogFormat) -> Result<LogRecord> {
        let serial = self
            .entries
            .iter()
            .find(|e| is_serial_key(&e.parameter) && !e.value.is_empty())
            .map(|e| e.value.clone())
            .ok_or_else(|| {
                Error::MalformedContent("シリアル番号が見つかりません".to_string())
            })?;

        let metadata = extract_metadata(&self.entries);

        Ok(LogRecord {
            format,
            serial,
            metadata,
            entries: self.entries,
            index: self.index,
        })
    }
}

/// 構成タグとして扱うキー名（compact後）: Config Tag / Config_Tag / Target_Config_Tag
const CONFIG_TAG_KEYS: [&str; 2] = ["configtag", "targetconfigtag"];

fn extract_metadata(entries: &[LogEntry]) -> LogMetadata {
    let mut meta = LogMetadata::default();

    for entry in entries.iter().filter(|e| !e.value.is_empty()) {
        let key = compact(&entry.parameter);
        let slot = if CONFIG_TAG_KEYS.contains(&key.as_str()) {
            &mut meta.config_tag
        } else if key.contains("firmware") {
            &mut meta.firmware_version
        } else if key.contains("software") {
            &mut meta.software_version
        } else if key.contains("model") {
            &mut meta.model
        } else if key.contains("toolname") || key == "tool" {
            &mut meta.tool_name
        } else if key.starts_with("date") {
            &mut meta.date
        } else {
            continue;
        };

        if slot.is_none() {
            *slot = Some(entry.value.clone());
        }
    }

    meta
}

/// 1ログファイルの正規化レコード
#[derive(Debug, Clone)]
pub struct LogRecord {
    format: LogFormat,
    serial: String,
    metadata: LogMetadata,
    entries: Vec<LogEntry>,
    index: HashMap<(String, String), usize>,
}

impl LogRecord {
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// ログから抽出したシリアル番号（原文）
    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn metadata(&self) -> &LogMetadata {
        &self.metadata
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (セクション, パラメータ) で値を検索
    ///
    /// セクションが空の場合は全セクションから最初に現れたパラメータを返す。
    pub fn get(&self, section: &str, parameter: &str) -> Option<&str> {
        let parameter = lookup_key(parameter);
        let section = lookup_key(section);

        if section.is_empty() {
            return self
                .entries
                .iter()
                .find(|e| lookup_key(&e.parameter) == parameter)
                .map(|e| e.value.as_str());
        }

        self.index
            .get(&(section, parameter))
            .map(|&pos| self.entries[pos].value.as_str())
    }

    /// 正規化テーブル（Section,Parameter,Value）の行を返す
    pub fn to_normalized_lines(&self, delimiter: char) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        lines.push(join_line(&NORMALIZED_HEADER, delimiter));
        for e in &self.entries {
            lines.push(join_line(&[&e.section, &e.parameter, &e.value], delimiter));
        }
        lines
    }
}
