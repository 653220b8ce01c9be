//! ESTログパーサー
//!
//! 3種類のログ形式を判定し、共通の `LogRecord` に正規化する。
//!
//! ## 対応形式
//! 1. 区切り文字テーブル（ヘッダー行 + データ行）
//! 2. ヘッダー + テーブル（`key,value` 行の後に `Section,...` の設定表）
//! 3. キー・バリュー・セクション（`[SECTION]` + `key = value`、設定表の埋め込み可）

use crate::error::{Error, Result};
use crate::record::{compact, is_serial_key, LogRecord, RecordBuilder};
use crate::table::{detect_delimiter, split_line, trim_trailing_empty};
use crate::types::LogFormat;

/// ヘッダー部・横持ちテーブルのセクション名
pub const HEADER_SECTION: &str = "";

const SECTION_COLUMNS: &[&str] = &["section"];
const PARAMETER_COLUMNS: &[&str] = &["parameter", "parametername", "name", "item", "key"];
const VALUE_COLUMNS: &[&str] = &["currentvalue", "value", "actual", "actualvalue"];

/// 拡張子から決まる最初の解析方針
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    /// CSV・Excelなど表形式の拡張子
    Tabular,
    /// それ以外（.txt / .log / .ini など）
    Sectioned,
}

impl FormatHint {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "csv" | "tsv" | "xlsx" | "xlsm" | "xls" | "ods" => FormatHint::Tabular,
            _ => FormatHint::Sectioned,
        }
    }
}

/// ログテキストを解析
///
/// # Arguments
/// * `text` - ログファイルの内容
/// * `declared` - 形式を指定する場合は `Some`（判定を省略）
/// * `hint` - 自動判定時に優先する方針
pub fn read_log(text: &str, declared: Option<LogFormat>, hint: FormatHint) -> Result<LogRecord> {
    let format = match declared {
        Some(format) => format,
        None => detect_format(text, hint)?,
    };
    parse_as(text, format)
}

/// 指定形式で解析
pub fn parse_as(text: &str, format: LogFormat) -> Result<LogRecord> {
    match format {
        LogFormat::DelimitedTable => parse_delimited_table(text),
        LogFormat::HeaderTable => parse_header_table(text),
        LogFormat::KeyValueSection => parse_key_value_sections(text),
    }
}

/// 空行を除いたtrim済みの行（BOM除去）
fn content_lines(text: &str) -> Vec<&str> {
    text.trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect()
}

fn is_section_header(line: &str) -> bool {
    line.len() > 2 && line.starts_with('[') && line.ends_with(']')
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';')
}

/// `key = value` / `key: value` 行の区切り位置
///
/// 区切り文字（カンマ等）より前に `=` か `:` がある場合のみ
fn kv_separator(line: &str) -> Option<(usize, char)> {
    let sep = line.char_indices().find(|(_, c)| *c == '=' || *c == ':')?;
    let delim_pos = line.find(|c: char| c == ',' || c == '\t' || c == ';');
    match delim_pos {
        Some(d) if d < sep.0 => None,
        _ if sep.0 == 0 => None,
        _ => Some(sep),
    }
}

/// 形式を自動判定
///
/// `[SECTION]` で始まればキー・バリュー形式、ヘッダー行とそれ以下の幅の行が
/// 続けば表形式。拡張子のヒントでどちらを先に試すかが変わる。
pub fn detect_format(text: &str, hint: FormatHint) -> Result<LogFormat> {
    let lines = content_lines(text);
    let first = match lines.first() {
        Some(first) => *first,
        None => return Err(Error::MalformedContent("内容が空です".to_string())),
    };

    // 先頭が [SECTION] なら拡張子に関係なくキー・バリュー形式（設定表の埋め込みを含む）
    if is_section_header(first) {
        return Ok(LogFormat::KeyValueSection);
    }

    let table = detect_table(&lines);
    let detected = match hint {
        FormatHint::Tabular => table,
        FormatHint::Sectioned => {
            if table.is_some() {
                table
            } else if lines.iter().any(|l| kv_separator(l).is_some()) {
                // [SECTION] のない key = value ファイル
                Some(LogFormat::KeyValueSection)
            } else {
                None
            }
        }
    };

    detected.ok_or_else(|| {
        Error::UnsupportedFormat(format!("認識できない形式です（先頭行: {}）", first))
    })
}

fn detect_table(lines: &[&str]) -> Option<LogFormat> {
    let delimiter = detect_delimiter(lines[0]);
    let rows: Vec<Vec<String>> = lines.iter().map(|l| split_line(l, delimiter)).collect();
    let header = &rows[0];

    // 2行目以降に "Section" 見出しがあればヘッダー + テーブル
    let has_section_row = rows
        .iter()
        .skip(1)
        .any(|r| r.len() >= 2 && r[0].eq_ignore_ascii_case("section"));
    if has_section_row {
        return Some(LogFormat::HeaderTable);
    }

    // "Serial No,EDW0042" のような2列のキー・バリューだけのファイル（シリアルは何行目でもよい）
    let all_pairs = rows.iter().all(|r| r.len() <= 2);
    let has_serial_pair = rows.iter().any(|r| {
        r.len() == 2 && is_serial_key(&r[0]) && r[1].chars().any(|c| c.is_ascii_digit())
    });
    if all_pairs && has_serial_pair {
        return Some(LogFormat::HeaderTable);
    }

    let uniform = header.len() >= 2
        && !header[0].is_empty()
        && rows.len() >= 2
        && rows.iter().skip(1).all(|r| r.len() <= header.len());
    uniform.then_some(LogFormat::DelimitedTable)
}

fn find_column(header: &[String], names: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| names.iter().any(|n| compact(h) == *n))
}

/// 表をエントリに展開
///
/// パラメータ列と値列があれば縦持ち（1行1エントリ）、なければ横持ち
/// （各列が1エントリ、空セルは無視）として扱う。
fn apply_table(
    builder: &mut RecordBuilder,
    header: &[String],
    rows: &[Vec<String>],
    default_section: &str,
) -> Result<()> {
    let section_col = find_column(header, SECTION_COLUMNS);
    let param_col = find_column(header, PARAMETER_COLUMNS);
    let value_col = find_column(header, VALUE_COLUMNS);

    for (i, row) in rows.iter().enumerate() {
        if row.len() > header.len() {
            return Err(Error::MalformedContent(format!(
                "表の{}行目の列数({})がヘッダー({})より多い",
                i + 1,
                row.len(),
                header.len()
            )));
        }
        if row.iter().all(|c| c.is_empty()) {
            continue;
        }

        let cell = |c: usize| row.get(c).map(String::as_str).unwrap_or("");
        let section = match section_col {
            Some(c) if !cell(c).is_empty() => cell(c),
            _ => default_section,
        };

        match (param_col, value_col) {
            (Some(p), Some(v)) => builder.insert(section, cell(p), cell(v)),
            _ => {
                for (c, name) in header.iter().enumerate() {
                    if Some(c) == section_col || cell(c).is_empty() {
                        continue;
                    }
                    builder.insert(section, name, cell(c));
                }
            }
        }
    }

    Ok(())
}

/// 区切り文字テーブル形式
pub fn parse_delimited_table(text: &str) -> Result<LogRecord> {
    let lines = content_lines(text);
    if lines.len() < 2 {
        return Err(Error::MalformedContent(
            "ヘッダー行とデータ行が必要です".to_string(),
        ));
    }

    let delimiter = detect_delimiter(lines[0]);
    let header = split_line(lines[0], delimiter);
    if header.len() < 2 {
        return Err(Error::MalformedContent(format!(
            "ヘッダー行の列が足りません: {}",
            lines[0]
        )));
    }

    let rows: Vec<Vec<String>> = lines[1..]
        .iter()
        .map(|l| split_line(l, delimiter))
        .collect();

    let mut builder = RecordBuilder::new();
    apply_table(&mut builder, &header, &rows, HEADER_SECTION)?;
    builder.finish(LogFormat::DelimitedTable)
}

/// ヘッダー + テーブル形式
pub fn parse_header_table(text: &str) -> Result<LogRecord> {
    let lines = content_lines(text);
    let delimiter = match lines.first() {
        Some(first) => detect_delimiter(first),
        None => return Err(Error::MalformedContent("内容が空です".to_string())),
    };

    let mut builder = RecordBuilder::new();
    let mut table_header: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for line in &lines {
        let mut fields = split_line(line, delimiter);

        if table_header.is_some() {
            rows.push(fields);
            continue;
        }

        if fields.len() >= 2 && fields[0].eq_ignore_ascii_case("section") {
            table_header = Some(fields);
            continue;
        }

        // ヘッダー部: 1列目がキー、残りが値
        trim_trailing_empty(&mut fields);
        if fields.len() >= 2 && !fields[0].is_empty() {
            let separator = delimiter.to_string();
            let value = fields[1..].join(separator.as_str());
            builder.insert(HEADER_SECTION, &fields[0], &value);
        }
    }

    if let Some(header) = table_header {
        apply_table(&mut builder, &header, &rows, HEADER_SECTION)?;
    }

    builder.finish(LogFormat::HeaderTable)
}

/// 設定表の埋め込み（キー・バリュー形式の途中から始まる表）
struct PendingTable {
    header: Vec<String>,
    delimiter: char,
    section: String,
    rows: Vec<Vec<String>>,
}

impl PendingTable {
    fn flush(self, builder: &mut RecordBuilder) -> Result<()> {
        apply_table(builder, &self.header, &self.rows, &self.section)
    }
}

/// `key: A = B (unit)` → `A`、`key = 150 (bar)` → `150`
fn clean_kv_value(raw: &str, separator: char) -> &str {
    let mut value = raw.trim();
    if separator == ':' {
        if let Some(pos) = value.find('=') {
            value = value[..pos].trim();
        }
    }
    if value.ends_with(')') {
        if let Some(pos) = value.rfind('(') {
            if pos > 0 {
                value = value[..pos].trim();
            }
        }
    }
    value
}

fn starts_with_digit(s: &str) -> bool {
    s.chars().take(3).any(|c| c.is_ascii_digit())
}

/// キー・バリュー・セクション形式
pub fn parse_key_value_sections(text: &str) -> Result<LogRecord> {
    let lines = content_lines(text);
    if lines.is_empty() {
        return Err(Error::MalformedContent("内容が空です".to_string()));
    }

    let mut builder = RecordBuilder::new();
    let mut section = String::new();
    let mut table: Option<PendingTable> = None;

    for line in lines {
        if is_comment(line) {
            continue;
        }

        if is_section_header(line) {
            if let Some(pending) = table.take() {
                pending.flush(&mut builder)?;
            }
            section = line[1..line.len() - 1].trim().to_string();
            continue;
        }

        if let Some(pending) = table.as_mut() {
            if line.contains(pending.delimiter) {
                pending.rows.push(split_line(line, pending.delimiter));
            }
            continue;
        }

        if let Some((pos, separator)) = kv_separator(line) {
            let key = &line[..pos];
            let value = clean_kv_value(&line[pos + separator.len_utf8()..], separator);
            builder.insert(&section, key, value);
            continue;
        }

        let delimiter = detect_delimiter(line);
        let fields = split_line(line, delimiter);
        if fields.len() >= 3 && !starts_with_digit(&fields[0]) {
            table = Some(PendingTable {
                header: fields,
                delimiter,
                section: section.clone(),
                rows: Vec::new(),
            });
        }
    }

    if let Some(pending) = table.take() {
        pending.flush(&mut builder)?;
    }

    builder.finish(LogFormat::KeyValueSection)
}
