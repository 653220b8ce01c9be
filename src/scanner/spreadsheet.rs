//! Excel系ファイル（.xlsx / .xlsm / .xls / .ods）の読み込み
//!
//! 先頭シートを文字列の行に変換する。ログの場合はさらに区切り文字テキストに
//! 変換して、テキストのパーサーにそのまま渡す。

use crate::error::{EstError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use est_verify_common::table::{join_line, trim_trailing_empty};
use std::path::Path;

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];

pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| SPREADSHEET_EXTENSIONS.contains(&e.as_str()))
}

/// セルを文字列に変換（整数値の浮動小数は ".0" を付けない）
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// 先頭シートを行のリストとして読み込み（行末の空セルは除去）
pub fn read_first_sheet(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| EstError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EstError::Spreadsheet(format!("シートがありません: {}", path.display())))?
        .map_err(|e| EstError::Spreadsheet(format!("{}: {}", path.display(), e)))?;

    let rows = range
        .rows()
        .map(|row| {
            let mut cells: Vec<String> = row.iter().map(cell_to_string).collect();
            trim_trailing_empty(&mut cells);
            cells
        })
        .collect();

    Ok(rows)
}

/// 先頭シートをカンマ区切りテキストに変換
pub fn sheet_to_text(path: &Path) -> Result<String> {
    let rows = read_first_sheet(path)?;
    let lines: Vec<String> = rows
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| join_line(r, ','))
        .collect();
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Float(12345678.0)), "12345678");
        assert_eq!(cell_to_string(&Data::Float(12.5)), "12.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::String(" P-200 ".into())), "P-200");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
    }

    #[test]
    fn test_is_spreadsheet() {
        assert!(is_spreadsheet(Path::new("a/master.XLSX")));
        assert!(is_spreadsheet(Path::new("log.ods")));
        assert!(!is_spreadsheet(Path::new("log.csv")));
        assert!(!is_spreadsheet(Path::new("noext")));
    }
}
