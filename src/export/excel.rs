//! 一括処理の集計ブック（rust_xlsxwriter）

use crate::error::{EstError, Result};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;

/// 集計の1行
#[derive(Debug, Clone, Default)]
pub struct SummaryRow {
    pub file_name: String,
    pub serial: String,
    pub config_tag: String,
    /// PASS / FAIL / UNPASS / ERROR
    pub result: String,
    pub checked: usize,
    pub mismatched: usize,
    pub detail: String,
}

const HEADERS: &[(&str, f64)] = &[
    ("File", 32.0),
    ("Serial Number", 20.0),
    ("Config Tag", 16.0),
    ("Result", 10.0),
    ("Checked", 10.0),
    ("Mismatched", 12.0),
    ("Detail", 60.0),
];

fn excel_err(e: XlsxError) -> EstError {
    EstError::ExcelGeneration(e.to_string())
}

/// 集計ブックを生成
pub fn generate_summary(rows: &[SummaryRow], output_path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary").map_err(excel_err)?;

    for (col, (label, width)) in HEADERS.iter().enumerate() {
        let col = col as u16;
        sheet
            .write_string_with_format(0, col, *label, &bold)
            .map_err(excel_err)?;
        sheet.set_column_width(col, *width).map_err(excel_err)?;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, &row.file_name).map_err(excel_err)?;
        sheet.write_string(r, 1, &row.serial).map_err(excel_err)?;
        sheet.write_string(r, 2, &row.config_tag).map_err(excel_err)?;
        sheet.write_string(r, 3, &row.result).map_err(excel_err)?;
        sheet.write_number(r, 4, row.checked as f64).map_err(excel_err)?;
        sheet.write_number(r, 5, row.mismatched as f64).map_err(excel_err)?;
        sheet.write_string(r, 6, &row.detail).map_err(excel_err)?;
    }

    workbook.save(output_path).map_err(excel_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto, Reader};
    use tempfile::tempdir;

    #[test]
    fn test_summary_workbook() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("summary.xlsx");
        let rows = vec![
            SummaryRow {
                file_name: "a.csv".into(),
                serial: "PUMP-0042".into(),
                config_tag: "CFG-A".into(),
                result: "PASS".into(),
                checked: 3,
                ..SummaryRow::default()
            },
            SummaryRow {
                file_name: "b.txt".into(),
                result: "ERROR".into(),
                detail: "Malformed content".into(),
                ..SummaryRow::default()
            },
        ];
        generate_summary(&rows, &path).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range("Summary").unwrap();
        assert_eq!(range.height(), 3);
        assert_eq!(range.get((1, 1)).unwrap().to_string(), "PUMP-0042");
        assert_eq!(range.get((2, 3)).unwrap().to_string(), "ERROR");
    }
}
