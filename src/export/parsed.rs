//! 正規化テーブル（Section,Parameter,Value）のCSV出力

use crate::error::Result;
use est_verify_common::LogRecord;
use std::io::Write;
use std::path::Path;

/// 正規化済みレコードをCSVで保存（UTF-8 BOM付き、Excelで開ける形）
pub fn write_parsed_csv(record: &LogRecord, output_path: &Path) -> Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(output_path)?);
    file.write_all(b"\xEF\xBB\xBF")?;
    for line in record.to_normalized_lines(',') {
        writeln!(file, "{}", line)?;
    }
    file.flush()?;
    Ok(())
}
