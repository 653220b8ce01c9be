//! フォルダ一括処理（rayonで並列）

use crate::export::SummaryRow;
use crate::pipeline::ERROR_STATUS;
use crate::processor::Processor;
use crate::scanner::LogFileInfo;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

/// 全ファイルを処理して集計行を返す（ファイル名順）
///
/// 1ファイルの失敗は集計行に ERROR として残し、他のファイルは続行する。
pub fn process_all(processor: &Processor, files: &[LogFileInfo], show_progress: bool) -> Vec<SummaryRow> {
    let progress = if show_progress {
        ProgressBar::new(files.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
        progress.set_style(style.progress_chars("#>-"));
    }

    let rows: Vec<SummaryRow> = files
        .par_iter()
        .map(|file| {
            let row = match processor.process_file(&file.path) {
                Ok(output) => SummaryRow {
                    file_name: file.file_name.clone(),
                    serial: output.result.serial.clone(),
                    config_tag: output.result.config_tag.clone().unwrap_or_default(),
                    result: output.outcome().to_string(),
                    checked: output.result.outcomes.len(),
                    mismatched: output.result.mismatches().count(),
                    detail: output.report_path.display().to_string(),
                },
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "処理に失敗しました");
                    SummaryRow {
                        file_name: file.file_name.clone(),
                        result: ERROR_STATUS.to_string(),
                        detail: e.to_string(),
                        ..SummaryRow::default()
                    }
                }
            };
            progress.set_message(file.file_name.clone());
            progress.inc(1);
            row
        })
        .collect();

    progress.finish_and_clear();
    rows
}

/// 判定ごとの件数（PASS, FAIL, UNPASS, ERROR）
pub fn tally(rows: &[SummaryRow]) -> [usize; 4] {
    let count = |status: &str| rows.iter().filter(|r| r.result == status).count();
    [count("PASS"), count("FAIL"), count("UNPASS"), count(ERROR_STATUS)]
}
