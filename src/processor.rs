//! 1ファイル分の処理
//!
//! ログ読み込み → マスタ照合 → レポート生成 → 成果物の配置
//!
//! 成果物は `{出力フォルダ}/{シリアル}_{判定}/` にまとめる:
//! - `{シリアル}_{YYYYMMDD_HHMMSS}_{判定}.pdf`
//! - `{シリアル}_{YYYYMMDD_HHMMSS}_parsed.csv`
//! - `{シリアル}_{YYYYMMDD_HHMMSS}_log.{元の拡張子}`
//!
//! 同じ秒に同じシリアル・判定の成果物がすでにあれば、時刻の後に `-2`, `-3`, ... を付ける。

use crate::config::Config;
use crate::error::{EstError, Result};
use crate::export::{generate_report, write_parsed_csv, ReportData};
use crate::master_store::MasterStore;
use crate::scanner::read_log_file;
use chrono::{DateTime, FixedOffset, Utc};
use est_verify_common::{
    sanitize_for_path, truncate_serial, verify, ComparePolicy, LogFormat, LogMetadata, Outcome,
    VerificationResult, MAX_SERIAL_FILE_LEN,
};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// 同一時刻の成果物に付ける連番の上限
const MAX_SEQUENCE: u32 = 999;

/// 固定オフセットでの現在時刻
pub fn now_in(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

pub fn format_timestamp(timestamp: &DateTime<FixedOffset>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// 成果物のフォルダ名・ファイル名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    pub folder: String,
    pub report: String,
    pub parsed: String,
    pub log: String,
}

impl ArtifactNames {
    pub fn new(serial: &str, outcome: Outcome, timestamp: &DateTime<FixedOffset>, log_ext: &str) -> Self {
        Self::numbered(serial, outcome, timestamp, log_ext, 1)
    }

    /// 連番付き（1は連番なし）
    pub fn numbered(
        serial: &str,
        outcome: Outcome,
        timestamp: &DateTime<FixedOffset>,
        log_ext: &str,
        sequence: u32,
    ) -> Self {
        let safe = sanitize_for_path(serial);
        let short = truncate_serial(&safe, MAX_SERIAL_FILE_LEN);
        let ts = match sequence {
            0 | 1 => format_timestamp(timestamp),
            n => format!("{}-{}", format_timestamp(timestamp), n),
        };
        let log = if log_ext.is_empty() {
            format!("{}_{}_log", short, ts)
        } else {
            format!("{}_{}_log.{}", short, ts, log_ext)
        };

        Self {
            folder: format!("{}_{}", safe, outcome),
            report: format!("{}_{}_{}.pdf", short, ts, outcome),
            parsed: format!("{}_{}_parsed.csv", short, ts),
            log,
        }
    }
}

/// 処理結果
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub source: PathBuf,
    pub result: VerificationResult,
    pub metadata: LogMetadata,
    pub timestamp: DateTime<FixedOffset>,
    pub result_folder: PathBuf,
    pub report_path: PathBuf,
    pub parsed_path: PathBuf,
    /// 元ログのコピー（失敗した場合はNone）
    pub log_copy: Option<PathBuf>,
}

impl ProcessOutput {
    pub fn outcome(&self) -> Outcome {
        self.result.overall
    }
}

/// プロセッサの設定
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub output_folder: PathBuf,
    pub offset: FixedOffset,
    pub timezone_label: String,
    pub policy: ComparePolicy,
    /// 形式を固定する場合（通常は自動判定）
    pub declared_format: Option<LogFormat>,
}

impl ProcessorSettings {
    pub fn from_config(config: &Config, output_folder: PathBuf) -> Result<Self> {
        Ok(Self {
            output_folder,
            offset: config.offset()?,
            timezone_label: config.timezone_label.clone(),
            policy: config.compare_policy(),
            declared_format: None,
        })
    }
}

pub struct Processor {
    settings: ProcessorSettings,
    master: Arc<MasterStore>,
}

impl Processor {
    pub fn new(settings: ProcessorSettings, master: Arc<MasterStore>) -> Self {
        Self { settings, master }
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    pub fn master(&self) -> &Arc<MasterStore> {
        &self.master
    }

    /// 現在時刻（固定オフセット）で処理
    pub fn process_file(&self, path: &Path) -> Result<ProcessOutput> {
        self.process_file_at(path, now_in(self.settings.offset))
    }

    /// 指定時刻で処理
    pub fn process_file_at(&self, path: &Path, timestamp: DateTime<FixedOffset>) -> Result<ProcessOutput> {
        let record = read_log_file(path, self.settings.declared_format)?;

        // 照合中に再読み込みされても、取得したスナップショットを最後まで使う
        let snapshot = self.master.snapshot();
        let result = verify(&record, &snapshot.index, &self.settings.policy);
        let timestamp = timestamp.with_timezone(&self.settings.offset);

        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let folder = ArtifactNames::new(&result.serial, result.overall, &timestamp, &ext).folder;
        let result_folder = self.settings.output_folder.join(&folder);
        std::fs::create_dir_all(&result_folder)?;
        let names = reserve_names(&result_folder, &result, &timestamp, &ext)?;

        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let report_path = result_folder.join(&names.report);
        let report = ReportData {
            result: &result,
            metadata: record.metadata(),
            verified_at: timestamp,
            timezone_label: &self.settings.timezone_label,
            source_file: &source_file,
        };
        if let Err(e) = generate_report(&report, &report_path) {
            // 確保した空ファイルを残さない
            let _ = std::fs::remove_file(&report_path);
            return Err(e);
        }

        let parsed_path = result_folder.join(&names.parsed);
        write_parsed_csv(&record, &parsed_path)?;

        let log_dest = result_folder.join(&names.log);
        let log_copy = match std::fs::copy(path, &log_dest) {
            Ok(_) => Some(log_dest),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "元ログのコピーに失敗しました"
                );
                None
            }
        };

        tracing::info!(
            serial = %result.serial,
            result = %result.overall,
            folder = %result_folder.display(),
            "処理完了"
        );

        Ok(ProcessOutput {
            source: path.to_path_buf(),
            metadata: record.metadata().clone(),
            result,
            timestamp,
            result_folder,
            report_path,
            parsed_path,
            log_copy,
        })
    }
}

/// 他の処理と重ならない成果物名を確保する
///
/// レポートのパスを `create_new` で作成できた連番を採用する（並列処理でも一意）。
fn reserve_names(
    folder: &Path,
    result: &VerificationResult,
    timestamp: &DateTime<FixedOffset>,
    ext: &str,
) -> Result<ArtifactNames> {
    for sequence in 1..=MAX_SEQUENCE {
        let names = ArtifactNames::numbered(&result.serial, result.overall, timestamp, ext, sequence);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(folder.join(&names.report))
        {
            Ok(_) => {
                if sequence > 1 {
                    tracing::warn!(
                        report = %names.report,
                        "同じ時刻の成果物があるため連番を付けました"
                    );
                }
                return Ok(names);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(EstError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!(
            "成果物名を確保できません: {}（連番{}まで使用済み）",
            folder.display(),
            MAX_SEQUENCE
        ),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_timestamp_uses_fixed_offset() {
        let utc = Utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 5).unwrap();
        let local = utc.with_timezone(&kst());
        assert_eq!(format_timestamp(&local), "20250302_083005");
    }

    #[test]
    fn test_artifact_names() {
        let ts = kst().with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();
        let names = ArtifactNames::new("PUMP-0042", Outcome::Fail, &ts, "csv");

        assert_eq!(names.folder, "PUMP-0042_FAIL");
        assert_eq!(names.report, "PUMP-0042_20250301_101500_FAIL.pdf");
        assert_eq!(names.parsed, "PUMP-0042_20250301_101500_parsed.csv");
        assert_eq!(names.log, "PUMP-0042_20250301_101500_log.csv");
    }

    #[test]
    fn test_numbered_artifact_names() {
        let ts = kst().with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();
        let names = ArtifactNames::numbered("0042", Outcome::Pass, &ts, "ini", 2);

        assert_eq!(names.folder, "0042_PASS");
        assert_eq!(names.report, "0042_20250301_101500-2_PASS.pdf");
        assert_eq!(names.parsed, "0042_20250301_101500-2_parsed.csv");
        assert_eq!(names.log, "0042_20250301_101500-2_log.ini");
        assert_eq!(
            ArtifactNames::numbered("0042", Outcome::Pass, &ts, "ini", 1),
            ArtifactNames::new("0042", Outcome::Pass, &ts, "ini")
        );
    }

    #[test]
    fn test_artifact_names_sanitize_and_truncate() {
        let ts = kst().with_ymd_and_hms(2025, 3, 1, 10, 15, 0).unwrap();
        let names = ArtifactNames::new("EDW/0042:ABCDEFGHIJKLMNOP", Outcome::Unpass, &ts, "");

        assert_eq!(names.folder, "EDW_0042_ABCDEFGHIJKLMNOP_UNPASS");
        assert_eq!(names.report, "EDW_0042_ABCDEFGHIJK_20250301_101500_UNPASS.pdf");
        assert_eq!(names.log, "EDW_0042_ABCDEFGHIJK_20250301_101500_log");
    }
}
