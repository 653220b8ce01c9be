//! 検証結果・マスタ行の型定義
//!
//! CLIのプロセッサ・レポート・SharePoint連携で共有される型:
//! - MasterEntry: マスタ設定リストの1行
//! - ParameterOutcome: パラメータ1件の照合結果
//! - VerificationResult: 1ログファイルの最終判定

use serde::{Deserialize, Serialize};
use std::fmt;

/// 総合判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// 全パラメータ一致
    Pass,
    /// シリアルはマスタにあるが、1件以上不一致
    Fail,
    /// シリアルがマスタに存在しない
    Unpass,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Unpass => "UNPASS",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ログ形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// ヘッダー行 + 同じ幅のデータ行
    DelimitedTable,
    /// `key,value` のヘッダー部 + `Section,...` から始まる設定表
    HeaderTable,
    /// `[SECTION]` と `key = value` の組
    KeyValueSection,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::DelimitedTable => write!(f, "delimited-table"),
            LogFormat::HeaderTable => write!(f, "header-table"),
            LogFormat::KeyValueSection => write!(f, "key-value-section"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" | "delimited" | "delimited-table" | "csv" => Ok(LogFormat::DelimitedTable),
            "header" | "header-table" => Ok(LogFormat::HeaderTable),
            "ini" | "kv" | "key-value" | "key-value-section" => Ok(LogFormat::KeyValueSection),
            _ => Err(format!(
                "Unknown log format: {}. Use table, header-table, or key-value",
                s
            )),
        }
    }
}

/// マスタ設定リストの1行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterEntry {
    /// Pump_Serial_No（原文）
    pub serial: String,
    /// 数字のみのシリアルキー
    pub serial_key: String,
    /// Target_Config_Tag
    pub config_tag: String,
    /// Section（レポート表示用）
    pub section: String,
    /// Section_Match（ログ検索キー）
    pub section_match: String,
    /// Parameter_Match（ログ検索キー）
    pub parameter_match: String,
    /// Target_Value
    pub target_value: String,
    /// Original_Value
    pub original_value: String,
}

/// パラメータ1件の照合結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterOutcome {
    pub section: String,
    pub parameter: String,
    pub expected: String,
    /// ログ上の値（ログに存在しない場合はNone）
    pub actual: Option<String>,
    /// 変更前の値（マスタのOriginal_Value）
    #[serde(default)]
    pub original: String,
    pub matched: bool,
}

/// 1ログファイルの検証結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// ログから抽出したシリアル番号（原文）
    pub serial: String,
    pub serial_key: String,
    /// マスタのTarget_Config_Tag（UNPASSではNone）
    pub config_tag: Option<String>,
    pub overall: Outcome,
    pub outcomes: Vec<ParameterOutcome>,
}

impl VerificationResult {
    /// マスタに存在しないシリアルの結果
    pub fn unpass(serial: &str, serial_key: &str) -> Self {
        Self {
            serial: serial.to_string(),
            serial_key: serial_key.to_string(),
            config_tag: None,
            overall: Outcome::Unpass,
            outcomes: Vec::new(),
        }
    }

    /// 不一致のパラメータ
    pub fn mismatches(&self) -> impl Iterator<Item = &ParameterOutcome> {
        self.outcomes.iter().filter(|o| !o.matched)
    }

    pub fn matched_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.matched).count()
    }

    pub fn is_pass(&self) -> bool {
        self.overall == Outcome::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Pass.to_string(), "PASS");
        assert_eq!(Outcome::Fail.to_string(), "FAIL");
        assert_eq!(Outcome::Unpass.to_string(), "UNPASS");
    }

    #[test]
    fn test_outcome_serialize() {
        let json = serde_json::to_string(&Outcome::Unpass).expect("シリアライズ失敗");
        assert_eq!(json, "\"UNPASS\"");
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("csv".parse::<LogFormat>().unwrap(), LogFormat::DelimitedTable);
        assert_eq!("header-table".parse::<LogFormat>().unwrap(), LogFormat::HeaderTable);
        assert_eq!("INI".parse::<LogFormat>().unwrap(), LogFormat::KeyValueSection);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_unpass_result_is_empty() {
        let result = VerificationResult::unpass("SN-9", "9");
        assert_eq!(result.overall, Outcome::Unpass);
        assert!(result.outcomes.is_empty());
        assert!(!result.is_pass());
        assert_eq!(result.mismatches().count(), 0);
    }

    #[test]
    fn test_result_serialize_camel_case() {
        let result = VerificationResult {
            serial: "PUMP-0042".to_string(),
            serial_key: "0042".to_string(),
            config_tag: Some("CFG-A".to_string()),
            overall: Outcome::Fail,
            outcomes: vec![ParameterOutcome {
                section: "HYDRAULIC".to_string(),
                parameter: "Pressure".to_string(),
                expected: "150".to_string(),
                actual: Some("151".to_string()),
                original: "140".to_string(),
                matched: false,
            }],
        };

        let json = serde_json::to_string(&result).expect("シリアライズ失敗");
        assert!(json.contains("\"serialKey\":\"0042\""));
        assert!(json.contains("\"overall\":\"FAIL\""));
        assert!(json.contains("\"actual\":\"151\""));
    }
}
