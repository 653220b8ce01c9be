//! 設定照合ロジック
//!
//! ログのシリアルでマスタを引き、マスタ行ごとに (Section_Match, Parameter_Match)
//! の値を Target_Value と比較する。
//!
//! ## 判定
//! - マスタにシリアルがない → UNPASS（照合結果は空）
//! - 全件一致 → PASS
//! - 1件でも不一致（ログに項目がない場合も含む） → FAIL

use crate::master::MasterIndex;
use crate::record::LogRecord;
use crate::serial::normalize_serial;
use crate::types::{MasterEntry, Outcome, ParameterOutcome, VerificationResult};
use serde::{Deserialize, Serialize};

/// 数値比較の許容誤差
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tolerance {
    /// 完全一致
    #[default]
    Exact,
    /// |actual - expected| <= 値
    Absolute(f64),
    /// |actual - expected| <= 値 * |expected|
    Relative(f64),
}

/// 比較ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparePolicy {
    pub tolerance: Tolerance,
}

impl ComparePolicy {
    pub fn exact() -> Self {
        Self::default()
    }

    pub fn with_tolerance(tolerance: Tolerance) -> Self {
        Self { tolerance }
    }

    /// 期待値と実測値が一致するか
    ///
    /// 両方が数値として読めれば数値比較、それ以外は大文字小文字を無視した文字列比較。
    pub fn values_match(&self, expected: &str, actual: &str) -> bool {
        match (parse_number(expected), parse_number(actual)) {
            (Some(e), Some(a)) => match self.tolerance {
                Tolerance::Exact => e == a,
                Tolerance::Absolute(tol) => (a - e).abs() <= tol.abs(),
                Tolerance::Relative(ratio) => (a - e).abs() <= ratio.abs() * e.abs(),
            },
            _ => expected.trim().to_lowercase() == actual.trim().to_lowercase(),
        }
    }
}

/// 有限の数値として解釈できれば返す
fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// ログをマスタと照合
pub fn verify(record: &LogRecord, index: &MasterIndex, policy: &ComparePolicy) -> VerificationResult {
    let serial = record.serial();
    let serial_key = normalize_serial(serial);

    let entries = match index.lookup(serial) {
        Some(entries) if !entries.is_empty() => entries,
        _ => return VerificationResult::unpass(serial, &serial_key),
    };

    let config_tag = entries[0].config_tag.clone();
    let mut outcomes = Vec::with_capacity(entries.len() + 1);

    // ログに構成タグがあればマスタのタグと照合
    if let Some(log_tag) = record.metadata().config_tag.as_deref() {
        outcomes.push(ParameterOutcome {
            section: String::new(),
            parameter: "Config Tag".to_string(),
            expected: config_tag.clone(),
            actual: Some(log_tag.to_string()),
            original: String::new(),
            matched: log_tag.trim().eq_ignore_ascii_case(config_tag.trim()),
        });
    }

    outcomes.extend(entries.iter().map(|entry| check_entry(record, entry, policy)));

    let overall = if outcomes.iter().all(|o| o.matched) {
        Outcome::Pass
    } else {
        Outcome::Fail
    };

    VerificationResult {
        serial: serial.to_string(),
        serial_key,
        config_tag: Some(config_tag),
        overall,
        outcomes,
    }
}

fn check_entry(record: &LogRecord, entry: &MasterEntry, policy: &ComparePolicy) -> ParameterOutcome {
    let actual = record.get(&entry.section_match, &entry.parameter_match);
    let matched = actual
        .map(|a| policy.values_match(&entry.target_value, a))
        .unwrap_or(false);

    let section = if entry.section.is_empty() {
        entry.section_match.clone()
    } else {
        entry.section.clone()
    };

    ParameterOutcome {
        section,
        parameter: entry.parameter_match.clone(),
        expected: entry.target_value.clone(),
        actual: actual.map(str::to_string),
        original: entry.original_value.clone(),
        matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_reader::{read_log, FormatHint};
    use crate::master::REQUIRED_COLUMNS;

    fn master(rows: &[[&str; 7]]) -> MasterIndex {
        let header: Vec<String> = REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect();
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        MasterIndex::from_rows(&header, rows).unwrap()
    }

    fn pump_0042() -> MasterIndex {
        master(&[["PUMP-0042", "CFG-A", "Pressure", "", "150", "140", "Hydraulic"]])
    }

    fn log(text: &str) -> LogRecord {
        read_log(text, None, FormatHint::Sectioned).unwrap()
    }

    #[test]
    fn test_pass_with_digit_only_serial_match() {
        let record = log("Serial No = 0042\nPressure = 150\n");
        let result = verify(&record, &pump_0042(), &ComparePolicy::exact());

        assert_eq!(result.overall, Outcome::Pass);
        assert_eq!(result.serial, "0042");
        assert_eq!(result.config_tag.as_deref(), Some("CFG-A"));
        assert_eq!(result.outcomes.len(), 1);
        assert!(result.outcomes[0].matched);
    }

    #[test]
    fn test_fail_on_mismatch() {
        let record = log("Serial No = 0042\nPressure = 151\n");
        let result = verify(&record, &pump_0042(), &ComparePolicy::exact());

        assert_eq!(result.overall, Outcome::Fail);
        let mismatches: Vec<_> = result.mismatches().collect();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].expected, "150");
        assert_eq!(mismatches[0].actual.as_deref(), Some("151"));
        assert_eq!(mismatches[0].original, "140");
    }

    #[test]
    fn test_unpass_when_serial_unknown() {
        let record = log("Serial No = 9999\nPressure = 150\n");
        let result = verify(&record, &pump_0042(), &ComparePolicy::exact());

        assert_eq!(result.overall, Outcome::Unpass);
        assert!(result.outcomes.is_empty());
        assert_eq!(result.config_tag, None);
    }

    #[test]
    fn test_unpass_when_serial_has_no_digits() {
        let record = log("Serial No = ABC\nPressure = 150\n");
        let result = verify(&record, &pump_0042(), &ComparePolicy::exact());
        assert_eq!(result.overall, Outcome::Unpass);
        assert_eq!(result.serial_key, "");
    }

    #[test]
    fn test_missing_parameter_is_mismatch() {
        let record = log("Serial No = 0042\nFlow = 10\n");
        let result = verify(&record, &pump_0042(), &ComparePolicy::exact());

        assert_eq!(result.overall, Outcome::Fail);
        assert_eq!(result.outcomes[0].actual, None);
        assert!(!result.outcomes[0].matched);
    }

    #[test]
    fn test_numeric_and_string_comparison() {
        let policy = ComparePolicy::exact();
        assert!(policy.values_match("150", "150.0"));
        assert!(policy.values_match("1.5e2", " 150 "));
        assert!(!policy.values_match("150", "150.01"));
        assert!(policy.values_match("Enabled", " enabled"));
        assert!(!policy.values_match("Enabled", "Disabled"));
        // 片方だけ数値なら文字列比較
        assert!(!policy.values_match("150", "150bar"));
        assert!(!policy.values_match("inf", "INF1"));
    }

    #[test]
    fn test_tolerance_policies() {
        let abs = ComparePolicy::with_tolerance(Tolerance::Absolute(0.5));
        assert!(abs.values_match("150", "150.4"));
        assert!(!abs.values_match("150", "150.6"));

        let rel = ComparePolicy::with_tolerance(Tolerance::Relative(0.01));
        assert!(rel.values_match("1000", "1009"));
        assert!(!rel.values_match("1000", "1011"));
    }

    #[test]
    fn test_outcomes_follow_master_row_order_and_sections() {
        let index = master(&[
            ["0042", "CFG-A", "Speed", "MOTOR", "1450", "1500", "Motor"],
            ["0042", "CFG-A", "Pressure", "HYD", "150", "140", "Hydraulic"],
            ["0042", "CFG-A", "Pressure", "MOTOR", "5", "5", ""],
        ]);
        let record = log("[INFO]\nSerial No = 0042\n[HYD]\nPressure = 150\n[MOTOR]\nSpeed = 1450\nPressure = 5\n");
        let result = verify(&record, &index, &ComparePolicy::exact());

        assert_eq!(result.overall, Outcome::Pass);
        let params: Vec<_> = result.outcomes.iter().map(|o| o.parameter.as_str()).collect();
        assert_eq!(params, vec!["Speed", "Pressure", "Pressure"]);
        assert_eq!(result.outcomes[1].section, "Hydraulic");
        // Section列が空ならSection_Matchを表示
        assert_eq!(result.outcomes[2].section, "MOTOR");
    }

    #[test]
    fn test_config_tag_mismatch_fails() {
        let record = log("Serial No = 0042\nConfig Tag = CFG-B\nPressure = 150\n");
        let result = verify(&record, &pump_0042(), &ComparePolicy::exact());

        assert_eq!(result.overall, Outcome::Fail);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[0].parameter, "Config Tag");
        assert!(!result.outcomes[0].matched);
        assert!(result.outcomes[1].matched);
    }

    #[test]
    fn test_config_tag_match_is_case_insensitive() {
        let record = log("Serial No = 0042\nConfig Tag = cfg-a\nPressure = 150\n");
        let result = verify(&record, &pump_0042(), &ComparePolicy::exact());
        assert_eq!(result.overall, Outcome::Pass);
    }

    #[test]
    fn test_pass_iff_all_matched() {
        let index = master(&[
            ["0042", "CFG", "A", "", "1", "", ""],
            ["0042", "CFG", "B", "", "x", "", ""],
        ]);
        for (text, expected) in [
            ("Serial No = 0042\nA = 1\nB = X\n", Outcome::Pass),
            ("Serial No = 0042\nA = 1\nB = y\n", Outcome::Fail),
            ("Serial No = 0042\nA = 2\nB = x\n", Outcome::Fail),
        ] {
            let result = verify(&log(text), &index, &ComparePolicy::exact());
            assert_eq!(result.overall, expected, "log: {}", text);
            assert_eq!(result.is_pass(), result.outcomes.iter().all(|o| o.matched));
        }
    }
}
