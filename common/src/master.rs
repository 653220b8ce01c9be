//! マスタ設定リスト
//!
//! シリアルキー（数字のみ）→ MasterEntry の列 のインデックス。
//! 構築後は変更しない（再読み込みは新しいインデックスを作って差し替える）。

use crate::error::{Error, Result};
use crate::serial::normalize_serial;
use crate::types::MasterEntry;
use std::collections::HashMap;

/// 必須列
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Pump_Serial_No",
    "Target_Config_Tag",
    "Parameter_Match",
    "Section_Match",
    "Target_Value",
    "Original_Value",
    "Section",
];

/// 読み込み時の統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterStats {
    /// 登録した行数
    pub entries: usize,
    /// シリアル数
    pub serials: usize,
    /// 空行としてスキップした行数
    pub skipped_empty: usize,
    /// シリアルに数字がなくスキップした行数
    pub skipped_invalid_serial: usize,
}

/// 列名 → 列番号
struct ColumnMap([usize; 7]);

impl ColumnMap {
    fn resolve(header: &[String]) -> Result<Self> {
        let mut columns = [0usize; 7];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS.iter()) {
            *slot = header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| Error::MissingRequiredColumn(name.to_string()))?;
        }
        Ok(Self(columns))
    }

    fn get<'a>(&self, row: &'a [String], column: usize) -> &'a str {
        row.get(self.0[column]).map(|s| s.trim()).unwrap_or("")
    }
}

/// マスタのインデックス
#[derive(Debug, Clone, Default)]
pub struct MasterIndex {
    by_serial: HashMap<String, Vec<MasterEntry>>,
    stats: MasterStats,
}

impl MasterIndex {
    /// ヘッダー行とデータ行から構築
    ///
    /// 必須列が1つでも欠けていれば `MissingRequiredColumn`（部分的なインデックスは作らない）
    pub fn from_rows<I>(header: &[String], rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let columns = ColumnMap::resolve(header)?;
        let mut by_serial: HashMap<String, Vec<MasterEntry>> = HashMap::new();
        let mut stats = MasterStats::default();

        for row in rows {
            if row.iter().all(|c| c.trim().is_empty()) {
                stats.skipped_empty += 1;
                continue;
            }

            let serial = columns.get(&row, 0);
            let serial_key = normalize_serial(serial);
            if serial_key.is_empty() {
                stats.skipped_invalid_serial += 1;
                continue;
            }

            let entry = MasterEntry {
                serial: serial.to_string(),
                serial_key: serial_key.clone(),
                config_tag: columns.get(&row, 1).to_string(),
                parameter_match: columns.get(&row, 2).to_string(),
                section_match: columns.get(&row, 3).to_string(),
                target_value: columns.get(&row, 4).to_string(),
                original_value: columns.get(&row, 5).to_string(),
                section: columns.get(&row, 6).to_string(),
            };

            by_serial.entry(serial_key).or_default().push(entry);
            stats.entries += 1;
        }

        stats.serials = by_serial.len();
        Ok(Self { by_serial, stats })
    }

    /// シリアル番号（表記揺れ可）で検索
    pub fn lookup(&self, serial: &str) -> Option<&[MasterEntry]> {
        let key = normalize_serial(serial);
        if key.is_empty() {
            return None;
        }
        self.by_serial.get(&key).map(Vec::as_slice)
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.lookup(serial).is_some()
    }

    pub fn stats(&self) -> &MasterStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.by_serial.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_serial.is_empty()
    }

    /// 登録されているシリアルキー（ソート済み）
    pub fn serial_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.by_serial.keys().map(String::as_str).collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        REQUIRED_COLUMNS.iter().map(|s| s.to_string()).collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_and_lookup() {
        let rows = vec![
            row(&["PUMP-0042", "CFG-A", "Pressure", "HYDRAULIC", "150", "140", "Hydraulic"]),
            row(&["PUMP-0042", "CFG-A", "Flow", "HYDRAULIC", "12", "10", "Hydraulic"]),
            row(&["SN 77", "CFG-B", "Speed", "MOTOR", "1450", "1500", "Motor"]),
        ];
        let index = MasterIndex::from_rows(&header(), rows).unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(index.stats().entries, 3);

        let entries = index.lookup("0042").expect("シリアルが見つからない");
        assert_eq!(entries.len(), 2);
        // 行順を保持
        assert_eq!(entries[0].parameter_match, "Pressure");
        assert_eq!(entries[1].parameter_match, "Flow");
        assert_eq!(entries[0].serial_key, "0042");
        assert_eq!(entries[0].section, "Hydraulic");
        assert_eq!(entries[0].section_match, "HYDRAULIC");

        assert!(index.contains("EDW-77"));
        assert!(!index.contains("78"));
        assert!(!index.contains("N/A"));
    }

    #[test]
    fn test_missing_column() {
        let mut h = header();
        h.retain(|c| c != "Section_Match");
        let err = MasterIndex::from_rows(&h, Vec::<Vec<String>>::new()).unwrap_err();
        match err {
            Error::MissingRequiredColumn(name) => assert_eq!(name, "Section_Match"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_column_order_and_case_are_flexible() {
        let h = row(&[
            "section", " Target_Value ", "Original_Value", "Section_Match",
            "Parameter_Match", "Target_Config_Tag", "PUMP_SERIAL_NO",
        ]);
        let rows = vec![row(&["Hyd", "150", "140", "HYD", "Pressure", "CFG", "0042"])];
        let index = MasterIndex::from_rows(&h, rows).unwrap();
        assert!(index.lookup("42").is_none(), "42 と 0042 は別シリアル");

        let entry = &index.lookup("0042").unwrap()[0];
        assert_eq!(entry.target_value, "150");
        assert_eq!(entry.section, "Hyd");
        assert_eq!(entry.config_tag, "CFG");
    }

    #[test]
    fn test_skips_empty_and_invalid_rows() {
        let rows = vec![
            row(&["", "", "", "", "", "", ""]),
            row(&["N/A", "CFG", "Pressure", "HYD", "1", "1", "Hyd"]),
            row(&["0042", "CFG", "Pressure", "HYD", "1", "1", "Hyd"]),
        ];
        let index = MasterIndex::from_rows(&header(), rows).unwrap();
        let stats = index.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.skipped_empty, 1);
        assert_eq!(stats.skipped_invalid_serial, 1);
        assert_eq!(index.serial_keys(), vec!["0042"]);
    }

    #[test]
    fn test_short_rows_are_tolerated() {
        let rows = vec![row(&["0042", "CFG", "Pressure"])];
        let index = MasterIndex::from_rows(&header(), rows).unwrap();
        let entry = &index.lookup("0042").unwrap()[0];
        assert_eq!(entry.target_value, "");
        assert_eq!(entry.section, "");
    }
}
