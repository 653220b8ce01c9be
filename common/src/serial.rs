//! シリアル番号の正規化
//!
//! マスタとログのシリアル番号は表記揺れ（"EDW-0042" / "SN 0042" など）があるため、
//! 数字だけを取り出したキーで照合する。

/// ファイル名に使うシリアル番号の最大長
pub const MAX_SERIAL_FILE_LEN: usize = 20;

/// 数字以外を除去したシリアルキーを返す
///
/// # Examples
/// ```
/// use est_verify_common::normalize_serial;
///
/// assert_eq!(normalize_serial("PUMP-0042"), "0042");
/// assert_eq!(normalize_serial(&normalize_serial("EDW 12-34")), "1234");
/// ```
pub fn normalize_serial(serial: &str) -> String {
    serial.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// 2つのシリアル番号が同一機器を指すか
pub fn serials_match(a: &str, b: &str) -> bool {
    normalize_serial(a) == normalize_serial(b)
}

/// フォルダ名・ファイル名に使えない文字を `_` に置換
pub fn sanitize_for_path(serial: &str) -> String {
    let cleaned: String = serial
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "UNKNOWN".to_string()
    } else {
        cleaned
    }
}

/// ファイル名用に文字数で切り詰める
pub fn truncate_serial(serial: &str, max_len: usize) -> String {
    serial.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_non_digits() {
        assert_eq!(normalize_serial("EDW12345678"), "12345678");
        assert_eq!(normalize_serial("SN-12 34/56"), "123456");
        assert_eq!(normalize_serial("N/A"), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for s in ["PUMP-0042", "0042", "", "abc", "１２3", "12.5e3"] {
            let once = normalize_serial(s);
            assert_eq!(normalize_serial(&once), once, "input: {}", s);
        }
    }

    #[test]
    fn test_full_width_digits_are_not_ascii() {
        // 全角数字は対象外（マスタ側もASCIIで管理されている前提）
        assert_eq!(normalize_serial("１２3"), "3");
    }

    #[test]
    fn test_serials_match() {
        assert!(serials_match("PUMP-0042", "0042"));
        assert!(serials_match("SN 0042", "sn0042"));
        assert!(!serials_match("0042", "042"));
    }

    #[test]
    fn test_sanitize_for_path() {
        assert_eq!(sanitize_for_path("EDW/12:34"), "EDW_12_34");
        assert_eq!(sanitize_for_path("  "), "UNKNOWN");
        assert_eq!(sanitize_for_path("PUMP-0042"), "PUMP-0042");
    }

    #[test]
    fn test_truncate_serial() {
        assert_eq!(truncate_serial("ABCDEFGHIJKLMNOPQRSTUVWXYZ", MAX_SERIAL_FILE_LEN).len(), 20);
        assert_eq!(truncate_serial("SHORT", MAX_SERIAL_FILE_LEN), "SHORT");
    }
}
