//! 区切り文字テーブルの行コーデック
//!
//! ログ・マスタ・正規化CSVで共通に使う。引用符付きフィールド（`"a,b"`）と
//! `""` エスケープに対応する。

/// 候補となる区切り文字
pub const DELIMITERS: [char; 3] = [',', '\t', ';'];

/// 行に最も多く含まれる区切り文字を返す（見つからなければカンマ）
pub fn detect_delimiter(line: &str) -> char {
    DELIMITERS
        .iter()
        .copied()
        .map(|d| (d, line.matches(d).count()))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(_, count)| *count)
        .map(|(d, _)| d)
        .unwrap_or(',')
}

/// 1行をフィールドに分割（各フィールドはtrim済み）
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                current.push('"');
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if c == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }

    // 最後のフィールド
    fields.push(current.trim().to_string());
    fields
}

/// 区切り文字を含むフィールドを引用符で囲んで1行に結合
pub fn join_line<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    fields
        .iter()
        .map(|f| quote_field(f.as_ref(), delimiter))
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

fn quote_field(field: &str, delimiter: char) -> String {
    let needs_quotes = field.contains(delimiter)
        || field.contains('"')
        || field.contains('\n')
        || field.contains('\r');

    if needs_quotes {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// 末尾の空フィールドを除去（Excelの矩形範囲をテキスト化するときに使う）
pub fn trim_trailing_empty(fields: &mut Vec<String>) {
    while fields.last().map(|f| f.trim().is_empty()).unwrap_or(false) {
        fields.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(split_line("a, b ,c", ','), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_quoted() {
        assert_eq!(
            split_line(r#"Pump,"150,5","say ""hi""""#, ','),
            vec!["Pump", "150,5", r#"say "hi""#]
        );
    }

    #[test]
    fn test_split_empty_fields() {
        assert_eq!(split_line("a,,", ','), vec!["a", "", ""]);
        assert_eq!(split_line("", ','), vec![""]);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a;b;c,d"), ';');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_join_quotes_when_needed() {
        let line = join_line(&["Pump", "150,5", "say \"hi\""], ',');
        assert_eq!(line, r#"Pump,"150,5","say ""hi""""#);
        assert_eq!(split_line(&line, ','), vec!["Pump", "150,5", "say \"hi\""]);
    }

    #[test]
    fn test_trim_trailing_empty() {
        let mut fields = vec!["a".to_string(), "".to_string(), " ".to_string()];
        trim_trailing_empty(&mut fields);
        assert_eq!(fields, vec!["a"]);
    }
}
