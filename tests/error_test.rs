//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use est_verify::error::EstError;
use est_verify::scanner;
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"));
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, EstError::FolderNotFound(_)));
}

/// 空のフォルダをスキャンした場合
#[test]
fn test_scan_empty_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let result = scanner::scan_folder(dir.path());

    // 空フォルダはエラーではなく空のVecを返す
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// ログのないフォルダをスキャンした場合
#[test]
fn test_scan_folder_no_logs() {
    let dir = tempdir().expect("Failed to create temp dir");

    std::fs::write(dir.path().join("photo.jpg"), "jpeg").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_folder(dir.path());
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// 形式を判定できないログ
#[test]
fn test_unrecognized_log_is_per_file_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "just some words\nwithout structure\n").unwrap();

    let err = scanner::read_log_file(&path, None).unwrap_err();
    assert!(matches!(
        err,
        EstError::Common(est_verify_common::Error::UnsupportedFormat(_))
    ));
    assert!(err.is_per_file());
}

/// EstErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        EstError::Config("テスト設定エラー".to_string()),
        EstError::FileNotFound("est.csv".to_string()),
        EstError::FolderNotFound("/path/to/folder".to_string()),
        EstError::Spreadsheet("壊れたブック".to_string()),
        EstError::PdfGeneration("PDF生成エラー".to_string()),
        EstError::ExcelGeneration("Excel生成エラー".to_string()),
        EstError::Sync("401 Unauthorized".to_string()),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty(), "エラーメッセージが空: {:?}", err);
    }
}

/// エラーのDebug実装確認
#[test]
fn test_error_debug() {
    let err = EstError::Config("テスト".to_string());
    let debug = format!("{:?}", err);

    assert!(debug.contains("Config"));
    assert!(debug.contains("テスト"));
}

/// IOエラーからの変換
#[test]
fn test_io_error_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: EstError = io_err.into();

    assert!(matches!(err, EstError::Io(_)));
    let display = format!("{}", err);
    assert!(display.contains("IO"));
    assert!(!err.is_per_file());
}

/// JSONエラーからの変換
#[test]
fn test_json_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{ invalid }").unwrap_err();
    let err: EstError = json_err.into();

    assert!(matches!(err, EstError::JsonParse(_)));
}

/// common::Errorからの変換（透過的エラー）
#[test]
fn test_common_error_transparent() {
    let common_err = est_verify_common::Error::MissingRequiredColumn("Section_Match".to_string());
    let err: EstError = common_err.into();

    assert!(matches!(err, EstError::Common(_)));
    // 透過的エラーなのでメッセージがそのまま表示される
    assert_eq!(format!("{}", err), "Missing required column: Section_Match");
    assert!(!err.is_per_file());
}
