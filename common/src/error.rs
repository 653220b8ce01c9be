//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported log format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed content: {0}")]
    MalformedContent(String),

    #[error("Missing required column: {0}")]
    MissingRequiredColumn(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl Error {
    /// ログ単体の問題か（他ファイルの処理は継続してよいか）
    pub fn is_per_file(&self) -> bool {
        matches!(self, Error::UnsupportedFormat(_) | Error::MalformedContent(_))
    }
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let error = Error::MissingRequiredColumn("Section_Match".to_string());
        assert_eq!(format!("{}", error), "Missing required column: Section_Match");
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_per_file_errors() {
        assert!(Error::UnsupportedFormat("x".into()).is_per_file());
        assert!(Error::MalformedContent("x".into()).is_per_file());
        assert!(!Error::FileNotFound("x".into()).is_per_file());
        assert!(!Error::MissingRequiredColumn("x".into()).is_per_file());
    }
}
