use thiserror::Error;

#[derive(Error, Debug)]
pub enum EstError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("スプレッドシート読み込みエラー: {0}")]
    Spreadsheet(String),

    #[error("PDF生成エラー: {0}")]
    PdfGeneration(String),

    #[error("Excel生成エラー: {0}")]
    ExcelGeneration(String),

    #[error("SharePoint連携エラー: {0}")]
    Sync(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] est_verify_common::Error),
}

impl EstError {
    /// 1ファイルだけの問題か（バッチ・監視では他のファイルを続行する）
    pub fn is_per_file(&self) -> bool {
        match self {
            EstError::Common(e) => e.is_per_file(),
            EstError::Spreadsheet(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EstError>;
