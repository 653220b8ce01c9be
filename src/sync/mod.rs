//! 検証結果の外部連携

pub mod sharepoint;

use crate::error::Result;
use crate::processor::ProcessOutput;
use serde::{Deserialize, Serialize};

pub use sharepoint::{SharePointAuth, SharePointClient};

/// 連携先に送る1件分の検証結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub serial_number: String,
    /// UNPASSでは "N/A"
    pub config_tag: String,
    pub result: String,
    /// RFC 3339（オフセット付き）
    pub verification_date: String,
    pub result_folder: String,
}

impl SyncRecord {
    pub fn from_output(output: &ProcessOutput) -> Self {
        Self {
            serial_number: output.result.serial.clone(),
            config_tag: output
                .result
                .config_tag
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            result: output.result.overall.to_string(),
            verification_date: output.timestamp.to_rfc3339(),
            result_folder: output.result_folder.display().to_string(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} - {}", self.serial_number, self.result)
    }
}

/// 検証結果の送信先
///
/// 失敗はローカルの処理結果に影響させない（呼び出し側でログに残すだけ）。
#[allow(async_fn_in_trait)]
pub trait ResultSink {
    async fn publish(&self, record: &SyncRecord) -> Result<()>;

    /// ログ表示用の名前
    fn name(&self) -> &str;
}
