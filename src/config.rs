use crate::error::{EstError, Result};
use chrono::FixedOffset;
use est_verify_common::{ComparePolicy, Tolerance};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_SITE_URL: &str = "SHAREPOINT_SITE_URL";
pub const ENV_LIST_NAME: &str = "SHAREPOINT_LIST_NAME";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// マスタ設定リスト（.xlsx / .csv）
    pub master_list_path: Option<PathBuf>,
    pub watch_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub sharepoint_site_url: Option<String>,
    pub sharepoint_list_name: String,
    /// 成果物のタイムスタンプに使う固定オフセット（時間）
    pub utc_offset_hours: i32,
    pub timezone_label: String,
    pub numeric_tolerance: Tolerance,
    pub poll_interval_ms: u64,
    pub queue_capacity: usize,
    pub sync_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            master_list_path: None,
            watch_folder: None,
            output_folder: None,
            sharepoint_site_url: None,
            sharepoint_list_name: "EST Verification Results".into(),
            utc_offset_hours: 9,
            timezone_label: "KST".into(),
            numeric_tolerance: Tolerance::Exact,
            poll_interval_ms: 1000,
            queue_capacity: 64,
            sync_timeout_seconds: 30,
        }
    }
}

impl Config {
    /// 設定ファイルを読み込み、環境変数で上書き
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// 指定パスから読み込み（存在しなければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| EstError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("est-verify").join("config.json"))
    }

    /// 環境変数を優先
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_SITE_URL) {
            if !url.trim().is_empty() {
                self.sharepoint_site_url = Some(url.trim().to_string());
            }
        }
        if let Ok(name) = std::env::var(ENV_LIST_NAME) {
            if !name.trim().is_empty() {
                self.sharepoint_list_name = name.trim().to_string();
            }
        }
    }

    pub fn master_path(&self) -> Result<PathBuf> {
        self.master_list_path
            .as_deref()
            .map(resolve_path)
            .ok_or_else(|| {
                EstError::Config(
                    "マスタ設定リストが未設定です。`est-verify config --set-master PATH` で設定してください".into(),
                )
            })
    }

    pub fn output_path(&self) -> Result<PathBuf> {
        self.output_folder
            .as_deref()
            .map(resolve_path)
            .ok_or_else(|| {
                EstError::Config(
                    "出力フォルダが未設定です。`est-verify config --set-output PATH` で設定してください".into(),
                )
            })
    }

    pub fn watch_path(&self) -> Result<PathBuf> {
        self.watch_folder
            .as_deref()
            .map(resolve_path)
            .ok_or_else(|| {
                EstError::Config(
                    "監視フォルダが未設定です。`est-verify config --set-watch PATH` で設定してください".into(),
                )
            })
    }

    /// 成果物のタイムスタンプ用オフセット
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            EstError::Config(format!("UTCオフセットが不正です: {}", self.utc_offset_hours))
        })
    }

    pub fn compare_policy(&self) -> ComparePolicy {
        ComparePolicy::with_tolerance(self.numeric_tolerance)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_seconds.max(1))
    }

    pub fn sharepoint_enabled(&self) -> bool {
        self.sharepoint_site_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

/// 相対パスはカレントディレクトリ基準
pub fn resolve_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
