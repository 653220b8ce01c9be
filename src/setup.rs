//! 対話的な初期設定

use crate::config::Config;
use crate::error::{EstError, Result};
use dialoguer::Input;
use std::path::PathBuf;

fn ask(prompt: &str, current: Option<String>) -> Result<Option<String>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .with_initial_text(current.unwrap_or_default())
        .allow_empty(true)
        .interact_text()
        .map_err(|e| EstError::Config(e.to_string()))?;

    let trimmed = input.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

fn path_text(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.display().to_string())
}

/// 各項目を質問して設定を更新（空欄は未設定）
pub fn run_interactive_setup(config: &mut Config) -> Result<()> {
    println!("⚙ est-verify - 初期設定（空欄で未設定）\n");

    config.master_list_path =
        ask("マスタ設定リスト (.xlsx/.csv)", path_text(&config.master_list_path))?.map(PathBuf::from);
    config.watch_folder = ask("監視フォルダ", path_text(&config.watch_folder))?.map(PathBuf::from);
    config.output_folder = ask("出力フォルダ", path_text(&config.output_folder))?.map(PathBuf::from);
    config.sharepoint_site_url = ask("SharePointサイトURL", config.sharepoint_site_url.clone())?;

    if config.sharepoint_site_url.is_some() {
        if let Some(name) = ask("SharePointリスト名", Some(config.sharepoint_list_name.clone()))? {
            config.sharepoint_list_name = name;
        }
    }

    let offset: i32 = Input::new()
        .with_prompt("タイムスタンプのUTCオフセット（時間）")
        .default(config.utc_offset_hours)
        .interact_text()
        .map_err(|e| EstError::Config(e.to_string()))?;
    config.utc_offset_hours = offset;
    config.offset()?;

    if let Some(label) = ask("タイムゾーン表示名", Some(config.timezone_label.clone()))? {
        config.timezone_label = label;
    }

    Ok(())
}
