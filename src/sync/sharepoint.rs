//! SharePointリストへの検証結果登録（REST API）

use super::{ResultSink, SyncRecord};
use crate::config::Config;
use crate::error::{EstError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_ACCESS_TOKEN: &str = "SHAREPOINT_ACCESS_TOKEN";
pub const ENV_USERNAME: &str = "SHAREPOINT_USERNAME";
pub const ENV_PASSWORD: &str = "SHAREPOINT_PASSWORD";

const ODATA_JSON: &str = "application/json;odata=nometadata";

/// 認証方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharePointAuth {
    Bearer(String),
    Basic { username: String, password: String },
    Anonymous,
}

impl SharePointAuth {
    /// 環境変数から決定（トークン → ユーザー/パスワード → なし）
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            return SharePointAuth::Bearer(token);
        }
        match (non_empty(ENV_USERNAME), non_empty(ENV_PASSWORD)) {
            (Some(username), Some(password)) => SharePointAuth::Basic { username, password },
            _ => SharePointAuth::Anonymous,
        }
    }
}

/// リストに登録する項目（SharePoint側の列名）
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListItemPayload<'a> {
    title: String,
    serial_number: &'a str,
    config_tag: &'a str,
    result: &'a str,
    verification_date: &'a str,
    result_folder: &'a str,
}

/// リストから取得した項目
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListItem {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub config_tag: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub verification_date: Option<String>,
    #[serde(default)]
    pub result_folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListItemsResponse {
    #[serde(default)]
    value: Vec<ListItem>,
}

pub struct SharePointClient {
    site_url: String,
    list_name: String,
    auth: SharePointAuth,
    client: reqwest::Client,
}

impl SharePointClient {
    pub fn new(site_url: &str, list_name: &str, auth: SharePointAuth, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ODATA_JSON));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| EstError::Sync(format!("HTTPクライアント作成エラー: {}", e)))?;

        Ok(Self {
            site_url: site_url.trim().trim_end_matches('/').to_string(),
            list_name: list_name.to_string(),
            auth,
            client,
        })
    }

    /// 設定にサイトURLがあれば作成
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        match config.sharepoint_site_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Self::new(
                url,
                &config.sharepoint_list_name,
                SharePointAuth::from_env(),
                config.sync_timeout(),
            )
            .map(Some),
            _ => Ok(None),
        }
    }

    /// `{site}/_api/web/lists/getbytitle('{list}')/items`
    pub fn items_url(&self) -> String {
        format!(
            "{}/_api/web/lists/getbytitle('{}')/items",
            self.site_url,
            escape_odata(&self.list_name)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            SharePointAuth::Bearer(token) => request.bearer_auth(token),
            SharePointAuth::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            SharePointAuth::Anonymous => request,
        }
    }

    /// 検証結果を1件登録
    pub async fn add_verification_result(&self, record: &SyncRecord) -> Result<()> {
        let payload = ListItemPayload {
            title: record.title(),
            serial_number: &record.serial_number,
            config_tag: &record.config_tag,
            result: &record.result,
            verification_date: &record.verification_date,
            result_folder: &record.result_folder,
        };

        let response = self
            .authorize(self.client.post(self.items_url()))
            .header(CONTENT_TYPE, ODATA_JSON)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EstError::Sync(format!("送信エラー: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EstError::Sync(format!(
                "登録に失敗しました ({}): {}",
                status,
                body.trim()
            )));
        }
        Ok(())
    }

    /// 登録済みの結果を日時の昇順で取得
    pub async fn get_sorted_results(&self, serial: Option<&str>) -> Result<Vec<ListItem>> {
        let mut request = self.authorize(self.client.get(self.items_url()));
        if let Some(serial) = serial {
            request = request.query(&[("$filter", serial_filter(serial))]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EstError::Sync(format!("取得エラー: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EstError::Sync(format!("一覧の取得に失敗しました ({})", status)));
        }

        let body: ListItemsResponse = response
            .json()
            .await
            .map_err(|e| EstError::Sync(format!("応答の解析エラー: {}", e)))?;

        Ok(sort_by_date(body.value))
    }
}

impl ResultSink for SharePointClient {
    async fn publish(&self, record: &SyncRecord) -> Result<()> {
        self.add_verification_result(record).await
    }

    fn name(&self) -> &str {
        "SharePoint"
    }
}

/// ODataの文字列リテラル用（`'` → `''`）
fn escape_odata(s: &str) -> String {
    s.replace('\'', "''")
}

fn serial_filter(serial: &str) -> String {
    format!("SerialNumber eq '{}'", escape_odata(serial))
}

/// 日時の昇順（日時なしは先頭）
pub fn sort_by_date(mut items: Vec<ListItem>) -> Vec<ListItem> {
    items.sort_by(|a, b| a.verification_date.cmp(&b.verification_date));
    items
}
