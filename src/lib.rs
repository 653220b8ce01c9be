//! ポンプESTログの設定検証ツール
//!
//! ファイル入出力と処理の組み立て（解析・照合のコアは `est_verify_common`）

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod master_store;
pub mod pipeline;
pub mod processor;
pub mod scanner;
pub mod setup;
pub mod sync;
pub mod watcher;

pub use est_verify_common as common;
