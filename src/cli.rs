use clap::{Parser, Subcommand};
use est_verify_common::LogFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "est-verify")]
#[command(about = "ポンプESTログの設定検証・レポート生成ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// ログファイル1件を検証してレポートを出力
    Verify {
        /// ESTログファイル
        #[arg(required = true)]
        file: PathBuf,

        /// マスタ設定リスト（省略時は設定ファイルの値）
        #[arg(short, long)]
        master: Option<PathBuf>,

        /// 出力フォルダ（省略時は設定ファイルの値）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ログ形式を指定 (table/header-table/key-value)
        #[arg(short, long)]
        format: Option<LogFormat>,

        /// 数値比較の許容誤差（絶対値）
        #[arg(long)]
        tolerance: Option<f64>,

        /// SharePoint連携を行わない
        #[arg(long)]
        no_sync: bool,
    },

    /// フォルダ内のログを一括検証
    Run {
        /// ログフォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// マスタ設定リスト
        #[arg(short, long)]
        master: Option<PathBuf>,

        /// 出力フォルダ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ログ形式を指定
        #[arg(short, long)]
        format: Option<LogFormat>,

        /// 数値比較の許容誤差（絶対値）
        #[arg(long)]
        tolerance: Option<f64>,

        /// 集計ブック（.xlsx）の出力先
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// 監視フォルダに置かれたログを自動で検証
    Watch {
        /// 監視フォルダ（省略時は設定ファイルの値）
        folder: Option<PathBuf>,

        /// マスタ設定リスト
        #[arg(short, long)]
        master: Option<PathBuf>,

        /// 出力フォルダ
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 起動時に既にあるファイルも処理する
        #[arg(long)]
        include_existing: bool,

        /// 数値比較の許容誤差（絶対値）
        #[arg(long)]
        tolerance: Option<f64>,

        /// SharePoint連携を行わない
        #[arg(long)]
        no_sync: bool,
    },

    /// ログを解析して正規化テーブル（CSV）を出力
    Parse {
        /// ESTログファイル
        #[arg(required = true)]
        file: PathBuf,

        /// 出力CSV（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ログ形式を指定
        #[arg(short, long)]
        format: Option<LogFormat>,
    },

    /// マスタ設定リストの内容を確認
    Master {
        /// マスタ設定リスト（省略時は設定ファイルの値）
        path: Option<PathBuf>,

        /// 指定シリアルの設定を表示
        #[arg(short, long)]
        serial: Option<String>,
    },

    /// 設定を表示/編集
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 対話的に設定
        #[arg(long)]
        init: bool,

        /// マスタ設定リストのパス
        #[arg(long)]
        set_master: Option<PathBuf>,

        /// 監視フォルダ
        #[arg(long)]
        set_watch: Option<PathBuf>,

        /// 出力フォルダ
        #[arg(long)]
        set_output: Option<PathBuf>,

        /// SharePointサイトURL
        #[arg(long)]
        set_sharepoint_url: Option<String>,

        /// SharePointリスト名
        #[arg(long)]
        set_list_name: Option<String>,

        /// タイムスタンプのUTCオフセット（時間）
        #[arg(long, allow_hyphen_values = true)]
        set_utc_offset: Option<i32>,

        /// タイムゾーン表示名
        #[arg(long)]
        set_timezone_label: Option<String>,
    },

    /// SharePointに登録済みの検証結果を表示
    History {
        /// シリアル番号で絞り込み
        #[arg(short, long)]
        serial: Option<String>,
    },
}
