//! 監視キューの単一コンシューマ
//!
//! 1ファイルずつ Processor（ブロッキング処理）を実行し、連携先があれば送信する。
//! 連携の失敗はログに残すだけで、ローカルの成果物には影響しない。

use crate::history::{History, HistoryEntry};
use crate::processor::{now_in, ProcessOutput, Processor};
use crate::sync::{ResultSink, SyncRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const ERROR_STATUS: &str = "ERROR";

pub struct Pipeline<S: ResultSink> {
    processor: Arc<Processor>,
    sink: Option<S>,
    history: History,
}

impl<S: ResultSink> Pipeline<S> {
    pub fn new(processor: Arc<Processor>, sink: Option<S>) -> Self {
        Self {
            processor,
            sink,
            history: History::default(),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// キューが閉じるまで処理
    pub async fn run(&mut self, rx: &mut mpsc::Receiver<PathBuf>) {
        while let Some(path) = rx.recv().await {
            self.handle(path).await;
        }
    }

    /// 1ファイル処理して履歴に追加
    pub async fn handle(&mut self, path: PathBuf) -> HistoryEntry {
        self.reload_master_if_modified();

        let file_name = display_name(&path);
        let processor = Arc::clone(&self.processor);
        let job_path = path.clone();
        let joined = tokio::task::spawn_blocking(move || processor.process_file(&job_path)).await;

        let entry = match joined {
            Ok(Ok(output)) => {
                println!(
                    "✔ {} → {} ({})",
                    file_name,
                    output.outcome(),
                    output.result_folder.display()
                );
                self.publish(&output).await;
                self.entry_for_output(&file_name, &output)
            }
            Ok(Err(e)) => {
                if e.is_per_file() {
                    tracing::warn!(path = %path.display(), error = %e, "ログをスキップしました");
                } else {
                    tracing::error!(path = %path.display(), error = %e, "処理に失敗しました");
                }
                println!("✘ {}: {}", file_name, e);
                self.error_entry(&file_name, e.to_string())
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "処理タスクが異常終了しました");
                self.error_entry(&file_name, e.to_string())
            }
        };

        self.history.push(entry.clone());
        entry
    }

    fn reload_master_if_modified(&self) {
        match self.processor.master().reload_if_modified() {
            Ok(Some(snapshot)) => {
                println!(
                    "↻ マスタを再読み込みしました（{}シリアル）",
                    snapshot.index.len()
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "マスタの再読み込みに失敗しました。以前のマスタを使用します");
            }
        }
    }

    async fn publish(&self, output: &ProcessOutput) {
        let Some(sink) = &self.sink else {
            return;
        };
        let record = SyncRecord::from_output(output);
        match sink.publish(&record).await {
            Ok(()) => tracing::info!(sink = sink.name(), serial = %record.serial_number, "連携完了"),
            Err(e) => tracing::warn!(
                sink = sink.name(),
                serial = %record.serial_number,
                error = %e,
                "連携に失敗しました（ローカルの結果は保存済み）"
            ),
        }
    }

    fn entry_for_output(&self, file_name: &str, output: &ProcessOutput) -> HistoryEntry {
        let mismatches = output.result.mismatches().count();
        HistoryEntry {
            time: output.timestamp.to_rfc3339(),
            file_name: file_name.to_string(),
            serial: Some(output.result.serial.clone()),
            status: output.outcome().to_string(),
            message: format!(
                "{}件照合, {}件不一致",
                output.result.outcomes.len(),
                mismatches
            ),
        }
    }

    fn error_entry(&self, file_name: &str, message: String) -> HistoryEntry {
        HistoryEntry {
            time: now_in(self.processor.settings().offset).to_rfc3339(),
            file_name: file_name.to_string(),
            serial: None,
            status: ERROR_STATUS.to_string(),
            message,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
