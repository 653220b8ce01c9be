//! 監視モードの処理履歴（直近のみ保持）

use serde::Serialize;
use std::collections::VecDeque;

pub const HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// 処理時刻（RFC 3339）
    pub time: String,
    pub file_name: String,
    pub serial: Option<String>,
    /// PASS / FAIL / UNPASS / ERROR
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl History {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(HISTORY_LIMIT)),
            limit: limit.max(1),
        }
    }

    /// 追加（上限を超えたら古いものから捨てる）
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 古い順
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// 判定ごとの件数
    pub fn count_status(&self, status: &str) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }
}
