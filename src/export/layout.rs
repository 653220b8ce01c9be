//! レポートのレイアウト定義
//!
//! mm基準（printpdfの座標は左下原点）

// ============================================
// mm基準レイアウト
// ============================================

/// A4サイズ（mm）
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// 余白（mm）
pub const MARGIN_MM: f32 = 19.0;

pub const USABLE_WIDTH_MM: f32 = A4_WIDTH_MM - MARGIN_MM * 2.0; // 172mm

/// 表の行高さ（mm）
pub const ROW_HEIGHT_MM: f32 = 7.0;

/// 機器情報表の列幅（ラベル / 値）
pub const INFO_LABEL_WIDTH_MM: f32 = 50.0;

/// 1ページ目で表題・判定・機器情報が占める高さ（mm）
pub const FIRST_PAGE_HEADER_MM: f32 = 150.0;

/// 2ページ目以降の見出し高さ（mm）
pub const CONTINUATION_HEADER_MM: f32 = 20.0;

/// 文字サイズ（pt）
pub const TITLE_FONT_SIZE: f32 = 18.0;
pub const BANNER_FONT_SIZE: f32 = 48.0;
pub const HEADING_FONT_SIZE: f32 = 13.0;
pub const BODY_FONT_SIZE: f32 = 9.5;
pub const NOTE_FONT_SIZE: f32 = 8.0;

// ============================================
// 色（RGB 0.0〜1.0）
// ============================================

pub const TITLE_COLOR: (f32, f32, f32) = (0.776, 0.133, 0.161); // #C62229
pub const PASS_COLOR: (f32, f32, f32) = (0.0, 0.667, 0.0); // #00AA00
pub const FAIL_COLOR: (f32, f32, f32) = (0.8, 0.0, 0.0); // #CC0000
pub const UNPASS_COLOR: (f32, f32, f32) = (0.85, 0.5, 0.0);
pub const TEXT_COLOR: (f32, f32, f32) = (0.2, 0.2, 0.2);
pub const GRID_COLOR: (f32, f32, f32) = (0.5, 0.5, 0.5);

// ============================================
// 照合結果表
// ============================================

/// 照合結果表の列
#[derive(Debug, Clone, Copy)]
pub struct ColumnDefinition {
    pub label: &'static str,
    pub width_mm: f32,
    /// セルに収める最大文字数
    pub max_chars: usize,
}

pub const RESULT_COLUMNS: &[ColumnDefinition] = &[
    ColumnDefinition { label: "Section", width_mm: 32.0, max_chars: 16 },
    ColumnDefinition { label: "Parameter", width_mm: 48.0, max_chars: 26 },
    ColumnDefinition { label: "Expected", width_mm: 30.0, max_chars: 16 },
    ColumnDefinition { label: "Actual", width_mm: 30.0, max_chars: 16 },
    ColumnDefinition { label: "Result", width_mm: 32.0, max_chars: 10 },
];

/// レポートのレイアウト
#[derive(Debug, Clone)]
pub struct ReportLayout {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_mm: f32,
    pub row_height_mm: f32,
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self::a4()
    }
}

impl ReportLayout {
    pub fn a4() -> Self {
        Self {
            page_width_mm: A4_WIDTH_MM,
            page_height_mm: A4_HEIGHT_MM,
            margin_mm: MARGIN_MM,
            row_height_mm: ROW_HEIGHT_MM,
        }
    }

    /// コンテンツ開始Y座標（mm、下から）
    pub fn content_top_mm(&self) -> f32 {
        self.page_height_mm - self.margin_mm
    }

    pub fn usable_height_mm(&self) -> f32 {
        self.page_height_mm - self.margin_mm * 2.0
    }

    /// 表ヘッダー行を除いて1ページに入るデータ行数
    pub fn rows_on_page(&self, first_page: bool) -> usize {
        let header = if first_page {
            FIRST_PAGE_HEADER_MM
        } else {
            CONTINUATION_HEADER_MM
        };
        let available = self.usable_height_mm() - header - self.row_height_mm;
        (available / self.row_height_mm).floor().max(1.0) as usize
    }

    /// データ行をページごとに分割（戻り値は各ページの行範囲）
    pub fn paginate(&self, rows: usize) -> Vec<std::ops::Range<usize>> {
        let mut pages = Vec::new();
        let mut start = 0;
        let mut first = true;
        while start < rows || first {
            let end = (start + self.rows_on_page(first)).min(rows);
            pages.push(start..end);
            start = end;
            first = false;
        }
        pages
    }
}

/// 組み込みフォント（WinAnsi）で表示できる文字に変換し、最大文字数で切り詰める
pub fn fit_text(text: &str, max_chars: usize) -> String {
    let ascii: String = text
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect();
    if ascii.chars().count() <= max_chars {
        return ascii;
    }
    let keep = max_chars.saturating_sub(2);
    format!("{}..", &ascii[..keep])
}
