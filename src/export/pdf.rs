//! 検証レポートPDF（printpdf、組み込みHelvetica）

use super::layout::{
    fit_text, ReportLayout, BANNER_FONT_SIZE, BODY_FONT_SIZE, FAIL_COLOR, GRID_COLOR,
    HEADING_FONT_SIZE, INFO_LABEL_WIDTH_MM, NOTE_FONT_SIZE, PASS_COLOR, RESULT_COLUMNS,
    TEXT_COLOR, TITLE_COLOR, TITLE_FONT_SIZE, UNPASS_COLOR,
};
use crate::error::{EstError, Result};
use chrono::{DateTime, FixedOffset};
use est_verify_common::{LogMetadata, Outcome, VerificationResult};
use printpdf::*;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const REPORT_TITLE: &str = "Pump EST Configuration Verification Report";

/// レポートに載せる内容
#[derive(Debug, Clone, Copy)]
pub struct ReportData<'a> {
    pub result: &'a VerificationResult,
    pub metadata: &'a LogMetadata,
    pub verified_at: DateTime<FixedOffset>,
    pub timezone_label: &'a str,
    pub source_file: &'a str,
}

impl ReportData<'_> {
    /// 機器情報表の行
    pub fn info_rows(&self) -> Vec<(&'static str, String)> {
        let or_na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());
        vec![
            ("Serial Number", self.result.serial.clone()),
            (
                "Config Tag",
                self.result.config_tag.clone().unwrap_or_else(|| "N/A".to_string()),
            ),
            ("Model", or_na(&self.metadata.model)),
            ("Software Version", or_na(&self.metadata.software_version)),
            ("Firmware Version", or_na(&self.metadata.firmware_version)),
            (
                "Verification Date",
                format!(
                    "{} {}",
                    self.verified_at.format("%Y-%m-%d %H:%M:%S"),
                    self.timezone_label
                ),
            ),
            ("Source File", self.source_file.to_string()),
        ]
    }

    /// 照合結果表の行（Section, Parameter, Expected, Actual, Result）
    pub fn result_rows(&self) -> Vec<[String; 5]> {
        self.result
            .outcomes
            .iter()
            .map(|o| {
                [
                    o.section.clone(),
                    o.parameter.clone(),
                    o.expected.clone(),
                    o.actual.clone().unwrap_or_else(|| "(missing)".to_string()),
                    if o.matched { "OK" } else { "MISMATCH" }.to_string(),
                ]
            })
            .collect()
    }
}

fn rgb((r, g, b): (f32, f32, f32)) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn outcome_color(outcome: Outcome) -> (f32, f32, f32) {
    match outcome {
        Outcome::Pass => PASS_COLOR,
        Outcome::Fail => FAIL_COLOR,
        Outcome::Unpass => UNPASS_COLOR,
    }
}

fn hline(layer: &PdfLayerReference, x1: f32, x2: f32, y: f32) {
    layer.add_line(Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
    });
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// 照合結果表のヘッダーを描画し、次の行のベースラインYを返す
fn draw_table_header(layer: &PdfLayerReference, fonts: &Fonts, layout: &ReportLayout, top: f32) -> f32 {
    let left = layout.margin_mm;
    let right = layout.page_width_mm - layout.margin_mm;

    layer.set_fill_color(rgb(TEXT_COLOR));
    let mut x = left;
    let baseline = top - layout.row_height_mm + 2.0;
    for col in RESULT_COLUMNS {
        layer.use_text(col.label, BODY_FONT_SIZE, Mm(x + 1.5), Mm(baseline), &fonts.bold);
        x += col.width_mm;
    }
    hline(layer, left, right, top);
    hline(layer, left, right, top - layout.row_height_mm);
    top - layout.row_height_mm
}

fn draw_result_rows(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    layout: &ReportLayout,
    rows: &[[String; 5]],
    top: f32,
) {
    let left = layout.margin_mm;
    let right = layout.page_width_mm - layout.margin_mm;
    let mut y = top;

    for row in rows {
        let baseline = y - layout.row_height_mm + 2.0;
        let mut x = left;
        for (cell, col) in row.iter().zip(RESULT_COLUMNS) {
            let color = if col.label == "Result" && cell != "OK" {
                FAIL_COLOR
            } else {
                TEXT_COLOR
            };
            layer.set_fill_color(rgb(color));
            layer.use_text(
                fit_text(cell, col.max_chars),
                BODY_FONT_SIZE,
                Mm(x + 1.5),
                Mm(baseline),
                &fonts.regular,
            );
            x += col.width_mm;
        }
        y -= layout.row_height_mm;
        hline(layer, left, right, y);
    }
}

/// 1ページ目（表題・判定・機器情報）を描画し、照合結果表の開始Yを返す
fn draw_first_page(layer: &PdfLayerReference, fonts: &Fonts, layout: &ReportLayout, data: &ReportData) -> f32 {
    let left = layout.margin_mm;
    let right = layout.page_width_mm - layout.margin_mm;
    let center = layout.page_width_mm / 2.0;
    let mut y = layout.content_top_mm() - 8.0;

    layer.set_fill_color(rgb(TITLE_COLOR));
    layer.use_text(REPORT_TITLE, TITLE_FONT_SIZE, Mm(left + 6.0), Mm(y), &fonts.bold);
    y -= 28.0;

    // 判定（大きく中央に）
    let outcome = data.result.overall;
    let label = outcome.as_str();
    // Helvetica-Boldの平均字幅はおよそ0.65em
    let banner_width_mm = label.len() as f32 * BANNER_FONT_SIZE * 0.65 * 0.3528;
    layer.set_fill_color(rgb(outcome_color(outcome)));
    layer.use_text(label, BANNER_FONT_SIZE, Mm(center - banner_width_mm / 2.0), Mm(y), &fonts.bold);
    y -= 18.0;

    layer.set_fill_color(rgb(TEXT_COLOR));
    layer.use_text("Device Information", HEADING_FONT_SIZE, Mm(left), Mm(y), &fonts.bold);
    y -= 3.0;

    hline(layer, left, right, y);
    for (label, value) in data.info_rows() {
        let baseline = y - layout.row_height_mm + 2.0;
        layer.use_text(label, BODY_FONT_SIZE, Mm(left + 1.5), Mm(baseline), &fonts.bold);
        layer.use_text(
            fit_text(&value, 80),
            BODY_FONT_SIZE,
            Mm(left + INFO_LABEL_WIDTH_MM),
            Mm(baseline),
            &fonts.regular,
        );
        y -= layout.row_height_mm;
        hline(layer, left, right, y);
    }
    y -= 10.0;

    if outcome == Outcome::Unpass {
        layer.set_fill_color(rgb(UNPASS_COLOR));
        layer.use_text(
            fit_text(
                &format!(
                    "Serial number {} was not found in the master configuration list.",
                    data.result.serial
                ),
                100,
            ),
            HEADING_FONT_SIZE - 2.0,
            Mm(left),
            Mm(y),
            &fonts.bold,
        );
        return y - 6.0;
    }

    let mismatches = data.result.mismatches().count();
    layer.use_text(
        format!(
            "Parameter Verification ({} checked, {} mismatched)",
            data.result.outcomes.len(),
            mismatches
        ),
        HEADING_FONT_SIZE,
        Mm(left),
        Mm(y),
        &fonts.bold,
    );
    y - 3.0
}

/// 検証レポートPDFを生成
pub fn generate_report(data: &ReportData, output_path: &Path) -> Result<()> {
    let layout = ReportLayout::a4();
    let title = fit_text(&format!("{} - {}", REPORT_TITLE, data.result.serial), 120);

    let (doc, page1, layer1) = PdfDocument::new(
        title.as_str(),
        Mm(layout.page_width_mm),
        Mm(layout.page_height_mm),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| EstError::PdfGeneration(format!("フォント追加エラー: {:?}", e)))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| EstError::PdfGeneration(format!("フォント追加エラー: {:?}", e)))?,
    };

    let rows = data.result_rows();
    let pages = layout.paginate(rows.len());
    let page_count = pages.len();

    for (page_no, range) in pages.into_iter().enumerate() {
        let layer = if page_no == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (page, layer) = doc.add_page(
                Mm(layout.page_width_mm),
                Mm(layout.page_height_mm),
                format!("Layer {}", page_no + 1),
            );
            doc.get_page(page).get_layer(layer)
        };
        layer.set_outline_color(rgb(GRID_COLOR));
        layer.set_outline_thickness(0.5);

        let table_top = if page_no == 0 {
            draw_first_page(&layer, &fonts, &layout, data)
        } else {
            layer.set_fill_color(rgb(TEXT_COLOR));
            layer.use_text(
                fit_text(&format!("{} (continued)", data.result.serial), 60),
                HEADING_FONT_SIZE,
                Mm(layout.margin_mm),
                Mm(layout.content_top_mm() - 6.0),
                &fonts.bold,
            );
            layout.content_top_mm() - 12.0
        };

        if !rows.is_empty() {
            let body_top = draw_table_header(&layer, &fonts, &layout, table_top);
            draw_result_rows(&layer, &fonts, &layout, &rows[range], body_top);
        }

        layer.set_fill_color(rgb(TEXT_COLOR));
        layer.use_text(
            format!("Page {} / {}", page_no + 1, page_count),
            NOTE_FONT_SIZE,
            Mm(layout.page_width_mm - layout.margin_mm - 20.0),
            Mm(layout.margin_mm / 2.0),
            &fonts.regular,
        );
    }

    let file = File::create(output_path)?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| EstError::PdfGeneration(format!("PDF保存エラー: {:?}", e)))?;

    Ok(())
}
