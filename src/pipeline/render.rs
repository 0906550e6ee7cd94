//! PDF report layout: batch results → paginated A4 document.
//!
//! This is the one genuinely fiddly part of the crate. The input is
//! semi-structured model prose — markdown-ish emphasis, emoji section
//! markers, variable whitespace, occasionally pages worth of text for a
//! single image — and the output must be a tidy multi-page document that
//! never crashes and never overflows a margin.
//!
//! ## Approach
//!
//! `printpdf` gives us pages, built-in Helvetica faces, and absolute text
//! placement; everything else is ours. [`ReportWriter`] keeps a top-down
//! cursor in millimetres and starts a new page whenever the next block
//! would cross the bottom margin. Word wrapping measures lines against an
//! approximate Helvetica advance-width table — built-in fonts ship no
//! metrics, and a coarse table within a few percent is plenty for ragged-
//! right body text.
//!
//! Every string is passed through [`sanitize_pdf_line`] immediately before
//! placement, so no caller can feed the WinAnsi-encoded fonts a glyph they
//! cannot represent.
//!
//! ## Document structure
//!
//! 1. Title page — clinic banner, title, location, image count, timestamp,
//!    disclaimer.
//! 2. One page per image — numbered header, image name, rule, then the
//!    report body with heading/body classification.
//! 3. Specialist advice page — static recommendations keyed to the
//!    detected location, plus the footer note.

use crate::error::Xray2ReportError;
use crate::output::BatchOutput;
use crate::pipeline::sanitize::sanitize_pdf_line;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocumentReference, PdfLayerReference, Point,
    Rgb,
};
use tracing::debug;

// ── Page geometry (A4, millimetres) ──────────────────────────────────────

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN_LEFT: f32 = 20.0;
const MARGIN_RIGHT: f32 = 20.0;
const MARGIN_TOP: f32 = 20.0;
/// Auto-page-break threshold from the bottom edge.
const MARGIN_BOTTOM: f32 = 15.0;

const CONTENT_WIDTH: f32 = PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;

/// Heading colour, RGB(0, 51, 102) — dark blue.
const DARK_BLUE: (f32, f32, f32) = (0.0, 51.0 / 255.0, 102.0 / 255.0);
const BLACK: (f32, f32, f32) = (0.0, 0.0, 0.0);

const POINT_TO_MM: f32 = 0.352_778;

// ── Static advice-page copy ──────────────────────────────────────────────

const DISCLAIMER: &str = "IMPORTANT DISCLAIMER: This AI-generated analysis is for educational \
and informational purposes only. It should not be used as a substitute for professional \
medical diagnosis, treatment, or advice. Always consult with qualified healthcare \
professionals for medical decisions.";

const SPECIALISTS: [&str; 4] = [
    "- Orthopedic specialists for bone-related findings",
    "- Radiologists for detailed image interpretation",
    "- General practitioners for initial consultation",
    "- Pulmonologists for chest X-ray findings",
];

const FIND_METHODS: [&str; 4] = [
    "- Search 'specialist name + near me' in Google Maps",
    "- Use healthcare provider directories",
    "- Contact your insurance provider for in-network specialists",
    "- Consider telemedicine options for initial consultations",
];

const EMERGENCY_SIGNS: [&str; 4] = [
    "- Severe or worsening pain",
    "- Difficulty breathing",
    "- Signs of infection (fever, redness, swelling)",
    "- Any concerning symptoms mentioned in the analysis above",
];

const FINAL_NOTE: &str =
    "Remember: Early consultation with healthcare professionals leads to better outcomes.";

const FOOTER_NOTE: &str = "This report was generated using AI analysis and should be reviewed \
by medical professionals.";

// ── Heading classification ───────────────────────────────────────────────

const SECTION_KEYWORDS: [&str; 7] = [
    "medical analysis:",
    "treatment plan:",
    "suggested treatment",
    "medications:",
    "possible medications",
    "emotional healing",
    "healing message:",
];

const SECTION_MARKERS: [char; 4] = ['🩻', '🩺', '💊', '💙'];

/// Classify a report line as a section heading.
///
/// The model is prompted to emit `**emoji Section Name:**` headings, but in
/// practice it drifts: markers get dropped, emphasis gets lost, colons
/// survive. Any one of the signals is enough.
pub(crate) fn is_section_heading(line: &str) -> bool {
    let lower = line.to_lowercase();
    SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
        || line.trim_end().ends_with(':')
        || line.contains("**")
        || line.chars().any(|c| SECTION_MARKERS.contains(&c))
}

// ── Helvetica width estimation ───────────────────────────────────────────

/// Approximate advance width of a WinAnsi glyph in 1/1000 em units.
///
/// Coarse buckets around the real Helvetica AFM values; body text is
/// ragged-right so a few percent of error only moves a break point by a
/// character or two.
fn glyph_units(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '\'' | '|' | '!' | '.' | ',' | ':' | ';' => 240.0,
        ' ' | 'I' | 'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '-' | '/' => 300.0,
        'm' | 'M' | 'w' | 'W' | '%' | '@' => 890.0,
        'A'..='Z' | '0'..='9' | '?' | '#' | '&' | '+' | '=' => 660.0,
        _ => 556.0,
    }
}

/// Estimated width of `text` in millimetres at `size_pt`.
fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    let units: f32 = text.chars().map(glyph_units).sum();
    units / 1000.0 * size_pt * POINT_TO_MM
}

/// Greedy word wrap against the estimated width.
///
/// A word wider than a whole line is hard-broken character by character so
/// pathological input (base64 blobs, run-on dashes) still fits the page.
fn wrap_text(text: &str, size_pt: f32, max_width_mm: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if text_width_mm(&candidate, size_pt) <= max_width_mm {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if text_width_mm(word, size_pt) <= max_width_mm {
            current = word.to_string();
        } else {
            // Hard-break an oversized word
            let mut piece = String::new();
            for c in word.chars() {
                piece.push(c);
                if text_width_mm(&piece, size_pt) > max_width_mm {
                    let overflow = piece.pop();
                    if !piece.is_empty() {
                        lines.push(std::mem::take(&mut piece));
                    }
                    if let Some(c) = overflow {
                        piece.push(c);
                    }
                }
            }
            current = piece;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ── Writer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

/// Cursor-based page writer over a `printpdf` document.
///
/// The cursor runs top-down in millimetres from the page's top edge;
/// `ensure_space` opens a fresh page when a block would cross the bottom
/// margin.
struct ReportWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    cursor_y: f32,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl ReportWriter {
    fn new(title: &str) -> Result<Self, Xray2ReportError> {
        let (doc, page, layer) =
            printpdf::PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

        let pdf_err = |e: printpdf::Error| Xray2ReportError::PdfRenderFailed(e.to_string());
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_err)?;
        let italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(pdf_err)?;

        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            cursor_y: MARGIN_TOP,
            regular,
            bold,
            italic,
        })
    }

    fn font(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }

    fn add_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_y = MARGIN_TOP;
    }

    /// Start a new page if `needed_mm` would cross the bottom margin.
    fn ensure_space(&mut self, needed_mm: f32) {
        if self.cursor_y + needed_mm > PAGE_HEIGHT - MARGIN_BOTTOM {
            self.add_page();
        }
    }

    fn set_fill(&self, (r, g, b): (f32, f32, f32)) {
        self.layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
    }

    fn spacer(&mut self, h: f32) {
        self.cursor_y += h;
    }

    /// Place one already-wrapped line; sanitises just before placement.
    fn write_line(
        &mut self,
        text: &str,
        size_pt: f32,
        style: FontStyle,
        line_height_mm: f32,
        align: Align,
        color: (f32, f32, f32),
    ) {
        let clean = sanitize_pdf_line(text);
        if clean.is_empty() {
            return;
        }

        self.ensure_space(line_height_mm);
        let x = match align {
            Align::Left => MARGIN_LEFT,
            Align::Center => {
                let w = text_width_mm(&clean, size_pt);
                ((PAGE_WIDTH - w) / 2.0).max(MARGIN_LEFT)
            }
        };

        // Baseline sits three quarters down the line box.
        let baseline = PAGE_HEIGHT - (self.cursor_y + line_height_mm * 0.75);

        self.set_fill(color);
        self.layer
            .use_text(clean, size_pt, Mm(x), Mm(baseline), self.font(style));
        self.cursor_y += line_height_mm;
    }

    /// Wrap and place a paragraph, left-aligned.
    fn write_wrapped(
        &mut self,
        text: &str,
        size_pt: f32,
        style: FontStyle,
        line_height_mm: f32,
        color: (f32, f32, f32),
    ) {
        let clean = sanitize_pdf_line(text);
        if clean.is_empty() {
            return;
        }
        for line in wrap_text(&clean, size_pt, CONTENT_WIDTH) {
            // Already sanitised; write_line's second pass is a no-op.
            self.write_line(&line, size_pt, style, line_height_mm, Align::Left, color);
        }
    }

    /// Horizontal rule across the content width at the cursor.
    fn hrule(&mut self) {
        self.ensure_space(2.0);
        let y = PAGE_HEIGHT - self.cursor_y;
        let rule = Line {
            points: vec![
                (Point::new(Mm(MARGIN_LEFT), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN_RIGHT), Mm(y)), false),
            ],
            is_closed: false,
        };
        self.layer
            .set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(rule);
        self.cursor_y += 2.0;
    }

    fn finish(self) -> Result<Vec<u8>, Xray2ReportError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| Xray2ReportError::PdfRenderFailed(e.to_string()))
    }
}

// ── Document assembly ────────────────────────────────────────────────────

/// Render the batch into PDF bytes.
///
/// Pure layout: no network, no filesystem. Failed images are included with
/// their placeholder text so the document accounts for every submitted
/// image.
pub fn render_report(output: &BatchOutput, clinic_name: &str) -> Result<Vec<u8>, Xray2ReportError> {
    let mut w = ReportWriter::new("X-Ray Medical Analysis Report")?;

    render_title_page(&mut w, output, clinic_name);

    for report in &output.reports {
        w.add_page();

        w.write_line(
            &format!("ANALYSIS REPORT {}", report.index),
            16.0,
            FontStyle::Bold,
            10.0,
            Align::Center,
            BLACK,
        );
        w.spacer(3.0);
        w.write_line(
            &format!("Image: {}", report.name),
            12.0,
            FontStyle::Italic,
            8.0,
            Align::Center,
            BLACK,
        );
        w.spacer(8.0);
        w.hrule();
        w.spacer(8.0);

        render_report_body(&mut w, &report.report);
    }

    render_advice_page(&mut w, &output.location);

    debug!("Report layout complete ({} image pages)", output.reports.len());
    w.finish()
}

fn render_title_page(w: &mut ReportWriter, output: &BatchOutput, clinic_name: &str) {
    w.spacer(20.0);
    w.write_line(clinic_name, 20.0, FontStyle::Bold, 10.0, Align::Center, BLACK);
    w.spacer(20.0);

    w.write_line(
        "X-RAY MEDICAL ANALYSIS REPORT",
        18.0,
        FontStyle::Bold,
        12.0,
        Align::Center,
        BLACK,
    );
    w.spacer(10.0);

    w.write_line(
        &format!("Generated for location: {}", output.location),
        12.0,
        FontStyle::Italic,
        8.0,
        Align::Center,
        BLACK,
    );
    w.write_line(
        &format!("Total images analyzed: {}", output.reports.len()),
        12.0,
        FontStyle::Italic,
        8.0,
        Align::Center,
        BLACK,
    );
    w.write_line(
        &format!("Report generated on: {}", output.generated_at),
        12.0,
        FontStyle::Italic,
        8.0,
        Align::Center,
        BLACK,
    );
    w.spacer(15.0);

    w.write_wrapped(DISCLAIMER, 10.0, FontStyle::Italic, 6.0, BLACK);
}

/// Lay out one report body: double-newline sections, heading/body split.
///
/// Body lines within a section are accumulated and re-flowed into a single
/// wrapped paragraph; the model's own line breaks inside a paragraph are
/// artifacts of its output window, not layout intent.
fn render_report_body(w: &mut ReportWriter, report: &str) {
    for section in report.split("\n\n") {
        if section.trim().is_empty() {
            continue;
        }

        let mut paragraph = String::new();
        for line in section.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if is_section_heading(line) {
                if !paragraph.trim().is_empty() {
                    w.write_wrapped(&paragraph, 10.0, FontStyle::Regular, 5.0, BLACK);
                    paragraph.clear();
                    w.spacer(3.0);
                }
                w.write_line(line, 12.0, FontStyle::Bold, 8.0, Align::Left, DARK_BLUE);
                w.spacer(2.0);
            } else if paragraph.is_empty() {
                paragraph.push_str(line);
            } else {
                paragraph.push(' ');
                paragraph.push_str(line);
            }
        }

        if !paragraph.trim().is_empty() {
            w.write_wrapped(&paragraph, 10.0, FontStyle::Regular, 5.0, BLACK);
            w.spacer(4.0);
        }
    }
}

fn render_advice_page(w: &mut ReportWriter, location: &str) {
    w.add_page();

    w.write_line(
        "SPECIALIST RECOMMENDATIONS",
        16.0,
        FontStyle::Bold,
        10.0,
        Align::Center,
        BLACK,
    );
    w.spacer(10.0);
    w.hrule();
    w.spacer(10.0);

    w.write_line(
        "Recommended Next Steps:",
        11.0,
        FontStyle::Bold,
        8.0,
        Align::Left,
        DARK_BLUE,
    );
    w.spacer(3.0);

    w.write_wrapped(
        &format!("Based on your location: {location}, we recommend consulting with:"),
        10.0,
        FontStyle::Regular,
        5.0,
        BLACK,
    );
    w.spacer(3.0);
    for item in SPECIALISTS {
        w.write_wrapped(item, 10.0, FontStyle::Regular, 5.0, BLACK);
        w.spacer(1.0);
    }
    w.spacer(4.0);

    w.write_line(
        "How to Find Specialists:",
        11.0,
        FontStyle::Bold,
        7.0,
        Align::Left,
        DARK_BLUE,
    );
    w.spacer(2.0);
    for item in FIND_METHODS {
        w.write_wrapped(item, 10.0, FontStyle::Regular, 5.0, BLACK);
        w.spacer(1.0);
    }
    w.spacer(4.0);

    w.write_line(
        "Emergency Signs to Watch For:",
        11.0,
        FontStyle::Bold,
        7.0,
        Align::Left,
        DARK_BLUE,
    );
    w.spacer(2.0);
    for item in EMERGENCY_SIGNS {
        w.write_wrapped(item, 10.0, FontStyle::Regular, 5.0, BLACK);
        w.spacer(1.0);
    }
    w.spacer(4.0);

    w.write_wrapped(FINAL_NOTE, 10.0, FontStyle::Regular, 5.0, BLACK);

    w.spacer(15.0);
    w.write_line(FOOTER_NOTE, 8.0, FontStyle::Italic, 5.0, Align::Center, BLACK);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{BatchOutput, BatchStats, ImageReport};

    fn batch(reports: Vec<ImageReport>) -> BatchOutput {
        let total = reports.len();
        BatchOutput {
            reports,
            location: "Lyon, ARA".into(),
            generated_at: "August 30, 2026 at 02:15 PM".into(),
            stats: BatchStats {
                total_images: total,
                analyzed_images: total,
                failed_images: 0,
                total_duration_ms: 0,
                llm_duration_ms: 0,
            },
        }
    }

    fn report(index: usize, name: &str, text: &str) -> ImageReport {
        ImageReport {
            index,
            name: name.into(),
            report: text.into(),
            duration_ms: 1,
            error: None,
        }
    }

    // ── Heading classification ──

    #[test]
    fn classifies_prompted_headings() {
        assert!(is_section_heading("**🩻 Medical Analysis:**"));
        assert!(is_section_heading("Suggested Treatment Plan"));
        assert!(is_section_heading("Possible Medications"));
        assert!(is_section_heading("💙 Emotional Healing Message"));
    }

    #[test]
    fn classifies_colon_terminated_lines() {
        assert!(is_section_heading("Findings:"));
    }

    #[test]
    fn body_text_is_not_a_heading() {
        assert!(!is_section_heading("The lung fields are clear."));
        assert!(!is_section_heading("- ibuprofen 400 mg as needed"));
    }

    // ── Width estimation & wrapping ──

    #[test]
    fn width_scales_with_font_size() {
        let narrow = text_width_mm("hello world", 10.0);
        let wide = text_width_mm("hello world", 20.0);
        assert!((wide - narrow * 2.0).abs() < 0.001);
    }

    #[test]
    fn wide_glyphs_measure_wider() {
        assert!(text_width_mm("mmmm", 10.0) > text_width_mm("iiii", 10.0) * 2.0);
    }

    #[test]
    fn wrap_short_text_single_line() {
        let lines = wrap_text("short line", 10.0, CONTENT_WIDTH);
        assert_eq!(lines, vec!["short line"]);
    }

    #[test]
    fn wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap_text(&text, 10.0, CONTENT_WIDTH);
        assert!(lines.len() > 3);
        for line in &lines {
            assert!(
                text_width_mm(line, 10.0) <= CONTENT_WIDTH + 0.001,
                "overflowing line: {line:?}"
            );
        }
        // No text lost
        let rejoined = lines.join(" ");
        assert_eq!(
            rejoined.split_whitespace().count(),
            text.split_whitespace().count()
        );
    }

    #[test]
    fn wrap_hard_breaks_monster_words() {
        let blob = "A".repeat(400);
        let lines = wrap_text(&blob, 10.0, CONTENT_WIDTH);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, 10.0) <= CONTENT_WIDTH + 0.001);
        }
        let total: usize = lines.iter().map(|l| l.len()).sum();
        assert_eq!(total, 400);
    }

    #[test]
    fn wrap_empty_input() {
        assert!(wrap_text("", 10.0, CONTENT_WIDTH).is_empty());
        assert!(wrap_text("   ", 10.0, CONTENT_WIDTH).is_empty());
    }

    // ── Full-document rendering ──

    fn assert_is_pdf(bytes: &[u8]) {
        assert!(bytes.len() > 500, "suspiciously small PDF: {}", bytes.len());
        assert_eq!(&bytes[..5], b"%PDF-", "missing PDF magic");
    }

    #[test]
    fn renders_typical_batch() {
        let text = "**🩻 Medical Analysis:**\nNo acute fracture. Lung fields clear.\n\n\
                    **🩺 Suggested Treatment Plan:**\n- Rest\n- Follow-up in 2 weeks\n\n\
                    **💊 Possible Medications:**\n- Ibuprofen\n\n\
                    **💙 Emotional Healing Message:**\nYou are on the mend.";
        let out = batch(vec![
            report(1, "chest.png", text),
            report(2, "wrist.jpg", text),
        ]);
        let bytes = render_report(&out, "MEDICAL CENTER").unwrap();
        assert_is_pdf(&bytes);
    }

    #[test]
    fn renders_empty_batch() {
        // Title page + advice page only.
        let out = batch(vec![]);
        let bytes = render_report(&out, "MEDICAL CENTER").unwrap();
        assert_is_pdf(&bytes);
    }

    #[test]
    fn renders_hostile_input_without_panicking() {
        let hostile = format!(
            "🩻🩻🩻\n\n{}\n\n**unclosed emphasis\n\n{}\n\n漢字テスト",
            "x".repeat(5000),
            "word ".repeat(3000)
        );
        let out = batch(vec![report(1, "junk.png", &hostile)]);
        let bytes = render_report(&out, "MEDICAL CENTER").unwrap();
        assert_is_pdf(&bytes);
    }

    #[test]
    fn renders_failure_placeholder() {
        let out = batch(vec![report(
            1,
            "broken.jpg",
            "Analysis failed: connection refused",
        )]);
        let bytes = render_report(&out, "MEDICAL CENTER").unwrap();
        assert_is_pdf(&bytes);
    }
}
