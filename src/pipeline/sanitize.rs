//! Sanitisation: deterministic cleanup of model-generated report text.
//!
//! Two layers, used at two different points:
//!
//! * [`clean_report`] runs once per report, right after the inference call.
//!   It fixes model quirks that are wrong in any medium — outer code
//!   fences, CRLF endings, invisible Unicode, runaway blank lines — while
//!   leaving the content (including emoji and `**` markers, which the PDF
//!   layout later keys off) untouched.
//!
//! * [`sanitize_pdf_line`] runs per line at PDF layout time. The built-in
//!   PDF fonts are WinAnsi-encoded, so everything outside Latin-1 must be
//!   folded to an equivalent or dropped. This is the defensive fallback
//!   chain: no model output, however malformed, may panic the renderer or
//!   produce unencodable glyphs.

use once_cell::sync::Lazy;
use regex::Regex;

// ── Report-level cleanup ─────────────────────────────────────────────────

/// Apply all report-level cleanup rules to raw model output.
///
/// Rules (applied in order):
/// 1. Strip an outer markdown fence if the model wrapped its whole answer
/// 2. Normalise line endings (CRLF/CR → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 6. Trim leading/trailing blank lines
pub fn clean_report(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\n(.*)\n```\s*$").unwrap());

fn strip_outer_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── PDF-level sanitisation ───────────────────────────────────────────────

static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{1,3}([^*]+)\*{1,3}").unwrap());

/// Strip markdown emphasis markers, keeping the emphasised text.
///
/// `**Medical Analysis:**` → `Medical Analysis:`. Unbalanced leftover
/// asterisks are removed outright.
pub fn strip_emphasis(input: &str) -> String {
    RE_EMPHASIS.replace_all(input, "$1").replace('*', "")
}

/// Fold a typographic character to its closest WinAnsi-safe equivalent.
///
/// Returns `None` for characters that have no reasonable fold and should
/// be dropped (emoji, CJK, arrows, …).
fn fold_char(c: char) -> Option<&'static str> {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => Some("'"),
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => Some("\""),
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => Some("-"),
        '\u{2026}' => Some("..."),
        '\u{2022}' | '\u{25CF}' | '\u{25AA}' | '\u{2023}' | '\u{2043}' => Some("-"),
        '\u{00A0}' | '\u{2002}' | '\u{2003}' | '\u{2009}' => Some(" "),
        '\u{2190}' => Some("<-"),
        '\u{2192}' => Some("->"),
        _ => None,
    }
}

/// Sanitise one line of text for the WinAnsi-encoded built-in PDF fonts.
///
/// The fallback chain, in order: strip emphasis markers, fold typographic
/// punctuation to ASCII, drop anything still outside Latin-1 (emoji,
/// symbols), then collapse runs of whitespace. Always returns a printable
/// string; worst case it is empty and the caller skips the line.
pub fn sanitize_pdf_line(input: &str) -> String {
    let stripped = strip_emphasis(input);

    let mut folded = String::with_capacity(stripped.len());
    for c in stripped.chars() {
        if let Some(repl) = fold_char(c) {
            folded.push_str(repl);
        } else if (c as u32) < 0x100 && (!c.is_control() || c == '\t') {
            folded.push(c);
        }
        // else: dropped — no WinAnsi representation
    }

    collapse_spaces(&folded)
}

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());

fn collapse_spaces(input: &str) -> String {
    RE_SPACES.replace_all(input.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_fence() {
        let input = "```markdown\n**Medical Analysis:**\nfine\n```";
        assert_eq!(clean_report(input), "**Medical Analysis:**\nfine");
    }

    #[test]
    fn fence_in_the_middle_is_kept() {
        let input = "intro\n```\ncode\n```\noutro";
        assert_eq!(clean_report(input), input);
    }

    #[test]
    fn normalises_crlf_and_trailing_space() {
        assert_eq!(clean_report("a  \r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(clean_report("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn removes_invisible_unicode() {
        assert_eq!(clean_report("he\u{200B}llo\u{FEFF}"), "hello");
    }

    #[test]
    fn emphasis_is_stripped() {
        assert_eq!(strip_emphasis("**bold** and *italic*"), "bold and italic");
        assert_eq!(strip_emphasis("**Medical Analysis:**"), "Medical Analysis:");
        // Unbalanced markers do not survive either
        assert_eq!(strip_emphasis("dangling ** marker"), "dangling  marker");
    }

    #[test]
    fn pdf_line_folds_typography() {
        assert_eq!(
            sanitize_pdf_line("“quoted” — it’s fine…"),
            "\"quoted\" - it's fine..."
        );
    }

    #[test]
    fn pdf_line_drops_emoji_keeps_text() {
        assert_eq!(
            sanitize_pdf_line("**🩻 Medical Analysis:**"),
            "Medical Analysis:"
        );
        assert_eq!(sanitize_pdf_line("💙 stay strong 💙"), "stay strong");
    }

    #[test]
    fn pdf_line_keeps_latin1_accents() {
        assert_eq!(sanitize_pdf_line("fracture déplacée"), "fracture déplacée");
    }

    #[test]
    fn pdf_line_bullet_fold() {
        assert_eq!(sanitize_pdf_line("• rest • ice"), "- rest - ice");
    }

    #[test]
    fn pdf_line_never_panics_on_junk() {
        let junk = "\u{1F9E0}\u{FFFD}漢字\u{0007}table";
        assert_eq!(sanitize_pdf_line(junk), "table");
        assert_eq!(sanitize_pdf_line(""), "");
    }

    #[test]
    fn collapses_space_runs() {
        assert_eq!(sanitize_pdf_line("a   b\t\tc"), "a b c");
    }
}
