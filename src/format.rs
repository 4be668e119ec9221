//! Search-result rendering.
//!
//! Turns raw engine hits (with highlight-marked content) into ranked,
//! truncated excerpts. Two targets share the same line-selection core:
//! a terminal rendering with ANSI-colored match spans, and a plain prose
//! rendering for the MCP tool consumer where the `**` markers are kept
//! verbatim. Hits are rendered in engine order; no re-ranking happens here.

use crate::assemble::truncate_chars;
use crate::models::SearchHit;

/// Highlight tag pair for the interactive (CLI) path.
pub const CLI_PRE_TAG: &str = "<<<";
pub const CLI_POST_TAG: &str = ">>>";
/// Highlight tag pair for the protocol (MCP) path; kept verbatim in output
/// so the consuming model sees markdown emphasis.
pub const MCP_TAG: &str = "**";

const CLI_MAX_MATCH_LINES: usize = 5;
const CLI_MATCH_LINE_CAP: usize = 200;
const CLI_PREVIEW_LINES: usize = 3;
const CLI_PREVIEW_LINE_CAP: usize = 150;

const MCP_MAX_MATCH_LINES: usize = 3;
const MCP_PREVIEW_CHARS: usize = 200;

const CYAN: &str = "\x1b[36m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const MATCH_COLOR: &str = "\x1b[43;30m"; // yellow background, black text
const RESET: &str = "\x1b[0m";

/// Lines of the highlighted content that contain a complete match: both the
/// opening and the closing marker. A match spanning a line break leaves one
/// marker on each line and is excluded.
fn matched_lines<'a>(highlighted: &'a str, pre: &str, post: &str) -> Vec<&'a str> {
    highlighted
        .lines()
        .filter(|line| line.contains(pre) && line.contains(post))
        .collect()
}

/// Terminal rendering: colored header, rank + filename + path per hit, up to
/// five matched lines with the tags rewritten to a background highlight.
/// With `color` off (stdout not a TTY) the same text is emitted bare.
pub fn render_interactive(query: &str, hits: &[SearchHit], color: bool) -> String {
    let paint = |code: &str, text: &str| {
        if color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    };

    let mut out = String::new();
    out.push_str(&format!(
        "\n{}\n\n",
        paint(CYAN, &format!("=== Search Results for '{}' ===", query))
    ));

    if hits.is_empty() {
        out.push_str("No results found.\n");
        return out;
    }

    for (idx, hit) in hits.iter().enumerate() {
        out.push_str(&format!(
            "{}\n",
            paint(GREEN, &format!("{}. 📄 {}", idx + 1, hit.filename))
        ));
        out.push_str(&format!("   {} {}\n", paint(YELLOW, "Path:"), hit.path));

        let matches = hit
            .highlighted
            .as_deref()
            .map(|h| matched_lines(h, CLI_PRE_TAG, CLI_POST_TAG))
            .unwrap_or_default();

        if !matches.is_empty() {
            out.push_str(&format!("   {}\n", paint(YELLOW, "Matches:")));
            for line in matches.iter().take(CLI_MAX_MATCH_LINES) {
                let capped = truncate_chars(line, CLI_MATCH_LINE_CAP);
                let rendered = if color {
                    // Reset at end of line in case truncation ate a closing tag.
                    format!(
                        "{}{}",
                        capped.replace(CLI_PRE_TAG, MATCH_COLOR).replace(CLI_POST_TAG, RESET),
                        RESET
                    )
                } else {
                    capped
                };
                out.push_str(&format!("     {}\n", rendered));
            }
        } else {
            for line in hit
                .content
                .lines()
                .filter(|l| !l.trim().is_empty())
                .take(CLI_PREVIEW_LINES)
            {
                out.push_str(&format!(
                    "     {}\n",
                    truncate_chars(line, CLI_PREVIEW_LINE_CAP)
                ));
            }
        }
        out.push('\n');
    }

    out
}

/// Prose rendering for the MCP tool consumer. Markers stay verbatim; at most
/// three matched lines per hit; hits without a qualifying line fall back to
/// an ellipsized single-line preview of the raw content.
pub fn render_protocol(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!(
            "検索クエリ「{}」に一致するドキュメントが見つかりませんでした。",
            query
        );
    }

    let mut parts = vec![format!("検索クエリ「{}」の結果:\n", query)];

    for (idx, hit) in hits.iter().enumerate() {
        parts.push(format!("\n## {}. {}", idx + 1, hit.filename));
        parts.push(format!("パス: {}\n", hit.path));

        let matches = hit
            .highlighted
            .as_deref()
            .map(|h| matched_lines(h, MCP_TAG, MCP_TAG))
            .unwrap_or_default();

        if !matches.is_empty() {
            parts.push("関連箇所:".to_string());
            for line in matches.iter().take(MCP_MAX_MATCH_LINES) {
                parts.push(format!("  {}", line));
            }
        } else {
            let preview = truncate_chars(&hit.content, MCP_PREVIEW_CHARS).replace('\n', " ");
            parts.push(format!("プレビュー: {}...", preview));
        }
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(content: &str, highlighted: Option<&str>) -> SearchHit {
        SearchHit {
            id: "ab12cd34".to_string(),
            path: "/docs/report.docx".to_string(),
            filename: "report.docx".to_string(),
            content: content.to_string(),
            highlighted: highlighted.map(|h| h.to_string()),
        }
    }

    #[test]
    fn only_lines_with_both_markers_are_selected() {
        let lines = matched_lines("plain\n<<<match>>> more\nother", "<<<", ">>>");
        assert_eq!(lines, vec!["<<<match>>> more"]);
    }

    #[test]
    fn line_with_single_marker_is_excluded() {
        // A match spanning a line break leaves an opener on one line and a
        // closer on the next; neither line qualifies.
        let lines = matched_lines("start <<<spans\nlines>>> end", "<<<", ">>>");
        assert!(lines.is_empty());
    }

    #[test]
    fn empty_hit_set_renders_no_results_message() {
        let out = render_interactive("budget", &[], false);
        assert!(out.contains("=== Search Results for 'budget' ==="));
        assert!(out.contains("No results found."));
    }

    #[test]
    fn matched_lines_are_capped_at_five() {
        let highlighted = (1..=8)
            .map(|i| format!("[段落{}] <<<x>>>", i))
            .collect::<Vec<_>>()
            .join("\n");
        let h = hit("raw", Some(&highlighted));
        let out = render_interactive("x", &[h], false);
        assert_eq!(out.matches("[段落").count(), 5);
    }

    #[test]
    fn interactive_match_lines_are_truncated_to_200_chars() {
        let long = format!("<<<m>>>{}", "a".repeat(400));
        let h = hit("raw", Some(&long));
        let out = render_interactive("m", &[h], false);
        let rendered = out.lines().find(|l| l.contains("<<<m>>>")).unwrap();
        // 5 leading spaces + 200 chars of content.
        assert_eq!(rendered.chars().count(), 205);
    }

    #[test]
    fn fallback_preview_shows_first_three_nonblank_lines() {
        let h = hit("one\n\ntwo\nthree\nfour", None);
        let out = render_interactive("q", &[h], false);
        assert!(out.contains("one"));
        assert!(out.contains("two"));
        assert!(out.contains("three"));
        assert!(!out.contains("four"));
    }

    #[test]
    fn fallback_applies_when_no_line_qualifies() {
        // Highlighted content exists but the only match spans a line break.
        let h = hit("preview text", Some("a <<<spans\nlines>>> b"));
        let out = render_interactive("q", &[h], false);
        assert!(out.contains("preview text"));
    }

    #[test]
    fn color_mode_rewrites_markers_to_ansi() {
        let h = hit("raw", Some("[段落1] <<<発注>>> 処理"));
        let out = render_interactive("発注", &[h], true);
        assert!(out.contains("\x1b[43;30m発注\x1b[0m"));
        assert!(!out.contains("<<<"));
    }

    #[test]
    fn ranks_are_one_based_and_in_engine_order() {
        let hits = vec![hit("a", None), hit("b", None)];
        let out = render_interactive("q", &hits, false);
        let first = out.find("1. 📄").unwrap();
        let second = out.find("2. 📄").unwrap();
        assert!(first < second);
    }

    #[test]
    fn protocol_keeps_markers_verbatim_and_caps_at_three() {
        let highlighted = (1..=5)
            .map(|i| format!("[要素{}] **流程**", i))
            .collect::<Vec<_>>()
            .join("\n");
        let h = hit("raw", Some(&highlighted));
        let out = render_protocol("流程", &[h]);
        assert!(out.contains("**流程**"));
        assert_eq!(out.matches("[要素").count(), 3);
        assert!(out.contains("## 1. report.docx"));
        assert!(out.contains("パス: /docs/report.docx"));
    }

    #[test]
    fn protocol_fallback_is_single_line_ellipsized_preview() {
        let content = format!("line one\n{}", "字".repeat(400));
        let h = hit(&content, None);
        let out = render_protocol("q", &[h]);
        let preview_line = out.lines().find(|l| l.starts_with("プレビュー:")).unwrap();
        assert!(preview_line.ends_with("..."));
        assert!(!preview_line.contains('\n'));
        // 200 content chars at most.
        assert!(preview_line.chars().count() <= 200 + "プレビュー: ...".chars().count());
    }

    #[test]
    fn protocol_no_results_message_echoes_the_query() {
        let out = render_protocol("原価", &[]);
        assert!(out.contains("「原価」"));
        assert!(out.contains("見つかりませんでした"));
    }
}
