//! UTF-8 safe helpers for showing note text in listings

/// Truncate to `max_chars` characters, appending "..." when cut.
///
/// Counts characters, not bytes, so multi-byte text never splits mid-char.
///
/// # Examples
/// ```
/// use texnote_core::utils::string::truncate_at_char_boundary;
///
/// assert_eq!(truncate_at_char_boundary("\\section{Intro}", 8), "\\section...");
/// assert_eq!(truncate_at_char_boundary("Résumé", 10), "Résumé");
/// ```
pub fn truncate_at_char_boundary(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// One-line preview of a note body
///
/// Skips blank lines and `%` comments, collapses runs of whitespace, then
/// truncates to `max_chars`.
pub fn preview_line(text: &str, max_chars: usize) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('%'))
        .unwrap_or("");
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_at_char_boundary(&collapsed, max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_and_exact() {
        assert_eq!(truncate_at_char_boundary("\\item", 10), "\\item");
        assert_eq!(truncate_at_char_boundary("\\item", 5), "\\item");
        assert_eq!(truncate_at_char_boundary("", 5), "");
    }

    #[test]
    fn test_truncate_long() {
        assert_eq!(
            truncate_at_char_boundary("\\begin{document}", 6),
            "\\begin..."
        );
    }

    #[test]
    fn test_truncate_multibyte() {
        // 'α' and '→' are multi-byte in UTF-8
        let text = "$\\alpha$ α→β mapping";
        let result = truncate_at_char_boundary(text, 11);
        assert_eq!(result, "$\\alpha$ α→...");
        assert!(result.is_char_boundary(result.len()));
    }

    #[test]
    fn test_preview_skips_comments_and_blanks() {
        let text = "\n% scratch\n   \\section{Results}   and   more\n\\end{document}";
        assert_eq!(preview_line(text, 40), "\\section{Results} and more");
    }

    #[test]
    fn test_preview_empty() {
        assert_eq!(preview_line("  \n% only a comment\n", 10), "");
    }
}
