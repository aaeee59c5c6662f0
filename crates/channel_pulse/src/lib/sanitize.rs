/// Maps a video title to a fragment safe to use as a local file name.
///
/// Anything other than alphanumerics, spaces, hyphens and underscores becomes
/// `_`, and trailing whitespace is dropped.
pub fn sanitize(title: &str) -> String {
    title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// File stem for a video's artifact; falls back to the id when the title
/// sanitizes to nothing.
pub fn artifact_stem(title: &str, video_id: &str) -> String {
    let stem = sanitize(title);
    if stem.is_empty() {
        sanitize(video_id)
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_allowed(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, ' ' | '-' | '_')
    }

    #[test]
    fn test_replaces_disallowed_characters() {
        assert_eq!(
            sanitize("Episode 12: What's next?"),
            "Episode 12_ What_s next_"
        );
        assert_eq!(sanitize("a/b\\c.d"), "a_b_c_d");
    }

    #[test]
    fn test_keeps_unicode_letters() {
        assert_eq!(sanitize("Günün Özeti - Çarşamba"), "Günün Özeti - Çarşamba");
    }

    #[test]
    fn test_trims_trailing_whitespace() {
        assert_eq!(sanitize("News   "), "News");
        assert_eq!(sanitize("News\t"), "News_");
    }

    #[test]
    fn test_empty_and_fully_disallowed() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("!!!"), "___");
    }

    #[test]
    fn test_output_alphabet_and_idempotence() {
        let titles = [
            "Live 🔴 | Parliament Q&A (17/10)",
            "  leading spaces stay",
            "tabs\tand\nnewlines",
            "ümlaut · middle dot",
            "--__--",
            "",
            "100% <real> \"quotes\"",
        ];

        for title in titles {
            let once = sanitize(title);
            assert!(
                once.chars().all(is_allowed),
                "{once:?} contains a disallowed character"
            );
            assert_eq!(sanitize(&once), once, "sanitize not idempotent for {title:?}");
        }
    }

    #[test]
    fn test_artifact_stem_falls_back_to_id() {
        assert_eq!(artifact_stem("", "abc-123"), "abc-123");
        assert_eq!(artifact_stem("   ", "abc-123"), "abc-123");
        assert_eq!(artifact_stem("Title", "abc-123"), "Title");
    }
}
