use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds.
// u128 millis fits in u64 for realistic timestamps (until year 584942417)
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Collapse runs of whitespace into a single space and trim both ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Make `text` usable as a file name.
///
/// Characters that are invalid in file names on any supported platform are
/// replaced with `_`, except `"` and `/` which get look-alike glyphs so the
/// result stays readable. An empty result becomes `_`.
pub(crate) fn make_valid_file_name(text: &str) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '"' => '\u{201D}',
            '/' => '\u{2044}',
            '<' | '>' | ':' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.is_empty() {
        "_".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01 in ms
        assert!(now_millis() > 1_577_836_800_000);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  red \t\n bikini  "), "red bikini");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_make_valid_file_name_replaces_invalid() {
        assert_eq!(make_valid_file_name("a<b>c:d"), "a_b_c_d");
        assert_eq!(make_valid_file_name("what?*|"), "what___");
        assert_eq!(make_valid_file_name("tab\there"), "tab_here");
    }

    #[test]
    fn test_make_valid_file_name_fancy_glyphs() {
        assert_eq!(make_valid_file_name("\"big\" box"), "\u{201D}big\u{201D} box");
        assert_eq!(make_valid_file_name("on/off"), "on\u{2044}off");
        assert_eq!(make_valid_file_name("it's"), "it's");
    }

    #[test]
    fn test_make_valid_file_name_empty() {
        assert_eq!(make_valid_file_name(""), "_");
    }
}
