//! Visibility filtering based on shader annotations.
//!
//! Shaders can hide themselves from listings with an annotation such as:
//!
//! ```text
//! #pragma annotation "visibility" "False"
//! ```
//!
//! The extractor reports annotations as raw lines. Each line is split on `"`
//! and only the purely alphanumeric pieces are kept as tokens, so quoting and
//! surrounding punctuation do not matter.

const VISIBILITY_KEY: &str = "visibility";
const HIDDEN_VALUE: &str = "False";

fn tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split('"')
        .filter(|piece| !piece.is_empty() && piece.chars().all(char::is_alphanumeric))
}

fn hides(line: &str) -> bool {
    let line = line.trim_end_matches('\r');
    let mut previous = None;

    for token in tokens(line) {
        if previous == Some(VISIBILITY_KEY) && token == HIDDEN_VALUE {
            return true;
        }
        previous = Some(token);
    }

    false
}

/// Returns `false` if any annotation line carries a `"visibility" "False"`
/// token pair, `true` otherwise (including when there are no annotations).
pub fn is_visible<S: AsRef<str>>(annotations: &[S]) -> bool {
    !annotations.iter().any(|line| hides(line.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_annotations_are_visible() {
        let annotations: [&str; 0] = [];
        assert!(is_visible(&annotations));
    }

    #[test]
    fn test_visibility_false_hides() {
        assert!(!is_visible(&[r#"#pragma annotation "visibility" "False""#]));
        assert!(!is_visible(&[r#""visibility""False""#]));
    }

    #[test]
    fn test_visibility_true_is_visible() {
        assert!(is_visible(&[r#"#pragma annotation "visibility" "True""#]));
    }

    #[test]
    fn test_pair_must_be_consecutive() {
        assert!(is_visible(&[r#""visibility" "hidden" "False""#]));
        assert!(is_visible(&[r#""False" "visibility""#]));
    }

    #[test]
    fn test_surrounding_tokens_do_not_matter() {
        let annotations = [
            r#""author" "someone""#,
            r#"#pragma annotation "grouping" "x" "visibility" "False" "extra""#,
        ];
        assert!(!is_visible(&annotations));
    }

    #[test]
    fn test_non_alphanumeric_pieces_are_ignored() {
        // "help text" contains a space so it is not a token; the pair is still adjacent
        assert!(!is_visible(&[r#""help text" "visibility" "False""#]));
        // "False!" is not a token
        assert!(is_visible(&[r#""visibility" "False!""#]));
    }

    #[test]
    fn test_carriage_returns_are_stripped() {
        assert!(!is_visible(&["\"visibility\" \"False\"\r"]));
    }

    #[test]
    fn test_malformed_lines_contribute_nothing() {
        let annotations = [
            "\"",
            "\"\"\"\"",
            "no quotes at all",
            r#""visibility""#,
            "\u{0}\u{1}\"",
        ];
        assert!(is_visible(&annotations));
    }

    #[test]
    fn test_any_line_can_hide() {
        let annotations = vec![
            String::from(r#""label" "Plastic""#),
            String::new(),
            String::from(r#""visibility" "False""#),
        ];
        assert!(!is_visible(&annotations));
    }
}
