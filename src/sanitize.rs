/// Filename sanitation for downloaded media titles.
///
/// Remote titles routinely contain characters that are reserved on at least
/// one supported filesystem. Every reserved character is mapped to `_` so
/// that concurrent workers can write their output files without path errors.

const RESERVED: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces every filesystem-reserved character in `name` with `_`.
///
/// Total and deterministic; applying it twice yields the same string.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if RESERVED.contains(&c) { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_reserved_character() {
        assert_eq!(sanitize(r#"<>:"/\|?*"#), "_________");
    }

    #[test]
    fn leaves_ordinary_titles_alone() {
        assert_eq!(sanitize("a plain title 123"), "a plain title 123");
    }

    #[test]
    fn mixed_title() {
        assert_eq!(
            sanitize("What? A/B Test: \"results\""),
            "What_ A_B Test_ _results_"
        );
    }

    #[test]
    fn is_idempotent() {
        let inputs = ["", "clean", r#"a<b>c:d"e/f\g|h?i*j"#, "???"];
        for s in inputs {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn output_never_contains_reserved_characters() {
        let out = sanitize(r#"x<y>z:w"v/u\t|s?r*q"#);
        assert!(!out.contains(|c| RESERVED.contains(&c)));
    }

    #[test]
    fn preserves_unicode() {
        assert_eq!(sanitize("日本語タイトル？"), "日本語タイトル？");
    }
}
