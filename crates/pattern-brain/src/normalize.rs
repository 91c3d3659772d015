//! Message normalisation and word matching helpers.

/// Chat abbreviations expanded before matching. Only whole words are replaced.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("u", "you"),
    ("ur", "your"),
    ("r", "are"),
    ("pls", "please"),
    ("plz", "please"),
    ("thx", "thanks"),
    ("ty", "thank you"),
    ("wat", "what"),
    ("wut", "what"),
    ("hru", "how are you"),
];

/// Lower-case, collapse whitespace and expand chat abbreviations.
///
/// Punctuation attached to a word is kept: `"u?"` becomes `"you?"`.
pub fn normalize(message: &str) -> String {
    message
        .split_whitespace()
        .map(|token| {
            let lower = token.to_lowercase();
            let start = lower
                .find(|c: char| c.is_alphanumeric())
                .unwrap_or(lower.len());
            let end = lower
                .rfind(|c: char| c.is_alphanumeric())
                .map(|i| i + lower[i..].chars().next().map_or(1, char::len_utf8))
                .unwrap_or(start);
            if start >= end {
                return lower;
            }

            let core = &lower[start..end];
            match ABBREVIATIONS.iter().find(|(short, _)| *short == core) {
                Some((_, long)) => format!("{}{}{}", &lower[..start], long, &lower[end..]),
                None => lower,
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split text into bare words (letters, digits, apostrophes).
pub fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Whether any of `candidates` appears as a whole word in `text`.
pub fn has_any_word(text: &str, candidates: &[&str]) -> bool {
    words(text).iter().any(|w| candidates.contains(w))
}

/// Whether any of `phrases` appears in `text` on word boundaries.
pub fn has_any_phrase(text: &str, phrases: &[&str]) -> bool {
    let padded = format!(" {} ", words(text).join(" "));
    phrases
        .iter()
        .any(|phrase| padded.contains(&format!(" {} ", phrase)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lone_u_becomes_you() {
        assert_eq!(normalize("how r u"), "how are you");
        assert_eq!(normalize("Thank U!"), "thank you!");
    }

    #[test]
    fn test_embedded_letters_untouched() {
        assert_eq!(normalize("use your umbrella"), "use your umbrella");
        assert_eq!(normalize("Run, rabbit"), "run, rabbit");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(normalize("  hello \t  there  "), "hello there");
    }

    #[test]
    fn test_punctuation_only_token() {
        assert_eq!(normalize("?? u"), "?? you");
    }

    #[test]
    fn test_word_helpers() {
        assert!(has_any_word("well, hello there", &["hello"]));
        assert!(!has_any_word("othello", &["hello"]));
        assert!(has_any_phrase("so... how are you?", &["how are you"]));
        assert!(!has_any_phrase("show are yours", &["how are you"]));
        assert_eq!(words("xyzzy-nonsense"), vec!["xyzzy", "nonsense"]);
    }
}
