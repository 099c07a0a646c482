use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Maximal runs of letters, combining marks and digits; everything else separates tokens.
    static ref RE: Regex = Regex::new(r"[\p{L}\p{M}\p{N}]+").expect("valid regex");
}

/// Tokenize text into (term, position) using NFKC normalization and lowercasing.
///
/// Every token is kept: there is no stopword list and no stemming, so positions
/// are consecutive token ordinals.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .enumerate()
        .map(|(pos, mat)| (mat.as_str().to_string(), pos))
        .collect()
}

/// Terms only, in order of appearance.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|(t, _)| t).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("The quick, brown fox!");
        assert_eq!(
            t,
            vec![
                ("the".to_string(), 0),
                ("quick".to_string(), 1),
                ("brown".to_string(), 2),
                ("fox".to_string(), 3),
            ]
        );
    }

    #[test]
    fn splits_on_punctuation_runs() {
        assert_eq!(terms("e-mail::v2...beta__x"), vec!["e", "mail", "v2", "beta", "x"]);
        assert!(terms("  ?!-- ").is_empty());
    }
}
