use docsearch_core::tokenizer::{terms, tokenize};

#[test]
fn it_normalizes_without_stemming() {
    let words = terms("Running Runners RUN! The café's menu.");
    assert_eq!(words, vec!["running", "runners", "run", "the", "café", "s", "menu"]);
}

#[test]
fn it_keeps_stopwords() {
    let words = terms("The quick brown fox and the lazy dog");
    assert!(words.contains(&"the".to_string()));
    assert!(words.contains(&"and".to_string()));
    assert_eq!(words.len(), 8);
}

#[test]
fn it_applies_compatibility_normalization() {
    // fullwidth letters and the "ﬁ" ligature fold to their ASCII forms
    assert_eq!(terms("ＦＯＸ ﬁle"), vec!["fox", "file"]);
}

#[test]
fn it_is_idempotent_on_normalized_text() {
    for text in [
        "The quick brown fox",
        "e-mail: someone@example.com, 2024-01-01!",
        "Ünïcödé   MIXED case\ttabs\nnewlines",
        "",
    ] {
        let once = terms(text);
        let twice = terms(&once.join(" "));
        assert_eq!(once, twice, "{text:?}");
    }
}

#[test]
fn positions_are_consecutive() {
    let positions: Vec<usize> = tokenize("a, b; c... d").into_iter().map(|(_, p)| p).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}
