use std::collections::BTreeSet;

use crate::engine::KeyValue;

/// Emits `(word, document)` once per distinct word of the document.
pub fn map(document: &str, contents: &str) -> Vec<KeyValue> {
    let words: BTreeSet<&str> = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .collect();

    words
        .into_iter()
        .map(|w| KeyValue::new(w, document))
        .collect()
}

/// `"<n> <doc>,<doc>,..."` with documents sorted.
pub fn reduce(_key: &str, values: &[String]) -> String {
    let mut docs: Vec<&str> = values.iter().map(String::as_str).collect();
    docs.sort_unstable();
    format!("{} {}", docs.len(), docs.join(","))
}
