use crate::engine::KeyValue;

/// Emits `(word, "1")` for every run of letters in the input.
pub fn map(_filename: &str, contents: &str) -> Vec<KeyValue> {
    contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(|w| KeyValue::new(w, "1"))
        .collect()
}

/// Number of occurrences of the word.
pub fn reduce(_key: &str, values: &[String]) -> String {
    values.len().to_string()
}
