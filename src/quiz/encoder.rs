//! Canonical string encodings for structured answers.
//!
//! The encodings are meant to be read by the grading model, not parsed back by this crate.

pub const SEQUENCE_SEPARATOR: &str = " || ";
pub const PAIR_ARROW: &str = " -> ";
pub const PAIR_SEPARATOR: &str = ", ";

/// Items in their current working order, e.g. `"b || a || c"`.
pub fn encode_sequence<S: AsRef<str>>(items: &[S]) -> String {
    items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(SEQUENCE_SEPARATOR)
}

/// Selections in insertion order, e.g. `"Paris -> France, Berlin -> Germany"`.
pub fn encode_matching<L: AsRef<str>, R: AsRef<str>>(selections: &[(L, R)]) -> String {
    selections
        .iter()
        .map(|(left, right)| format!("{}{}{}", left.as_ref(), PAIR_ARROW, right.as_ref()))
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR)
}
