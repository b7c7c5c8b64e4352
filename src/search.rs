use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lower-cased, accent-free form used for matching.
pub fn fold(value: &str) -> String {
    value
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Indices of `labels` that contain `query`, in their original order. A blank
/// query matches everything.
pub fn filter_indices<S: AsRef<str>>(labels: &[S], query: &str) -> Vec<usize> {
    let needle = fold(query.trim());
    labels
        .iter()
        .enumerate()
        .filter(|(_, label)| needle.is_empty() || fold(label.as_ref()).contains(&needle))
        .map(|(idx, _)| idx)
        .collect()
}
