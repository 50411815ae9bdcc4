//! Baseline diffing for dictated text.
//!
//! Three tiers, tried in order: pure append, baseline found inside the final
//! text, then a common-prefix fallback. Not an edit distance.

use crate::text::normalize_str;

/// Text present in `final_text` that was not part of `baseline`.
pub fn compute_added_text(baseline: &str, final_text: &str) -> String {
    let baseline = normalize_str(baseline);
    let final_text = normalize_str(final_text);

    if final_text.is_empty() {
        return String::new();
    }
    if baseline.is_empty() {
        return final_text;
    }

    if let Some(rest) = final_text.strip_prefix(baseline.as_str()) {
        return rest.trim_start().to_string();
    }

    if let Some(index) = final_text.find(baseline.as_str()) {
        let before = final_text[..index].trim();
        let after = final_text[index + baseline.len()..].trim();
        return join_segments(before, after);
    }

    let prefix = common_prefix_char_count(&baseline, &final_text);
    suffix_from_char_index(&final_text, prefix)
        .trim_start()
        .to_string()
}

pub fn has_added_content(baseline: &str, final_text: &str) -> bool {
    !compute_added_text(baseline, final_text).is_empty()
}

fn join_segments(before: &str, after: &str) -> String {
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.to_string(),
        (_, true) => before.to_string(),
        _ => format!("{before} {after}"),
    }
}

fn common_prefix_char_count(left: &str, right: &str) -> usize {
    left.chars()
        .zip(right.chars())
        .take_while(|(l, r)| l == r)
        .count()
}

fn suffix_from_char_index(text: &str, char_index: usize) -> &str {
    match text.char_indices().nth(char_index) {
        Some((byte_index, _)) => &text[byte_index..],
        None => "",
    }
}
