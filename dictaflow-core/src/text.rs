const NBSP: char = '\u{00A0}';
const MAX_CONSECUTIVE_NEWLINES: usize = 2;

/// Canonical comparable form of composer text.
///
/// Steps run in a fixed order: NBSP to space, drop carriage returns, drop
/// horizontal whitespace before each newline, collapse newline runs to two,
/// trim. `None` normalizes to an empty string.
pub fn normalize(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };

    let flattened: String = raw
        .chars()
        .filter(|ch| *ch != '\r')
        .map(|ch| if ch == NBSP { ' ' } else { ch })
        .collect();

    let mut lines = flattened.split('\n').peekable();
    let mut stripped = String::with_capacity(flattened.len());
    while let Some(line) = lines.next() {
        if lines.peek().is_some() {
            stripped.push_str(line.trim_end_matches([' ', '\t']));
            stripped.push('\n');
        } else {
            stripped.push_str(line);
        }
    }

    collapse_newlines(&stripped).trim().to_string()
}

pub fn normalize_str(raw: &str) -> String {
    normalize(Some(raw))
}

/// True when the text holds nothing but newlines and whitespace once
/// normalized. Editors often leave a lone blank paragraph after a clear.
pub fn is_blank_text(raw: Option<&str>) -> bool {
    normalize(raw).replace('\n', "").trim().is_empty()
}

fn collapse_newlines(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut run = 0_usize;
    for ch in text.chars() {
        if ch == '\n' {
            run += 1;
            if run > MAX_CONSECUTIVE_NEWLINES {
                continue;
            }
        } else {
            run = 0;
        }
        collapsed.push(ch);
    }
    collapsed
}
