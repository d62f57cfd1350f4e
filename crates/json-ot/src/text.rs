//! Char-indexed string helpers. All string offsets in the crate count Unicode
//! scalar values, not bytes.

pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the char at `index`; `index == char_len(s)` maps to `s.len()`.
pub(crate) fn byte_offset(s: &str, index: usize) -> Option<usize> {
    if index == 0 {
        return Some(0);
    }
    s.char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(s.len()))
        .nth(index)
}

/// Chars `[start, end)` of `s`, clamped to its length.
pub(crate) fn slice(s: &str, start: usize, end: usize) -> String {
    s.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

pub(crate) fn slice_from(s: &str, start: usize) -> String {
    s.chars().skip(start).collect()
}

/// `s` with `insert` placed before char `index`.
pub(crate) fn splice_in(s: &str, index: usize, insert: &str) -> String {
    let mut out: String = s.chars().take(index).collect();
    out.push_str(insert);
    out.extend(s.chars().skip(index));
    out
}

/// `s` without chars `[start, end)`.
pub(crate) fn cut(s: &str, start: usize, end: usize) -> String {
    s.chars()
        .enumerate()
        .filter(|(i, _)| *i < start || *i >= end)
        .map(|(_, ch)| ch)
        .collect()
}
