/// Convert a DOM offset (UTF-16 code units) into a char index of `s`.
///
/// Offsets landing inside a surrogate pair round down to the pair's start.
pub(crate) fn utf16_to_char_idx(s: &str, pos_utf16: u32) -> usize {
    if pos_utf16 == 0 {
        return 0;
    }
    let mut acc: u32 = 0;
    for (i, ch) in s.chars().enumerate() {
        let w = ch.len_utf16() as u32;
        if acc + w > pos_utf16 {
            return i;
        }
        acc += w;
        if acc == pos_utf16 {
            return i + 1;
        }
    }
    s.chars().count()
}

pub(crate) fn char_idx_to_utf16(s: &str, char_idx: usize) -> u32 {
    s.chars().take(char_idx).map(|c| c.len_utf16() as u32).sum()
}

pub(crate) fn char_idx_to_byte_idx(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
