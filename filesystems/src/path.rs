// Path handling shared by both backends.
// Volume paths accept either separator; runs collapse and outer
// separators are trimmed before segment-by-segment resolution.

/// Split a textual path into segments. Empty input yields no segments.
pub fn split_path(path: &str) -> Vec<String> {
    path.split(|c| c == '/' || c == '\\')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// ASCII case-insensitive name comparison. Unicode folding is out of
/// scope; on-disk names in the supported corpus are ASCII-cased.
pub fn names_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Decode UTF-16LE bytes, substituting the replacement character for
/// invalid units. An odd trailing byte is dropped.
pub fn decode_utf16le(raw: &[u8]) -> String {
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    decode_utf16_units(&units)
}

pub fn decode_utf16_units(units: &[u16]) -> String {
    char::decode_utf16(units.iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
