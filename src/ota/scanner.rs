//! Delimiter search over a received window.

/// Index of the first `delimiter` at or after `start`, or `None`.
///
/// A `start` past the end of `buffer` is simply "not found".
pub fn find(buffer: &[u8], start: usize, delimiter: u8) -> Option<usize> {
    buffer
        .get(start..)?
        .iter()
        .position(|&b| b == delimiter)
        .map(|i| start + i)
}
