//! Ordered sequences rebuilt from `(position, value)` pairs.
//!
//! Relational rows arrive in no particular order. Each row names its slot by
//! position, so a sequence is rebuilt by writing every value at its index and
//! padding unseen indices with `T::default()`.

/// Largest position accepted when rebuilding a sequence.
///
/// Rows beyond this bound are treated as stale, which keeps a single tampered
/// row from allocating an enormous placeholder run.
pub const MAX_POSITION: usize = 1 << 16;

/// Converts a stored position column into an index.
///
/// Returns `None` for negative positions and positions beyond `MAX_POSITION`.
pub fn to_position(raw: i64) -> Option<usize> {
    usize::try_from(raw).ok().filter(|pos| *pos <= MAX_POSITION)
}

/// Writes `value` at `pos`, growing `seq` with defaults when needed.
pub fn place<T: Default>(seq: &mut Vec<T>, pos: usize, value: T) {
    if pos >= seq.len() {
        seq.resize_with(pos + 1, T::default);
    }
    seq[pos] = value;
}

/// Rebuilds a sequence from unordered `(position, value)` pairs.
pub fn collect_positions<T: Default>(pairs: impl IntoIterator<Item = (usize, T)>) -> Vec<T> {
    let mut seq = Vec::new();
    for (pos, value) in pairs {
        place(&mut seq, pos, value);
    }
    seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_in_order() {
        let seq = collect_positions(vec![(0, "a"), (1, "b"), (2, "c")]);
        assert_eq!(seq, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_place_out_of_order() {
        let seq = collect_positions(vec![(2, "c"), (0, "a"), (1, "b")]);
        assert_eq!(seq, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_gaps_filled_with_default() {
        let seq = collect_positions(vec![(3, 7), (1, 5)]);
        assert_eq!(seq, vec![0, 5, 0, 7]);
    }

    #[test]
    fn test_place_overwrites_placeholder() {
        let mut seq: Vec<String> = Vec::new();
        place(&mut seq, 2, "late".to_string());
        place(&mut seq, 0, "first".to_string());
        assert_eq!(seq, vec!["first", "", "late"]);
    }

    #[test]
    fn test_to_position_bounds() {
        assert_eq!(to_position(0), Some(0));
        assert_eq!(to_position(42), Some(42));
        assert_eq!(to_position(-1), None);
        assert_eq!(to_position(MAX_POSITION as i64 + 1), None);
    }

    #[test]
    fn test_empty_input() {
        let seq: Vec<u8> = collect_positions(Vec::new());
        assert!(seq.is_empty());
    }
}
