//! Context window builder

/// Number of prior turns forwarded to the model by default
pub const DEFAULT_CONTEXT_WINDOW: usize = 10;

/// Return the last `limit` entries of `history`, in their original order.
///
/// Histories no longer than `limit` are returned whole.
pub fn build_window<T>(history: &[T], limit: usize) -> &[T] {
    &history[history.len().saturating_sub(limit)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_history_is_identity() {
        let history = [1, 2, 3];
        assert_eq!(build_window(&history, 10), &history[..]);
        assert_eq!(build_window(&history, 3), &history[..]);
    }

    #[test]
    fn test_long_history_keeps_last_entries_in_order() {
        let history: Vec<u32> = (0..25).collect();
        let window = build_window(&history, 10);

        assert_eq!(window.len(), 10);
        assert_eq!(window, &(15..25).collect::<Vec<_>>()[..]);
    }

    #[test]
    fn test_empty_history() {
        let history: [u8; 0] = [];
        assert!(build_window(&history, DEFAULT_CONTEXT_WINDOW).is_empty());
    }

    #[test]
    fn test_zero_limit() {
        assert!(build_window(&[1, 2, 3], 0).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let history = ["a", "b", "c", "d"];
        assert_eq!(build_window(&history, 2), build_window(&history, 2));
        assert_eq!(build_window(&history, 2), &["c", "d"]);
    }
}
