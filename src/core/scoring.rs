//! Scoring module - the line-clear score table.
//!
//! Clearing 1-3 rows scores rows x 100. Clearing exactly 4 scores 800.
//! Wider boards can clear more than 4 rows at once; those clears score
//! floor(rows / 4) x 1200, the generalized bonus tier.

/// Points awarded for clearing `rows` rows in a single scan.
pub fn score_for_clear(rows: usize) -> u32 {
    match rows {
        0 => 0,
        1..=3 => rows as u32 * 100,
        4 => 800,
        _ => (rows as u32 / 4) * 1200,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_clears() {
        assert_eq!(score_for_clear(0), 0);
        assert_eq!(score_for_clear(1), 100);
        assert_eq!(score_for_clear(2), 200);
        assert_eq!(score_for_clear(3), 300);
    }

    #[test]
    fn test_four_row_bonus() {
        assert_eq!(score_for_clear(4), 800);
    }

    #[test]
    fn test_wide_board_bonus_tier() {
        assert_eq!(score_for_clear(5), 1200);
        assert_eq!(score_for_clear(7), 1200);
        assert_eq!(score_for_clear(8), 2400);
        assert_eq!(score_for_clear(12), 3600);
    }
}
