//! Row scoring and display ordering, a pure pass over already-fetched rows.

use rand::Rng;
use rand::seq::SliceRandom;

use board_types::models::SortMode;

/// A like outweighs the jitter by an order of magnitude, so score ordering
/// stays approximately grouped by like count while ties vary across calls.
const LIKE_WEIGHT: f64 = 0.1;
const OTHER_WEIGHT: f64 = 0.01;
const HIGHLIGHT_BONUS: f64 = 0.5;
const RANDOM_JITTER: f64 = 0.01;

/// Per-row inputs to the scoring pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowStats {
    pub likes: usize,
    pub understands: usize,
    pub curious: usize,
    pub highlighted: bool,
}

pub fn score<R: Rng + ?Sized>(stats: &RowStats, rng: &mut R) -> f64 {
    1.0 + stats.likes as f64 * LIKE_WEIGHT
        + (stats.understands + stats.curious) as f64 * OTHER_WEIGHT
        + if stats.highlighted { HIGHLIGHT_BONUS } else { 0.0 }
        + rng.random::<f64>() * RANDOM_JITTER
}

/// Compute the display order for rows given in insertion order. Returns
/// indices into `stats`.
pub fn display_order<R: Rng + ?Sized>(
    stats: &[RowStats],
    mode: SortMode,
    rng: &mut R,
) -> Vec<usize> {
    let mut order: Vec<usize> = (0..stats.len()).collect();
    match mode {
        SortMode::Score => {
            let scores: Vec<f64> = stats.iter().map(|s| score(s, &mut *rng)).collect();
            order.sort_by(|a, b| scores[*b].total_cmp(&scores[*a]));
        }
        SortMode::Newest => order.reverse(),
        SortMode::Oldest => {}
        SortMode::Likes => order.sort_by(|a, b| stats[*b].likes.cmp(&stats[*a].likes)),
        SortMode::Random => order.shuffle(rng),
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(likes: usize, understands: usize, curious: usize, highlighted: bool) -> RowStats {
        RowStats {
            likes,
            understands,
            curious,
            highlighted,
        }
    }

    #[test]
    fn insertion_order_modes() {
        let rows = vec![stats(0, 0, 0, false); 4];
        let mut rng = rand::rng();

        assert_eq!(display_order(&rows, SortMode::Oldest, &mut rng), vec![0, 1, 2, 3]);
        assert_eq!(display_order(&rows, SortMode::Newest, &mut rng), vec![3, 2, 1, 0]);
    }

    #[test]
    fn likes_mode_sorts_descending() {
        let rows = vec![stats(1, 0, 0, false), stats(5, 0, 0, false), stats(3, 0, 0, false)];
        let mut rng = rand::rng();
        assert_eq!(display_order(&rows, SortMode::Likes, &mut rng), vec![1, 2, 0]);
    }

    /// A one-like gap always dominates the jitter, so score ordering groups
    /// by like count even though exact ordering is not repeatable.
    #[test]
    fn score_mode_groups_by_likes() {
        let rows = vec![stats(0, 0, 0, false), stats(4, 0, 0, false), stats(2, 0, 0, false)];
        let mut rng = rand::rng();

        for _ in 0..50 {
            assert_eq!(display_order(&rows, SortMode::Score, &mut rng), vec![1, 2, 0]);
        }
    }

    #[test]
    fn highlight_outranks_small_reaction_counts() {
        let rows = vec![stats(2, 3, 3, false), stats(0, 0, 0, true)];
        let mut rng = rand::rng();
        assert_eq!(display_order(&rows, SortMode::Score, &mut rng), vec![1, 0]);
    }

    #[test]
    fn random_mode_is_a_permutation() {
        let rows = vec![stats(0, 0, 0, false); 10];
        let mut rng = rand::rng();

        let order = display_order(&rows, SortMode::Random, &mut rng);
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }
}
