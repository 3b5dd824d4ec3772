//! Pairing of registered teams into matches.
//!
//! Pure functions over team IDs; the caller persists the result.

use crate::team::TeamId;
use rand::Rng;
use rand::seq::SliceRandom;

/// One elimination round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    pub pairs: Vec<(TeamId, TeamId)>,
    /// Team advancing without a match when the count is odd
    pub bye: Option<TeamId>,
}

/// Every unordered pair of teams, each exactly once.
///
/// # Arguments
///
/// * `teams` - Distinct team IDs
///
/// # Returns
///
/// * `n * (n - 1) / 2` pairs, in input order
pub fn round_robin(teams: &[TeamId]) -> Vec<(TeamId, TeamId)> {
    let mut pairs = Vec::with_capacity(teams.len() * teams.len().saturating_sub(1) / 2);
    for (i, &home) in teams.iter().enumerate() {
        for &away in &teams[i + 1..] {
            pairs.push((home, away));
        }
    }
    pairs
}

/// Shuffle the teams and pair neighbours. With an odd count the team left
/// at the end gets a bye.
pub fn elimination<R: Rng + ?Sized>(teams: &[TeamId], rng: &mut R) -> Bracket {
    let mut order = teams.to_vec();
    order.shuffle(rng);

    let bye = if order.len() % 2 == 1 { order.pop() } else { None };
    let pairs = order.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();

    Bracket { pairs, bye }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_round_robin_of_four_is_six_matches() {
        let pairs = round_robin(&[1, 2, 3, 4]);
        assert_eq!(pairs.len(), 6);
        assert!(pairs.contains(&(1, 4)));
        assert!(pairs.contains(&(3, 4)));
    }

    #[test]
    fn test_round_robin_degenerate_inputs() {
        assert!(round_robin(&[]).is_empty());
        assert!(round_robin(&[7]).is_empty());
    }

    #[test]
    fn test_elimination_of_four_has_no_bye() {
        let mut rng = StdRng::seed_from_u64(7);
        let bracket = elimination(&[1, 2, 3, 4], &mut rng);
        assert_eq!(bracket.pairs.len(), 2);
        assert_eq!(bracket.bye, None);

        let mut seen: Vec<TeamId> = bracket.pairs.iter().flat_map(|&(a, b)| [a, b]).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_elimination_of_three_gives_one_bye() {
        let mut rng = StdRng::seed_from_u64(11);
        let bracket = elimination(&[5, 6, 7], &mut rng);
        assert_eq!(bracket.pairs.len(), 1);
        let bye = bracket.bye.unwrap();
        let (a, b) = bracket.pairs[0];
        assert!(bye != a && bye != b);
    }

    #[test]
    fn test_same_seed_gives_same_bracket() {
        let teams = [10, 20, 30, 40, 50, 60];
        let first = elimination(&teams, &mut StdRng::seed_from_u64(3));
        let second = elimination(&teams, &mut StdRng::seed_from_u64(3));
        assert_eq!(first, second);
    }
}
