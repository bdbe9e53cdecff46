//! Dice rolling for battle resolution.
//!
//! Every random number in the engine flows through here so tests can
//! substitute a seeded RNG for the thread-local one.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Largest allowed die size; each face value is carried as an `i32`.
pub const MAX_SIDES: u32 = i32::MAX as u32;

/// Error type for dice rolls.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Dice count must be at least 1")]
    ZeroCount,
    #[error("Dice must have at least 1 side")]
    ZeroSides,
    #[error("Dice cannot have more than {max} sides", max = MAX_SIDES)]
    SidesTooLarge,
}

/// The result of rolling one or more dice of the same size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    /// Sum of all individual dice.
    pub total: i32,
    /// Each die in the order it was rolled.
    pub rolls: Vec<i32>,
}

impl fmt::Display for DiceRoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.rolls.iter().map(|r| r.to_string()).collect();
        write!(f, "[{}] = {}", parts.join(", "), self.total)
    }
}

/// Roll `count` dice with `sides` faces using the thread-local RNG.
pub fn roll_detailed(count: u32, sides: u32) -> Result<DiceRoll, DiceError> {
    roll_detailed_with(&mut rand::thread_rng(), count, sides)
}

/// Roll with a specific RNG (useful for testing).
///
/// Both parameters must be at least 1 and `sides` at most
/// [`MAX_SIDES`]; invalid input fails fast rather than being clamped.
/// Each die is drawn uniformly from `1..=sides`.
pub fn roll_detailed_with<R: Rng>(
    rng: &mut R,
    count: u32,
    sides: u32,
) -> Result<DiceRoll, DiceError> {
    if count == 0 {
        return Err(DiceError::ZeroCount);
    }
    if sides == 0 {
        return Err(DiceError::ZeroSides);
    }
    if sides > MAX_SIDES {
        return Err(DiceError::SidesTooLarge);
    }

    let rolls: Vec<i32> = (0..count)
        .map(|_| rng.gen_range(1..=sides) as i32)
        .collect();
    let total = rolls.iter().sum();

    Ok(DiceRoll { total, rolls })
}

/// Roll and return only the summed total.
pub fn roll_sum(count: u32, sides: u32) -> Result<i32, DiceError> {
    roll_sum_with(&mut rand::thread_rng(), count, sides)
}

/// Summed roll with a specific RNG.
pub fn roll_sum_with<R: Rng>(rng: &mut R, count: u32, sides: u32) -> Result<i32, DiceError> {
    Ok(roll_detailed_with(rng, count, sides)?.total)
}

/// Roll the single d20 used for attack checks.
pub fn roll_d20() -> i32 {
    roll_d20_with(&mut rand::thread_rng())
}

/// Attack die with a specific RNG.
pub fn roll_d20_with<R: Rng>(rng: &mut R) -> i32 {
    rng.gen_range(1..=20)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_roll_range() {
        for _ in 0..100 {
            let result = roll_detailed(2, 6).unwrap();
            assert!(result.total >= 2 && result.total <= 12);
            assert_eq!(result.rolls.len(), 2);
            for die in &result.rolls {
                assert!((1..=6).contains(die));
            }
        }
    }

    #[test]
    fn test_roll_sum_range() {
        for _ in 0..100 {
            let total = roll_sum(3, 8).unwrap();
            assert!((3..=24).contains(&total));
        }
    }

    #[test]
    fn test_single_sided_die() {
        // A one-sided die always rolls 1, which keeps improvised
        // "flat damage" weapons representable.
        let result = roll_detailed(4, 1).unwrap();
        assert_eq!(result.total, 4);
        assert_eq!(result.rolls, vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_zero_count_rejected() {
        let result = roll_detailed(0, 6);
        assert!(matches!(result, Err(DiceError::ZeroCount)));
    }

    #[test]
    fn test_zero_sides_rejected() {
        let result = roll_sum(1, 0);
        assert!(matches!(result, Err(DiceError::ZeroSides)));
    }

    #[test]
    fn test_oversized_sides_rejected() {
        let result = roll_detailed(1, MAX_SIDES + 1);
        assert!(matches!(result, Err(DiceError::SidesTooLarge)));
    }

    #[test]
    fn test_largest_die_rolls_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = roll_detailed_with(&mut rng, 1, MAX_SIDES).unwrap();
        assert_eq!(result.rolls.len(), 1);
        assert!(result.total >= 1);
    }

    #[test]
    fn test_seeded_rolls_are_deterministic() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let first = roll_detailed_with(&mut a, 6, 10).unwrap();
        let second = roll_detailed_with(&mut b, 6, 10).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_d20_range() {
        for _ in 0..100 {
            let roll = roll_d20();
            assert!((1..=20).contains(&roll));
        }
    }

    #[test]
    fn test_roll_totals_match_parts() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let result = roll_detailed_with(&mut rng, 5, 12).unwrap();
            assert_eq!(result.total, result.rolls.iter().sum::<i32>());
        }
    }
}
