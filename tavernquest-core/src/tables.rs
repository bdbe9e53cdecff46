//! Lookup tables behind the battle math.
//!
//! Ability modifiers, proficiency, experience rewards and level
//! thresholds, challenge-rating hit dice, and the hit-point status
//! ladder all live here so the resolvers stay table-free.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ability modifier for a raw ability score.
///
/// Floor division, so 8 maps to -1 rather than 0.
pub fn ability_modifier(score: u8) -> i32 {
    (score as i32 - 10).div_euclid(2)
}

/// Proficiency bonus keyed by level or challenge rating.
///
/// Fractional challenge ratings land in the first bucket. The ladder is
/// deliberately open-ended at the top.
pub fn proficiency_bonus(rank: f64) -> i32 {
    match rank {
        r if r <= 4.0 => 2,
        r if r <= 8.0 => 3,
        r if r <= 12.0 => 4,
        r if r <= 16.0 => 5,
        r if r <= 20.0 => 6,
        r if r <= 24.0 => 7,
        r if r <= 28.0 => 8,
        _ => 9,
    }
}

/// Experience awarded for defeating an opponent of the given challenge
/// rating. Ratings outside the canonical breakpoints award nothing.
pub fn xp_reward(challenge: f64) -> u32 {
    match challenge {
        c if c == 0.125 => 25,
        c if c == 0.25 => 50,
        c if c == 0.5 => 100,
        c if c == 1.0 => 200,
        c if c == 2.0 => 450,
        c if c == 3.0 => 700,
        c if c == 5.0 => 1_800,
        c if c == 10.0 => 5_900,
        _ => 0,
    }
}

/// Hit dice `(count, sides)` for an opponent of the given challenge
/// rating, keyed by the same breakpoints as [`xp_reward`]. Unknown
/// ratings fall back to the minimal die.
pub fn hit_dice(challenge: f64) -> (u32, u32) {
    match challenge {
        c if c == 0.125 => (1, 8),
        c if c == 0.25 => (2, 8),
        c if c == 0.5 => (3, 8),
        c if c == 1.0 => (4, 10),
        c if c == 2.0 => (6, 10),
        c if c == 3.0 => (8, 10),
        c if c == 5.0 => (12, 10),
        c if c == 10.0 => (20, 12),
        _ => (1, 4),
    }
}

/// Cumulative experience required to reach each level, indexed by
/// level - 1.
pub const XP_THRESHOLDS: [u32; 20] = [
    0, 300, 900, 2_700, 6_500, 14_000, 23_000, 34_000, 48_000, 64_000, 85_000, 100_000, 120_000,
    140_000, 165_000, 195_000, 225_000, 265_000, 305_000, 355_000,
];

/// Highest level whose cumulative threshold the total meets.
pub fn level_for_xp(experience: u32) -> u8 {
    XP_THRESHOLDS
        .iter()
        .rposition(|&threshold| experience >= threshold)
        .map(|idx| (idx + 1) as u8)
        .unwrap_or(1)
}

/// Coarse health description for display, derived from the percentage
/// of starting hit points remaining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HpStatus {
    Unscathed,
    Healthy,
    Scratched,
    Bruised,
    Wounded,
    Injured,
    Bloodied,
    BadlyWounded,
    GrievouslyWounded,
    Defeated,
    Unknown,
}

impl HpStatus {
    /// Classify current hit points against the starting value.
    ///
    /// Zero or negative current HP is always `Defeated`; a session that
    /// somehow started at zero reports `Unknown` rather than dividing
    /// by it.
    pub fn from_hp(start_hp: i32, current_hp: i32) -> HpStatus {
        if start_hp <= 0 {
            return HpStatus::Unknown;
        }
        if current_hp <= 0 {
            return HpStatus::Defeated;
        }

        let percent = current_hp as f64 * 100.0 / start_hp as f64;
        match percent {
            p if p >= 100.0 => HpStatus::Unscathed,
            p if p >= 90.0 => HpStatus::Healthy,
            p if p >= 80.0 => HpStatus::Scratched,
            p if p >= 70.0 => HpStatus::Bruised,
            p if p >= 60.0 => HpStatus::Wounded,
            p if p >= 50.0 => HpStatus::Injured,
            p if p >= 40.0 => HpStatus::Bloodied,
            p if p >= 30.0 => HpStatus::BadlyWounded,
            _ => HpStatus::GrievouslyWounded,
        }
    }

    /// Display label, suitable for embedding in chat messages.
    pub fn label(&self) -> &'static str {
        match self {
            HpStatus::Unscathed => "unscathed",
            HpStatus::Healthy => "healthy",
            HpStatus::Scratched => "scratched",
            HpStatus::Bruised => "bruised",
            HpStatus::Wounded => "wounded",
            HpStatus::Injured => "injured",
            HpStatus::Bloodied => "bloodied",
            HpStatus::BadlyWounded => "badly wounded",
            HpStatus::GrievouslyWounded => "grievously wounded",
            HpStatus::Defeated => "defeated",
            HpStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Remaining hit points as a whole percentage, rounded to nearest.
pub fn hp_percent(start_hp: i32, current_hp: i32) -> i32 {
    if start_hp <= 0 {
        return 0;
    }
    let percent = current_hp.max(0) as f64 * 100.0 / start_hp as f64;
    percent.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier_midpoints() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(8), -1);
        assert_eq!(ability_modifier(20), 5);
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(30), 10);
    }

    #[test]
    fn test_ability_modifier_monotonic() {
        let mut last = ability_modifier(0);
        for score in 1..=30u8 {
            let current = ability_modifier(score);
            assert!(current >= last);
            last = current;
        }
    }

    #[test]
    fn test_proficiency_buckets() {
        assert_eq!(proficiency_bonus(0.125), 2);
        assert_eq!(proficiency_bonus(1.0), 2);
        assert_eq!(proficiency_bonus(4.0), 2);
        assert_eq!(proficiency_bonus(5.0), 3);
        assert_eq!(proficiency_bonus(12.0), 4);
        assert_eq!(proficiency_bonus(13.0), 5);
        assert_eq!(proficiency_bonus(20.0), 6);
        assert_eq!(proficiency_bonus(24.0), 7);
        assert_eq!(proficiency_bonus(28.0), 8);
        assert_eq!(proficiency_bonus(30.0), 9);
    }

    #[test]
    fn test_xp_reward_breakpoints() {
        assert_eq!(xp_reward(0.125), 25);
        assert_eq!(xp_reward(0.25), 50);
        assert_eq!(xp_reward(0.5), 100);
        assert_eq!(xp_reward(1.0), 200);
        assert_eq!(xp_reward(2.0), 450);
        assert_eq!(xp_reward(3.0), 700);
        assert_eq!(xp_reward(5.0), 1_800);
        assert_eq!(xp_reward(10.0), 5_900);
    }

    #[test]
    fn test_xp_reward_unknown_rating() {
        assert_eq!(xp_reward(4.0), 0);
        assert_eq!(xp_reward(0.0), 0);
        assert_eq!(xp_reward(30.0), 0);
    }

    #[test]
    fn test_hit_dice_breakpoints() {
        assert_eq!(hit_dice(0.125), (1, 8));
        assert_eq!(hit_dice(1.0), (4, 10));
        assert_eq!(hit_dice(10.0), (20, 12));
        assert_eq!(hit_dice(7.0), (1, 4));
    }

    #[test]
    fn test_level_for_xp() {
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(299), 1);
        assert_eq!(level_for_xp(300), 2);
        assert_eq!(level_for_xp(900), 3);
        assert_eq!(level_for_xp(6_500), 5);
        assert_eq!(level_for_xp(354_999), 19);
        assert_eq!(level_for_xp(355_000), 20);
        assert_eq!(level_for_xp(1_000_000), 20);
    }

    #[test]
    fn test_hp_status_ladder() {
        assert_eq!(HpStatus::from_hp(100, 100), HpStatus::Unscathed);
        assert_eq!(HpStatus::from_hp(100, 95), HpStatus::Healthy);
        assert_eq!(HpStatus::from_hp(100, 85), HpStatus::Scratched);
        assert_eq!(HpStatus::from_hp(100, 75), HpStatus::Bruised);
        assert_eq!(HpStatus::from_hp(100, 65), HpStatus::Wounded);
        assert_eq!(HpStatus::from_hp(100, 55), HpStatus::Injured);
        assert_eq!(HpStatus::from_hp(100, 45), HpStatus::Bloodied);
        assert_eq!(HpStatus::from_hp(100, 35), HpStatus::BadlyWounded);
        assert_eq!(HpStatus::from_hp(100, 5), HpStatus::GrievouslyWounded);
        assert_eq!(HpStatus::from_hp(100, 0), HpStatus::Defeated);
    }

    #[test]
    fn test_hp_status_edge_cases() {
        // Defeated wins over any percentage argument.
        assert_eq!(HpStatus::from_hp(100, -5), HpStatus::Defeated);
        // A zero starting pool cannot be classified.
        assert_eq!(HpStatus::from_hp(0, 10), HpStatus::Unknown);
        assert_eq!(HpStatus::from_hp(-1, -1), HpStatus::Unknown);
        // Overhealed combatants still read as unscathed.
        assert_eq!(HpStatus::from_hp(10, 12), HpStatus::Unscathed);
    }

    #[test]
    fn test_hp_status_exact_boundaries() {
        assert_eq!(HpStatus::from_hp(10, 9), HpStatus::Healthy);
        assert_eq!(HpStatus::from_hp(10, 4), HpStatus::Bloodied);
        assert_eq!(HpStatus::from_hp(10, 3), HpStatus::BadlyWounded);
        assert_eq!(HpStatus::from_hp(10, 2), HpStatus::GrievouslyWounded);
    }

    #[test]
    fn test_hp_percent_rounds() {
        assert_eq!(hp_percent(100, 100), 100);
        assert_eq!(hp_percent(3, 2), 67);
        assert_eq!(hp_percent(3, 1), 33);
        assert_eq!(hp_percent(100, -4), 0);
        assert_eq!(hp_percent(0, 10), 0);
    }
}
