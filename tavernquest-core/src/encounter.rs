//! Random opponent selection.
//!
//! The generator draws an opponent from the humanoid or bestiary pool
//! with challenge-rating-weighted roulette, then rolls its hit points
//! from the rating's hit dice. All randomness comes in through `Rng`
//! parameters so selection is testable with a seeded generator.

use crate::combatant::Combatant;
use crate::content::{ContentError, ContentProvider};
use crate::dice::{self, DiceError};
use crate::tables;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Error type for encounter generation.
#[derive(Debug, Error)]
pub enum EncounterError {
    #[error("No opponents available in any content pool")]
    NoContentAvailable,
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    #[error("Dice error: {0}")]
    Dice(#[from] DiceError),
}

/// How challenge ratings skew opponent selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CrWeightMode {
    /// Favor weak opponents: weight `1 / max(cr, 0.01)`.
    LowCr,
    /// Favor strong opponents: weight `max(cr, 0.01)`.
    HighCr,
    /// Every entry weighs the same.
    #[default]
    Balanced,
}

/// Which content pool opponents come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PoolPreference {
    Humanoids,
    Bestiary,
    /// Coin-flip between the pools, falling back to whichever has
    /// entries.
    #[default]
    Any,
}

/// Both opponent pools, fetched once per generation.
#[derive(Debug, Clone, Default)]
pub struct PoolSet {
    pub humanoids: Vec<Combatant>,
    pub bestiary: Vec<Combatant>,
}

impl PoolSet {
    pub fn is_empty(&self) -> bool {
        self.humanoids.is_empty() && self.bestiary.is_empty()
    }
}

/// Picks opponents for new encounters.
pub struct EncounterGenerator {
    content: Arc<dyn ContentProvider>,
    weight_mode: CrWeightMode,
    pool_preference: PoolPreference,
}

impl EncounterGenerator {
    pub fn new(content: Arc<dyn ContentProvider>) -> Self {
        EncounterGenerator {
            content,
            weight_mode: CrWeightMode::default(),
            pool_preference: PoolPreference::default(),
        }
    }

    pub fn with_weight_mode(mut self, mode: CrWeightMode) -> Self {
        self.weight_mode = mode;
        self
    }

    pub fn with_pool_preference(mut self, preference: PoolPreference) -> Self {
        self.pool_preference = preference;
        self
    }

    /// Fetch both pools from the content provider.
    pub async fn load_pools(&self) -> Result<PoolSet, EncounterError> {
        Ok(PoolSet {
            humanoids: self.content.humanoid_pool().await?,
            bestiary: self.content.bestiary_pool().await?,
        })
    }

    /// Draw one opponent from the loaded pools.
    ///
    /// A preferred-but-empty pool falls back to the other; only two
    /// empty pools refuse the encounter.
    pub fn pick_with<R: Rng>(
        &self,
        rng: &mut R,
        pools: &PoolSet,
    ) -> Result<Combatant, EncounterError> {
        let pool = self.choose_pool(rng, pools)?;
        let picked = select_weighted(rng, pool, self.weight_mode);
        tracing::debug!(
            opponent = %picked.name,
            mode = ?self.weight_mode,
            "selected encounter opponent"
        );
        Ok(picked)
    }

    /// Full generation: pick an opponent and roll its hit points.
    pub async fn generate_with<R: Rng>(&self, rng: &mut R) -> Result<Combatant, EncounterError> {
        let pools = self.load_pools().await?;
        let mut opponent = self.pick_with(rng, &pools)?;
        opponent.hitpoints = roll_hitpoints_with(rng, &opponent)?;
        Ok(opponent)
    }

    fn choose_pool<'a, R: Rng>(
        &self,
        rng: &mut R,
        pools: &'a PoolSet,
    ) -> Result<&'a [Combatant], EncounterError> {
        if pools.is_empty() {
            return Err(EncounterError::NoContentAvailable);
        }

        let pool = match self.pool_preference {
            PoolPreference::Humanoids => {
                if pools.humanoids.is_empty() {
                    &pools.bestiary
                } else {
                    &pools.humanoids
                }
            }
            PoolPreference::Bestiary => {
                if pools.bestiary.is_empty() {
                    &pools.humanoids
                } else {
                    &pools.bestiary
                }
            }
            PoolPreference::Any => {
                if pools.humanoids.is_empty() {
                    &pools.bestiary
                } else if pools.bestiary.is_empty() {
                    &pools.humanoids
                } else if rng.gen_bool(0.5) {
                    &pools.humanoids
                } else {
                    &pools.bestiary
                }
            }
        };

        Ok(pool)
    }
}

/// Roll starting hit points from the opponent's challenge-rating hit
/// dice. Level-ranked entries roll as if they were rating 1.
pub fn roll_hitpoints_with<R: Rng>(rng: &mut R, opponent: &Combatant) -> Result<i32, DiceError> {
    let rating = opponent
        .rank
        .challenge()
        .map(|c| c.value())
        .unwrap_or(1.0);
    let (count, sides) = tables::hit_dice(rating);
    dice::roll_sum_with(rng, count, sides)
}

fn selection_weight(mode: CrWeightMode, entry: &Combatant) -> f64 {
    let rating = entry.rank.challenge().map(|c| c.value()).unwrap_or(1.0);
    match mode {
        CrWeightMode::LowCr => 1.0 / rating.max(0.01),
        CrWeightMode::HighCr => rating.max(0.01),
        CrWeightMode::Balanced => 1.0,
    }
}

/// Cumulative-weight roulette over a non-empty pool.
fn select_weighted<R: Rng>(rng: &mut R, pool: &[Combatant], mode: CrWeightMode) -> Combatant {
    let weights: Vec<f64> = pool
        .iter()
        .map(|entry| selection_weight(mode, entry))
        .collect();
    let total: f64 = weights.iter().sum();

    if total > 0.0 {
        let roll = rng.gen_range(0.0..total);
        let mut cumulative = 0.0;
        for (entry, weight) in pool.iter().zip(&weights) {
            cumulative += weight;
            if cumulative >= roll {
                return entry.clone();
            }
        }
    }

    // Accumulated rounding can leave the walk just short of the roll;
    // fall back to a uniform pick.
    pool[rng.gen_range(0..pool.len())].clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{Armor, ChallengeRating, Rank, Weapon};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    struct FixedContent {
        humanoids: Vec<Combatant>,
        bestiary: Vec<Combatant>,
    }

    #[async_trait]
    impl ContentProvider for FixedContent {
        async fn resolve_weapon(&self, _id: &str) -> Result<Option<Weapon>, ContentError> {
            Ok(None)
        }

        async fn resolve_armor(&self, _id: &str) -> Result<Option<Armor>, ContentError> {
            Ok(None)
        }

        async fn humanoid_pool(&self) -> Result<Vec<Combatant>, ContentError> {
            Ok(self.humanoids.clone())
        }

        async fn bestiary_pool(&self) -> Result<Vec<Combatant>, ContentError> {
            Ok(self.bestiary.clone())
        }
    }

    fn rated(id: &str, rating: f64) -> Combatant {
        Combatant::new(id, id, Rank::Challenge(ChallengeRating::new(rating)))
    }

    fn count_picks(mode: CrWeightMode, trials: u32) -> HashMap<String, u32> {
        let generator = EncounterGenerator::new(Arc::new(FixedContent {
            humanoids: vec![rated("weak", 0.1), rated("strong", 10.0)],
            bestiary: Vec::new(),
        }))
        .with_weight_mode(mode)
        .with_pool_preference(PoolPreference::Humanoids);

        let pools = PoolSet {
            humanoids: vec![rated("weak", 0.1), rated("strong", 10.0)],
            bestiary: Vec::new(),
        };

        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts = HashMap::new();
        for _ in 0..trials {
            let picked = generator.pick_with(&mut rng, &pools).unwrap();
            *counts.entry(picked.id).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_high_cr_mode_prefers_strong_opponents() {
        let counts = count_picks(CrWeightMode::HighCr, 2000);
        let strong = counts.get("strong").copied().unwrap_or(0);
        let weak = counts.get("weak").copied().unwrap_or(0);
        assert!(
            strong > weak * 5,
            "expected strong to dominate, got strong={} weak={}",
            strong,
            weak
        );
    }

    #[test]
    fn test_low_cr_mode_prefers_weak_opponents() {
        let counts = count_picks(CrWeightMode::LowCr, 2000);
        let strong = counts.get("strong").copied().unwrap_or(0);
        let weak = counts.get("weak").copied().unwrap_or(0);
        assert!(weak > strong * 5);
    }

    #[test]
    fn test_balanced_mode_is_roughly_even() {
        let counts = count_picks(CrWeightMode::Balanced, 2000);
        let strong = counts.get("strong").copied().unwrap_or(0);
        let weak = counts.get("weak").copied().unwrap_or(0);
        assert!(strong > 700 && weak > 700);
    }

    #[tokio::test]
    async fn test_empty_pools_refuse_encounter() {
        let generator = EncounterGenerator::new(Arc::new(FixedContent {
            humanoids: Vec::new(),
            bestiary: Vec::new(),
        }));
        let mut rng = StdRng::seed_from_u64(1);
        let result = generator.generate_with(&mut rng).await;
        assert!(matches!(result, Err(EncounterError::NoContentAvailable)));
    }

    #[tokio::test]
    async fn test_preferred_pool_falls_back_when_empty() {
        let generator = EncounterGenerator::new(Arc::new(FixedContent {
            humanoids: Vec::new(),
            bestiary: vec![rated("wolf", 0.25)],
        }))
        .with_pool_preference(PoolPreference::Humanoids);

        let mut rng = StdRng::seed_from_u64(5);
        let opponent = generator.generate_with(&mut rng).await.unwrap();
        assert_eq!(opponent.id, "wolf");
    }

    #[tokio::test]
    async fn test_any_preference_draws_from_both_pools() {
        let generator = EncounterGenerator::new(Arc::new(FixedContent {
            humanoids: vec![rated("bandit", 0.125)],
            bestiary: vec![rated("rat", 0.125)],
        }));

        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = HashMap::new();
        for _ in 0..200 {
            let opponent = generator.generate_with(&mut rng).await.unwrap();
            *seen.entry(opponent.id).or_insert(0) += 1;
        }
        assert!(seen.contains_key("bandit"));
        assert!(seen.contains_key("rat"));
    }

    #[test]
    fn test_hitpoint_roll_ranges() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let hp = roll_hitpoints_with(&mut rng, &rated("rat", 0.125)).unwrap();
            assert!((1..=8).contains(&hp));

            let hp = roll_hitpoints_with(&mut rng, &rated("dragon", 10.0)).unwrap();
            assert!((20..=240).contains(&hp));

            // Off-table ratings land on the minimal die.
            let hp = roll_hitpoints_with(&mut rng, &rated("oddity", 7.0)).unwrap();
            assert!((1..=4).contains(&hp));
        }
    }

    #[test]
    fn test_level_ranked_entry_rolls_as_rating_one() {
        let mut rng = StdRng::seed_from_u64(4);
        let villager = Combatant::new("villager", "Villager", Rank::Level(2));
        for _ in 0..50 {
            let hp = roll_hitpoints_with(&mut rng, &villager).unwrap();
            assert!((4..=40).contains(&hp));
        }
    }

    #[tokio::test]
    async fn test_generated_opponent_has_rolled_hitpoints() {
        let generator = EncounterGenerator::new(Arc::new(FixedContent {
            humanoids: vec![rated("bandit", 0.125)],
            bestiary: Vec::new(),
        }));
        let mut rng = StdRng::seed_from_u64(9);
        let opponent = generator.generate_with(&mut rng).await.unwrap();
        assert!(opponent.hitpoints >= 1);
    }
}
