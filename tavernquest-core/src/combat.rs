//! Attack and damage resolution.
//!
//! Pure battle math: the state machine decides who swings at whom and
//! what to do with the result. RNG comes in as a parameter, nothing
//! here touches session or storage state.

use crate::combatant::{Combatant, Weapon};
use crate::dice::{self, DiceError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four mutually exclusive outcomes of an attack check.
///
/// External renderers key their flavor-text templates by this value;
/// the engine keys nothing else off it than the damage rules below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackOutcome {
    CriticalHit,
    Hit,
    Miss,
    CriticalMiss,
}

impl AttackOutcome {
    /// True when the swing connects and damage applies.
    pub fn is_hit(&self) -> bool {
        matches!(self, AttackOutcome::CriticalHit | AttackOutcome::Hit)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttackOutcome::CriticalHit => "critical hit",
            AttackOutcome::Hit => "hit",
            AttackOutcome::Miss => "miss",
            AttackOutcome::CriticalMiss => "critical miss",
        }
    }
}

impl fmt::Display for AttackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A resolved attack check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRoll {
    /// The raw d20.
    pub natural: i32,
    pub ability_modifier: i32,
    pub proficiency_modifier: i32,
    /// Natural roll plus both modifiers.
    pub total: i32,
    pub target_armor_class: i32,
    pub outcome: AttackOutcome,
}

/// Classify a natural d20 and its modified total against armor class.
///
/// Natural extremes win over the total comparison: a 20 crits even
/// when the total falls short, a 1 fumbles even when it would have met
/// the armor class.
pub fn classify_attack(natural: i32, total: i32, armor_class: i32) -> AttackOutcome {
    if natural == 20 {
        AttackOutcome::CriticalHit
    } else if natural == 1 {
        AttackOutcome::CriticalMiss
    } else if total >= armor_class {
        AttackOutcome::Hit
    } else {
        AttackOutcome::Miss
    }
}

/// Roll an attack check for `attacker` against a defender's armor
/// class. Attacks key off strength for every combatant.
pub fn resolve_attack_with<R: Rng>(
    rng: &mut R,
    attacker: &Combatant,
    armor_class: i32,
) -> AttackRoll {
    let natural = dice::roll_d20_with(rng);
    let ability_modifier = attacker.attributes.strength_modifier();
    let proficiency_modifier = attacker.rank.proficiency_bonus();
    let total = natural + ability_modifier + proficiency_modifier;
    let outcome = classify_attack(natural, total, armor_class);

    AttackRoll {
        natural,
        ability_modifier,
        proficiency_modifier,
        total,
        target_armor_class: armor_class,
        outcome,
    }
}

/// A resolved damage application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReport {
    /// Individual dice of the base roll.
    pub rolls: Vec<i32>,
    /// Base weapon expression value.
    pub damage: i32,
    /// Second, independent roll of the same expression. Only lands on
    /// a critical hit but is always rolled.
    pub critical_roll: i32,
    pub ability_modifier: i32,
    /// Damage actually applied, after the zero floor.
    pub total: i32,
    pub hp_before: i32,
    pub hp_after: i32,
}

/// Roll weapon damage for a classified outcome and apply it to `hp`.
///
/// Both instances of the weapon expression are rolled on every
/// invocation so RNG consumption never depends on the outcome; the
/// second instance only counts on a critical hit. Total damage is
/// floored at zero (a negative strength modifier cannot heal) and the
/// defender's hit points are clamped at zero.
pub fn resolve_damage_with<R: Rng>(
    rng: &mut R,
    outcome: AttackOutcome,
    weapon: &Weapon,
    ability_modifier: i32,
    hp: i32,
) -> Result<DamageReport, DiceError> {
    let spec = weapon.damage;
    let base = dice::roll_detailed_with(rng, spec.dice_count, spec.dice_value)?;
    let crit = dice::roll_detailed_with(rng, spec.dice_count, spec.dice_value)?;
    let damage = base.total + spec.modifier;
    let critical_roll = crit.total + spec.modifier;

    let raw_total = match outcome {
        AttackOutcome::CriticalHit => damage + critical_roll + ability_modifier,
        AttackOutcome::Hit => damage + ability_modifier,
        AttackOutcome::Miss | AttackOutcome::CriticalMiss => 0,
    };
    let total = raw_total.max(0);
    let hp_after = (hp - total).max(0);

    Ok(DamageReport {
        rolls: base.rolls,
        damage,
        critical_roll,
        ability_modifier,
        total,
        hp_before: hp,
        hp_after,
    })
}
