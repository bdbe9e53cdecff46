//! Combatant data model shared by players and generated opponents.

use crate::tables;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Armor class used when a combatant has no armor equipped.
pub const DEFAULT_ARMOR_CLASS: i32 = 10;

/// Chat-platform user id. Keys the session registry and the combatant
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(id: u64) -> Self {
        PlayerId(id)
    }
}

/// Unique id for one battle session instance, mainly for log
/// correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub strength: u8,
    pub dexterity: u8,
    pub constitution: u8,
    pub intelligence: u8,
    pub wisdom: u8,
    pub charisma: u8,
}

impl Attributes {
    pub fn new(
        strength: u8,
        dexterity: u8,
        constitution: u8,
        intelligence: u8,
        wisdom: u8,
        charisma: u8,
    ) -> Self {
        Attributes {
            strength,
            dexterity,
            constitution,
            intelligence,
            wisdom,
            charisma,
        }
    }

    /// Modifier for the score attacks and damage are keyed by.
    pub fn strength_modifier(&self) -> i32 {
        tables::ability_modifier(self.strength)
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes::new(10, 10, 10, 10, 10, 10)
    }
}

/// Opponent difficulty rating. Non-negative, usually one of the
/// canonical fractional or whole breakpoints (1/8, 1/4, 1/2, 1, 2...).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeRating(f64);

impl ChallengeRating {
    /// Build a rating, clamping negative input to zero.
    pub fn new(value: f64) -> Self {
        ChallengeRating(value.max(0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for ChallengeRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0.125 {
            write!(f, "1/8")
        } else if self.0 == 0.25 {
            write!(f, "1/4")
        } else if self.0 == 0.5 {
            write!(f, "1/2")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Where a combatant sits on the power curve: players carry a level,
/// opponents carry a challenge rating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Rank {
    Level(u8),
    Challenge(ChallengeRating),
}

impl Rank {
    /// Numeric value fed to the proficiency table.
    pub fn table_value(&self) -> f64 {
        match self {
            Rank::Level(level) => *level as f64,
            Rank::Challenge(cr) => cr.value(),
        }
    }

    pub fn proficiency_bonus(&self) -> i32 {
        tables::proficiency_bonus(self.table_value())
    }

    pub fn level(&self) -> Option<u8> {
        match self {
            Rank::Level(level) => Some(*level),
            Rank::Challenge(_) => None,
        }
    }

    pub fn challenge(&self) -> Option<ChallengeRating> {
        match self {
            Rank::Level(_) => None,
            Rank::Challenge(cr) => Some(*cr),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rank::Level(level) => write!(f, "level {}", level),
            Rank::Challenge(cr) => write!(f, "CR {}", cr),
        }
    }
}

/// Weapon damage expression: count, die size and a flat modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageSpec {
    pub dice_count: u32,
    pub dice_value: u32,
    pub modifier: i32,
}

impl DamageSpec {
    pub const fn new(dice_count: u32, dice_value: u32, modifier: i32) -> Self {
        DamageSpec {
            dice_count,
            dice_value,
            modifier,
        }
    }

    /// Lowest possible expression value.
    pub fn min(&self) -> i32 {
        self.dice_count as i32 + self.modifier
    }

    /// Highest possible expression value.
    pub fn max(&self) -> i32 {
        (self.dice_count * self.dice_value) as i32 + self.modifier
    }
}

impl fmt::Display for DamageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.dice_count, self.dice_value)?;
        if self.modifier > 0 {
            write!(f, "+{}", self.modifier)?;
        } else if self.modifier < 0 {
            write!(f, "{}", self.modifier)?;
        }
        Ok(())
    }
}

/// A weapon record resolved from the content catalog.
///
/// Range and weight are carried through for display; the battle math
/// only reads the damage expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weapon {
    pub id: String,
    pub name: String,
    pub damage: DamageSpec,
    pub range: Option<(u32, u32)>,
    pub weight: f32,
}

impl Weapon {
    pub fn new(id: impl Into<String>, name: impl Into<String>, damage: DamageSpec) -> Self {
        Weapon {
            id: id.into(),
            name: name.into(),
            damage,
            range: None,
            weight: 0.0,
        }
    }

    pub fn with_range(mut self, range: (u32, u32)) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Fallback used when a combatant swings without a usable weapon,
    /// either because it owns none or because it fumbled for one it
    /// does not own.
    pub fn improvised() -> Self {
        Weapon::new("improvised", "Bare Hands", DamageSpec::new(1, 4, 0))
    }
}

/// An armor record resolved from the content catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Armor {
    pub id: String,
    pub name: String,
    pub armor_class: i32,
    pub weight: f32,
}

impl Armor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, armor_class: i32) -> Self {
        Armor {
            id: id.into(),
            name: name.into(),
            armor_class,
            weight: 0.0,
        }
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }
}

/// A player or opponent record.
///
/// Hit points are current values and never drop below zero; damage
/// application clamps before writing back. Equipment is carried as item
/// ids and resolved through the content provider when a session is
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
    pub hitpoints: i32,
    pub rank: Rank,
    pub experience: u32,
    pub weapons: Vec<String>,
    pub armor: Vec<String>,
}

impl Combatant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rank: Rank) -> Self {
        Combatant {
            id: id.into(),
            name: name.into(),
            attributes: Attributes::default(),
            hitpoints: 1,
            rank,
            experience: 0,
            weapons: Vec::new(),
            armor: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_hitpoints(mut self, hitpoints: i32) -> Self {
        self.hitpoints = hitpoints.max(0);
        self
    }

    pub fn with_experience(mut self, experience: u32) -> Self {
        self.experience = experience;
        self
    }

    pub fn with_weapon(mut self, id: impl Into<String>) -> Self {
        self.weapons.push(id.into());
        self
    }

    pub fn with_armor(mut self, id: impl Into<String>) -> Self {
        self.armor.push(id.into());
        self
    }

    pub fn is_defeated(&self) -> bool {
        self.hitpoints <= 0
    }

    /// True when the record owns the given weapon id
    /// (case-insensitive).
    pub fn owns_weapon(&self, id: &str) -> bool {
        self.weapons.iter().any(|w| w.eq_ignore_ascii_case(id))
    }
}
