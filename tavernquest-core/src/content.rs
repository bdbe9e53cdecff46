//! Game content: the provider port and a bundled sample catalog.
//!
//! The engine never reads content tables directly; it goes through
//! [`ContentProvider`] so the bot can back equipment and opponent pools
//! with whatever storage it likes. [`BundledContent`] serves the static
//! catalog below and is enough for tests, demos and small deployments.

use crate::combatant::{Armor, Attributes, ChallengeRating, Combatant, DamageSpec, Rank, Weapon};
use async_trait::async_trait;
use lazy_static::lazy_static;
use thiserror::Error;

/// Error type for content lookups.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Content backend failure: {0}")]
    Backend(String),
}

/// Source of equipment records and opponent pools.
///
/// Unknown ids resolve to `Ok(None)`; errors are reserved for backend
/// failures.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn resolve_weapon(&self, id: &str) -> Result<Option<Weapon>, ContentError>;
    async fn resolve_armor(&self, id: &str) -> Result<Option<Armor>, ContentError>;
    /// People-shaped opponents: bandits, cultists, soldiers.
    async fn humanoid_pool(&self) -> Result<Vec<Combatant>, ContentError>;
    /// Everything with more teeth than conversation.
    async fn bestiary_pool(&self) -> Result<Vec<Combatant>, ContentError>;
}

fn cr(value: f64) -> Rank {
    Rank::Challenge(ChallengeRating::new(value))
}

lazy_static! {
    /// Weapon catalog, player arsenal and natural weapons together.
    pub static ref WEAPONS: Vec<Weapon> = vec![
        Weapon::new("club", "Club", DamageSpec::new(1, 4, 0)).with_weight(2.0),
        Weapon::new("dagger", "Dagger", DamageSpec::new(1, 4, 0))
            .with_range((20, 60))
            .with_weight(1.0),
        Weapon::new("mace", "Mace", DamageSpec::new(1, 6, 0)).with_weight(4.0),
        Weapon::new("shortsword", "Shortsword", DamageSpec::new(1, 6, 0)).with_weight(2.0),
        Weapon::new("rusty-sword", "Rusty Sword", DamageSpec::new(1, 6, -1)).with_weight(3.0),
        Weapon::new("scimitar", "Scimitar", DamageSpec::new(1, 6, 0)).with_weight(3.0),
        Weapon::new("spear", "Spear", DamageSpec::new(1, 6, 0))
            .with_range((20, 60))
            .with_weight(3.0),
        Weapon::new("longsword", "Longsword", DamageSpec::new(1, 8, 0)).with_weight(3.0),
        Weapon::new("battleaxe", "Battleaxe", DamageSpec::new(1, 8, 0)).with_weight(4.0),
        Weapon::new("warhammer", "Warhammer", DamageSpec::new(1, 8, 0)).with_weight(2.0),
        Weapon::new("greatclub", "Greatclub", DamageSpec::new(1, 8, 0)).with_weight(10.0),
        Weapon::new("greataxe", "Greataxe", DamageSpec::new(1, 12, 0)).with_weight(7.0),
        Weapon::new("greatsword", "Greatsword", DamageSpec::new(2, 6, 0)).with_weight(6.0),
        Weapon::new("shortbow", "Shortbow", DamageSpec::new(1, 6, 0))
            .with_range((80, 320))
            .with_weight(2.0),
        Weapon::new("longbow", "Longbow", DamageSpec::new(1, 8, 0))
            .with_range((150, 600))
            .with_weight(2.0),
        // Natural weapons for the bestiary.
        Weapon::new("bite", "Bite", DamageSpec::new(1, 6, 0)),
        Weapon::new("claws", "Claws", DamageSpec::new(2, 4, 0)),
        Weapon::new("slam", "Slam", DamageSpec::new(1, 8, 0)),
        Weapon::new("gore", "Gore", DamageSpec::new(1, 10, 0)),
    ];

    /// Armor catalog.
    pub static ref ARMORS: Vec<Armor> = vec![
        Armor::new("padded", "Padded Armor", 11).with_weight(8.0),
        Armor::new("leather", "Leather Armor", 11).with_weight(10.0),
        Armor::new("studded-leather", "Studded Leather", 12).with_weight(13.0),
        Armor::new("hide", "Hide Armor", 12).with_weight(12.0),
        Armor::new("chain-shirt", "Chain Shirt", 13).with_weight(20.0),
        Armor::new("scale-mail", "Scale Mail", 14).with_weight(45.0),
        Armor::new("breastplate", "Breastplate", 14).with_weight(20.0),
        Armor::new("chain-mail", "Chain Mail", 16).with_weight(55.0),
        Armor::new("splint", "Splint Armor", 17).with_weight(60.0),
        Armor::new("plate", "Plate Armor", 18).with_weight(65.0),
    ];

    /// Humanoid opponent pool. Hit points here are placeholders; the
    /// encounter generator rolls real values from the challenge rating.
    pub static ref HUMANOIDS: Vec<Combatant> = vec![
        Combatant::new("bandit", "Bandit", cr(0.125))
            .with_attributes(Attributes::new(11, 12, 12, 10, 10, 10))
            .with_weapon("scimitar")
            .with_armor("leather"),
        Combatant::new("cultist", "Cultist", cr(0.125))
            .with_attributes(Attributes::new(11, 12, 10, 10, 11, 10))
            .with_weapon("dagger")
            .with_armor("leather"),
        Combatant::new("goblin", "Goblin", cr(0.25))
            .with_attributes(Attributes::new(8, 14, 10, 10, 8, 8))
            .with_weapon("scimitar")
            .with_armor("hide"),
        Combatant::new("thug", "Thug", cr(0.5))
            .with_attributes(Attributes::new(15, 11, 14, 10, 10, 11))
            .with_weapon("mace")
            .with_armor("studded-leather"),
        Combatant::new("hobgoblin", "Hobgoblin", cr(0.5))
            .with_attributes(Attributes::new(13, 12, 12, 10, 10, 9))
            .with_weapon("longsword")
            .with_armor("chain-mail"),
        Combatant::new("berserker", "Berserker", cr(2.0))
            .with_attributes(Attributes::new(16, 12, 17, 9, 11, 9))
            .with_weapon("greataxe")
            .with_armor("hide"),
        Combatant::new("veteran", "Veteran", cr(3.0))
            .with_attributes(Attributes::new(16, 13, 14, 10, 11, 10))
            .with_weapon("longsword")
            .with_armor("splint"),
        Combatant::new("gladiator", "Gladiator", cr(5.0))
            .with_attributes(Attributes::new(18, 15, 16, 10, 12, 15))
            .with_weapon("spear")
            .with_armor("studded-leather"),
    ];

    /// Beast and monster pool.
    pub static ref BESTIARY: Vec<Combatant> = vec![
        Combatant::new("giant-rat", "Giant Rat", cr(0.125))
            .with_attributes(Attributes::new(7, 15, 11, 2, 10, 4))
            .with_weapon("bite"),
        Combatant::new("wolf", "Wolf", cr(0.25))
            .with_attributes(Attributes::new(12, 15, 12, 3, 12, 6))
            .with_weapon("bite"),
        Combatant::new("boar", "Boar", cr(0.25))
            .with_attributes(Attributes::new(13, 11, 12, 2, 9, 5))
            .with_weapon("gore"),
        Combatant::new("black-bear", "Black Bear", cr(0.5))
            .with_attributes(Attributes::new(15, 10, 14, 2, 12, 7))
            .with_weapon("claws"),
        Combatant::new("dire-wolf", "Dire Wolf", cr(1.0))
            .with_attributes(Attributes::new(17, 15, 15, 3, 12, 7))
            .with_weapon("bite"),
        Combatant::new("brown-bear", "Brown Bear", cr(1.0))
            .with_attributes(Attributes::new(19, 10, 16, 2, 13, 7))
            .with_weapon("claws"),
        Combatant::new("ogre", "Ogre", cr(2.0))
            .with_attributes(Attributes::new(19, 8, 16, 5, 7, 7))
            .with_weapon("greatclub")
            .with_armor("hide"),
        Combatant::new("owlbear", "Owlbear", cr(3.0))
            .with_attributes(Attributes::new(20, 12, 17, 3, 12, 7))
            .with_weapon("claws"),
        Combatant::new("troll", "Troll", cr(5.0))
            .with_attributes(Attributes::new(18, 13, 20, 7, 9, 7))
            .with_weapon("claws"),
        Combatant::new("young-dragon", "Young Dragon", cr(10.0))
            .with_attributes(Attributes::new(22, 10, 19, 14, 11, 17))
            .with_weapon("bite")
            .with_armor("scale-mail"),
    ];
}

/// Look up a catalog weapon by id (case-insensitive).
pub fn get_weapon(id: &str) -> Option<Weapon> {
    WEAPONS
        .iter()
        .find(|w| w.id.eq_ignore_ascii_case(id))
        .cloned()
}

/// Look up catalog armor by id (case-insensitive).
pub fn get_armor(id: &str) -> Option<Armor> {
    ARMORS
        .iter()
        .find(|a| a.id.eq_ignore_ascii_case(id))
        .cloned()
}

/// Content provider backed by the bundled catalog above.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledContent;

impl BundledContent {
    pub fn new() -> Self {
        BundledContent
    }
}

#[async_trait]
impl ContentProvider for BundledContent {
    async fn resolve_weapon(&self, id: &str) -> Result<Option<Weapon>, ContentError> {
        Ok(get_weapon(id))
    }

    async fn resolve_armor(&self, id: &str) -> Result<Option<Armor>, ContentError> {
        Ok(get_armor(id))
    }

    async fn humanoid_pool(&self) -> Result<Vec<Combatant>, ContentError> {
        Ok(HUMANOIDS.clone())
    }

    async fn bestiary_pool(&self) -> Result<Vec<Combatant>, ContentError> {
        Ok(BESTIARY.clone())
    }
}
