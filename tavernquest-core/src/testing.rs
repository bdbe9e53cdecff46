//! Testing utilities for the battle engine.
//!
//! This module provides tools for integration testing:
//! - `MemoryStore` and `FailingStore` for deterministic persistence
//! - `StaticContent` for scripted opponent pools and equipment
//! - `BattleHarness` for running battle scenarios end to end
//! - Assertion helpers for verifying session state

use crate::combatant::{Armor, Attributes, Combatant, PlayerId, Rank, Weapon};
use crate::content::{ContentError, ContentProvider};
use crate::engine::{BattleAction, BattleEngine, EngineConfig, EngineError, SessionResult};
use crate::persist::{CombatantStore, StoreError};
use crate::session::Step;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory combatant store.
///
/// Use this for tests that need a real save path without touching the
/// filesystem.
pub struct MemoryStore {
    records: RwLock<HashMap<PlayerId, Combatant>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a record while building the store.
    pub fn with_record(mut self, player: PlayerId, combatant: Combatant) -> Self {
        self.records.get_mut().insert(player, combatant);
        self
    }

    pub async fn insert(&self, player: PlayerId, combatant: Combatant) {
        self.records.write().await.insert(player, combatant);
    }

    /// Read a record back, bypassing the store trait.
    pub async fn get(&self, player: PlayerId) -> Option<Combatant> {
        self.records.read().await.get(&player).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

#[async_trait]
impl CombatantStore for MemoryStore {
    async fn load(&self, player: PlayerId) -> Result<Option<Combatant>, StoreError> {
        Ok(self.records.read().await.get(&player).cloned())
    }

    async fn save(&self, player: PlayerId, combatant: &Combatant) -> Result<(), StoreError> {
        self.records.write().await.insert(player, combatant.clone());
        Ok(())
    }
}

/// A store whose saves always fail.
///
/// Loads serve the seeded records, so battles run normally until the
/// first write. Use this to exercise the save-degradation path.
pub struct FailingStore {
    records: HashMap<PlayerId, Combatant>,
}

impl FailingStore {
    pub fn new() -> Self {
        FailingStore {
            records: HashMap::new(),
        }
    }

    pub fn with_record(mut self, player: PlayerId, combatant: Combatant) -> Self {
        self.records.insert(player, combatant);
        self
    }
}

impl Default for FailingStore {
    fn default() -> Self {
        FailingStore::new()
    }
}

#[async_trait]
impl CombatantStore for FailingStore {
    async fn load(&self, player: PlayerId) -> Result<Option<Combatant>, StoreError> {
        Ok(self.records.get(&player).cloned())
    }

    async fn save(&self, _player: PlayerId, _combatant: &Combatant) -> Result<(), StoreError> {
        Err(StoreError::Backend(
            "saves are disabled in this test store".to_string(),
        ))
    }
}

/// A content provider backed by plain vectors.
///
/// Build exactly the catalog a scenario needs; lookups are
/// case-insensitive like the bundled catalog's.
#[derive(Clone, Default)]
pub struct StaticContent {
    weapons: Vec<Weapon>,
    armors: Vec<Armor>,
    humanoids: Vec<Combatant>,
    bestiary: Vec<Combatant>,
}

impl StaticContent {
    pub fn new() -> Self {
        StaticContent::default()
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapons.push(weapon);
        self
    }

    pub fn with_armor(mut self, armor: Armor) -> Self {
        self.armors.push(armor);
        self
    }

    pub fn with_humanoid_entry(mut self, entry: Combatant) -> Self {
        self.humanoids.push(entry);
        self
    }

    pub fn with_bestiary_entry(mut self, entry: Combatant) -> Self {
        self.bestiary.push(entry);
        self
    }
}

#[async_trait]
impl ContentProvider for StaticContent {
    async fn resolve_weapon(&self, id: &str) -> Result<Option<Weapon>, ContentError> {
        Ok(self
            .weapons
            .iter()
            .find(|w| w.id.eq_ignore_ascii_case(id))
            .cloned())
    }

    async fn resolve_armor(&self, id: &str) -> Result<Option<Armor>, ContentError> {
        Ok(self
            .armors
            .iter()
            .find(|a| a.id.eq_ignore_ascii_case(id))
            .cloned())
    }

    async fn humanoid_pool(&self) -> Result<Vec<Combatant>, ContentError> {
        Ok(self.humanoids.clone())
    }

    async fn bestiary_pool(&self) -> Result<Vec<Combatant>, ContentError> {
        Ok(self.bestiary.clone())
    }
}

/// A level-one adventurer wired to bundled content ids.
pub fn sample_hero(name: impl Into<String>) -> Combatant {
    Combatant::new("hero", name, Rank::Level(1))
        .with_attributes(Attributes::new(15, 13, 14, 10, 12, 8))
        .with_hitpoints(12)
        .with_weapon("longsword")
        .with_weapon("dagger")
        .with_armor("leather")
}

/// Test harness for running battle scenarios against a seeded engine.
pub struct BattleHarness {
    pub engine: BattleEngine,
    pub player: PlayerId,
}

impl BattleHarness {
    /// Harness over the bundled catalog with a sample hero.
    pub fn new() -> Self {
        Self::with_hero(sample_hero("Test Hero"))
    }

    /// Harness over the bundled catalog with a custom hero.
    pub fn with_hero(hero: Combatant) -> Self {
        let store = MemoryStore::new().with_record(PlayerId(1), hero);
        let engine = BattleEngine::with_config(
            Arc::new(store),
            Arc::new(crate::content::BundledContent),
            EngineConfig::new().with_rng_seed(0xD1CE),
        );
        BattleHarness {
            engine,
            player: PlayerId(1),
        }
    }

    /// Harness over scripted store, content and config.
    pub fn with_parts(
        store: Arc<dyn CombatantStore>,
        content: Arc<dyn ContentProvider>,
        config: EngineConfig,
    ) -> Self {
        BattleHarness {
            engine: BattleEngine::with_config(store, content, config),
            player: PlayerId(1),
        }
    }

    pub async fn engage(&self) -> Result<SessionResult, EngineError> {
        self.engine
            .handle_action(self.player, BattleAction::Engage)
            .await
    }

    pub async fn attack(&self) -> Result<SessionResult, EngineError> {
        self.engine
            .handle_action(self.player, BattleAction::Attack)
            .await
    }

    pub async fn flee(&self) -> Result<SessionResult, EngineError> {
        self.engine
            .handle_action(self.player, BattleAction::Flee)
            .await
    }

    /// Fight one round with the given weapon id.
    pub async fn choose(&self, weapon: impl Into<String>) -> Result<SessionResult, EngineError> {
        self.engine
            .handle_action(self.player, BattleAction::Weapon(weapon.into()))
            .await
    }

    /// Commit to the fight and swing the same weapon until the battle
    /// ends. The round cap keeps a broken engine from spinning forever.
    pub async fn fight_until_over(
        &self,
        weapon: &str,
        max_rounds: u32,
    ) -> Result<SessionResult, EngineError> {
        let mut last = self.attack().await?;
        for _ in 0..max_rounds {
            if last.is_over() {
                break;
            }
            last = self.choose(weapon).await?;
        }
        Ok(last)
    }
}

impl Default for BattleHarness {
    fn default() -> Self {
        BattleHarness::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the action landed on the expected step.
#[track_caller]
pub fn assert_step(result: &SessionResult, step: Step) {
    assert_eq!(
        result.step, step,
        "Expected step {step}, got {}",
        result.step
    );
}

/// Assert the battle has reached a terminal step.
#[track_caller]
pub fn assert_over(result: &SessionResult) {
    assert!(
        result.is_over(),
        "Expected a finished battle, got step {}",
        result.step
    );
}

/// Assert the battle is still live.
#[track_caller]
pub fn assert_live(result: &SessionResult) {
    assert!(
        !result.is_over(),
        "Expected a live battle, got step {}",
        result.step
    );
}

/// Assert this action produced a log line containing the fragment.
#[track_caller]
pub fn assert_logged(result: &SessionResult, fragment: &str) {
    assert!(
        result.log.iter().any(|line| line.contains(fragment)),
        "Expected a log line containing '{fragment}', got {:?}",
        result.log
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new().with_record(PlayerId(7), sample_hero("Seeded"));

        let loaded = store.load(PlayerId(7)).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Seeded");

        let mut updated = loaded.clone();
        updated.experience = 500;
        store.save(PlayerId(7), &updated).await.unwrap();
        assert_eq!(store.get(PlayerId(7)).await.unwrap().experience, 500);
    }

    #[tokio::test]
    async fn test_failing_store_loads_but_never_saves() {
        let store = FailingStore::new().with_record(PlayerId(1), sample_hero("Doomed"));

        assert!(store.load(PlayerId(1)).await.unwrap().is_some());
        let result = store.save(PlayerId(1), &sample_hero("Doomed")).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_static_content_lookup_ignores_case() {
        let content = StaticContent::new().with_weapon(Weapon::new(
            "longsword",
            "Longsword",
            crate::combatant::DamageSpec::new(1, 8, 0),
        ));

        let weapon = content.resolve_weapon("LONGSWORD").await.unwrap();
        assert_eq!(weapon.unwrap().name, "Longsword");
        assert!(content.resolve_weapon("halberd").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_harness_opens_a_battle() {
        let harness = BattleHarness::new();

        let opened = harness.engage().await.unwrap();
        assert_step(&opened, Step::Start);
        assert_logged(&opened, "appears");

        let committed = harness.attack().await.unwrap();
        assert_step(&committed, Step::WeaponChoice);
        assert_live(&committed);
        assert_eq!(committed.weapon_options.len(), 2);
    }
}
