//! Turn-based combat engine for the TavernQuest chat game.
//!
//! This crate provides:
//! - Per-player battle sessions driven by a small state machine
//! - d20 attack resolution with criticals and weapon damage dice
//! - Opponent generation weighted by challenge rating
//! - Experience, level and hit-point bookkeeping with JSON persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tavernquest_core::{BattleAction, BattleEngine, BundledContent, JsonFileStore, PlayerId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(JsonFileStore::new("players"));
//!     let engine = BattleEngine::new(store, Arc::new(BundledContent));
//!
//!     let result = engine
//!         .handle_action(PlayerId(42), BattleAction::Engage)
//!         .await?;
//!     for line in &result.log {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod combatant;
pub mod content;
pub mod dice;
pub mod encounter;
pub mod engine;
pub mod persist;
pub mod session;
pub mod tables;
pub mod testing;

// Primary public API
pub use combat::{AttackOutcome, AttackRoll, DamageReport};
pub use combatant::{
    Armor, Attributes, ChallengeRating, Combatant, DamageSpec, PlayerId, Rank, SessionId, Weapon,
};
pub use content::{BundledContent, ContentProvider};
pub use encounter::{CrWeightMode, EncounterGenerator, PoolPreference};
pub use engine::{BattleAction, BattleEngine, EngineConfig, EngineError, SessionResult};
pub use persist::{CombatantStore, JsonFileStore};
pub use session::{BattleSession, SessionRegistry, Step};
pub use tables::HpStatus;
pub use testing::BattleHarness;
