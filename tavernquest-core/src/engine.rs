//! The battle engine, the crate's public entry point.
//!
//! One engine instance serves every player. Each incoming action locks
//! that player's session, advances the state machine, and returns a
//! [`SessionResult`] for the bot to render. A weapon action resolves a
//! full round (player swing, then the opponent's answer) atomically
//! before the lock is released.

use crate::combat::{self, AttackOutcome};
use crate::combatant::{Combatant, PlayerId, Rank, SessionId, Weapon};
use crate::content::{ContentError, ContentProvider};
use crate::dice::DiceError;
use crate::encounter::{self, CrWeightMode, EncounterError, EncounterGenerator, PoolPreference};
use crate::persist::{CombatantStore, StoreError};
use crate::session::{
    AttackReport, BattleSession, CombatantState, RoundRecord, SessionRegistry, Step,
};
use crate::tables::{self, HpStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Error type for engine actions.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Player {0} has no stored character")]
    UnknownPlayer(PlayerId),
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    #[error("Encounter error: {0}")]
    Encounter(#[from] EncounterError),
    #[error("Dice error: {0}")]
    Dice(#[from] DiceError),
}

/// What a player asks the engine to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleAction {
    /// Start a new encounter, or look at the one in progress.
    Engage,
    /// Stand and fight; moves the session to weapon choice.
    Attack,
    /// Walk away. Only possible before the first swing.
    Flee,
    /// Fight one round with the given weapon id.
    Weapon(String),
}

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub weight_mode: CrWeightMode,
    pub pool_preference: PoolPreference,
    /// Armor class for combatants with nothing equipped.
    pub default_armor_class: i32,
    /// Seed for the engine RNG; `None` seeds from entropy. Tests set
    /// this for reproducible battles.
    pub rng_seed: Option<u64>,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            weight_mode: CrWeightMode::default(),
            pool_preference: PoolPreference::default(),
            default_armor_class: crate::combatant::DEFAULT_ARMOR_CLASS,
            rng_seed: None,
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

    pub fn with_default_armor_class(mut self, armor_class: i32) -> Self {
        self.default_armor_class = armor_class;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::new()
    }
}

/// Rendering snapshot of one side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSnapshot {
    pub name: String,
    pub hp: i32,
    pub start_hp: i32,
    pub hp_percent: i32,
    pub status: HpStatus,
}

impl SideSnapshot {
    fn of(state: &CombatantState) -> Self {
        SideSnapshot {
            name: state.combatant.name.clone(),
            hp: state.hp(),
            start_hp: state.start_hp,
            hp_percent: tables::hp_percent(state.start_hp, state.hp()),
            status: state.status(),
        }
    }
}

/// Everything the caller needs to render the outcome of one action.
///
/// `log` carries only the lines this action produced; flavor text is
/// the renderer's job, keyed by the outcomes inside `round_report`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: SessionId,
    pub step: Step,
    pub round: u32,
    pub player: SideSnapshot,
    pub npc: SideSnapshot,
    pub log: Vec<String>,
    /// Weapons to offer when `step` is `WeaponChoice`.
    pub weapon_options: Vec<Weapon>,
    /// The exchanges fought by this action, if it fought any.
    pub round_report: Option<RoundRecord>,
    /// Experience awarded for the kill, present from the end of a won
    /// battle onwards.
    pub reward_xp: Option<u32>,
    /// New level when the reward crossed a threshold this action.
    pub level_up: Option<u8>,
    pub experience: u32,
    /// True when writing the player record failed and the in-memory
    /// session kept the authoritative values.
    pub save_failed: bool,
}

impl SessionResult {
    pub fn is_over(&self) -> bool {
        self.step.is_terminal()
    }
}

struct RoundOutcome {
    save_failed: bool,
    level_up: Option<u8>,
}

/// The combat engine. Owns the session registry, the encounter
/// generator and the RNG; talks to the store and content provider
/// through their ports.
pub struct BattleEngine {
    store: Arc<dyn CombatantStore>,
    content: Arc<dyn ContentProvider>,
    generator: EncounterGenerator,
    registry: SessionRegistry,
    config: EngineConfig,
    rng: Mutex<StdRng>,
}

impl BattleEngine {
    pub fn new(store: Arc<dyn CombatantStore>, content: Arc<dyn ContentProvider>) -> Self {
        Self::with_config(store, content, EngineConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn CombatantStore>,
        content: Arc<dyn ContentProvider>,
        config: EngineConfig,
    ) -> Self {
        let generator = EncounterGenerator::new(Arc::clone(&content))
            .with_weight_mode(config.weight_mode)
            .with_pool_preference(config.pool_preference);
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        BattleEngine {
            store,
            content,
            generator,
            registry: SessionRegistry::new(),
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Advance a player's battle by one action.
    ///
    /// A player with no live session gets one built on the spot: their
    /// record is loaded from the store, equipment is resolved, and a
    /// fresh opponent is generated. `Engage` on a finished battle
    /// replaces the session with a new encounter; every other action on
    /// a finished battle answers with a fixed closing line and changes
    /// nothing.
    pub async fn handle_action(
        &self,
        player: PlayerId,
        action: BattleAction,
    ) -> Result<SessionResult, EngineError> {
        tracing::debug!(player = %player, action = ?action, "handling battle action");

        let (entry, mut fresh) = match self.registry.get(player).await {
            Some(entry) => (entry, false),
            None => {
                // Two first contacts can race; only the one whose build
                // was inserted replays the log from the top.
                let session = self.build_session(player).await?;
                self.registry.get_or_insert(player, session).await
            }
        };
        let mut session = entry.lock().await;

        if matches!(action, BattleAction::Engage) && session.is_over() {
            *session = self.build_session(player).await?;
            fresh = true;
        }

        let log_start = if fresh { 0 } else { session.log.len() };
        let mut save_failed = false;
        let mut level_up = None;
        let mut fought = false;

        match (session.step, action) {
            (_, BattleAction::Engage) => {
                // View refresh; a finished battle was already replaced
                // above.
            }
            (Step::EndBattle, _) | (Step::Flee, _) => {
                session.push_log("The battle is over.");
            }
            (Step::Start, BattleAction::Attack) => {
                session.step = Step::WeaponChoice;
                let line = format!(
                    "{} squares up against the {}. Choose a weapon.",
                    session.player.combatant.name, session.npc.combatant.name
                );
                session.push_log(line);
            }
            (Step::Start, BattleAction::Flee) => {
                session.step = Step::Flee;
                let line = format!(
                    "{} slips away from the {}. No shame in living.",
                    session.player.combatant.name, session.npc.combatant.name
                );
                session.push_log(line);
                tracing::info!(player = %player, "player fled the encounter");
            }
            (Step::Start, BattleAction::Weapon(_)) => {
                session.push_log("No fight has started. Attack or flee first.");
            }
            (Step::WeaponChoice, BattleAction::Weapon(id)) => {
                let outcome = self.fight_round(&mut session, &id).await?;
                save_failed = outcome.save_failed;
                level_up = outcome.level_up;
                fought = true;
            }
            (Step::WeaponChoice, BattleAction::Attack) => {
                session.push_log("Already in the thick of it. Choose a weapon.");
            }
            (Step::WeaponChoice, BattleAction::Flee) => {
                session.push_log("Too late to run now. Choose a weapon.");
            }
            (Step::Fight | Step::PostBattle, _) => {
                // Transient steps; a session at rest never sits here.
                session.push_log("The round is still resolving.");
            }
        }

        Ok(Self::result_from(
            &session, log_start, fought, save_failed, level_up,
        ))
    }

    /// Resolve one full round with the chosen weapon.
    async fn fight_round(
        &self,
        session: &mut BattleSession,
        weapon_id: &str,
    ) -> Result<RoundOutcome, EngineError> {
        // Unknown or unowned weapon ids degrade to bare hands instead
        // of rejecting the action.
        let (weapon, fumbled) = match session.player.owned_weapon(weapon_id) {
            Some(weapon) => (weapon, false),
            None => (Weapon::improvised(), true),
        };

        // Roll the whole round into locals under one short-lived RNG
        // lock. The session is only touched once both swings have
        // resolved; a roll that fails leaves it at rest in
        // WeaponChoice. Store writes happen after the lock is released.
        let (player_swing, npc_swing) = {
            let mut rng = self.rng.lock().await;
            let player_swing =
                Self::swing(&mut *rng, &session.player, &session.npc, &weapon, fumbled)?;
            let npc_swing = if player_swing.damage.hp_after <= 0 {
                None
            } else {
                let counter_weapon = session.npc.first_weapon();
                Some(Self::swing(
                    &mut *rng,
                    &session.npc,
                    &session.player,
                    &counter_weapon,
                    false,
                )?)
            };
            (player_swing, npc_swing)
        };

        session.step = Step::Fight;
        session.round += 1;
        let round = session.round;
        if fumbled {
            let line = format!(
                "{} fumbles for a weapon that isn't there and falls back on bare hands!",
                session.player.combatant.name
            );
            session.push_log(line);
        }
        session.npc.combatant.hitpoints = player_swing.damage.hp_after;
        if let Some(ref counter) = npc_swing {
            session.player.combatant.hitpoints = counter.damage.hp_after;
        }
        session.push_log(describe_swing(&player_swing));
        if let Some(ref counter) = npc_swing {
            session.push_log(describe_swing(counter));
        }
        session.last_round = Some(RoundRecord {
            round,
            player_attack: player_swing,
            npc_attack: npc_swing,
        });

        let mut outcome = RoundOutcome {
            save_failed: false,
            level_up: None,
        };

        if session.npc.is_down() {
            // Victory before the opponent could answer: straight to the
            // end, reward exactly once.
            session.step = Step::EndBattle;
            let (failed, level) = self.award_victory(session).await;
            outcome.save_failed = failed;
            outcome.level_up = level;
        } else {
            session.step = Step::PostBattle;
            if session.player.is_down() {
                session.step = Step::EndBattle;
                let line = format!(
                    "{} collapses. The {} takes the day.",
                    session.player.combatant.name, session.npc.combatant.name
                );
                session.push_log(line);
                tracing::info!(
                    player = %session.player_id,
                    opponent = %session.npc.combatant.name,
                    "player defeated"
                );
            } else {
                session.step = Step::WeaponChoice;
            }
            // The opponent's counter changed player hit points; write
            // them through.
            outcome.save_failed = self.save_player(session).await;
        }

        Ok(outcome)
    }

    /// Reward a won battle: experience from the opponent's challenge
    /// rating, level recomputed, record saved.
    async fn award_victory(&self, session: &mut BattleSession) -> (bool, Option<u8>) {
        let rating = session
            .npc
            .combatant
            .rank
            .challenge()
            .map(|c| c.value())
            .unwrap_or(0.0);
        let reward = tables::xp_reward(rating);
        session.reward_xp = Some(reward);

        let old_level = match session.player.combatant.rank {
            Rank::Level(level) => level,
            Rank::Challenge(_) => tables::level_for_xp(session.player.combatant.experience),
        };
        session.player.combatant.experience += reward;
        let new_level = tables::level_for_xp(session.player.combatant.experience);
        if session.player.combatant.rank.level().is_some() {
            session.player.combatant.rank = Rank::Level(new_level);
        }

        let line = format!(
            "The {} is defeated! {} gains {} experience.",
            session.npc.combatant.name, session.player.combatant.name, reward
        );
        session.push_log(line);

        let level_up = (new_level > old_level).then_some(new_level);
        if let Some(level) = level_up {
            let line = format!("{} reaches level {}!", session.player.combatant.name, level);
            session.push_log(line);
        }

        tracing::info!(
            player = %session.player_id,
            opponent = %session.npc.combatant.name,
            reward,
            "battle won"
        );

        let save_failed = self.save_player(session).await;
        (save_failed, level_up)
    }

    /// Write the player record through the store. Returns true on
    /// failure; the in-memory session stays authoritative either way.
    async fn save_player(&self, session: &mut BattleSession) -> bool {
        match self
            .store
            .save(session.player_id, &session.player.combatant)
            .await
        {
            Ok(()) => false,
            Err(err) => {
                tracing::error!(
                    player = %session.player_id,
                    error = %err,
                    "failed to save player record; session stays authoritative"
                );
                session.push_log("(Your record could not be saved; the battle continues from memory.)");
                true
            }
        }
    }

    /// Load the player, resolve equipment, and roll up a fresh
    /// opponent.
    async fn build_session(&self, player: PlayerId) -> Result<BattleSession, EngineError> {
        let record = self
            .store
            .load(player)
            .await?
            .ok_or(EngineError::UnknownPlayer(player))?;
        let player_state = self.resolve_state(record).await?;

        let pools = self.generator.load_pools().await?;
        let npc = {
            let mut rng = self.rng.lock().await;
            let mut npc = self.generator.pick_with(&mut *rng, &pools)?;
            npc.hitpoints = encounter::roll_hitpoints_with(&mut *rng, &npc)?;
            npc
        };
        let npc_state = self.resolve_state(npc).await?;

        tracing::info!(
            player = %player,
            opponent = %npc_state.combatant.name,
            opponent_hp = npc_state.combatant.hitpoints,
            "new encounter"
        );

        let mut session = BattleSession::new(player, player_state, npc_state);
        let line = format!(
            "A wild {} ({}) appears before {}!",
            session.npc.combatant.name, session.npc.combatant.rank, session.player.combatant.name
        );
        session.push_log(line);
        Ok(session)
    }

    /// Resolve a combatant's equipment ids into full records.
    async fn resolve_state(&self, combatant: Combatant) -> Result<CombatantState, EngineError> {
        let mut weapons = Vec::new();
        for id in &combatant.weapons {
            match self.content.resolve_weapon(id).await? {
                Some(weapon) => weapons.push(weapon),
                None => tracing::warn!(
                    item = %id,
                    owner = %combatant.name,
                    "weapon id did not resolve; leaving it out"
                ),
            }
        }

        let mut armor_class = self.config.default_armor_class;
        if let Some(armor_id) = combatant.armor.first() {
            if let Some(armor) = self.content.resolve_armor(armor_id).await? {
                armor_class = armor.armor_class;
            }
        }

        Ok(CombatantState::new(combatant, armor_class, weapons))
    }

    fn result_from(
        session: &BattleSession,
        log_start: usize,
        fought: bool,
        save_failed: bool,
        level_up: Option<u8>,
    ) -> SessionResult {
        SessionResult {
            session_id: session.id,
            step: session.step,
            round: session.round,
            player: SideSnapshot::of(&session.player),
            npc: SideSnapshot::of(&session.npc),
            log: session.log[log_start..].to_vec(),
            weapon_options: if session.step == Step::WeaponChoice {
                session.player.weapons.clone()
            } else {
                Vec::new()
            },
            round_report: if fought { session.last_round.clone() } else { None },
            reward_xp: session.reward_xp,
            level_up,
            experience: session.player.combatant.experience,
            save_failed,
        }
    }

    fn swing<R: Rng>(
        rng: &mut R,
        attacker: &CombatantState,
        defender: &CombatantState,
        weapon: &Weapon,
        fumbled: bool,
    ) -> Result<AttackReport, DiceError> {
        let roll = combat::resolve_attack_with(rng, &attacker.combatant, defender.armor_class);
        let damage = combat::resolve_damage_with(
            rng,
            roll.outcome,
            weapon,
            roll.ability_modifier,
            defender.hp(),
        )?;
        let defender_status = HpStatus::from_hp(defender.start_hp, damage.hp_after);

        Ok(AttackReport {
            attacker: attacker.combatant.name.clone(),
            defender: defender.combatant.name.clone(),
            weapon: weapon.name.clone(),
            notation: weapon.damage.to_string(),
            fumbled,
            roll,
            damage,
            defender_status,
        })
    }
}

/// Mechanical one-line narration of a swing.
fn describe_swing(report: &AttackReport) -> String {
    let check = format!(
        "d20 {} {:+} {:+} = {} vs AC {}",
        report.roll.natural,
        report.roll.ability_modifier,
        report.roll.proficiency_modifier,
        report.roll.total,
        report.roll.target_armor_class
    );
    match report.roll.outcome {
        AttackOutcome::CriticalHit => format!(
            "{} crits {} with the {} ({}): {} damage ({} + {} crit). {} is {}.",
            report.attacker,
            report.defender,
            report.weapon,
            check,
            report.damage.total,
            report.damage.damage,
            report.damage.critical_roll,
            report.defender,
            report.defender_status
        ),
        AttackOutcome::Hit => format!(
            "{} hits {} with the {} ({}): {} damage. {} is {}.",
            report.attacker,
            report.defender,
            report.weapon,
            check,
            report.damage.total,
            report.defender,
            report.defender_status
        ),
        AttackOutcome::Miss => format!(
            "{} misses {} with the {} ({}).",
            report.attacker, report.defender, report.weapon, check
        ),
        AttackOutcome::CriticalMiss => format!(
            "{} fumbles the {} badly (natural 1).",
            report.attacker, report.weapon
        ),
    }
}
