//! Battle session state and the in-memory session registry.
//!
//! A session tracks one player's current encounter from `Start` to a
//! terminal step. The registry hands out one `Arc<Mutex<_>>` per
//! player; the engine holds that mutex for the whole of an action so a
//! round resolves atomically per player while other players proceed in
//! parallel.

use crate::combat::{AttackRoll, DamageReport};
use crate::combatant::{Combatant, PlayerId, SessionId, Weapon};
use crate::tables::HpStatus;
use serde::{Deserialize, Serialize};
use std::collections::{hash_map::Entry, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Where a battle session currently stands.
///
/// `Fight` and `PostBattle` are transient: a weapon action passes
/// through both before the result is returned, so a session at rest is
/// only ever at `Start`, `WeaponChoice`, `EndBattle` or `Flee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Start,
    WeaponChoice,
    Fight,
    PostBattle,
    EndBattle,
    Flee,
}

impl Step {
    /// Terminal steps accept no further combat actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::EndBattle | Step::Flee)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Step::Start => "start",
            Step::WeaponChoice => "weapon choice",
            Step::Fight => "fight",
            Step::PostBattle => "post battle",
            Step::EndBattle => "end of battle",
            Step::Flee => "fled",
        };
        write!(f, "{}", label)
    }
}

/// One side of a battle with its equipment resolved to full records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantState {
    pub combatant: Combatant,
    /// Hit points at the moment the session was built; the basis for
    /// status percentages.
    pub start_hp: i32,
    pub armor_class: i32,
    pub weapons: Vec<Weapon>,
}

impl CombatantState {
    pub fn new(combatant: Combatant, armor_class: i32, weapons: Vec<Weapon>) -> Self {
        let start_hp = combatant.hitpoints;
        CombatantState {
            combatant,
            start_hp,
            armor_class,
            weapons,
        }
    }

    pub fn hp(&self) -> i32 {
        self.combatant.hitpoints
    }

    pub fn status(&self) -> HpStatus {
        HpStatus::from_hp(self.start_hp, self.combatant.hitpoints)
    }

    pub fn is_down(&self) -> bool {
        self.combatant.is_defeated()
    }

    /// Resolved weapon for the given id, if this side owns it.
    pub fn owned_weapon(&self, id: &str) -> Option<Weapon> {
        self.weapons
            .iter()
            .find(|w| w.id.eq_ignore_ascii_case(id))
            .cloned()
    }

    /// Weapon this side swings when not choosing: the first resolved
    /// one, or bare hands.
    pub fn first_weapon(&self) -> Weapon {
        self.weapons
            .first()
            .cloned()
            .unwrap_or_else(Weapon::improvised)
    }
}

/// One side's swing within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackReport {
    pub attacker: String,
    pub defender: String,
    /// Display name of the weapon swung.
    pub weapon: String,
    /// Damage expression, e.g. `2d6+1`.
    pub notation: String,
    /// True when the attacker fumbled for a weapon it does not own and
    /// fell back to bare hands.
    pub fumbled: bool,
    pub roll: AttackRoll,
    pub damage: DamageReport,
    pub defender_status: HpStatus,
}

/// Everything that happened in one round of exchanges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub player_attack: AttackReport,
    /// Absent when the opponent dropped before it could answer.
    pub npc_attack: Option<AttackReport>,
}

/// Per-player battle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSession {
    pub id: SessionId,
    pub player_id: PlayerId,
    pub player: CombatantState,
    pub npc: CombatantState,
    pub step: Step,
    /// Rounds fought so far.
    pub round: u32,
    pub last_round: Option<RoundRecord>,
    /// Experience awarded at the end of a won battle. Set exactly once.
    pub reward_xp: Option<u32>,
    /// Mechanical narration accumulated across the whole session.
    pub log: Vec<String>,
}

impl BattleSession {
    pub fn new(player_id: PlayerId, player: CombatantState, npc: CombatantState) -> Self {
        BattleSession {
            id: SessionId::new(),
            player_id,
            player,
            npc,
            step: Step::Start,
            round: 0,
            last_round: None,
            reward_xp: None,
            log: Vec::new(),
        }
    }

    pub fn is_over(&self) -> bool {
        self.step.is_terminal()
    }

    pub fn push_log(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }
}

/// In-memory map of live sessions, one per player.
///
/// An explicit service owned by the engine rather than process-global
/// state, so tests and multi-engine setups stay isolated.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<PlayerId, Arc<Mutex<BattleSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the live session for a player, if any.
    pub async fn get(&self, player: PlayerId) -> Option<Arc<Mutex<BattleSession>>> {
        self.sessions.read().await.get(&player).cloned()
    }

    /// Insert `session` unless the player already has one; returns the
    /// live entry plus whether this call inserted it. When two tasks
    /// race to create a session the loser's build is dropped and gets
    /// `false` back.
    pub async fn get_or_insert(
        &self,
        player: PlayerId,
        session: BattleSession,
    ) -> (Arc<Mutex<BattleSession>>, bool) {
        let mut sessions = self.sessions.write().await;
        match sessions.entry(player) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(slot) => {
                let entry = Arc::new(Mutex::new(session));
                slot.insert(Arc::clone(&entry));
                (entry, true)
            }
        }
    }

    /// Drop a player's session entirely.
    pub async fn remove(&self, player: PlayerId) -> Option<Arc<Mutex<BattleSession>>> {
        self.sessions.write().await.remove(&player)
    }

    /// Number of sessions currently held, terminal ones included.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{ChallengeRating, DamageSpec, Rank, DEFAULT_ARMOR_CLASS};

    fn side(name: &str, hp: i32) -> CombatantState {
        let combatant = Combatant::new(name, name, Rank::Level(1)).with_hitpoints(hp);
        CombatantState::new(combatant, DEFAULT_ARMOR_CLASS, Vec::new())
    }

    fn sample_session(player: u64) -> BattleSession {
        let npc = Combatant::new(
            "wolf",
            "Wolf",
            Rank::Challenge(ChallengeRating::new(0.25)),
        )
        .with_hitpoints(11);
        BattleSession::new(
            PlayerId(player),
            side("hero", 20),
            CombatantState::new(npc, 12, vec![Weapon::improvised()]),
        )
    }

    #[test]
    fn test_step_terminality() {
        assert!(Step::EndBattle.is_terminal());
        assert!(Step::Flee.is_terminal());
        assert!(!Step::Start.is_terminal());
        assert!(!Step::WeaponChoice.is_terminal());
        assert!(!Step::Fight.is_terminal());
        assert!(!Step::PostBattle.is_terminal());
    }

    #[test]
    fn test_combatant_state_tracks_start_hp() {
        let mut state = side("hero", 20);
        assert_eq!(state.start_hp, 20);
        state.combatant.hitpoints = 9;
        assert_eq!(state.hp(), 9);
        assert_eq!(state.status(), HpStatus::Bloodied);
        assert!(!state.is_down());
        state.combatant.hitpoints = 0;
        assert!(state.is_down());
    }

    #[test]
    fn test_weapon_lookup_and_fallback() {
        let sword = Weapon::new("longsword", "Longsword", DamageSpec::new(1, 8, 0));
        let armed = CombatantState::new(
            Combatant::new("a", "A", Rank::Level(1)),
            10,
            vec![sword.clone()],
        );
        assert_eq!(armed.owned_weapon("LONGSWORD"), Some(sword.clone()));
        assert_eq!(armed.owned_weapon("dagger"), None);
        assert_eq!(armed.first_weapon(), sword);

        let unarmed = side("b", 5);
        assert_eq!(unarmed.first_weapon(), Weapon::improvised());
    }

    #[test]
    fn test_new_session_starts_clean() {
        let session = sample_session(1);
        assert_eq!(session.step, Step::Start);
        assert_eq!(session.round, 0);
        assert!(session.last_round.is_none());
        assert!(session.reward_xp.is_none());
        assert!(!session.is_over());
    }

    #[test]
    fn test_session_serde_round_trip() {
        let session = sample_session(2);
        let json = serde_json::to_string(&session).unwrap();
        let back: BattleSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[tokio::test]
    async fn test_registry_get_or_insert() {
        let registry = SessionRegistry::new();
        let player = PlayerId(7);
        assert!(registry.get(player).await.is_none());

        let (first, inserted) = registry.get_or_insert(player, sample_session(7)).await;
        assert!(inserted);
        let (second, inserted_again) = registry.get_or_insert(player, sample_session(7)).await;
        assert!(!inserted_again);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.active_count().await, 1);

        // The racing build was dropped, the live session survives.
        let live = first.lock().await;
        assert_eq!(live.player_id, player);
    }

    #[tokio::test]
    async fn test_registry_remove() {
        let registry = SessionRegistry::new();
        let player = PlayerId(9);
        registry.get_or_insert(player, sample_session(9)).await;
        assert!(registry.remove(player).await.is_some());
        assert!(registry.get(player).await.is_none());
        assert_eq!(registry.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_registry_isolates_players() {
        let registry = Arc::new(SessionRegistry::new());
        let (a, _) = registry.get_or_insert(PlayerId(1), sample_session(1)).await;
        let (b, _) = registry.get_or_insert(PlayerId(2), sample_session(2)).await;

        // Holding one player's session must not block another's.
        let guard_a = a.lock().await;
        let guard_b = b.lock().await;
        assert_ne!(guard_a.player_id, guard_b.player_id);
    }
}
