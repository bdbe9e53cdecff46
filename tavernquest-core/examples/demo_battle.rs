//! Run one scripted battle from the command line.
//!
//! Run with: `cargo run -p tavernquest-core --example demo_battle`

use std::sync::Arc;

use tavernquest_core::testing::{sample_hero, MemoryStore};
use tavernquest_core::{BattleAction, BattleEngine, BundledContent, EngineConfig, PlayerId, Step};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let player = PlayerId(1);
    let store = Arc::new(MemoryStore::new().with_record(player, sample_hero("Kara")));
    let engine = BattleEngine::with_config(
        store,
        Arc::new(BundledContent),
        EngineConfig::new().with_rng_seed(2024),
    );

    let opened = engine.handle_action(player, BattleAction::Engage).await?;
    print_lines(&opened.log);
    println!(
        "{} ({}/{} hp) vs {} ({}/{} hp)\n",
        opened.player.name,
        opened.player.hp,
        opened.player.start_hp,
        opened.npc.name,
        opened.npc.hp,
        opened.npc.start_hp
    );

    let mut result = engine.handle_action(player, BattleAction::Attack).await?;
    print_lines(&result.log);

    for _ in 0..30 {
        if result.is_over() {
            break;
        }
        result = engine
            .handle_action(player, BattleAction::Weapon("longsword".to_string()))
            .await?;
        print_lines(&result.log);
    }

    println!();
    match result.step {
        Step::EndBattle => match result.reward_xp {
            Some(reward) => println!(
                "Battle over after {} rounds. {} now has {} experience (+{reward}).",
                result.round, result.player.name, result.experience
            ),
            None => println!(
                "Battle over after {} rounds. No reward today.",
                result.round
            ),
        },
        step => println!("Battle still at {step} after 30 rounds."),
    }
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
