//! Headless scenario execution
//!
//! Runs combat scenarios without any graphical output, suitable for
//! automated testing and balance analysis.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;
use bevy::utils::HashMap;
use std::time::Duration;

use crate::combat::components::{Dead, Faction, GameRng, LocalAuthority, StatEcho};
use crate::combat::events::{CastRequest, EquipPerkRequest, GrantXp, ReviveRequest};
use crate::combat::log::{CombatLog, CombatantSummary, ScenarioMetadata};
use crate::combat::modifiers::ModifierLedger;
use crate::combat::skills::{AutoAttack, PerkDrives, SkillCooldowns, SkillLevels};
use crate::combat::stats::StatBlock;
use crate::combat::systems::{self, SimulationSpeed};
use crate::combat::CombatPlugin;
use crate::config::{load_character_definitions, CharacterDefinitions, ContentPlugin};

use super::config::{ActionKind, ScenarioConfig, ScriptedAction};

/// Result of a completed scenario
///
/// Provides programmatic access to outcomes for testing and analysis.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Wall-clock scenario duration in seconds
    pub elapsed_secs: f32,
    /// Whether the player was alive at scenario end
    pub player_survived: bool,
    /// Player level at scenario end
    pub player_level: u32,
    /// Enemies still alive at scenario end
    pub enemies_remaining: usize,
    /// Total damage dealt per source (skill name or "attack")
    pub damage_by_source: HashMap<String, f32>,
}

/// Resource tracking scenario execution state
#[derive(Resource)]
pub struct ScenarioState {
    /// Maximum scenario duration before stopping
    pub max_duration: f32,
    /// Elapsed wall-clock time. Script times are wall-clock so a scripted
    /// pause can still be followed by a scripted resume.
    pub elapsed: f32,
    /// Custom output path for the combat log
    pub output_path: Option<String>,
    pub scenario_name: String,
    pub random_seed: Option<u64>,
    /// Whether the scenario has completed
    pub complete: bool,
    /// Scenario result (populated on completion)
    pub result: Option<ScenarioResult>,
    script: Vec<ScriptedAction>,
    cursor: usize,
}

/// Handle to the scripted combatant
#[derive(Resource)]
pub struct PlayerHandle(pub Entity);

/// Plugin for headless scenario execution
pub struct ScenarioPlugin {
    pub config: ScenarioConfig,
}

impl Plugin for ScenarioPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ScenarioState {
            max_duration: self.config.duration_secs,
            elapsed: 0.0,
            output_path: self.config.output_path.clone(),
            scenario_name: self.config.scenario_name.clone(),
            random_seed: self.config.random_seed,
            complete: false,
            result: None,
            script: self.config.script.clone(),
            cursor: 0,
        })
        .insert_resource(ScenarioSpawns {
            config: self.config.clone(),
        });

        if let Some(seed) = self.config.random_seed {
            app.insert_resource(GameRng::from_seed(seed));
        }

        app.add_systems(Startup, setup_scenario).add_systems(
            Update,
            (drive_script, check_scenario_end)
                .chain()
                .after(systems::CombatSystemPhase::Resolution),
        );
        app.add_systems(PostUpdate, exit_on_complete);
    }
}

/// Spawn specs held until the startup system runs
#[derive(Resource)]
struct ScenarioSpawns {
    config: ScenarioConfig,
}

fn setup_scenario(
    mut commands: Commands,
    spawns: Res<ScenarioSpawns>,
    characters: Res<CharacterDefinitions>,
    mut log: ResMut<CombatLog>,
) {
    log.clear();
    let config = &spawns.config;

    let player_def = characters.get_unchecked(&config.player.character);
    let stats = StatBlock::from_loadout(player_def, &config.player.loadout);

    let mut levels = SkillLevels::default();
    for (skill, level) in &config.player.skill_levels {
        levels.set(skill, *level);
    }
    let mut perks = PerkDrives::default();
    for perk in &config.player.perks {
        perks.equip(&perk.skill, perk.level);
        levels.set(&perk.skill, perk.level);
    }

    let player = commands
        .spawn((
            Name::new(player_def.name.clone()),
            stats,
            StatEcho::default(),
            ModifierLedger::default(),
            SkillCooldowns::default(),
            levels,
            perks,
            AutoAttack::new(config.player.attack_range),
            Faction(0),
            LocalAuthority,
            Transform::from_translation(Vec3::from_array(config.player.position)),
        ))
        .id();
    log.register_combatant(player, player_def.name.clone());
    commands.insert_resource(PlayerHandle(player));

    for group in &config.enemies {
        let enemy_def = characters.get_unchecked(&group.character);
        for i in 0..group.count {
            let mut position = Vec3::from_array(group.position);
            position.x += group.spacing * i as f32;
            let name = if group.count > 1 {
                format!("{} {}", enemy_def.name, i + 1)
            } else {
                enemy_def.name.clone()
            };
            let enemy = commands
                .spawn((
                    Name::new(name.clone()),
                    StatBlock::from_loadout(enemy_def, &Default::default()),
                    StatEcho::default(),
                    ModifierLedger::default(),
                    SkillCooldowns::default(),
                    SkillLevels::default(),
                    AutoAttack::new(12.0),
                    Faction(1),
                    LocalAuthority,
                    Transform::from_translation(position),
                ))
                .id();
            log.register_combatant(enemy, name);
        }
    }
}

/// Advance the scenario clock and fire due scripted actions. The clock is
/// wall time, unaffected by simulation pause.
#[allow(clippy::too_many_arguments)]
fn drive_script(
    time: Res<Time>,
    mut state: ResMut<ScenarioState>,
    player: Res<PlayerHandle>,
    mut speed: ResMut<SimulationSpeed>,
    mut cast_events: EventWriter<CastRequest>,
    mut equip_events: EventWriter<EquipPerkRequest>,
    mut xp_events: EventWriter<GrantXp>,
    mut revive_events: EventWriter<ReviveRequest>,
) {
    state.elapsed += time.delta_secs();

    while state.cursor < state.script.len() && state.script[state.cursor].at <= state.elapsed {
        let action = state.script[state.cursor].action.clone();
        state.cursor += 1;
        match action {
            ActionKind::Cast { skill, direction } => {
                cast_events.send(CastRequest {
                    caster: player.0,
                    skill,
                    input_dir: Vec3::from_array(direction),
                });
            }
            ActionKind::EquipPerk { skill, level } => {
                equip_events.send(EquipPerkRequest {
                    entity: player.0,
                    perk: skill,
                    level,
                });
            }
            ActionKind::GrantXp { amount } => {
                xp_events.send(GrantXp {
                    entity: player.0,
                    amount,
                });
            }
            ActionKind::Pause => speed.pause(),
            ActionKind::Resume => speed.resume(),
            ActionKind::Revive => {
                revive_events.send(ReviveRequest { entity: player.0 });
            }
        }
    }
}

/// Stop at the duration limit, or early once every enemy is dead and the
/// script is exhausted. Saves the combat log on completion.
fn check_scenario_end(
    mut state: ResMut<ScenarioState>,
    log: Res<CombatLog>,
    player: Res<PlayerHandle>,
    combatants: Query<(Entity, &StatBlock, &Faction, Has<Dead>)>,
) {
    if state.complete {
        return;
    }

    let enemies_remaining = combatants
        .iter()
        .filter(|(_, _, faction, dead)| faction.0 != 0 && !dead)
        .count();
    let had_enemies = combatants.iter().any(|(_, _, faction, _)| faction.0 != 0);
    let script_done = state.cursor >= state.script.len();

    let time_up = state.elapsed >= state.max_duration;
    let cleared = had_enemies && enemies_remaining == 0 && script_done;
    if !time_up && !cleared {
        return;
    }

    let (player_survived, player_level) = combatants
        .get(player.0)
        .map(|(_, stats, _, dead)| (!dead && stats.is_alive(), stats.level))
        .unwrap_or((false, 1));

    let result = ScenarioResult {
        elapsed_secs: state.elapsed,
        player_survived,
        player_level,
        enemies_remaining,
        damage_by_source: log.damage_by_source(),
    };

    let metadata = ScenarioMetadata {
        scenario_name: state.scenario_name.clone(),
        duration_secs: state.elapsed,
        random_seed: state.random_seed,
        combatants: combatants
            .iter()
            .map(|(entity, stats, _, _)| CombatantSummary {
                name: log.name_of(entity),
                max_hp: stats.max_hp,
                final_hp: stats.hp,
                level: stats.level,
            })
            .collect(),
    };
    match log.save_to_file(&metadata, state.output_path.as_deref()) {
        Ok(path) => println!("Scenario complete. Log saved to: {}", path),
        Err(e) => eprintln!("Failed to save combat log: {}", e),
    }

    state.result = Some(result);
    state.complete = true;
}

/// Exit the app when the scenario is complete
fn exit_on_complete(state: Res<ScenarioState>, mut exit: EventWriter<AppExit>) {
    if state.complete {
        exit.send(AppExit::Success);
    }
}

/// Run a headless scenario with the given configuration
pub fn run_scenario(config: ScenarioConfig) -> Result<(), String> {
    config.validate()?;

    // Resolve character ids against the content up front; the setup system
    // can then use the unchecked lookups
    let characters = load_character_definitions()?;
    if characters.get(&config.player.character).is_none() {
        return Err(format!(
            "Unknown player character '{}'",
            config.player.character
        ));
    }
    for group in &config.enemies {
        if characters.get(&group.character).is_none() {
            return Err(format!("Unknown enemy character '{}'", group.character));
        }
    }

    println!("Starting headless combat scenario...");
    println!("  Player: {}", config.player.character);
    for group in &config.enemies {
        println!("  Enemies: {} x{}", group.character, group.count);
    }
    println!("  Max duration: {:.0}s", config.duration_secs);
    if let Some(seed) = config.random_seed {
        println!("  Seed: {}", seed);
    }

    App::new()
        // Minimal plugins - no window, no rendering
        .add_plugins(
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
        )
        // Transform plugin needed for entity positions
        .add_plugins(TransformPlugin)
        // Load character and skill definitions from config
        .add_plugins(ContentPlugin)
        // The combat core
        .add_plugins(CombatPlugin)
        // Scenario orchestration
        .add_plugins(ScenarioPlugin { config })
        .run();

    Ok(())
}
