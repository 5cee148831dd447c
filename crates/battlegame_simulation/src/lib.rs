//! BattleGame Simulation Core
//!
//! ECS-симуляция на Bevy 0.16: server-authoritative melee атака.
//!
//! Слои:
//! - ECS = game state + правила (cooldown, hit-scan, damage, репликация Health)
//! - Движок = анимация, физика, транспорт, камера/ввод (внешнее)
//!
//! Один fixed step (60Hz) = один логический шаг. Порядок внутри шага
//! задаёт `BattleSet`.

use std::time::Duration;

use bevy::ecs::event::event_update_system;
use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod combat;
pub mod components;
pub mod duel;
pub mod logger;
pub mod net;
pub mod player;

// Re-export базовых типов для удобства
pub use combat::{
    AttackAccepted, AttackSchedule, CombatPlugin, DamageDealt, HitResolver, HitResult, RequestAttack,
    TRACE_DISTANCE,
};
pub use components::*;
pub use duel::{run_duel, DuelConfig, DuelOutcome, FxStats};
pub use logger::{init_logger, log, log_error, log_info, log_warning};
pub use net::{
    AttackAttemptedFx, AttackSucceededFx, ClientCommand, NetId, NetPlugin, NetRole, NotificationChannel,
    ServerMessage,
};
pub use player::{AttackPressed, DebugDamagePressed, LocalPlayer, PlayerPlugin};

/// Частота simulation tick.
pub const SIMULATION_HZ: f64 = 60.0;

/// Порядок фаз внутри одного fixed step.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BattleSet {
    /// NetId → Entity
    Index,
    /// Локальный input → command channel
    Input,
    /// Inbound команды → RequestAttack (server)
    Receive,
    /// Таймеры, запросы, resolution
    Combat,
    /// Health → observers, входящие уведомления → FX
    Replicate,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            FixedUpdate,
            (
                BattleSet::Index,
                BattleSet::Input,
                BattleSet::Receive,
                BattleSet::Combat,
                BattleSet::Replicate,
            )
                .chain(),
        )
        .add_plugins((NetPlugin, PlayerPlugin, CombatPlugin));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ));

    app
}

/// Headless app с полной симуляцией в заданной роли.
pub fn create_battle_app(seed: u64, role: NetRole) -> App {
    let mut app = create_headless_app(seed);
    app.insert_resource(role).add_plugins(SimulationPlugin);
    app
}

/// Один fixed step ровно на `delta` (без wall clock).
///
/// После schedule та же уборка, что делает `App::update`: swap буферов
/// событий (событие живёт два step'а) и очистка removal trackers.
pub fn step_fixed(app: &mut App, delta: Duration) {
    let world = app.world_mut();
    world.resource_mut::<Time<Fixed>>().advance_by(delta);
    world.run_schedule(FixedUpdate);

    if let Err(err) = world.run_system_once(event_update_system) {
        log_error(&format!("Event update failed: {}", err));
    }
    world.clear_trackers();
}

/// Длительность одного fixed step.
pub fn fixed_timestep() -> Duration {
    Duration::from_secs_f64(1.0 / SIMULATION_HZ)
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
