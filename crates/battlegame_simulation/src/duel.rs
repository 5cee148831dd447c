//! Headless дуэль: dedicated server + два клиента через loopback.
//!
//! Используется бинарником и тестами детерминизма. Каждый клиент управляет
//! своим персонажем, нажатия атаки решает seeded RNG.

use bevy::prelude::*;
use rand::Rng;

use crate::components::{character_bundle, AttackConfig, Health};
use crate::net::loopback::{pump_commands, pump_notifications};
use crate::net::{apply_server_messages, AttackAttemptedFx, AttackSucceededFx, NetId, NetRole};
use crate::player::{AttackPressed, LocalPlayer};
use crate::{create_battle_app, fixed_timestep, step_fixed, BattleSet, DeterministicRng};

/// Параметры дуэли.
#[derive(Debug, Clone, Copy)]
pub struct DuelConfig {
    pub seed: u64,
    pub ticks: u32,
    /// Вероятность нажатия атаки клиентом за tick
    pub press_chance: f64,
    pub attack: AttackConfig,
    /// Расстояние между персонажами (по Z)
    pub distance: f32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 600,
            press_chance: 0.05,
            attack: AttackConfig::default(),
            distance: 50.0,
        }
    }
}

/// FX, увиденные одним observer'ом.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FxStats {
    pub attempted: u32,
    pub succeeded: u32,
}

/// Итог дуэли (сравнимый между прогонами).
#[derive(Debug, Clone, PartialEq)]
pub struct DuelOutcome {
    /// Health по NetId на сервере
    pub server_health: Vec<(NetId, f32)>,
    /// Реплика Health на каждом клиенте
    pub client_health: Vec<Vec<(NetId, f32)>>,
    pub client_fx: Vec<FxStats>,
    /// Сколько раз клиенты нажали атаку
    pub presses: u32,
}

/// System (client): подсчёт FX событий.
fn count_fx(
    mut attempted: EventReader<AttackAttemptedFx>,
    mut succeeded: EventReader<AttackSucceededFx>,
    mut stats: ResMut<FxStats>,
) {
    stats.attempted += attempted.read().count() as u32;
    stats.succeeded += succeeded.read().count() as u32;
}

const FIGHTERS: [NetId; 2] = [NetId(1), NetId(2)];

/// Оба персонажа в мир: лицом друг к другу на расстоянии `distance`.
fn spawn_fighters(world: &mut World, config: &DuelConfig, local: Option<NetId>) {
    let placements = [
        (FIGHTERS[0], Vec3::ZERO, Vec3::NEG_Z),
        (FIGHTERS[1], Vec3::new(0.0, 0.0, -config.distance), Vec3::Z),
    ];

    for (net_id, position, facing) in placements {
        let transform = Transform::from_translation(position).looking_to(facing, Vec3::Y);
        let mut entity = world.spawn(character_bundle(net_id, transform, config.attack));
        if local == Some(net_id) {
            entity.insert(LocalPlayer);
        }
    }
}

fn client_app(config: &DuelConfig, local: NetId) -> App {
    let mut app = create_battle_app(config.seed, NetRole::Client);
    app.init_resource::<FxStats>().add_systems(
        FixedUpdate,
        count_fx.after(apply_server_messages).in_set(BattleSet::Replicate),
    );
    spawn_fighters(app.world_mut(), config, Some(local));
    app
}

fn health_by_net_id(world: &mut World) -> Vec<(NetId, f32)> {
    let mut query = world.query::<(&NetId, &Health)>();
    let mut healths: Vec<_> = query.iter(world).map(|(id, health)| (*id, health.current)).collect();
    healths.sort_by_key(|(id, _)| *id);
    healths
}

/// Прогон дуэли на `config.ticks` fixed steps.
///
/// Порядок tick'а: clients (input + применение уведомлений) → commands →
/// server → notifications.
pub fn run_duel(config: &DuelConfig) -> DuelOutcome {
    let mut server = create_battle_app(config.seed, NetRole::Server);
    spawn_fighters(server.world_mut(), config, None);

    let mut clients: Vec<App> = FIGHTERS.iter().map(|id| client_app(config, *id)).collect();

    let mut rng = DeterministicRng::new(config.seed).rng;
    let mut presses = 0;
    let step = fixed_timestep();

    for _ in 0..config.ticks {
        for client in clients.iter_mut() {
            if rng.gen_bool(config.press_chance) {
                client.world_mut().send_event(AttackPressed);
                presses += 1;
            }
            step_fixed(client, step);
        }

        pump_commands(&mut server, &mut clients);
        step_fixed(&mut server, step);
        pump_notifications(&mut server, &mut clients);
    }

    // Последний шаг клиентов: применить хвост уведомлений
    for client in clients.iter_mut() {
        step_fixed(client, step);
    }

    let server_health = health_by_net_id(server.world_mut());
    let client_health = clients
        .iter_mut()
        .map(|client| health_by_net_id(client.world_mut()))
        .collect();
    let client_fx = clients
        .iter()
        .map(|client| *client.world().resource::<FxStats>())
        .collect();

    crate::logger::log_info(&format!(
        "Duel finished: {} ticks, {} presses, server health {:?}",
        config.ticks, presses, server_health
    ));

    DuelOutcome {
        server_health,
        client_health,
        client_fx,
        presses,
    }
}
