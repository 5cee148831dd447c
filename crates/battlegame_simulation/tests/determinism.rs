//! Тесты детерминизма
//!
//! Проверяем что дуэль с одинаковым seed даёт идентичные результаты

use bevy::prelude::*;
use rand::Rng;
use battlegame_simulation::*;

#[test]
fn test_determinism_same_seed() {
    const SEED: u64 = 12345;

    let config = DuelConfig {
        seed: SEED,
        ..DuelConfig::default()
    };

    // Первый прогон
    let outcome1 = run_duel(&config);

    // Второй прогон с тем же seed
    let outcome2 = run_duel(&config);

    assert_eq!(
        outcome1, outcome2,
        "Дуэль с одинаковым seed ({}) дала разные результаты!",
        SEED
    );
}

#[test]
fn test_determinism_multiple_runs() {
    const SEED: u64 = 42;
    const TICK_COUNT: usize = 1000;

    // Запускаем 5 раз: все должны быть идентичны
    let snapshots: Vec<_> = (0..5).map(|_| run_server_simulation(SEED, TICK_COUNT)).collect();

    for (i, snapshot) in snapshots.iter().enumerate().skip(1) {
        assert_eq!(
            snapshots[0], *snapshot,
            "Прогон {} дал результат отличный от прогона 0",
            i
        );
    }
}

#[test]
fn test_client_replica_matches_server() {
    let config = DuelConfig {
        seed: 7,
        press_chance: 0.1,
        ..DuelConfig::default()
    };
    let outcome = run_duel(&config);

    assert!(outcome.presses > 0);
    for replica in &outcome.client_health {
        assert_eq!(*replica, outcome.server_health);
    }

    // Оба клиента видят одни и те же FX
    assert_eq!(outcome.client_fx[0], outcome.client_fx[1]);
    assert!(outcome.client_fx[0].succeeded <= outcome.client_fx[0].attempted);
}

/// Server app: 4 персонажа по кругу, атаки по seeded RNG; snapshot Health
fn run_server_simulation(seed: u64, tick_count: usize) -> Vec<u8> {
    let mut app = create_battle_app(seed, NetRole::Server);

    // Пары лицом друг к другу на расстоянии 50
    let placements = [
        (Vec3::new(0.0, 0.0, 0.0), Vec3::NEG_Z),
        (Vec3::new(0.0, 0.0, -50.0), Vec3::Z),
        (Vec3::new(300.0, 0.0, 0.0), Vec3::NEG_Z),
        (Vec3::new(300.0, 0.0, -50.0), Vec3::Z),
    ];
    let characters: Vec<Entity> = placements
        .iter()
        .enumerate()
        .map(|(i, (position, facing))| {
            let config = AttackConfig::from_secs(0.5 + i as f32 * 0.1, 0.2, 10.0);
            let transform = Transform::from_translation(*position).looking_to(*facing, Vec3::Y);
            app.world_mut()
                .spawn(character_bundle(NetId(i as u64 + 1), transform, config))
                .id()
        })
        .collect();

    for _ in 0..tick_count {
        for &character in &characters {
            let press = app.world_mut().resource_mut::<DeterministicRng>().rng.gen_bool(0.2);
            if press {
                app.world_mut().send_event(RequestAttack { character });
            }
        }
        step_fixed(&mut app, fixed_timestep());
    }

    world_snapshot::<Health>(app.world_mut())
}
