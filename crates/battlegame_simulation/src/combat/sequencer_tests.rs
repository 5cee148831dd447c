//! Tests for attack sequencer systems.

use std::time::Duration;

use bevy::prelude::*;

use crate::combat::{AttackAccepted, AttackSchedule, DamageDealt, RequestAttack};
use crate::components::{character_bundle, AttackConfig, AttackState, Character, DamageKind, Health};
use crate::net::{
    apply_server_messages, AttackAttemptedFx, AttackSucceededFx, NetId, NetRole, NotificationChannel,
    ServerMessage,
};
use crate::{create_battle_app, step_fixed, BattleSet};

const STEP: Duration = Duration::from_millis(100);

fn spawn_pair(app: &mut App, config: AttackConfig) -> (Entity, Entity) {
    let attacker = app
        .world_mut()
        .spawn(character_bundle(
            NetId(1),
            Transform::from_xyz(0.0, 0.0, 0.0).looking_to(Vec3::NEG_Z, Vec3::Y),
            config,
        ))
        .id();
    let target = app
        .world_mut()
        .spawn(character_bundle(
            NetId(2),
            Transform::from_xyz(0.0, 0.0, -50.0).looking_to(Vec3::Z, Vec3::Y),
            AttackConfig::default(),
        ))
        .id();
    (attacker, target)
}

/// Всё, что увидели читатели событий за тест.
#[derive(Resource, Default)]
struct EventLog {
    accepted: Vec<AttackAccepted>,
    damage: Vec<DamageDealt>,
    attempted_fx: Vec<AttackAttemptedFx>,
    succeeded_fx: Vec<AttackSucceededFx>,
}

fn record_events(
    mut accepted: EventReader<AttackAccepted>,
    mut damage: EventReader<DamageDealt>,
    mut attempted_fx: EventReader<AttackAttemptedFx>,
    mut succeeded_fx: EventReader<AttackSucceededFx>,
    mut log: ResMut<EventLog>,
) {
    log.accepted.extend(accepted.read().copied());
    log.damage.extend(damage.read().copied());
    log.attempted_fx.extend(attempted_fx.read().copied());
    log.succeeded_fx.extend(succeeded_fx.read().copied());
}

fn server_app_with_log() -> App {
    let mut app = create_battle_app(1, NetRole::Server);
    app.init_resource::<EventLog>().add_systems(
        FixedUpdate,
        record_events.after(apply_server_messages).in_set(BattleSet::Replicate),
    );
    app
}

fn request(app: &mut App, character: Entity) {
    app.world_mut().send_event(RequestAttack { character });
}

/// Attack-уведомления (без HealthChanged) в порядке multicast.
fn attack_messages(app: &App) -> Vec<ServerMessage> {
    app.world()
        .resource::<NotificationChannel>()
        .outbound()
        .iter()
        .filter(|message| !matches!(message, ServerMessage::HealthChanged { .. }))
        .copied()
        .collect()
}

fn health(app: &App, entity: Entity) -> f32 {
    app.world().get::<Health>(entity).unwrap().current
}

#[test]
fn test_zero_delay_resolves_in_same_step() {
    let mut app = create_battle_app(1, NetRole::Server);
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::from_secs(1.0, 0.0, 20.0));

    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);

    let messages = attack_messages(&app);
    assert_eq!(messages.len(), 2, "messages = {:?}", messages);
    assert_eq!(messages[0], ServerMessage::AttackAttempted { attacker: NetId(1) });
    assert!(matches!(
        messages[1],
        ServerMessage::AttackSucceeded { attacker: NetId(1), target: NetId(2), .. }
    ));
    assert_eq!(health(&app, target), 80.0);
}

#[test]
fn test_request_during_cooldown_is_dropped() {
    let mut app = create_battle_app(1, NetRole::Server);
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::from_secs(1.0, 0.0, 20.0));

    request(&mut app, attacker);
    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);

    assert_eq!(health(&app, target), 80.0);
    assert_eq!(attack_messages(&app).len(), 2);
    assert!(app.world().get::<AttackState>(attacker).unwrap().cooldown_active);

    step_fixed(&mut app, STEP);
    request(&mut app, attacker);
    step_fixed(&mut app, STEP);

    assert_eq!(health(&app, target), 80.0);
    assert_eq!(attack_messages(&app).len(), 2);
}

#[test]
fn test_delay_longer_than_cooldown_is_clamped() {
    let mut app = create_battle_app(1, NetRole::Server);
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::from_secs(0.2, 1.0, 20.0));

    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);
    step_fixed(&mut app, STEP);
    assert_eq!(health(&app, target), 100.0);

    // 0.2s = cooldown, не 1.0s
    step_fixed(&mut app, STEP);
    assert_eq!(health(&app, target), 80.0);
    assert!(!app.world().get::<AttackState>(attacker).unwrap().cooldown_active);
}

#[test]
fn test_miss_emits_only_attempted() {
    let mut app = create_battle_app(1, NetRole::Server);
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::from_secs(1.0, 0.0, 20.0));

    // Отвернуть атакующего от цели
    app.world_mut()
        .get_mut::<Transform>(attacker)
        .unwrap()
        .look_to(Vec3::Z, Vec3::Y);

    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);

    assert_eq!(
        attack_messages(&app),
        vec![ServerMessage::AttackAttempted { attacker: NetId(1) }]
    );
    assert_eq!(health(&app, target), 100.0);
}

#[test]
fn test_destroyed_attacker_cancels_pending_tasks() {
    let mut app = create_battle_app(1, NetRole::Server);
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::default());

    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);
    assert_eq!(app.world().resource::<AttackSchedule>().pending_for(attacker), 2);

    app.world_mut().despawn(attacker);
    step_fixed(&mut app, STEP);
    assert_eq!(app.world().resource::<AttackSchedule>().pending_for(attacker), 0);

    for _ in 0..10 {
        step_fixed(&mut app, STEP);
    }
    assert_eq!(health(&app, target), 100.0);
    assert_eq!(attack_messages(&app).len(), 1);
}

#[test]
fn test_zero_cooldown_accepts_every_request() {
    let mut app = create_battle_app(1, NetRole::Server);
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::from_secs(0.0, 0.3, 10.0));

    request(&mut app, attacker);
    request(&mut app, attacker);
    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);

    assert_eq!(health(&app, target), 70.0);
    assert!(app.world().resource::<AttackSchedule>().is_empty());
}

#[test]
fn test_client_role_never_mutates() {
    let mut app = create_battle_app(1, NetRole::Client);
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::from_secs(1.0, 0.0, 20.0));

    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);

    assert_eq!(health(&app, target), 100.0);
    assert!(!app.world().get::<AttackState>(attacker).unwrap().cooldown_active);
    assert!(app.world().resource::<NotificationChannel>().outbound().is_empty());
}

#[test]
fn test_accepted_and_damage_events() {
    let mut app = server_app_with_log();
    let config = AttackConfig::from_secs(1.0, 0.0, 20.0).with_damage_kind(DamageKind::Generic);
    let (attacker, target) = spawn_pair(&mut app, config);

    request(&mut app, attacker);
    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);

    let log = app.world().resource::<EventLog>();
    assert_eq!(log.accepted, vec![AttackAccepted { character: attacker }]);
    assert_eq!(log.damage.len(), 1);

    let dealt = log.damage[0];
    assert_eq!(dealt.target, target);
    assert_eq!(dealt.instigator, Some(attacker));
    assert_eq!(dealt.kind, DamageKind::Generic);
    assert_eq!(dealt.applied, 20.0);
    assert_eq!(dealt.health_after, 80.0);
}

#[test]
fn test_character_without_net_id_still_notifies_locally() {
    let mut app = server_app_with_log();

    let attacker = app
        .world_mut()
        .spawn((
            Character,
            AttackConfig::from_secs(1.0, 0.0, 20.0),
            Transform::from_xyz(0.0, 0.0, 0.0).looking_to(Vec3::NEG_Z, Vec3::Y),
        ))
        .id();
    let target = app
        .world_mut()
        .spawn((Character, Transform::from_xyz(0.0, 0.0, -50.0)))
        .id();

    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);

    assert_eq!(health(&app, target), 80.0);

    let log = app.world().resource::<EventLog>();
    assert_eq!(log.attempted_fx, vec![AttackAttemptedFx { attacker }]);
    assert_eq!(log.succeeded_fx.len(), 1);
    assert_eq!(log.succeeded_fx[0].attacker, attacker);
    assert_eq!(log.succeeded_fx[0].target, Some(target));

    // На провод ничего: клиенты таких персонажей не знают
    assert!(attack_messages(&app).is_empty());
}

#[test]
fn test_net_id_attack_reaches_server_fx_once() {
    let mut app = server_app_with_log();
    let (attacker, target) = spawn_pair(&mut app, AttackConfig::from_secs(1.0, 0.0, 20.0));

    request(&mut app, attacker);
    step_fixed(&mut app, Duration::ZERO);
    step_fixed(&mut app, STEP);

    let log = app.world().resource::<EventLog>();
    assert_eq!(log.attempted_fx, vec![AttackAttemptedFx { attacker }]);
    assert_eq!(log.succeeded_fx.len(), 1);
    assert_eq!(log.succeeded_fx[0].target, Some(target));
}
