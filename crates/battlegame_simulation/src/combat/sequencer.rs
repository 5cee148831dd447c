//! Attack sequencer (server-authoritative melee).
//!
//! Per character: `Idle → CoolingDown → Idle`.
//! - Запрос во время cooldown молча отбрасывается (без очереди, без ошибки)
//! - Cooldown сбрасывается только своим таймером
//! - Hit-scan + damage: отложенный side effect внутри CoolingDown
//!
//! Zero-delay resolution идёт через `ResolveAttack` событие, которое
//! `resolve_attacks` читает в том же fixed step (chain): "attempted"
//! всегда уходит раньше "succeeded".

use bevy::prelude::*;

use crate::combat::{
    attack_ray, take_damage, AttackSchedule, CharacterTrace, DamageDealt, DamageRequest,
    HitPresentation, HitResolver, TaskKind, TRACE_DISTANCE,
};
use crate::components::{AttackConfig, AttackState, Health, Invulnerable};
use crate::net::{AttackAttemptedFx, AttackSucceededFx, NetId, NetRole, NotificationChannel, ServerMessage};

/// Команда: персонаж хочет атаковать (уже на сервере).
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestAttack {
    pub character: Entity,
}

/// Внутреннее событие: пора делать hit-scan для атаки персонажа.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveAttack {
    pub character: Entity,
}

/// Событие: атака принята (server-side, до сетевого multicast).
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackAccepted {
    pub character: Entity,
}

/// System: уничтоженный персонаж → отмена всех его таймеров.
pub fn cancel_tasks_for_removed_characters(
    mut removed: RemovedComponents<AttackState>,
    mut schedule: ResMut<AttackSchedule>,
) {
    for character in removed.read() {
        let cancelled = schedule.cancel_all(character);
        if cancelled > 0 {
            crate::logger::log(&format!(
                "🗑️ Cancelled {} attack task(s) of destroyed {:?}",
                cancelled, character
            ));
        }
    }
}

/// System: продвинуть таймеры атак.
///
/// CooldownExpired → персонаж снова Idle.
/// ResolveAttack → событие для `resolve_attacks`.
pub fn tick_attack_schedule(
    role: Res<NetRole>,
    time: Res<Time<Fixed>>,
    mut schedule: ResMut<AttackSchedule>,
    mut states: Query<&mut AttackState>,
    mut resolve_events: EventWriter<ResolveAttack>,
) {
    if !role.has_authority() {
        return;
    }

    for task in schedule.tick(time.delta()) {
        let Ok(mut state) = states.get_mut(task.character) else {
            // Персонаж исчез между tick'ами: callback просто не выполняется
            continue;
        };

        match task.kind {
            TaskKind::CooldownExpired => {
                if state.cooldown == Some(task.handle) {
                    state.cooldown_active = false;
                    state.cooldown = None;
                    crate::logger::log(&format!("✅ Attack cooldown over ({:?})", task.character));
                }
            }
            TaskKind::ResolveAttack => {
                if state.pending_resolve == Some(task.handle) {
                    state.pending_resolve = None;
                }
                resolve_events.write(ResolveAttack {
                    character: task.character,
                });
            }
        }
    }
}

/// System: RequestAttack.
///
/// Cooldown активен → no-op. Иначе: cooldown таймер, delay таймер (или
/// resolution в этом же step), "attack attempted" всем observers.
pub fn process_attack_requests(
    role: Res<NetRole>,
    mut requests: EventReader<RequestAttack>,
    mut schedule: ResMut<AttackSchedule>,
    mut attackers: Query<(&AttackConfig, &mut AttackState, Option<&NetId>)>,
    mut accepted_events: EventWriter<AttackAccepted>,
    mut resolve_events: EventWriter<ResolveAttack>,
    mut notifications: ResMut<NotificationChannel>,
    mut attempted_fx: EventWriter<AttackAttemptedFx>,
) {
    if !role.has_authority() {
        requests.clear();
        return;
    }

    for request in requests.read() {
        let character = request.character;
        let Ok((config, mut state, net_id)) = attackers.get_mut(character) else {
            crate::logger::log_warning(&format!(
                "RequestAttack: {:?} is not an attacking character",
                character
            ));
            continue;
        };

        if state.cooldown_active {
            crate::logger::log(&format!("⏳ Attack dropped, cooling down ({:?})", character));
            continue;
        }

        // Zero cooldown не ставится таймером → флаг не поднимаем
        if let Some(handle) = schedule.schedule(character, TaskKind::CooldownExpired, config.cooldown_duration) {
            state.cooldown_active = true;
            state.cooldown = Some(handle);
        }

        accepted_events.write(AttackAccepted { character });
        // Без NetId клиенты персонажа не знают: уведомление только локальное
        match net_id {
            Some(net_id) => notifications.multicast(ServerMessage::AttackAttempted { attacker: *net_id }),
            None => {
                attempted_fx.write(AttackAttemptedFx { attacker: character });
            }
        }

        let delay = config.effective_damage_delay();
        match schedule.schedule(character, TaskKind::ResolveAttack, delay) {
            Some(handle) => state.pending_resolve = Some(handle),
            None => {
                resolve_events.write(ResolveAttack { character });
            }
        }

        crate::logger::log(&format!(
            "⚔️ Attack accepted ({:?}, cooldown: {:.2}s, damage delay: {:.2}s)",
            character,
            config.cooldown_duration.as_secs_f32(),
            delay.as_secs_f32()
        ));
    }
}

/// System: ResolveAttack (hit-scan вперёд, damage, "attack succeeded").
///
/// Все lookups weak (через Entity): уничтоженный атакующий или цель → no-op.
pub fn resolve_attacks(
    role: Res<NetRole>,
    mut resolve_events: EventReader<ResolveAttack>,
    trace: CharacterTrace,
    attackers: Query<(&AttackConfig, Option<&NetId>)>,
    mut targets: Query<(&mut Health, Has<Invulnerable>, Option<&NetId>)>,
    mut damage_dealt: EventWriter<DamageDealt>,
    mut notifications: ResMut<NotificationChannel>,
    mut succeeded_fx: EventWriter<AttackSucceededFx>,
) {
    if !role.has_authority() {
        resolve_events.clear();
        return;
    }

    for event in resolve_events.read() {
        let attacker = event.character;
        let (Ok((config, attacker_net_id)), Some(transform)) =
            (attackers.get(attacker), trace.transform(attacker))
        else {
            crate::logger::log(&format!("ResolveAttack: attacker {:?} no longer exists", attacker));
            continue;
        };

        let Some((origin, direction)) = attack_ray(transform) else {
            crate::logger::log(&format!("ResolveAttack: {:?} has no horizontal facing", attacker));
            continue;
        };

        let Some(hit) = trace.query_nearest_opponent(origin, direction, TRACE_DISTANCE, attacker) else {
            crate::logger::log(&format!("💨 Attack missed ({:?})", attacker));
            continue;
        };

        let Ok((mut health, invulnerable, target_net_id)) = targets.get_mut(hit.actor) else {
            continue;
        };

        let request = DamageRequest {
            amount: config.attack_amount,
            kind: config.damage_kind,
            instigator: Some(attacker),
            causer: Some(attacker),
        };
        let applied = take_damage(&mut health, &request, invulnerable);

        damage_dealt.write(DamageDealt {
            target: hit.actor,
            instigator: Some(attacker),
            kind: request.kind,
            requested: request.amount,
            applied,
            health_after: health.current,
        });

        crate::logger::log(&format!(
            "💥 Attack hit ({:?} → {:?}, distance: {:.1}, applied: {:.1}, HP: {:.1})",
            attacker, hit.actor, hit.distance, applied, health.current
        ));

        let presentation = HitPresentation::from(&hit);
        match (attacker_net_id, target_net_id) {
            (Some(attacker_id), Some(target_id)) => {
                notifications.multicast(ServerMessage::AttackSucceeded {
                    attacker: *attacker_id,
                    target: *target_id,
                    hit: presentation,
                });
            }
            _ => {
                succeeded_fx.write(AttackSucceededFx {
                    attacker,
                    target: Some(hit.actor),
                    hit: presentation,
                });
            }
        }
    }
}
