//! Combat module (server-authoritative melee)
//!
//! ECS ответственность:
//! - AttackSchedule: cooldown + damage-delay таймеры per character
//! - Sequencer: RequestAttack → ResolveAttack → damage
//! - Damage intake: Health мутирует только сервер
//!
//! Движок (внешнее): анимация удара, физика, транспорт.

use bevy::prelude::*;

pub mod damage;
pub mod hit_scan;
pub mod schedule;
pub mod sequencer;

#[cfg(test)]
mod sequencer_tests;

// Re-export основных типов
pub use damage::{damage_to_apply, take_damage, DamageDealt, DamageRequest};
pub use hit_scan::{
    attack_ray, trace_capsules, CharacterTrace, HitPresentation, HitResolver, HitResult, TRACE_DISTANCE,
};
pub use schedule::{AttackSchedule, FiredTask, TaskKind, TimerHandle};
pub use sequencer::{
    cancel_tasks_for_removed_characters, process_attack_requests, resolve_attacks, tick_attack_schedule,
    AttackAccepted, RequestAttack, ResolveAttack,
};

use crate::BattleSet;

/// Combat Plugin
///
/// Регистрирует combat системы в FixedUpdate (`BattleSet::Combat`).
///
/// Порядок выполнения:
/// 1. cancel_tasks_for_removed_characters: destruction отменяет таймеры
/// 2. tick_attack_schedule: cooldown expiry, отложенные resolution
/// 3. process_attack_requests: RequestAttack
/// 4. resolve_attacks: hit-scan + damage + "succeeded"
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AttackSchedule>()
            .add_event::<RequestAttack>()
            .add_event::<ResolveAttack>()
            .add_event::<AttackAccepted>()
            .add_event::<DamageDealt>();

        app.add_systems(
            FixedUpdate,
            (
                cancel_tasks_for_removed_characters,
                tick_attack_schedule,
                process_attack_requests,
                resolve_attacks,
            )
                .chain()
                .in_set(BattleSet::Combat),
        );
    }
}
