//! Attack components: параметры и серверное состояние melee-атаки

use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::TimerHandle;

/// Тип урона. Для sequencer'а непрозрачен, передаётся в damage pipeline как есть.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum DamageKind {
    #[default]
    Generic,
    Melee,
}

/// Параметры атаки (authoring-time).
///
/// Durations неотрицательны by type. `damage_apply_delay` больше cooldown
/// допустим при authoring, но при запросе атаки клампится до cooldown.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct AttackConfig {
    /// Cooldown между атаками (единственный сериализатор атак)
    pub cooldown_duration: Duration,
    /// Задержка hit-scan + damage от начала атаки (синхронно с анимацией)
    pub damage_apply_delay: Duration,
    /// Урон по цели
    pub attack_amount: f32,
    pub damage_kind: DamageKind,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            cooldown_duration: Duration::from_secs(1),
            damage_apply_delay: Duration::from_millis(300),
            attack_amount: 20.0,
            damage_kind: DamageKind::Melee,
        }
    }
}

impl AttackConfig {
    /// Конструктор из секунд (как в редакторе). Отрицательные и NaN → 0.
    pub fn from_secs(cooldown: f32, damage_delay: f32, attack_amount: f32) -> Self {
        Self {
            cooldown_duration: secs_clamped(cooldown),
            damage_apply_delay: secs_clamped(damage_delay),
            attack_amount,
            ..default()
        }
    }

    pub fn with_damage_kind(mut self, kind: DamageKind) -> Self {
        self.damage_kind = kind;
        self
    }

    /// `min(damage_apply_delay, cooldown_duration)`
    pub fn effective_damage_delay(&self) -> Duration {
        self.damage_apply_delay.min(self.cooldown_duration)
    }
}

/// Округление до микросекунд: 0.3f32 должно давать ровно 300ms, не 300.000011ms.
fn secs_clamped(secs: f32) -> Duration {
    if !secs.is_finite() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_micros((f64::from(secs) * 1_000_000.0).round() as u64)
}

/// Серверное состояние атаки персонажа.
///
/// `cooldown_active` сбрасывается только срабатыванием cooldown таймера.
/// Handles указывают в `AttackSchedule`; на клиенте компонент не меняется.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct AttackState {
    pub cooldown_active: bool,
    pub cooldown: Option<TimerHandle>,
    pub pending_resolve: Option<TimerHandle>,
}

impl AttackState {
    pub fn is_cooling_down(&self) -> bool {
        self.cooldown_active
    }

    pub fn phase(&self) -> AttackPhase {
        if self.cooldown_active {
            AttackPhase::CoolingDown
        } else {
            AttackPhase::Idle
        }
    }
}

/// Две фазы. Damage resolution не фаза, а отложенный side effect внутри CoolingDown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackPhase {
    Idle,
    CoolingDown,
}
