//! Базовые компоненты персонажа: Character, Health, CharacterCapsule

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, RigidBody};

use crate::components::{AttackConfig, AttackState};
use crate::net::NetId;

/// Игровой персонаж (игрок или бот): участник melee-боя.
///
/// Required Components дают всё, что нужно sequencer'у: здоровье,
/// параметры атаки, серверное состояние атаки и форму для hit-scan.
/// Transform владеет движок; здесь он только читается.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(Health, AttackConfig, AttackState, CharacterCapsule, Transform)]
pub struct Character;

/// Здоровье персонажа.
///
/// Мутирует только сервер (через damage pipeline), клиенты видят реплику.
/// Пола в нуле нет: смерть/респавн обрабатывает внешний код.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    /// Spawn: current = max.
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Вычитает уже посчитанный pipeline'ом урон. Отрицательное игнорируется.
    pub fn take_damage(&mut self, applied: f32) {
        if applied > 0.0 {
            self.current -= applied;
        }
    }

    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

/// Капсула персонажа (вертикальная, центр = Transform.translation, на уровне бёдер).
///
/// `half_height` включает полусферы, как у движковой capsule component.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct CharacterCapsule {
    pub radius: f32,
    pub half_height: f32,
}

impl Default for CharacterCapsule {
    fn default() -> Self {
        Self {
            radius: 42.0,
            half_height: 96.0,
        }
    }
}

impl CharacterCapsule {
    /// Половина длины осевого сегмента (без полусфер).
    pub fn segment_half_length(&self) -> f32 {
        (self.half_height - self.radius).max(0.0)
    }

    /// Тот же shape для физического backend'а.
    pub fn collider(&self) -> Collider {
        Collider::capsule_y(self.segment_half_length(), self.radius)
    }
}

/// Маркер: damage pipeline применяет 0 урона.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Invulnerable;

/// Spawn bundle персонажа.
///
/// Kinematic тело: движение ведёт движок, мы только читаем Transform.
/// `Collider`/`RigidBody` нужны только физическому backend'у хоста (если он
/// подключает `RapierPhysicsPlugin`). Симуляция их не читает: hit-scan
/// аналитический по `CharacterCapsule` (`trace_capsules`), поэтому collider
/// обязан совпадать с капсулой.
pub fn character_bundle(net_id: NetId, transform: Transform, config: AttackConfig) -> impl Bundle {
    let capsule = CharacterCapsule::default();
    (
        Character,
        net_id,
        transform,
        config,
        capsule,
        capsule.collider(),
        RigidBody::KinematicPositionBased,
    )
}

/// Spawn персонажа с default капсулой и здоровьем.
pub fn spawn_character(
    commands: &mut Commands,
    net_id: NetId,
    transform: Transform,
    config: AttackConfig,
) -> Entity {
    commands.spawn(character_bundle(net_id, transform, config)).id()
}
