//! Damage intake
//!
//! TakeDamage персонажа: generic pipeline считает applied amount,
//! затем Health вычитает его. Только на authority (сервер).
//! Пол в нуле не держим: смерть обрабатывается снаружи.

use bevy::prelude::*;

use crate::components::{DamageKind, Health};

/// Запрос урона (аргументы TakeDamage).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    pub amount: f32,
    pub kind: DamageKind,
    /// Кто инициировал (контроллер/персонаж атакующего)
    pub instigator: Option<Entity>,
    /// Чем нанесён урон (сам персонаж для melee)
    pub causer: Option<Entity>,
}

/// Событие: урон применён (после вычитания из Health).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct DamageDealt {
    pub target: Entity,
    pub instigator: Option<Entity>,
    pub kind: DamageKind,
    pub requested: f32,
    pub applied: f32,
    pub health_after: f32,
}

/// Generic damage pipeline: сколько реально применить.
///
/// - Invulnerable → 0
/// - отрицательный/NaN amount → 0 (TakeDamage не лечит)
/// - иначе pass-through
pub fn damage_to_apply(request: &DamageRequest, invulnerable: bool) -> f32 {
    if invulnerable || request.amount.is_nan() {
        return 0.0;
    }
    request.amount.max(0.0)
}

/// TakeDamage: вычитает applied из health, возвращает applied.
pub fn take_damage(health: &mut Health, request: &DamageRequest, invulnerable: bool) -> f32 {
    let applied = damage_to_apply(request, invulnerable);
    health.take_damage(applied);
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: f32) -> DamageRequest {
        DamageRequest {
            amount,
            kind: DamageKind::Melee,
            instigator: None,
            causer: None,
        }
    }

    #[test]
    fn test_take_damage_pass_through() {
        let mut health = Health::new(100.0);
        let applied = take_damage(&mut health, &request(20.0), false);

        assert_eq!(applied, 20.0);
        assert_eq!(health.current, 80.0);
    }

    #[test]
    fn test_take_damage_below_zero() {
        let mut health = Health::new(10.0);
        take_damage(&mut health, &request(25.0), false);
        assert_eq!(health.current, -15.0);
    }

    #[test]
    fn test_take_damage_never_heals() {
        let mut health = Health::new(100.0);
        health.take_damage(40.0);

        assert_eq!(take_damage(&mut health, &request(-30.0), false), 0.0);
        assert_eq!(take_damage(&mut health, &request(f32::NAN), false), 0.0);
        assert_eq!(health.current, 60.0);
    }

    #[test]
    fn test_invulnerable_takes_nothing() {
        let mut health = Health::new(100.0);
        assert_eq!(take_damage(&mut health, &request(50.0), true), 0.0);
        assert_eq!(health.current, 100.0);
    }
}
