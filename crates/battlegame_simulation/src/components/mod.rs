//! ECS Components для игровых entity
//!
//! Организация по доменам:
//! - character: персонаж (Character, Health, CharacterCapsule, Invulnerable)
//! - attack: melee атака (AttackConfig, AttackState, DamageKind)

pub mod attack;
pub mod character;

// Re-exports для удобного импорта
pub use attack::*;
pub use character::*;
