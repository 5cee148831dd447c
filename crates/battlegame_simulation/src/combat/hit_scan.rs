//! Hit-scan для melee атаки
//!
//! Архитектура:
//! - `HitResolver`: интерфейс запроса (физика движка или наш fallback)
//! - `CharacterTrace`: fallback, line trace против капсул `Character`
//! - Луч: из центра персонажа (бёдра) вперёд по facing без pitch, 75 units

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Character, CharacterCapsule};

/// Дальность melee trace (engine units).
pub const TRACE_DISTANCE: f32 = 75.0;

/// Результат попадания (для damage + презентации на клиентах).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// Кого задели
    pub actor: Entity,
    /// Дистанция от начала луча до точки входа
    pub distance: f32,
    /// Точка входа в капсулу
    pub impact_point: Vec3,
    /// Нормаль поверхности в точке входа
    pub impact_normal: Vec3,
    pub trace_start: Vec3,
    pub trace_end: Vec3,
}

/// Позиционная часть HitResult, которая уходит на клиентов.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitPresentation {
    pub distance: f32,
    pub impact_point: Vec3,
    pub impact_normal: Vec3,
    pub trace_start: Vec3,
    pub trace_end: Vec3,
}

impl From<&HitResult> for HitPresentation {
    fn from(hit: &HitResult) -> Self {
        Self {
            distance: hit.distance,
            impact_point: hit.impact_point,
            impact_normal: hit.impact_normal,
            trace_start: hit.trace_start,
            trace_end: hit.trace_end,
        }
    }
}

/// Интерфейс запроса ближайшего противника на луче.
pub trait HitResolver {
    fn query_nearest_opponent(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_range: f32,
        exclude: Entity,
    ) -> Option<HitResult>;
}

/// Луч атаки из transform персонажа: (origin, unit direction).
///
/// None: facing вертикальный, горизонтальной проекции нет.
pub fn attack_ray(transform: &Transform) -> Option<(Vec3, Vec3)> {
    let mut forward = transform.forward().as_vec3();
    forward.y = 0.0;
    if forward.length_squared() < 1e-6 {
        return None;
    }
    Some((transform.translation, forward.normalize()))
}

/// Fallback resolver: line trace против капсул всех `Character`.
#[derive(SystemParam)]
pub struct CharacterTrace<'w, 's> {
    characters: Query<'w, 's, (Entity, &'static Transform, &'static CharacterCapsule), With<Character>>,
}

impl CharacterTrace<'_, '_> {
    /// Transform персонажа (weak lookup: None если уже despawn).
    pub fn transform(&self, character: Entity) -> Option<&Transform> {
        self.characters.get(character).ok().map(|(_, transform, _)| transform)
    }
}

impl HitResolver for CharacterTrace<'_, '_> {
    fn query_nearest_opponent(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_range: f32,
        exclude: Entity,
    ) -> Option<HitResult> {
        trace_capsules(
            origin,
            direction,
            max_range,
            self.characters
                .iter()
                .filter(|(entity, _, _)| *entity != exclude)
                .map(|(entity, transform, capsule)| (entity, transform.translation, *capsule)),
        )
    }
}

/// Ближайшая капсула на луче `origin + direction * t`, `t ∈ [0, max_range]`.
///
/// `direction` должен быть нормализован. Старт внутри капсулы: попадание на t = 0.
pub fn trace_capsules(
    origin: Vec3,
    direction: Vec3,
    max_range: f32,
    candidates: impl IntoIterator<Item = (Entity, Vec3, CharacterCapsule)>,
) -> Option<HitResult> {
    let trace_end = origin + direction * max_range;
    let mut best: Option<HitResult> = None;

    for (entity, center, capsule) in candidates {
        let half = capsule.segment_half_length();
        let a = center - Vec3::Y * half;
        let b = center + Vec3::Y * half;

        let Some(distance) = ray_capsule(origin, direction, a, b, capsule.radius) else {
            continue;
        };
        if distance > max_range {
            continue;
        }
        if best.as_ref().is_some_and(|hit| hit.distance <= distance) {
            continue;
        }

        let impact_point = origin + direction * distance;
        let axis_point = closest_point_on_segment(impact_point, a, b);
        let impact_normal = (impact_point - axis_point).try_normalize().unwrap_or(-direction);

        best = Some(HitResult {
            actor: entity,
            distance,
            impact_point,
            impact_normal,
            trace_start: origin,
            trace_end,
        });
    }

    best
}

/// Ray vs capsule (сегмент `a-b`, радиус `r`). Возвращает t входа (≥ 0).
fn ray_capsule(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, r: f32) -> Option<f32> {
    if origin.distance_squared(closest_point_on_segment(origin, a, b)) <= r * r {
        return Some(0.0);
    }

    let ba = b - a;
    let baba = ba.dot(ba);
    if baba <= f32::EPSILON {
        return ray_sphere(origin, direction, a, r);
    }

    // Бесконечный цилиндр вдоль оси, затем проверка что вход внутри сегмента.
    let oa = origin - a;
    let bard = ba.dot(direction);
    let baoa = ba.dot(oa);
    let rdoa = direction.dot(oa);
    let oaoa = oa.dot(oa);

    let qa = baba - bard * bard;
    let qb = baba * rdoa - baoa * bard;
    let qc = baba * oaoa - baoa * baoa - r * r * baba;

    let mut best: Option<f32> = None;
    if qa > f32::EPSILON {
        let h = qb * qb - qa * qc;
        if h >= 0.0 {
            let t = (-qb - h.sqrt()) / qa;
            let y = baoa + t * bard;
            if t >= 0.0 && y > 0.0 && y < baba {
                best = Some(t);
            }
        }
    }

    // Полусферы на концах.
    for cap in [a, b] {
        if let Some(t) = ray_sphere(origin, direction, cap, r) {
            best = Some(best.map_or(t, |current| current.min(t)));
        }
    }

    best
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, r: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.dot(oc) - r * r;
    let h = b * b - c;
    if h < 0.0 {
        return None;
    }
    let t = -b - h.sqrt();
    (t >= 0.0).then_some(t)
}

fn closest_point_on_segment(point: Vec3, a: Vec3, b: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}
