//! Network boundary: authority vs presentation
//!
//! Архитектура:
//! - Server (authority): принимает команды, мутирует AttackState/Health
//! - Client (presentation): шлёт команды, применяет реплику Health + FX события
//! - Единственная точка пересечения: каналы (CommandChannel / NotificationChannel)
//!
//! Транспорт внешний. Каналы это очереди, которые транспорт (или `loopback`)
//! переносит между мирами. Payload'ы serde-сериализуемы.

use std::collections::{HashMap, VecDeque};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::{take_damage, DamageDealt, DamageRequest, HitPresentation, RequestAttack};
use crate::components::{DamageKind, Health, Invulnerable};
use crate::BattleSet;

pub mod loopback;

/// Урон debug-команды контроллера (self-damage для проверки репликации).
pub const DEBUG_SELF_DAMAGE: f32 = 20.0;

/// Роль процесса.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetRole {
    /// Authority (dedicated или listen server)
    #[default]
    Server,
    /// Presentation only
    Client,
}

impl NetRole {
    pub fn has_authority(&self) -> bool {
        matches!(self, NetRole::Server)
    }
}

/// Сетевая идентичность персонажа (одинакова в мирах сервера и клиентов).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct NetId(pub u64);

/// NetId → Entity в текущем мире.
#[derive(Resource, Debug, Default)]
pub struct NetIdIndex {
    by_id: HashMap<NetId, Entity>,
}

impl NetIdIndex {
    pub fn entity(&self, id: NetId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Client → Server (reliable, ordered).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClientCommand {
    /// Начать атаку своим персонажем
    RequestAttack,
    /// Debug: нанести урон своему персонажу
    DebugSelfDamage { amount: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Персонаж отправителя
    pub sender: NetId,
    pub command: ClientCommand,
}

/// Server → все observers. Только косметика + реплика Health.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    AttackAttempted {
        attacker: NetId,
    },
    AttackSucceeded {
        attacker: NetId,
        target: NetId,
        hit: HitPresentation,
    },
    HealthChanged {
        character: NetId,
        current: f32,
        max: f32,
    },
}

/// Очереди команд. `outbound` идёт к серверу, `inbound` хранит принятые сервером.
#[derive(Resource, Debug, Default)]
pub struct CommandChannel {
    inbound: VecDeque<CommandEnvelope>,
    outbound: VecDeque<CommandEnvelope>,
}

impl CommandChannel {
    pub fn send(&mut self, envelope: CommandEnvelope) {
        self.outbound.push_back(envelope);
    }

    pub fn deliver(&mut self, envelope: CommandEnvelope) {
        self.inbound.push_back(envelope);
    }

    pub fn drain_outbound(&mut self) -> Vec<CommandEnvelope> {
        self.outbound.drain(..).collect()
    }

    pub fn drain_inbound(&mut self) -> Vec<CommandEnvelope> {
        self.inbound.drain(..).collect()
    }
}

/// Multicast канал уведомлений.
///
/// На сервере `multicast` кладёт сообщение и в outbound (клиентам), и в
/// inbound (сервер сам observer). Клиент получает только через `deliver`.
#[derive(Resource, Debug, Default)]
pub struct NotificationChannel {
    inbound: VecDeque<ServerMessage>,
    outbound: Vec<ServerMessage>,
}

impl NotificationChannel {
    pub fn multicast(&mut self, message: ServerMessage) {
        self.outbound.push(message);
        self.inbound.push_back(message);
    }

    pub fn deliver(&mut self, message: ServerMessage) {
        self.inbound.push_back(message);
    }

    pub fn drain_outbound(&mut self) -> Vec<ServerMessage> {
        std::mem::take(&mut self.outbound)
    }

    pub fn outbound(&self) -> &[ServerMessage] {
        &self.outbound
    }
}

/// FX событие: атака начата (все observers).
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AttackAttemptedFx {
    pub attacker: Entity,
}

/// FX событие: атака попала.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AttackSucceededFx {
    pub attacker: Entity,
    /// None если цель на этом observer'е уже не существует
    pub target: Option<Entity>,
    pub hit: HitPresentation,
}

/// Net Plugin: каналы, роль, NetId index, репликация.
///
/// Роль по умолчанию: Server; клиентский app вставляет `NetRole::Client`.
pub struct NetPlugin;

impl Plugin for NetPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<NetRole>()
            .init_resource::<NetIdIndex>()
            .init_resource::<CommandChannel>()
            .init_resource::<NotificationChannel>()
            .add_event::<AttackAttemptedFx>()
            .add_event::<AttackSucceededFx>();

        app.add_systems(
            FixedUpdate,
            (
                index_net_ids.in_set(BattleSet::Index),
                receive_client_commands.in_set(BattleSet::Receive),
                (replicate_health, apply_server_messages)
                    .chain()
                    .in_set(BattleSet::Replicate),
            ),
        );
    }
}

/// System: поддержка NetId → Entity.
pub fn index_net_ids(
    mut index: ResMut<NetIdIndex>,
    added: Query<(Entity, &NetId), Added<NetId>>,
    mut removed: RemovedComponents<NetId>,
) {
    for entity in removed.read() {
        index.by_id.retain(|_, indexed| *indexed != entity);
    }

    for (entity, net_id) in added.iter() {
        if let Some(previous) = index.by_id.insert(*net_id, entity) {
            if previous != entity {
                crate::logger::log_warning(&format!(
                    "NetId {:?} re-bound: {:?} → {:?}",
                    net_id, previous, entity
                ));
            }
        }
    }
}

/// System (server): принятые команды → RequestAttack / debug damage.
///
/// Отправитель без персонажа → команда отбрасывается.
pub fn receive_client_commands(
    role: Res<NetRole>,
    mut channel: ResMut<CommandChannel>,
    index: Res<NetIdIndex>,
    mut requests: EventWriter<RequestAttack>,
    mut damage_dealt: EventWriter<DamageDealt>,
    mut healths: Query<(&mut Health, Has<Invulnerable>)>,
) {
    if !role.has_authority() {
        return;
    }

    for envelope in channel.drain_inbound() {
        let Some(character) = index.entity(envelope.sender) else {
            crate::logger::log_warning(&format!(
                "Command {:?} from unknown character {:?} dropped",
                envelope.command, envelope.sender
            ));
            continue;
        };

        match envelope.command {
            ClientCommand::RequestAttack => {
                requests.write(RequestAttack { character });
            }
            ClientCommand::DebugSelfDamage { amount } => {
                let Ok((mut health, invulnerable)) = healths.get_mut(character) else {
                    continue;
                };
                let request = DamageRequest {
                    amount,
                    kind: DamageKind::Generic,
                    instigator: None,
                    causer: None,
                };
                let applied = take_damage(&mut health, &request, invulnerable);
                damage_dealt.write(DamageDealt {
                    target: character,
                    instigator: None,
                    kind: request.kind,
                    requested: amount,
                    applied,
                    health_after: health.current,
                });
                crate::logger::log(&format!(
                    "🩸 Debug self-damage {:?}: {:.1} (HP: {:.1})",
                    character, applied, health.current
                ));
            }
        }
    }
}

/// System (server): изменившееся Health → HealthChanged всем observers.
pub fn replicate_health(
    role: Res<NetRole>,
    mut channel: ResMut<NotificationChannel>,
    changed: Query<(&NetId, &Health), Changed<Health>>,
) {
    if !role.has_authority() {
        return;
    }

    let mut updates: Vec<_> = changed.iter().collect();
    updates.sort_by_key(|(net_id, _)| **net_id);

    for (net_id, health) in updates {
        channel.multicast(ServerMessage::HealthChanged {
            character: *net_id,
            current: health.current,
            max: health.max,
        });
    }
}

/// System (все роли): входящие уведомления → FX события + реплика Health.
///
/// HealthChanged на сервере игнорируется (он и есть источник).
pub fn apply_server_messages(
    role: Res<NetRole>,
    mut channel: ResMut<NotificationChannel>,
    index: Res<NetIdIndex>,
    mut attempted: EventWriter<AttackAttemptedFx>,
    mut succeeded: EventWriter<AttackSucceededFx>,
    mut healths: Query<&mut Health>,
) {
    while let Some(message) = channel.inbound.pop_front() {
        match message {
            ServerMessage::AttackAttempted { attacker } => {
                if let Some(attacker) = index.entity(attacker) {
                    attempted.write(AttackAttemptedFx { attacker });
                }
            }
            ServerMessage::AttackSucceeded { attacker, target, hit } => {
                if let Some(attacker) = index.entity(attacker) {
                    succeeded.write(AttackSucceededFx {
                        attacker,
                        target: index.entity(target),
                        hit,
                    });
                }
            }
            ServerMessage::HealthChanged { character, current, max } => {
                if role.has_authority() {
                    continue;
                }
                let Some(entity) = index.entity(character) else {
                    continue;
                };
                if let Ok(mut health) = healths.get_mut(entity) {
                    health.current = current;
                    health.max = max;
                }
            }
        }
    }
}
