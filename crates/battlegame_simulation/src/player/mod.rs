//! Player controller: локальный input → команды серверу
//!
//! Input layer (движок) пишет `AttackPressed` / `DebugDamagePressed`.
//! Controller не решает ничего сам: на сервере (listen) команда сразу
//! попадает в inbound, на клиенте: в outbound к серверу.

use bevy::prelude::*;

use crate::net::{ClientCommand, CommandChannel, CommandEnvelope, NetId, NetRole, DEBUG_SELF_DAMAGE};
use crate::BattleSet;

/// Маркер: персонаж, которым управляет этот процесс.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct LocalPlayer;

/// Input: нажата кнопка атаки.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct AttackPressed;

/// Input: debug-кнопка self-damage.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct DebugDamagePressed;

/// System: forward локального input в command channel.
///
/// Одно нажатие = одна команда (reliable).
pub fn forward_local_input(
    role: Res<NetRole>,
    mut attack_pressed: EventReader<AttackPressed>,
    mut debug_pressed: EventReader<DebugDamagePressed>,
    local_players: Query<&NetId, With<LocalPlayer>>,
    mut channel: ResMut<CommandChannel>,
) {
    let commands: Vec<ClientCommand> = attack_pressed
        .read()
        .map(|_| ClientCommand::RequestAttack)
        .chain(debug_pressed.read().map(|_| ClientCommand::DebugSelfDamage {
            amount: DEBUG_SELF_DAMAGE,
        }))
        .collect();

    if commands.is_empty() {
        return;
    }

    let Ok(sender) = local_players.single() else {
        crate::logger::log_warning("Input without a single possessed LocalPlayer ignored");
        return;
    };

    for command in commands {
        let envelope = CommandEnvelope {
            sender: *sender,
            command,
        };
        if role.has_authority() {
            channel.deliver(envelope);
        } else {
            channel.send(envelope);
        }
    }
}

pub struct PlayerPlugin;

impl Plugin for PlayerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AttackPressed>()
            .add_event::<DebugDamagePressed>()
            .add_systems(FixedUpdate, forward_local_input.in_set(BattleSet::Input));
    }
}
