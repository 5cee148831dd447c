//! In-process loopback между server app и client apps.
//!
//! Заменяет транспорт в headless режиме и тестах: reliable, ordered, без потерь.

use bevy::prelude::*;

use super::{CommandChannel, NotificationChannel};

/// Client → server: все outbound команды клиентов в inbound сервера.
///
/// Клиенты обходятся по порядку; внутри клиента порядок сохраняется.
pub fn pump_commands(server: &mut App, clients: &mut [App]) -> usize {
    let mut delivered = 0;
    for client in clients.iter_mut() {
        let envelopes = client.world_mut().resource_mut::<CommandChannel>().drain_outbound();
        let mut server_channel = server.world_mut().resource_mut::<CommandChannel>();
        for envelope in envelopes {
            server_channel.deliver(envelope);
            delivered += 1;
        }
    }
    delivered
}

/// Server → clients: multicast всех outbound уведомлений каждому клиенту.
pub fn pump_notifications(server: &mut App, clients: &mut [App]) -> usize {
    let messages = server.world_mut().resource_mut::<NotificationChannel>().drain_outbound();
    for client in clients.iter_mut() {
        let mut client_channel = client.world_mut().resource_mut::<NotificationChannel>();
        for message in &messages {
            client_channel.deliver(*message);
        }
    }
    messages.len()
}
