//! Attack schedule: таблица отложенных задач, ключ = персонаж
//!
//! Владеет всеми таймерами атак. Handles отменяемы; уничтожение персонажа
//! отменяет все его задачи (`cancel_all`), поздний callback не срабатывает.
//! BTreeMap + монотонные handles → детерминированный порядок срабатывания.

use std::collections::BTreeMap;
use std::time::Duration;

use bevy::prelude::*;

/// Handle отложенной задачи. Не переиспользуется.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Что делать при срабатывании.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Конец cooldown → персонаж снова может атаковать
    CooldownExpired,
    /// Hit-scan + damage
    ResolveAttack,
}

/// Сработавшая задача (возвращается из `tick`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTask {
    pub character: Entity,
    pub handle: TimerHandle,
    pub kind: TaskKind,
}

#[derive(Debug)]
struct ScheduledTask {
    handle: TimerHandle,
    kind: TaskKind,
    timer: Timer,
}

/// Per-character scheduled-task table.
#[derive(Resource, Debug, Default)]
pub struct AttackSchedule {
    next_handle: u64,
    tasks: BTreeMap<Entity, Vec<ScheduledTask>>,
}

impl AttackSchedule {
    /// Single-shot задача через `delay`.
    ///
    /// Zero delay не срабатывает никогда (как у движкового timer service),
    /// вызывающий обязан выполнить действие синхронно. Возвращает None.
    pub fn schedule(&mut self, character: Entity, kind: TaskKind, delay: Duration) -> Option<TimerHandle> {
        if delay.is_zero() {
            return None;
        }

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        self.tasks.entry(character).or_default().push(ScheduledTask {
            handle,
            kind,
            timer: Timer::new(delay, TimerMode::Once),
        });

        Some(handle)
    }

    /// Отменить задачу. false: уже сработала или отменена.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let mut emptied = None;
        let mut found = false;

        for (character, tasks) in self.tasks.iter_mut() {
            if let Some(index) = tasks.iter().position(|task| task.handle == handle) {
                tasks.remove(index);
                found = true;
                if tasks.is_empty() {
                    emptied = Some(*character);
                }
                break;
            }
        }

        if let Some(character) = emptied {
            self.tasks.remove(&character);
        }

        found
    }

    /// Отменить все задачи персонажа (destruction). Возвращает число отменённых.
    pub fn cancel_all(&mut self, character: Entity) -> usize {
        self.tasks.remove(&character).map_or(0, |tasks| tasks.len())
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.tasks
            .values()
            .any(|tasks| tasks.iter().any(|task| task.handle == handle))
    }

    /// Оставшееся время задачи (None: нет такой).
    pub fn remaining(&self, handle: TimerHandle) -> Option<Duration> {
        self.tasks
            .values()
            .flat_map(|tasks| tasks.iter())
            .find(|task| task.handle == handle)
            .map(|task| task.timer.remaining())
    }

    /// Число ожидающих задач персонажа.
    pub fn pending_for(&self, character: Entity) -> usize {
        self.tasks.get(&character).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Продвинуть все таймеры на `delta`, забрать сработавшие.
    ///
    /// Порядок: по персонажу, внутри персонажа по handle (порядку постановки).
    pub fn tick(&mut self, delta: Duration) -> Vec<FiredTask> {
        let mut fired = Vec::new();

        for (character, tasks) in self.tasks.iter_mut() {
            tasks.retain_mut(|task| {
                task.timer.tick(delta);
                if task.timer.finished() {
                    fired.push(FiredTask {
                        character: *character,
                        handle: task.handle,
                        kind: task.kind,
                    });
                    false
                } else {
                    true
                }
            });
        }

        self.tasks.retain(|_, tasks| !tasks.is_empty());
        fired
    }
}
