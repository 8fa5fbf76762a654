//! Восстановление позиции прокрутки при повторной активации страницы.
//!
//! Страницы приложения не уничтожаются при навигации, а замораживаются и
//! оживают снова, поэтому жизненный цикл здесь двухфазный: `suspend`
//! (страница уходит с экрана, состояние сохраняется) и `resume` (страница
//! возвращается, сохранённое смещение применяется до первой отрисовки).
//!
//! Машина состояний на ключ страницы:
//! - `Idle` — отложенных записей нет;
//! - `PendingRestore` — страница активируется, смещение ещё не применено;
//! - `Dirty` — пользователь прокрутил, взведена отложенная запись.
//!
//! `resume` синхронный: контейнер со смещением никогда не показывается в
//! позиции (0,0) перед восстановлением — смещение доступно до кадра, без
//! асинхронного зазора.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use crate::error::{FeedError, FeedResult};
use crate::storage::{ScrollOffset, ScrollStorage};

/// Задержка отложенной записи смещения.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Фаза страницы в машине состояний прокрутки.
pub enum ScrollPhase {
    /// Отложенных записей нет, страница на экране.
    Idle,
    /// Страница активируется; сохранённое смещение ещё не применено.
    PendingRestore,
    /// Был скролл; запись взведена и ждёт окончания debounce-окна.
    Dirty,
}

#[derive(Debug, Default)]
struct TrackerInner {
    offsets: HashMap<String, ScrollOffset>,
    phases: HashMap<String, ScrollPhase>,
    generations: HashMap<String, u64>,
}

/// Хранитель позиций прокрутки всех страниц процесса.
#[derive(Debug)]
pub struct ScrollTracker {
    storage: Arc<ScrollStorage>,
    inner: Arc<Mutex<TrackerInner>>,
    debounce: Duration,
}

impl Clone for ScrollTracker {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            inner: Arc::clone(&self.inner),
            debounce: self.debounce,
        }
    }
}

impl ScrollTracker {
    /// Создаёт хранитель над файловым хранилищем с задержкой по умолчанию.
    pub fn new(storage: ScrollStorage) -> Self {
        Self::with_debounce(storage, DEFAULT_DEBOUNCE)
    }

    /// Создаёт хранитель с заданной задержкой отложенной записи.
    pub fn with_debounce(storage: ScrollStorage, debounce: Duration) -> Self {
        let offsets = storage.load();
        Self {
            storage: Arc::new(storage),
            inner: Arc::new(Mutex::new(TrackerInner {
                offsets,
                phases: HashMap::new(),
                generations: HashMap::new(),
            })),
            debounce,
        }
    }

    /// Текущая фаза страницы.
    pub fn phase(&self, key: &str) -> ScrollPhase {
        let inner = self.inner.lock().expect("scroll lock poisoned");
        if let Some(phase) = inner.phases.get(key) {
            *phase
        } else if inner.offsets.contains_key(key) {
            ScrollPhase::PendingRestore
        } else {
            ScrollPhase::Idle
        }
    }

    /// Сохранённое смещение страницы, если есть.
    pub fn offset(&self, key: &str) -> Option<ScrollOffset> {
        let inner = self.inner.lock().expect("scroll lock poisoned");
        inner.offsets.get(key).copied()
    }

    /// Активация страницы: синхронно возвращает сохранённое смещение.
    ///
    /// Вызывающая сторона обязана применить смещение до первой отрисовки
    /// контейнера. Переводит страницу в `Idle`.
    pub fn resume(&self, key: &str) -> Option<ScrollOffset> {
        let mut inner = self.inner.lock().expect("scroll lock poisoned");
        inner.phases.insert(key.to_string(), ScrollPhase::Idle);
        inner.offsets.get(key).copied()
    }

    /// Событие прокрутки: запоминает смещение и взводит отложенную запись.
    ///
    /// Каждый новый скролл сдвигает запись ещё на debounce-окно; на диск
    /// уходит только последнее смещение. Требует работающий tokio runtime.
    pub fn on_scroll(&self, key: &str, x: f64, y: f64) {
        let generation = {
            let mut inner = self.inner.lock().expect("scroll lock poisoned");
            inner.offsets.insert(
                key.to_string(),
                ScrollOffset {
                    x,
                    y,
                    timestamp: Utc::now(),
                },
            );
            inner.phases.insert(key.to_string(), ScrollPhase::Dirty);
            let generation = inner.generations.entry(key.to_string()).or_insert(0);
            *generation += 1;
            *generation
        };

        let tracker = self.clone();
        let key = key.to_string();
        let debounce = self.debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            tracker.flush_if_current(&key, generation);
        });
    }

    /// Деактивация страницы: немедленно сбрасывает отложенную запись и
    /// переводит страницу в ожидание восстановления.
    pub fn suspend(&self, key: &str) -> FeedResult<()> {
        let to_save = {
            let mut inner = self.inner.lock().expect("scroll lock poisoned");
            let dirty = inner.phases.get(key) == Some(&ScrollPhase::Dirty);
            // отменяем взведённый таймер: его поколение устарело
            if let Some(generation) = inner.generations.get_mut(key) {
                *generation += 1;
            }
            inner
                .phases
                .insert(key.to_string(), ScrollPhase::PendingRestore);
            dirty.then(|| inner.offsets.clone())
        };

        if let Some(offsets) = to_save {
            self.storage
                .save(&offsets)
                .map_err(|err| FeedError::Storage(err.to_string()))?;
        }
        Ok(())
    }

    fn flush_if_current(&self, key: &str, generation: u64) {
        let to_save = {
            let mut inner = self.inner.lock().expect("scroll lock poisoned");
            if inner.generations.get(key).copied() != Some(generation) {
                return;
            }
            inner.phases.insert(key.to_string(), ScrollPhase::Idle);
            inner.offsets.clone()
        };

        if let Err(err) = self.storage.save(&to_save) {
            warn!("failed to persist scroll offsets: {err}");
        }
    }
}
