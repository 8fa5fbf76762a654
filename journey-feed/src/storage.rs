//! Долговременное хранилище позиций прокрутки.
//!
//! Все позиции лежат в одном JSON-файле как словарь
//! `ключ страницы -> {x, y, timestamp}`, поэтому переживают полный
//! перезапуск приложения. Нечитаемый или испорченный файл считается
//! пустым хранилищем: восстановление позиции деградирует мягко и никогда
//! не падает.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// Сохранённое смещение прокрутки одной страницы.
pub struct ScrollOffset {
    /// Горизонтальное смещение.
    pub x: f64,
    /// Вертикальное смещение.
    pub y: f64,
    /// Момент последней записи (UTC).
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
/// Файловое хранилище словаря смещений.
pub struct ScrollStorage {
    path: PathBuf,
}

impl ScrollStorage {
    /// Хранилище в указанном файле; файл создаётся при первой записи.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Загружает словарь смещений; отсутствие или порча файла дают пустой
    /// словарь.
    pub fn load(&self) -> HashMap<String, ScrollOffset> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        parse_offsets(&raw)
    }

    /// Записывает словарь смещений целиком.
    pub fn save(&self, offsets: &HashMap<String, ScrollOffset>) -> io::Result<()> {
        let raw = serde_json::to_string(offsets).map_err(io::Error::other)?;
        fs::write(&self.path, raw)
    }
}

fn parse_offsets(raw: &str) -> HashMap<String, ScrollOffset> {
    match serde_json::from_str(raw) {
        Ok(offsets) => offsets,
        Err(err) => {
            warn!("corrupt scroll storage, starting empty: {err}");
            HashMap::new()
        }
    }
}
