//! Синхронизация ленты и сохранение состояния просмотра.
//!
//! Ядро клиентской части сервиса "journey": кэш запросов со схемой
//! stale-while-revalidate поверх [`journey_client::FeedClient`],
//! бесконечная лента со склейкой страниц, оптимистичные мутации с откатом
//! и восстановление позиции прокрутки при повторной активации страницы.
//!
//! Хранение нормализовано: каноническая запись топика одна на процесс,
//! списки ссылаются на неё по идентификатору. Все общие структуры
//! создаются явно и передаются зависимостям — глобального состояния в
//! библиотеке нет.

mod api;
mod cache;
mod error;
mod feed;
mod layout;
mod mutation;
mod scroll;
mod storage;

pub use api::TopicsApi;
pub use cache::{
    DEFAULT_FRESH_FOR, DEFAULT_RETRY_LIMIT, FeedParams, FeedSnapshot, PageSlice, QueryCache,
    QueryKey,
};
pub use error::{FeedError, FeedResult};
pub use feed::FeedQuery;
pub use layout::{GridTemplate, cell_aspect, grid_template, hidden_count};
pub use mutation::Mutations;
pub use scroll::{DEFAULT_DEBOUNCE, ScrollPhase, ScrollTracker};
pub use storage::{ScrollOffset, ScrollStorage};
