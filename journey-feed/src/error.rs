use journey_client::FeedClientError;
use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки слоя синхронизации ленты.
pub enum FeedError {
    /// Ошибка клиента API (транспорт, конверт, валидация).
    #[error(transparent)]
    Client(#[from] FeedClientError),

    /// Действие требует входа; запрос в сеть не отправлялся.
    #[error("login required")]
    LoginRequired,

    /// Топика нет в кэше, оптимистичная мутация невозможна.
    #[error("topic is not cached: {0}")]
    MissingTopic(String),

    /// Не удалось сохранить состояние просмотра на диск.
    #[error("scroll storage error: {0}")]
    Storage(String),
}

/// Результат операций `journey-feed`.
pub type FeedResult<T> = Result<T, FeedError>;
