use thiserror::Error;

#[derive(Debug, Error)]
/// Ошибки клиентской библиотеки `journey-client`.
pub enum FeedClientError {
    /// Ошибка HTTP-транспорта (`reqwest`).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Прикладная ошибка из конверта ответа: HTTP 2xx, но `code != 200`.
    #[error("api error {code}: {message}")]
    Api {
        /// Код из конверта ответа.
        code: i64,
        /// Сообщение из конверта ответа.
        message: String,
    },

    /// Требуется авторизация (отсутствует/некорректен токен).
    #[error("unauthorized")]
    Unauthorized,

    /// Запрошенный ресурс не найден.
    #[error("not found")]
    NotFound,

    /// Некорректный запрос или бизнес-ошибка.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Данные не прошли клиентскую валидацию, запрос не отправлялся.
    #[error("validation failed for '{field}': {message}")]
    Validation {
        /// Поле, не прошедшее валидацию.
        field: &'static str,
        /// Причина отказа.
        message: &'static str,
    },

    /// Не удалось декодировать тело ответа.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Результат операций `journey-client`.
pub type FeedClientResult<T> = Result<T, FeedClientError>;

impl FeedClientError {
    pub(crate) fn from_http_status(status: reqwest::StatusCode, message: Option<String>) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Self::Unauthorized
            }
            reqwest::StatusCode::NOT_FOUND => Self::NotFound,
            _ => {
                let message = message.unwrap_or_else(|| format!("http status {status}"));
                Self::InvalidRequest(message)
            }
        }
    }

    // Бэкенд дублирует коды ошибок внутри конверта даже при HTTP 200.
    pub(crate) fn from_envelope(code: i64, message: Option<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            _ => Self::Api {
                code,
                message: message.unwrap_or_else(|| format!("application code {code}")),
            },
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::from_http_status(status, None);
        }
        Self::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_http_status_maps_auth_statuses() {
        let err = FeedClientError::from_http_status(reqwest::StatusCode::UNAUTHORIZED, None);
        assert!(matches!(err, FeedClientError::Unauthorized));

        let err = FeedClientError::from_http_status(reqwest::StatusCode::FORBIDDEN, None);
        assert!(matches!(err, FeedClientError::Unauthorized));
    }

    #[test]
    fn from_http_status_maps_not_found() {
        let err = FeedClientError::from_http_status(reqwest::StatusCode::NOT_FOUND, None);
        assert!(matches!(err, FeedClientError::NotFound));
    }

    #[test]
    fn from_envelope_maps_auth_codes() {
        let err = FeedClientError::from_envelope(401, None);
        assert!(matches!(err, FeedClientError::Unauthorized));
    }

    #[test]
    fn from_envelope_keeps_code_and_message() {
        let err = FeedClientError::from_envelope(10042, Some("quota exceeded".to_string()));
        match err {
            FeedClientError::Api { code, message } => {
                assert_eq!(code, 10042);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
