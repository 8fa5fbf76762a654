//! Клиентская библиотека для работы с REST API сервиса "journey".
//!
//! Оборачивает HTTP-вызовы бэкенда (`reqwest`), разворачивает конверт
//! `{code, message, result}` и преобразует wire-формат топиков в модели
//! представления (`Post`, `PostImage`, `FeedPage`).
//!
//! Клиент хранит bearer-токен после `login` и автоматически использует его
//! в защищённых операциях. Мутации без токена отклоняются до обращения к
//! сети: вызывающая сторона обязана показать форму входа, а не ловить
//! сетевую ошибку.
#![warn(missing_docs)]

mod error;
mod http_client;
mod models;
mod wire;

pub use error::{FeedClientError, FeedClientResult};
pub use models::{Author, AuthResponse, FeedPage, Post, PostImage, TopicDraft};

use http_client::HttpClient;

#[derive(Debug, Clone)]
/// Клиент ленты: единая точка входа для чтения и мутаций.
pub struct FeedClient {
    http_client: HttpClient,
    token: Option<String>,
}

impl FeedClient {
    /// Создаёт клиент с базовым URL сервера, например `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(base_url),
            token: None,
        }
    }

    /// Устанавливает bearer-токен вручную (например, прочитанный с диска).
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Возвращает текущий токен, если он установлен.
    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Очищает сохранённый токен.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Есть ли у клиента токен для защищённых операций.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Выполняет вход и сохраняет полученный токен в клиенте.
    pub async fn login(&mut self, username: &str, password: &str) -> FeedClientResult<AuthResponse> {
        let result = self.http_client.login(username, password).await?;
        self.token = Some(result.access_token.clone());
        Ok(result)
    }

    /// Возвращает профиль текущего пользователя.
    ///
    /// Требует установленный токен.
    pub async fn me(&self) -> FeedClientResult<Author> {
        let token = self.require_token()?;
        self.http_client.me(token).await
    }

    /// Возвращает страницу ленты.
    ///
    /// `page` нумеруется с 1; `sort` и `tag` — необязательные серверные
    /// фильтры. Токен подставляется, если установлен: с ним бэкенд
    /// заполняет пользовательские флаги `is_liked`/`is_saved`.
    pub async fn list_topics(
        &self,
        page: u32,
        size: u32,
        sort: Option<&str>,
        tag: Option<&str>,
    ) -> FeedClientResult<FeedPage> {
        self.http_client
            .list_topics(page, size, sort, tag, self.get_token())
            .await
    }

    /// Возвращает топик по идентификатору.
    pub async fn get_topic(&self, id: &str) -> FeedClientResult<Post> {
        self.http_client.get_topic(id, self.get_token()).await
    }

    /// Создаёт новый топик.
    ///
    /// Черновик валидируется локально; невалидный черновик не уходит в
    /// сеть. Требует установленный токен.
    pub async fn create_topic(&self, draft: &TopicDraft) -> FeedClientResult<Post> {
        let draft = draft.clone().validate()?;
        let token = self.require_token()?;
        self.http_client.create_topic(token, &draft).await
    }

    /// Обновляет топик по идентификатору.
    ///
    /// Черновик валидируется локально. Требует установленный токен.
    pub async fn update_topic(&self, id: &str, draft: &TopicDraft) -> FeedClientResult<Post> {
        let draft = draft.clone().validate()?;
        let token = self.require_token()?;
        self.http_client.update_topic(token, id, &draft).await
    }

    /// Ставит лайк. Требует установленный токен.
    pub async fn like_topic(&self, id: &str) -> FeedClientResult<Post> {
        let token = self.require_token()?;
        self.http_client.like_topic(token, id).await
    }

    /// Снимает лайк. Требует установленный токен.
    pub async fn unlike_topic(&self, id: &str) -> FeedClientResult<Post> {
        let token = self.require_token()?;
        self.http_client.unlike_topic(token, id).await
    }

    /// Добавляет топик в закладки. Требует установленный токен.
    pub async fn save_topic(&self, id: &str) -> FeedClientResult<Post> {
        let token = self.require_token()?;
        self.http_client.save_topic(token, id).await
    }

    /// Убирает топик из закладок. Требует установленный токен.
    pub async fn unsave_topic(&self, id: &str) -> FeedClientResult<Post> {
        let token = self.require_token()?;
        self.http_client.unsave_topic(token, id).await
    }

    fn require_token(&self) -> FeedClientResult<&str> {
        self.token.as_deref().ok_or(FeedClientError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_roundtrip() {
        let mut client = FeedClient::new("http://127.0.0.1:8080");
        assert!(!client.is_authenticated());

        client.set_token("abc.def");
        assert!(client.is_authenticated());
        assert_eq!(client.get_token(), Some("abc.def"));

        client.clear_token();
        assert!(client.get_token().is_none());
    }

    #[tokio::test]
    async fn protected_operations_fail_before_network_without_token() {
        // Адрес заведомо не открыт: если бы клиент пошёл в сеть,
        // ошибка была бы транспортной, а не Unauthorized.
        let client = FeedClient::new("http://127.0.0.1:1");

        let err = client
            .like_topic("t-1")
            .await
            .expect_err("like without token must fail");
        assert!(matches!(err, FeedClientError::Unauthorized));

        let draft = TopicDraft {
            title: "t".to_string(),
            content: "c".to_string(),
            tags: Vec::new(),
            location: None,
        };
        let err = client
            .create_topic(&draft)
            .await
            .expect_err("create without token must fail");
        assert!(matches!(err, FeedClientError::Unauthorized));
    }

    #[tokio::test]
    async fn create_topic_rejects_invalid_draft_before_token_check() {
        let client = FeedClient::new("http://127.0.0.1:1");

        let draft = TopicDraft {
            title: "   ".to_string(),
            content: "c".to_string(),
            tags: Vec::new(),
            location: None,
        };
        let err = client
            .create_topic(&draft)
            .await
            .expect_err("blank title must fail");
        assert!(matches!(
            err,
            FeedClientError::Validation { field: "title", .. }
        ));
    }
}
