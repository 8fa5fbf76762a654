use reqwest::{Client, Method};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;

use crate::error::{FeedClientError, FeedClientResult};
use crate::models::{AuthResponse, Author, FeedPage, Post, TopicDraft};
use crate::wire::{AuthResponseDto, EnvelopeDto, PageDto, TopicDto, UserDto, unwrap_envelope};

#[derive(Debug, Serialize)]
struct LoginRequestDto<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct TopicPayloadDto<'a> {
    title: &'a str,
    content: &'a str,
    tags: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
}

impl<'a> TopicPayloadDto<'a> {
    fn from_draft(draft: &'a TopicDraft) -> Self {
        Self {
            title: &draft.title,
            content: &draft.content,
            tags: &draft.tags,
            location: draft.location.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct ListTopicsQuery<'a> {
    page: u32,
    size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
}

#[derive(Debug, Clone)]
/// HTTP-клиент для работы с REST API ленты.
pub(crate) struct HttpClient {
    base_url: String,
    client: Client,
}

impl HttpClient {
    /// Создаёт новый HTTP-клиент с базовым URL сервера.
    pub(crate) fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("failed to build reqwest client");

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn decode_error(response: reqwest::Response) -> FeedClientError {
        let status = response.status();

        let message = match response.json::<EnvelopeDto<serde_json::Value>>().await {
            Ok(envelope) => envelope.message,
            Err(_) => None,
        };
        FeedClientError::from_http_status(status, message)
    }

    async fn decode_envelope<T>(response: reqwest::Response) -> FeedClientResult<T>
    where
        T: DeserializeOwned,
    {
        if !response.status().is_success() {
            return Err(Self::decode_error(response).await);
        }

        let envelope = response
            .json::<EnvelopeDto<T>>()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        unwrap_envelope(envelope)
    }

    /// универсальный helper для отправки запросов с json-payload
    async fn send_json<TReq, TRes>(
        &self,
        method: Method,
        path: &str,
        body: &TReq,
        token: Option<&str>,
    ) -> FeedClientResult<TRes>
    where
        TReq: Serialize,
        TRes: DeserializeOwned,
    {
        let url = self.endpoint(path);

        let mut request = self.client.request(method, url).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        Self::decode_envelope(response).await
    }

    /// helper для запросов без тела (лайки, закладки, чтение по id)
    async fn send_empty<TRes>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
    ) -> FeedClientResult<TRes>
    where
        TRes: DeserializeOwned,
    {
        let url = self.endpoint(path);

        let mut request = self.client.request(method, url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        Self::decode_envelope(response).await
    }

    /// Выполняет вход и возвращает токен вместе с профилем пользователя.
    pub(crate) async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> FeedClientResult<AuthResponse> {
        let payload = LoginRequestDto { username, password };
        let dto: AuthResponseDto = self
            .send_json(Method::POST, "/auth/login", &payload, None)
            .await?;
        Ok(dto.into())
    }

    /// Возвращает профиль текущего пользователя.
    ///
    /// Требует валидный токен.
    pub(crate) async fn me(&self, token: &str) -> FeedClientResult<Author> {
        let dto: UserDto = self
            .send_empty(Method::GET, "/users/me", Some(token))
            .await?;
        Ok(dto.into())
    }

    /// Возвращает страницу ленты с параметрами `page/size/sort/tag`.
    ///
    /// Токен не обязателен: без него бэкенд отдаёт ленту без
    /// пользовательских флагов `liked`/`collected`.
    pub(crate) async fn list_topics(
        &self,
        page: u32,
        size: u32,
        sort: Option<&str>,
        tag: Option<&str>,
        token: Option<&str>,
    ) -> FeedClientResult<FeedPage> {
        let url = self.endpoint("/topics");
        let query = ListTopicsQuery {
            page,
            size,
            sort,
            tag,
        };

        let mut request = self.client.request(Method::GET, url).query(&query);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(FeedClientError::from_reqwest)?;
        let dto: PageDto = Self::decode_envelope(response).await?;
        Ok(dto.into())
    }

    /// Получает топик по идентификатору.
    pub(crate) async fn get_topic(&self, id: &str, token: Option<&str>) -> FeedClientResult<Post> {
        let dto: TopicDto = self
            .send_empty(Method::GET, &format!("/topics/{id}"), token)
            .await?;
        Ok(dto.into())
    }

    /// Создаёт топик от имени авторизованного пользователя.
    ///
    /// Требует валидный токен.
    pub(crate) async fn create_topic(
        &self,
        token: &str,
        draft: &TopicDraft,
    ) -> FeedClientResult<Post> {
        let payload = TopicPayloadDto::from_draft(draft);
        let dto: TopicDto = self
            .send_json(Method::POST, "/topics", &payload, Some(token))
            .await?;
        Ok(dto.into())
    }

    /// Обновляет топик по идентификатору.
    ///
    /// Требует валидный токен.
    pub(crate) async fn update_topic(
        &self,
        token: &str,
        id: &str,
        draft: &TopicDraft,
    ) -> FeedClientResult<Post> {
        let payload = TopicPayloadDto::from_draft(draft);
        let dto: TopicDto = self
            .send_json(Method::PUT, &format!("/topics/{id}"), &payload, Some(token))
            .await?;
        Ok(dto.into())
    }

    /// Ставит лайк и возвращает актуальное состояние топика.
    pub(crate) async fn like_topic(&self, token: &str, id: &str) -> FeedClientResult<Post> {
        let dto: TopicDto = self
            .send_empty(Method::POST, &format!("/topics/{id}/like"), Some(token))
            .await?;
        Ok(dto.into())
    }

    /// Снимает лайк и возвращает актуальное состояние топика.
    pub(crate) async fn unlike_topic(&self, token: &str, id: &str) -> FeedClientResult<Post> {
        let dto: TopicDto = self
            .send_empty(Method::DELETE, &format!("/topics/{id}/like"), Some(token))
            .await?;
        Ok(dto.into())
    }

    /// Добавляет топик в закладки (бэкенд называет операцию "collect").
    pub(crate) async fn save_topic(&self, token: &str, id: &str) -> FeedClientResult<Post> {
        let dto: TopicDto = self
            .send_empty(Method::POST, &format!("/topics/{id}/collect"), Some(token))
            .await?;
        Ok(dto.into())
    }

    /// Убирает топик из закладок.
    pub(crate) async fn unsave_topic(&self, token: &str, id: &str) -> FeedClientResult<Post> {
        let dto: TopicDto = self
            .send_empty(Method::DELETE, &format!("/topics/{id}/collect"), Some(token))
            .await?;
        Ok(dto.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_normalizes_slashes() {
        let client = HttpClient::new("http://localhost:8080/");
        let full = client.endpoint("/topics");
        assert_eq!(full, "http://localhost:8080/topics");
    }

    #[test]
    fn topic_payload_borrows_draft_fields() {
        let draft = TopicDraft {
            title: "Ночной город".to_string(),
            content: "огни набережной".to_string(),
            tags: vec!["город".to_string()],
            location: None,
        };

        let payload = TopicPayloadDto::from_draft(&draft);
        assert_eq!(payload.title, "Ночной город");
        assert!(payload.location.is_none());

        let raw = serde_json::to_value(&payload).expect("payload must serialize");
        assert!(
            raw.get("location").is_none(),
            "absent location must be skipped"
        );
    }

    #[test]
    fn list_topics_query_skips_empty_filters() {
        let query = ListTopicsQuery {
            page: 2,
            size: 10,
            sort: None,
            tag: None,
        };

        let raw = serde_json::to_value(&query).expect("query must serialize");
        assert_eq!(raw.get("page").and_then(|v| v.as_u64()), Some(2));
        assert!(raw.get("sort").is_none());
        assert!(raw.get("tag").is_none());
    }
}
