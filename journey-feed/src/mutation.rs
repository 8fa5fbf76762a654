//! Координаторы мутаций: действие пользователя превращается в запрос к
//! серверу и немедленную оптимистичную правку кэша.
//!
//! Флаг отношения и счётчик всегда меняются одной атомарной правкой, иначе
//! счётчик на экране разойдётся с состоянием кнопки. При ошибке сервера
//! восстанавливается снимок, сделанный до правки, и ошибка отдаётся
//! вызывающей стороне.

use tracing::debug;

use journey_client::{Post, TopicDraft};

use crate::api::TopicsApi;
use crate::cache::QueryCache;
use crate::error::{FeedError, FeedResult};

/// Мутации поверх кэша: лайки, закладки, создание и обновление топиков.
pub struct Mutations<A: TopicsApi> {
    cache: QueryCache<A>,
}

impl<A: TopicsApi> Mutations<A> {
    /// Создаёт координатор над общим кэшем приложения.
    pub fn new(cache: QueryCache<A>) -> Self {
        Self { cache }
    }

    /// Переключает лайк топика.
    ///
    /// Без токена действие перехватывается до сети: вызывающая сторона
    /// обязана показать форму входа.
    pub async fn toggle_like(&self, id: &str) -> FeedResult<Post> {
        self.require_login()?;

        let snapshot = self
            .cache
            .topic_snapshot(id)
            .ok_or_else(|| FeedError::MissingTopic(id.to_string()))?;
        let was_liked = snapshot.is_liked;

        self.cache.update_post(id, |post| {
            if was_liked {
                post.is_liked = false;
                post.likes = post.likes.saturating_sub(1);
            } else {
                post.is_liked = true;
                post.likes += 1;
            }
        });

        let result = if was_liked {
            self.cache.api().unlike_topic(id).await
        } else {
            self.cache.api().like_topic(id).await
        };

        match result {
            Ok(post) => {
                self.cache.apply_server_post(post.clone());
                Ok(post)
            }
            Err(err) => {
                debug!(id, "like toggle failed, rolling back: {err}");
                self.cache.restore_post(snapshot);
                Err(err.into())
            }
        }
    }

    /// Переключает закладку топика. Поведение зеркально `toggle_like`.
    pub async fn toggle_save(&self, id: &str) -> FeedResult<Post> {
        self.require_login()?;

        let snapshot = self
            .cache
            .topic_snapshot(id)
            .ok_or_else(|| FeedError::MissingTopic(id.to_string()))?;
        let was_saved = snapshot.is_saved;

        self.cache.update_post(id, |post| {
            if was_saved {
                post.is_saved = false;
                post.saves = post.saves.saturating_sub(1);
            } else {
                post.is_saved = true;
                post.saves += 1;
            }
        });

        let result = if was_saved {
            self.cache.api().unsave_topic(id).await
        } else {
            self.cache.api().save_topic(id).await
        };

        match result {
            Ok(post) => {
                self.cache.apply_server_post(post.clone());
                Ok(post)
            }
            Err(err) => {
                debug!(id, "save toggle failed, rolling back: {err}");
                self.cache.restore_post(snapshot);
                Err(err.into())
            }
        }
    }

    /// Создаёт топик: валидация локально, затем запрос и вставка ответа в
    /// кэш (в начало первой страницы каждой ленты).
    pub async fn create_topic(&self, draft: &TopicDraft) -> FeedResult<Post> {
        let draft = draft.clone().validate()?;
        self.require_login()?;

        let post = self.cache.api().create_topic(&draft).await?;
        self.cache.insert_new_post(post.clone());
        Ok(post)
    }

    /// Обновляет топик: оптимистичная правка закэшированной записи,
    /// откат при ошибке, сверка с ответом сервера при успехе.
    pub async fn update_topic(&self, id: &str, draft: &TopicDraft) -> FeedResult<Post> {
        let draft = draft.clone().validate()?;
        self.require_login()?;

        let snapshot = self.cache.topic_snapshot(id);
        if snapshot.is_some() {
            self.cache.update_post(id, |post| {
                post.title = draft.title.clone();
                post.content = draft.content.clone();
                post.tags = draft.tags.clone();
            });
        }

        match self.cache.api().update_topic(id, &draft).await {
            Ok(post) => {
                self.cache.apply_server_post(post.clone());
                Ok(post)
            }
            Err(err) => {
                if let Some(snapshot) = snapshot {
                    debug!(id, "update failed, rolling back: {err}");
                    self.cache.restore_post(snapshot);
                }
                Err(err.into())
            }
        }
    }

    fn require_login(&self) -> FeedResult<()> {
        if self.cache.api().is_authenticated() {
            Ok(())
        } else {
            Err(FeedError::LoginRequired)
        }
    }
}
