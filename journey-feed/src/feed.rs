//! Бесконечная лента поверх кэша: склейка страниц и догрузка.

use journey_client::Post;

use crate::api::TopicsApi;
use crate::cache::{FeedParams, FeedSnapshot, QueryCache, QueryKey};
use crate::error::FeedResult;

/// Одна бесконечная лента: ключ кэша плюс правила догрузки страниц.
///
/// Страницы добавляются только в конец; плоский список сохраняет серверный
/// порядок внутри страницы и порядок прихода между страницами.
pub struct FeedQuery<A: TopicsApi> {
    cache: QueryCache<A>,
    params: FeedParams,
}

impl<A: TopicsApi> FeedQuery<A> {
    /// Создаёт ленту для параметров выборки.
    pub fn new(cache: QueryCache<A>, params: FeedParams) -> Self {
        Self { cache, params }
    }

    /// Параметры выборки этой ленты.
    pub fn params(&self) -> &FeedParams {
        &self.params
    }

    /// Ключ кэша этой ленты.
    pub fn key(&self) -> QueryKey {
        QueryKey::Feed(self.params.clone())
    }

    /// Текущий снимок без обращения к сети.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.cache.peek(&self.key())
    }

    /// Читает ленту: из кэша, с фоновой ревалидацией или с загрузкой
    /// первой страницы — по состоянию ключа.
    pub async fn refresh(&self) -> FeedResult<FeedSnapshot> {
        self.cache.feed(&self.params).await
    }

    /// Номер следующей страницы или `None`, когда лента исчерпана.
    ///
    /// `None` — терминальный сигнал: дальнейшие `load_more` не ходят в сеть.
    pub fn next_page(snapshot: &FeedSnapshot) -> Option<u32> {
        if snapshot.last_page == 0 {
            return Some(1);
        }
        if snapshot.has_next_page() {
            Some(snapshot.last_page + 1)
        } else {
            None
        }
    }

    /// Догружает следующую страницу; на исчерпанной ленте — no-op.
    pub async fn load_more(&self) -> FeedResult<FeedSnapshot> {
        let current = self.snapshot();
        match Self::next_page(&current) {
            None => Ok(current),
            Some(1) => self.refresh().await,
            Some(page) => self.cache.load_page(&self.params, page).await,
        }
    }

    /// Сортирует снимок по локальной популярности (лайки + комментарии +
    /// закладки). Преобразование только для показа: кэш не меняется.
    pub fn trending(snapshot: &FeedSnapshot) -> Vec<Post> {
        let mut items = snapshot.items.clone();
        items.sort_by(|a, b| b.popularity().cmp(&a.popularity()));
        items
    }
}
