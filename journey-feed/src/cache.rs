//! Кэш запросов: единственный источник правды для серверных данных.
//!
//! Хранение нормализовано: канонический словарь `id -> Post` плюс
//! постраничные списки идентификаторов на каждый ключ. Логическая сущность
//! живёт ровно в одном месте, поэтому мутация топика видна всем спискам
//! сразу, без обхода всех форм кэша.
//!
//! Чтение работает по схеме stale-while-revalidate: устаревшие данные
//! отдаются немедленно, а ревалидация уходит в фон. Каждая отправка запроса
//! и каждая оптимистичная запись получают номер из монотонного счётчика;
//! ответ, чей номер старше последней применённой записи ключа,
//! отбрасывается как no-op.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use journey_client::{FeedPage, Post};

use crate::api::TopicsApi;
use crate::error::{FeedError, FeedResult};

/// Окно свежести по умолчанию: 5 минут.
pub const DEFAULT_FRESH_FOR: Duration = Duration::from_secs(5 * 60);

/// Количество повторов неудавшегося запроса.
pub const DEFAULT_RETRY_LIMIT: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Параметры выборки ленты; вместе с типом сущности образуют ключ кэша.
pub struct FeedParams {
    /// Размер страницы.
    pub size: u32,
    /// Серверная сортировка.
    pub sort: Option<String>,
    /// Фильтр по тегу.
    pub tag: Option<String>,
}

impl FeedParams {
    /// Параметры с размером страницы и без фильтров.
    pub fn new(size: u32) -> Self {
        Self {
            size,
            sort: None,
            tag: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Структурированный ключ кэша: тип сущности плюс параметры выборки.
pub enum QueryKey {
    /// Бесконечная лента с параметрами.
    Feed(FeedParams),
    /// Одиночный топик.
    Topic(String),
}

#[derive(Debug, Clone)]
/// Одна загруженная страница: номера и идентификаторы, без самих сущностей.
pub struct PageSlice {
    /// Номер страницы, с 1.
    pub page: u32,
    /// Идентификаторы постов в серверном порядке.
    pub ids: Vec<String>,
    /// Общее количество элементов по данным этой страницы.
    pub total: u64,
    /// Общее количество страниц по данным этой страницы.
    pub total_pages: u32,
}

#[derive(Debug, Default)]
struct QueryState {
    pages: Vec<PageSlice>,
    fetched_at: Option<Instant>,
    last_applied_seq: u64,
    error: Option<String>,
    refetching: bool,
    inflight_page: Option<u32>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entities: HashMap<String, Post>,
    topic_fetched_at: HashMap<String, Instant>,
    queries: HashMap<QueryKey, QueryState>,
    seq: u64,
}

impl CacheInner {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn snapshot(&self, key: &QueryKey) -> FeedSnapshot {
        let Some(state) = self.queries.get(key) else {
            return FeedSnapshot::empty();
        };

        let mut items = Vec::new();
        for slice in &state.pages {
            for id in &slice.ids {
                if let Some(post) = self.entities.get(id) {
                    items.push(post.clone());
                }
            }
        }

        let (last_page, total, total_pages) = state
            .pages
            .last()
            .map(|slice| (slice.page, slice.total, slice.total_pages))
            .unwrap_or((0, 0, 0));

        FeedSnapshot {
            items,
            last_page,
            total,
            total_pages,
            error: state.error.clone(),
        }
    }

    /// Применяет страницу, если ответ не устарел относительно последней
    /// записи ключа. Возвращает false для отброшенного ответа.
    fn apply_page(&mut self, key: &QueryKey, ticket: u64, page: FeedPage, replace: bool) -> bool {
        {
            let state = self.queries.entry(key.clone()).or_default();
            if ticket <= state.last_applied_seq {
                return false;
            }
        }

        let slice = PageSlice {
            page: page.page,
            ids: page.items.iter().map(|post| post.id.clone()).collect(),
            total: page.total,
            total_pages: page.total_pages,
        };
        for post in page.items {
            self.entities.insert(post.id.clone(), post);
        }

        let state = self.queries.entry(key.clone()).or_default();
        state.last_applied_seq = ticket;
        state.fetched_at = Some(Instant::now());
        state.error = None;
        if replace {
            state.pages.clear();
        }
        // страница с тем же номером заменяется, а не дублируется
        if let Some(existing) = state.pages.iter_mut().find(|s| s.page == slice.page) {
            *existing = slice;
        } else {
            state.pages.push(slice);
        }
        true
    }

    fn mark_failed(&mut self, key: &QueryKey, message: String) {
        let state = self.queries.entry(key.clone()).or_default();
        state.error = Some(message);
        state.refetching = false;
        state.inflight_page = None;
    }

    /// Помечает все ключи, в чьих страницах есть `id`: более старые ответы
    /// сети не должны перезатирать эту запись.
    fn touch_entity_keys(&mut self, id: &str, seq: u64) {
        for state in self.queries.values_mut() {
            let contains = state
                .pages
                .iter()
                .any(|slice| slice.ids.iter().any(|existing| existing == id));
            if contains {
                state.last_applied_seq = state.last_applied_seq.max(seq);
            }
        }
    }
}

#[derive(Debug, Clone)]
/// Снимок состояния одного ключа ленты для отрисовки.
pub struct FeedSnapshot {
    /// Плоский список постов: серверный порядок внутри страницы, порядок
    /// прихода между страницами.
    pub items: Vec<Post>,
    /// Номер последней загруженной страницы (0, если ничего не загружено).
    pub last_page: u32,
    /// Общее количество постов по данным сервера.
    pub total: u64,
    /// Общее количество страниц по данным сервера.
    pub total_pages: u32,
    /// Ошибка последней загрузки; заполненная ошибка не очищает `items`.
    pub error: Option<String>,
}

impl FeedSnapshot {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            last_page: 0,
            total: 0,
            total_pages: 0,
            error: None,
        }
    }

    /// Есть ли следующая страница.
    pub fn has_next_page(&self) -> bool {
        self.last_page < self.total_pages
    }
}

/// Кэш запросов поверх [`TopicsApi`].
///
/// Создаётся один на приложение и передаётся зависимостям явно; в тестах
/// каждый сценарий строит и разрушает собственный экземпляр.
pub struct QueryCache<A: TopicsApi> {
    api: Arc<A>,
    inner: Arc<Mutex<CacheInner>>,
    fresh_for: Duration,
    retry_limit: u32,
}

impl<A: TopicsApi> Clone for QueryCache<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            inner: Arc::clone(&self.inner),
            fresh_for: self.fresh_for,
            retry_limit: self.retry_limit,
        }
    }
}

impl<A: TopicsApi> QueryCache<A> {
    /// Создаёт кэш с политикой по умолчанию.
    pub fn new(api: A) -> Self {
        Self::with_policy(api, DEFAULT_FRESH_FOR, DEFAULT_RETRY_LIMIT)
    }

    /// Создаёт кэш с заданным окном свежести и лимитом повторов.
    pub fn with_policy(api: A, fresh_for: Duration, retry_limit: u32) -> Self {
        Self {
            api: Arc::new(api),
            inner: Arc::new(Mutex::new(CacheInner::default())),
            fresh_for,
            retry_limit,
        }
    }

    /// Источник данных кэша.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Читает ленту по ключу: свежие данные отдаются из кэша, устаревшие —
    /// тоже, но с ревалидацией в фоне; холодный ключ грузится на месте.
    pub async fn feed(&self, params: &FeedParams) -> FeedResult<FeedSnapshot> {
        let key = QueryKey::Feed(params.clone());

        enum Plan {
            Serve(FeedSnapshot),
            Revalidate(FeedSnapshot, u64),
            Load(u64),
        }

        let plan = {
            let mut inner = self.inner.lock().expect("cache lock poisoned");
            let has_data = inner
                .queries
                .get(&key)
                .map(|state| !state.pages.is_empty())
                .unwrap_or(false);

            if has_data {
                let fresh = inner
                    .queries
                    .get(&key)
                    .and_then(|state| state.fetched_at)
                    .map(|at| at.elapsed() < self.fresh_for)
                    .unwrap_or(false);
                let refetching = inner
                    .queries
                    .get(&key)
                    .map(|state| state.refetching)
                    .unwrap_or(false);

                if fresh || refetching {
                    Plan::Serve(inner.snapshot(&key))
                } else {
                    let ticket = inner.next_seq();
                    inner
                        .queries
                        .get_mut(&key)
                        .expect("feed state must exist")
                        .refetching = true;
                    Plan::Revalidate(inner.snapshot(&key), ticket)
                }
            } else {
                inner.queries.entry(key.clone()).or_default();
                let ticket = inner.next_seq();
                Plan::Load(ticket)
            }
        };

        match plan {
            Plan::Serve(snapshot) => {
                debug!(?key, "serving feed from cache");
                Ok(snapshot)
            }
            Plan::Revalidate(snapshot, ticket) => {
                debug!(?key, "serving stale feed, revalidating in background");
                self.spawn_revalidate(key, params.clone(), ticket);
                Ok(snapshot)
            }
            Plan::Load(ticket) => {
                let page = match self.list_with_retry(params, 1).await {
                    Ok(page) => page,
                    Err(err) => {
                        let mut inner = self.inner.lock().expect("cache lock poisoned");
                        inner.mark_failed(&key, err.to_string());
                        return Err(err.into());
                    }
                };

                let mut inner = self.inner.lock().expect("cache lock poisoned");
                inner.apply_page(&key, ticket, page, true);
                Ok(inner.snapshot(&key))
            }
        }
    }

    /// Догружает страницу `page` для ключа.
    ///
    /// Страница, которая уже загружена или уже грузится, повторно не
    /// запрашивается: гонка двух конкурентных `load_more` не порождает
    /// дублей в ленте.
    pub(crate) async fn load_page(&self, params: &FeedParams, page: u32) -> FeedResult<FeedSnapshot> {
        let key = QueryKey::Feed(params.clone());

        let ticket = {
            let mut inner = self.inner.lock().expect("cache lock poisoned");
            let duplicate = {
                let state = inner.queries.entry(key.clone()).or_default();
                state.pages.iter().any(|slice| slice.page == page)
                    || state.inflight_page == Some(page)
            };
            if duplicate {
                None
            } else {
                let ticket = inner.next_seq();
                inner
                    .queries
                    .get_mut(&key)
                    .expect("feed state must exist")
                    .inflight_page = Some(page);
                Some(ticket)
            }
        };

        let Some(ticket) = ticket else {
            debug!(?key, page, "page already loaded or in flight");
            let inner = self.inner.lock().expect("cache lock poisoned");
            return Ok(inner.snapshot(&key));
        };

        match self.list_with_retry(params, page).await {
            Ok(fetched) => {
                let mut inner = self.inner.lock().expect("cache lock poisoned");
                if let Some(state) = inner.queries.get_mut(&key) {
                    state.inflight_page = None;
                }
                if !inner.apply_page(&key, ticket, fetched, false) {
                    warn!(?key, page, "discarding stale page response");
                }
                Ok(inner.snapshot(&key))
            }
            Err(err) => {
                let mut inner = self.inner.lock().expect("cache lock poisoned");
                inner.mark_failed(&key, err.to_string());
                Err(err.into())
            }
        }
    }

    /// Читает топик по id: из кэша, если свежий, иначе с сервера.
    pub async fn topic(&self, id: &str) -> FeedResult<Post> {
        {
            let inner = self.inner.lock().expect("cache lock poisoned");
            if let Some(post) = inner.entities.get(id) {
                let fresh = inner
                    .topic_fetched_at
                    .get(id)
                    .map(|at| at.elapsed() < self.fresh_for)
                    .unwrap_or(false);
                if fresh {
                    return Ok(post.clone());
                }
            }
        }

        let mut attempt = 0;
        let post = loop {
            match self.api.get_topic(id).await {
                Ok(post) => break post,
                Err(err) if attempt < self.retry_limit => {
                    attempt += 1;
                    debug!(id, attempt, "retrying topic fetch after error: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        };

        self.apply_server_post(post.clone());
        Ok(post)
    }

    /// Текущий снимок ключа без обращения к сети.
    pub fn peek(&self, key: &QueryKey) -> FeedSnapshot {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.snapshot(key)
    }

    /// Снимок топика из канонического словаря.
    pub fn topic_snapshot(&self, id: &str) -> Option<Post> {
        let inner = self.inner.lock().expect("cache lock poisoned");
        inner.entities.get(id).cloned()
    }

    /// Помечает ключ устаревшим: следующее чтение перезапросит данные.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        match key {
            QueryKey::Feed(_) => {
                if let Some(state) = inner.queries.get_mut(key) {
                    state.fetched_at = None;
                }
            }
            QueryKey::Topic(id) => {
                inner.topic_fetched_at.remove(id);
            }
        }
    }

    /// Помечает устаревшими все ключи лент.
    pub fn invalidate_feeds(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        for state in inner.queries.values_mut() {
            state.fetched_at = None;
        }
    }

    /// Синхронно правит страницы ключа; правка атомарна для читателей и
    /// считается новее всех запросов в полёте.
    pub fn write<F>(&self, key: &QueryKey, updater: F)
    where
        F: FnOnce(&mut Vec<PageSlice>),
    {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let seq = inner.next_seq();
        if let Some(state) = inner.queries.get_mut(key) {
            updater(&mut state.pages);
            state.last_applied_seq = seq;
        }
    }

    /// Правит каноническую запись топика; правка видна всем спискам сразу.
    pub fn update_post<F>(&self, id: &str, updater: F) -> Option<Post>
    where
        F: FnOnce(&mut Post),
    {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let seq = inner.next_seq();
        let updated = match inner.entities.get_mut(id) {
            Some(post) => {
                updater(post);
                post.clone()
            }
            None => return None,
        };
        inner.touch_entity_keys(id, seq);
        Some(updated)
    }

    /// Применяет присланное сервером состояние топика (сверка после мутации).
    pub fn apply_server_post(&self, post: Post) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let seq = inner.next_seq();
        let id = post.id.clone();
        inner.entities.insert(id.clone(), post);
        inner.topic_fetched_at.insert(id.clone(), Instant::now());
        inner.touch_entity_keys(&id, seq);
    }

    /// Возвращает топик к снимку до оптимистичной мутации.
    pub fn restore_post(&self, post: Post) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let seq = inner.next_seq();
        let id = post.id.clone();
        inner.entities.insert(id.clone(), post);
        inner.touch_entity_keys(&id, seq);
    }

    /// Вставляет только что созданный топик: в канонический словарь и в
    /// начало первой страницы каждой ленты, сами ленты помечаются
    /// устаревшими для фоновой сверки счётчиков.
    pub fn insert_new_post(&self, post: Post) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let seq = inner.next_seq();
        let id = post.id.clone();
        inner.entities.insert(id.clone(), post);
        for state in inner.queries.values_mut() {
            if let Some(first) = state.pages.first_mut() {
                first.ids.insert(0, id.clone());
                state.last_applied_seq = state.last_applied_seq.max(seq);
            }
            state.fetched_at = None;
        }
    }

    fn spawn_revalidate(&self, key: QueryKey, params: FeedParams, ticket: u64) {
        let cache = self.clone();
        tokio::spawn(async move {
            match cache.list_with_retry(&params, 1).await {
                Ok(page) => {
                    let mut inner = cache.inner.lock().expect("cache lock poisoned");
                    if let Some(state) = inner.queries.get_mut(&key) {
                        state.refetching = false;
                    }
                    if !inner.apply_page(&key, ticket, page, true) {
                        warn!(?key, "discarding stale refetch response");
                    }
                }
                Err(err) => {
                    warn!(?key, "background refetch failed: {err}");
                    let mut inner = cache.inner.lock().expect("cache lock poisoned");
                    inner.mark_failed(&key, err.to_string());
                }
            }
        });
    }

    async fn list_with_retry(
        &self,
        params: &FeedParams,
        page: u32,
    ) -> journey_client::FeedClientResult<FeedPage> {
        let mut attempt = 0;
        loop {
            match self.api.list_topics(params, page).await {
                Ok(fetched) => return Ok(fetched),
                Err(err) if attempt < self.retry_limit => {
                    attempt += 1;
                    debug!(page, attempt, "retrying feed fetch after error: {err}");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<A: TopicsApi> std::fmt::Debug for QueryCache<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("fresh_for", &self.fresh_for)
            .field("retry_limit", &self.retry_limit)
            .finish_non_exhaustive()
    }
}
