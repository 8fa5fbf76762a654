use async_trait::async_trait;

use journey_client::{FeedClient, FeedClientResult, FeedPage, Post, TopicDraft};

use crate::cache::FeedParams;

/// Источник данных ленты: реализуется боевым [`FeedClient`] и фейками в тестах.
#[async_trait]
pub trait TopicsApi: Send + Sync + 'static {
    /// Есть ли токен для защищённых операций: мутации без него
    /// перехватываются до обращения к сети.
    fn is_authenticated(&self) -> bool;

    async fn list_topics(&self, params: &FeedParams, page: u32) -> FeedClientResult<FeedPage>;
    async fn get_topic(&self, id: &str) -> FeedClientResult<Post>;
    async fn create_topic(&self, draft: &TopicDraft) -> FeedClientResult<Post>;
    async fn update_topic(&self, id: &str, draft: &TopicDraft) -> FeedClientResult<Post>;
    async fn like_topic(&self, id: &str) -> FeedClientResult<Post>;
    async fn unlike_topic(&self, id: &str) -> FeedClientResult<Post>;
    async fn save_topic(&self, id: &str) -> FeedClientResult<Post>;
    async fn unsave_topic(&self, id: &str) -> FeedClientResult<Post>;
}

#[async_trait]
impl TopicsApi for FeedClient {
    fn is_authenticated(&self) -> bool {
        FeedClient::is_authenticated(self)
    }

    async fn list_topics(&self, params: &FeedParams, page: u32) -> FeedClientResult<FeedPage> {
        FeedClient::list_topics(
            self,
            page,
            params.size,
            params.sort.as_deref(),
            params.tag.as_deref(),
        )
        .await
    }

    async fn get_topic(&self, id: &str) -> FeedClientResult<Post> {
        FeedClient::get_topic(self, id).await
    }

    async fn create_topic(&self, draft: &TopicDraft) -> FeedClientResult<Post> {
        FeedClient::create_topic(self, draft).await
    }

    async fn update_topic(&self, id: &str, draft: &TopicDraft) -> FeedClientResult<Post> {
        FeedClient::update_topic(self, id, draft).await
    }

    async fn like_topic(&self, id: &str) -> FeedClientResult<Post> {
        FeedClient::like_topic(self, id).await
    }

    async fn unlike_topic(&self, id: &str) -> FeedClientResult<Post> {
        FeedClient::unlike_topic(self, id).await
    }

    async fn save_topic(&self, id: &str) -> FeedClientResult<Post> {
        FeedClient::save_topic(self, id).await
    }

    async fn unsave_topic(&self, id: &str) -> FeedClientResult<Post> {
        FeedClient::unsave_topic(self, id).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use journey_client::{Author, FeedClientError, FeedClientResult, FeedPage, Post, TopicDraft};

    use super::TopicsApi;
    use crate::cache::FeedParams;

    pub(crate) fn sample_post(id: &str, likes: u32) -> Post {
        Post {
            id: id.to_string(),
            title: format!("title {id}"),
            content: format!("content {id}"),
            images: Vec::new(),
            author: Author {
                id: "u-1".to_string(),
                name: "marina".to_string(),
                avatar: None,
            },
            tags: Vec::new(),
            likes,
            comments: 0,
            saves: 0,
            is_liked: false,
            is_saved: false,
            created_at: Utc
                .timestamp_opt(1_750_000_000, 0)
                .single()
                .expect("valid ts"),
            location: None,
        }
    }

    pub(crate) fn sample_page(page: u32, total_pages: u32, ids: &[&str]) -> FeedPage {
        FeedPage {
            items: ids.iter().map(|id| sample_post(id, 0)).collect(),
            page,
            total: u64::from(total_pages) * ids.len() as u64,
            total_pages,
        }
    }

    #[derive(Clone)]
    pub(crate) struct FakeApi {
        authenticated: Arc<Mutex<bool>>,
        pages: Arc<Mutex<Vec<FeedPage>>>,
        topics: Arc<Mutex<HashMap<String, Post>>>,
        list_calls: Arc<Mutex<Vec<u32>>>,
        mutation_calls: Arc<Mutex<Vec<String>>>,
        list_failures_left: Arc<Mutex<u32>>,
        fail_mutations: Arc<Mutex<bool>>,
        list_delay: Arc<Mutex<Duration>>,
    }

    impl FakeApi {
        pub(crate) fn new() -> Self {
            Self {
                authenticated: Arc::new(Mutex::new(true)),
                pages: Arc::new(Mutex::new(Vec::new())),
                topics: Arc::new(Mutex::new(HashMap::new())),
                list_calls: Arc::new(Mutex::new(Vec::new())),
                mutation_calls: Arc::new(Mutex::new(Vec::new())),
                list_failures_left: Arc::new(Mutex::new(0)),
                fail_mutations: Arc::new(Mutex::new(false)),
                list_delay: Arc::new(Mutex::new(Duration::ZERO)),
            }
        }

        pub(crate) fn with_pages(pages: Vec<FeedPage>) -> Self {
            let fake = Self::new();
            {
                let mut topics = fake.topics.lock().expect("topics mutex poisoned");
                for page in &pages {
                    for post in &page.items {
                        topics.insert(post.id.clone(), post.clone());
                    }
                }
            }
            *fake.pages.lock().expect("pages mutex poisoned") = pages;
            fake
        }

        pub(crate) fn set_authenticated(&self, value: bool) {
            *self.authenticated.lock().expect("auth mutex poisoned") = value;
        }

        pub(crate) fn set_topic(&self, post: Post) {
            self.topics
                .lock()
                .expect("topics mutex poisoned")
                .insert(post.id.clone(), post);
        }

        pub(crate) fn server_topic(&self, id: &str) -> Option<Post> {
            self.topics
                .lock()
                .expect("topics mutex poisoned")
                .get(id)
                .cloned()
        }

        pub(crate) fn fail_next_lists(&self, count: u32) {
            *self
                .list_failures_left
                .lock()
                .expect("failures mutex poisoned") = count;
        }

        pub(crate) fn fail_mutations(&self, value: bool) {
            *self
                .fail_mutations
                .lock()
                .expect("fail_mutations mutex poisoned") = value;
        }

        pub(crate) fn delay_lists(&self, delay: Duration) {
            *self.list_delay.lock().expect("delay mutex poisoned") = delay;
        }

        pub(crate) fn list_call_pages(&self) -> Vec<u32> {
            self.list_calls
                .lock()
                .expect("list_calls mutex poisoned")
                .clone()
        }

        pub(crate) fn mutation_call_log(&self) -> Vec<String> {
            self.mutation_calls
                .lock()
                .expect("mutation_calls mutex poisoned")
                .clone()
        }

        fn record_mutation(&self, entry: String) -> FeedClientResult<()> {
            self.mutation_calls
                .lock()
                .expect("mutation_calls mutex poisoned")
                .push(entry);
            if *self
                .fail_mutations
                .lock()
                .expect("fail_mutations mutex poisoned")
            {
                return Err(FeedClientError::InvalidRequest(
                    "injected mutation failure".to_string(),
                ));
            }
            Ok(())
        }

        fn patch_topic(
            &self,
            id: &str,
            patch: impl FnOnce(&mut Post),
        ) -> FeedClientResult<Post> {
            let mut topics = self.topics.lock().expect("topics mutex poisoned");
            let post = topics.get_mut(id).ok_or(FeedClientError::NotFound)?;
            patch(post);
            Ok(post.clone())
        }
    }

    #[async_trait]
    impl TopicsApi for FakeApi {
        fn is_authenticated(&self) -> bool {
            *self.authenticated.lock().expect("auth mutex poisoned")
        }

        async fn list_topics(&self, _params: &FeedParams, page: u32) -> FeedClientResult<FeedPage> {
            self.list_calls
                .lock()
                .expect("list_calls mutex poisoned")
                .push(page);

            let delay = *self.list_delay.lock().expect("delay mutex poisoned");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            {
                let mut failures = self
                    .list_failures_left
                    .lock()
                    .expect("failures mutex poisoned");
                if *failures > 0 {
                    *failures -= 1;
                    return Err(FeedClientError::InvalidRequest(
                        "injected list failure".to_string(),
                    ));
                }
            }

            let pages = self.pages.lock().expect("pages mutex poisoned");
            pages
                .get((page.max(1) - 1) as usize)
                .cloned()
                .ok_or(FeedClientError::NotFound)
        }

        async fn get_topic(&self, id: &str) -> FeedClientResult<Post> {
            self.topics
                .lock()
                .expect("topics mutex poisoned")
                .get(id)
                .cloned()
                .ok_or(FeedClientError::NotFound)
        }

        async fn create_topic(&self, draft: &TopicDraft) -> FeedClientResult<Post> {
            self.record_mutation(format!("create:{}", draft.title))?;

            let id = {
                let topics = self.topics.lock().expect("topics mutex poisoned");
                format!("t-new-{}", topics.len() + 1)
            };
            let mut post = sample_post(&id, 0);
            post.title = draft.title.clone();
            post.content = draft.content.clone();
            post.tags = draft.tags.clone();
            post.location = draft.location.clone();
            self.set_topic(post.clone());
            Ok(post)
        }

        async fn update_topic(&self, id: &str, draft: &TopicDraft) -> FeedClientResult<Post> {
            self.record_mutation(format!("update:{id}"))?;
            self.patch_topic(id, |post| {
                post.title = draft.title.clone();
                post.content = draft.content.clone();
                post.tags = draft.tags.clone();
            })
        }

        async fn like_topic(&self, id: &str) -> FeedClientResult<Post> {
            self.record_mutation(format!("like:{id}"))?;
            self.patch_topic(id, |post| {
                post.is_liked = true;
                post.likes += 1;
            })
        }

        async fn unlike_topic(&self, id: &str) -> FeedClientResult<Post> {
            self.record_mutation(format!("unlike:{id}"))?;
            self.patch_topic(id, |post| {
                post.is_liked = false;
                post.likes = post.likes.saturating_sub(1);
            })
        }

        async fn save_topic(&self, id: &str) -> FeedClientResult<Post> {
            self.record_mutation(format!("save:{id}"))?;
            self.patch_topic(id, |post| {
                post.is_saved = true;
                post.saves += 1;
            })
        }

        async fn unsave_topic(&self, id: &str) -> FeedClientResult<Post> {
            self.record_mutation(format!("unsave:{id}"))?;
            self.patch_topic(id, |post| {
                post.is_saved = false;
                post.saves = post.saves.saturating_sub(1);
            })
        }
    }
}
