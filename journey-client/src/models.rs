use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FeedClientError, FeedClientResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публичная модель автора топика (и текущего пользователя).
pub struct Author {
    /// Идентификатор пользователя.
    pub id: String,
    /// Отображаемое имя.
    pub name: String,
    /// URL аватара, если загружен.
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Изображение топика.
///
/// `width`/`height` заполняются только строго положительными значениями:
/// по ним считается соотношение сторон для раскладки до загрузки картинки.
pub struct PostImage {
    /// Идентификатор изображения.
    pub id: String,
    /// URL полноразмерного изображения.
    pub url: String,
    /// Ширина в пикселях.
    pub width: Option<u32>,
    /// Высота в пикселях.
    pub height: Option<u32>,
    /// Blurhash-превью, показывается до загрузки изображения.
    pub blurhash: Option<String>,
    /// MIME-тип.
    pub content_type: Option<String>,
    /// Имя исходного файла.
    pub name: Option<String>,
}

impl PostImage {
    /// Соотношение сторон (`width / height`), если известны оба размера.
    pub fn aspect_ratio(&self) -> Option<f64> {
        match (self.width, self.height) {
            (Some(width), Some(height)) if height > 0 => {
                Some(f64::from(width) / f64::from(height))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Публичная модель поста ленты (бэкенд называет его "topic").
pub struct Post {
    /// Идентификатор, стабильный на всё время жизни кэша.
    pub id: String,
    /// Заголовок.
    pub title: String,
    /// Текст поста.
    pub content: String,
    /// Изображения поста.
    pub images: Vec<PostImage>,
    /// Автор.
    pub author: Author,
    /// Теги.
    pub tags: Vec<String>,
    /// Количество лайков.
    pub likes: u32,
    /// Количество комментариев.
    pub comments: u32,
    /// Количество добавлений в закладки.
    pub saves: u32,
    /// Лайкнул ли пост текущий пользователь.
    pub is_liked: bool,
    /// Добавил ли пост в закладки текущий пользователь.
    pub is_saved: bool,
    /// Дата и время создания (UTC).
    pub created_at: DateTime<Utc>,
    /// Место, к которому привязан пост.
    pub location: Option<String>,
}

impl Post {
    /// Локальная оценка популярности: лайки + комментарии + закладки.
    ///
    /// Используется только для отображения ("trending"), кэш не меняет.
    pub fn popularity(&self) -> u64 {
        u64::from(self.likes) + u64::from(self.comments) + u64::from(self.saves)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Одна страница ленты.
pub struct FeedPage {
    /// Посты страницы в серверном порядке.
    pub items: Vec<Post>,
    /// Номер страницы, начиная с 1.
    pub page: u32,
    /// Общее количество постов в выборке.
    pub total: u64,
    /// Общее количество страниц.
    pub total_pages: u32,
}

impl FeedPage {
    /// Есть ли следующая страница.
    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Ответ после успешного входа.
pub struct AuthResponse {
    /// Bearer-токен для последующих запросов.
    pub access_token: String,
    /// Профиль вошедшего пользователя.
    pub user: Author,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Черновик топика для создания или обновления.
pub struct TopicDraft {
    /// Заголовок.
    pub title: String,
    /// Текст.
    pub content: String,
    /// Теги.
    pub tags: Vec<String>,
    /// Привязка к месту.
    pub location: Option<String>,
}

impl TopicDraft {
    /// Валидирует и нормализует черновик.
    ///
    /// Невалидный черновик не должен попадать в сеть: ошибки валидации
    /// возвращаются до отправки запроса.
    pub fn validate(self) -> FeedClientResult<Self> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            content: normalize_content(&self.content)?,
            tags: normalize_tags(self.tags),
            location: normalize_location(self.location),
        })
    }
}

fn normalize_title(title: &str) -> FeedClientResult<String> {
    let title = title.trim();
    if title.is_empty() || title.len() > 255 {
        return Err(FeedClientError::Validation {
            field: "title",
            message: "must be 1..255 chars",
        });
    }
    Ok(title.to_string())
}

fn normalize_content(content: &str) -> FeedClientResult<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(FeedClientError::Validation {
            field: "content",
            message: "must not be empty",
        });
    }
    Ok(content.to_string())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || normalized.iter().any(|existing| existing == tag) {
            continue;
        }
        normalized.push(tag.to_string());
    }
    normalized
}

fn normalize_location(location: Option<String>) -> Option<String> {
    let location = location?.trim().to_string();
    if location.is_empty() {
        return None;
    }
    Some(location)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> TopicDraft {
        TopicDraft {
            title: "  Утро в горах  ".to_string(),
            content: "  первый свет над перевалом  ".to_string(),
            tags: vec!["  горы ".to_string(), String::new(), "горы".to_string()],
            location: Some("  Домбай ".to_string()),
        }
    }

    #[test]
    fn draft_validate_normalizes_fields() {
        let draft = sample_draft().validate().expect("draft must validate");
        assert_eq!(draft.title, "Утро в горах");
        assert_eq!(draft.content, "первый свет над перевалом");
        assert_eq!(draft.tags, vec!["горы".to_string()]);
        assert_eq!(draft.location.as_deref(), Some("Домбай"));
    }

    #[test]
    fn draft_validate_rejects_blank_title() {
        let mut draft = sample_draft();
        draft.title = "   ".to_string();

        let err = draft.validate().expect_err("title must be rejected");
        assert!(matches!(
            err,
            FeedClientError::Validation { field: "title", .. }
        ));
    }

    #[test]
    fn draft_validate_rejects_blank_content() {
        let mut draft = sample_draft();
        draft.content = "   ".to_string();

        let err = draft.validate().expect_err("content must be rejected");
        assert!(matches!(
            err,
            FeedClientError::Validation {
                field: "content",
                ..
            }
        ));
    }

    #[test]
    fn draft_validate_drops_blank_location() {
        let mut draft = sample_draft();
        draft.location = Some("   ".to_string());

        let draft = draft.validate().expect("draft must validate");
        assert!(draft.location.is_none());
    }

    #[test]
    fn has_next_page_is_derived_from_page_and_total_pages() {
        let mut page = FeedPage {
            items: Vec::new(),
            page: 2,
            total: 25,
            total_pages: 3,
        };
        assert!(page.has_next_page());

        page.page = 3;
        assert!(!page.has_next_page());
    }

    #[test]
    fn aspect_ratio_requires_both_dimensions() {
        let image = PostImage {
            id: "i1".to_string(),
            url: "https://cdn.example.com/i1.jpg".to_string(),
            width: Some(1600),
            height: Some(900),
            blurhash: None,
            content_type: Some("image/jpeg".to_string()),
            name: None,
        };
        let ratio = image.aspect_ratio().expect("ratio must be known");
        assert!((ratio - 16.0 / 9.0).abs() < 1e-9);

        let no_height = PostImage {
            height: None,
            ..image.clone()
        };
        assert!(no_height.aspect_ratio().is_none());
    }

    #[test]
    fn popularity_sums_all_counters() {
        let post = Post {
            id: "t1".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            images: Vec::new(),
            author: Author {
                id: "u1".to_string(),
                name: "u".to_string(),
                avatar: None,
            },
            tags: Vec::new(),
            likes: 3,
            comments: 2,
            saves: 1,
            is_liked: false,
            is_saved: false,
            created_at: Utc::now(),
            location: None,
        };
        assert_eq!(post.popularity(), 6);
    }
}
