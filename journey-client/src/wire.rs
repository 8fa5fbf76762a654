//! Wire-формат бэкенда и преобразование в модели представления.
//!
//! Бэкенд отдаёт топики в конверте `{code, message, result}`; здесь
//! описаны DTO этого формата и чистые конверсии в [`Post`]/[`PostImage`].
//! Конверсии идемпотентны: один и тот же DTO всегда даёт структурно
//! одинаковую модель.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{FeedClientError, FeedClientResult};
use crate::models::{AuthResponse, Author, FeedPage, Post, PostImage};

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct EnvelopeDto<T> {
    pub(crate) code: i64,
    #[serde(default)]
    pub(crate) message: Option<String>,
    #[serde(default)]
    pub(crate) result: Option<T>,
}

/// Разворачивает конверт: `code != 200` — прикладная ошибка даже при HTTP 200.
pub(crate) fn unwrap_envelope<T>(envelope: EnvelopeDto<T>) -> FeedClientResult<T> {
    if envelope.code != 200 {
        return Err(FeedClientError::from_envelope(
            envelope.code,
            envelope.message,
        ));
    }
    envelope
        .result
        .ok_or_else(|| FeedClientError::Decode("envelope result is missing".to_string()))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicImageDto {
    pub(crate) id: String,
    pub(crate) url: String,
    #[serde(default)]
    pub(crate) width: Option<i64>,
    #[serde(default)]
    pub(crate) height: Option<i64>,
    #[serde(default)]
    pub(crate) blurhash: Option<String>,
    #[serde(rename = "type", default)]
    pub(crate) content_type: Option<String>,
    #[serde(default)]
    pub(crate) name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicDto {
    pub(crate) id: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) content: String,
    #[serde(default)]
    pub(crate) images: Vec<TopicImageDto>,
    pub(crate) user: UserDto,
    #[serde(default)]
    pub(crate) tags: Vec<String>,
    #[serde(default)]
    pub(crate) like_count: i64,
    #[serde(default)]
    pub(crate) comment_count: i64,
    #[serde(default)]
    pub(crate) collect_count: i64,
    #[serde(default)]
    pub(crate) liked: bool,
    #[serde(default)]
    pub(crate) collected: bool,
    pub(crate) created_at: DateTime<Utc>,
    #[serde(default)]
    pub(crate) location: Option<String>,
}

// Поля meta бэкенд отдаёт в смешанном стиле: часть snake_case, часть camelCase.
#[derive(Debug, Deserialize)]
pub(crate) struct PageMetaDto {
    pub(crate) current_page: u32,
    #[allow(dead_code)]
    pub(crate) size: u32,
    #[serde(rename = "totalElements")]
    pub(crate) total_elements: i64,
    #[serde(rename = "totalPages")]
    pub(crate) total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageDto {
    #[serde(default)]
    pub(crate) data: Vec<TopicDto>,
    pub(crate) meta: PageMetaDto,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthResponseDto {
    pub(crate) access_token: String,
    pub(crate) user: UserDto,
}

impl From<UserDto> for Author {
    fn from(value: UserDto) -> Self {
        Self {
            id: value.id,
            name: value.name,
            avatar: value.avatar,
        }
    }
}

impl From<TopicImageDto> for PostImage {
    fn from(value: TopicImageDto) -> Self {
        Self {
            id: value.id,
            url: value.url,
            width: positive_dimension(value.width),
            height: positive_dimension(value.height),
            blurhash: value.blurhash,
            content_type: value.content_type,
            name: value.name,
        }
    }
}

impl From<TopicDto> for Post {
    fn from(value: TopicDto) -> Self {
        Self {
            id: value.id,
            title: value.title,
            content: value.content,
            images: value.images.into_iter().map(PostImage::from).collect(),
            author: Author::from(value.user),
            tags: value.tags,
            likes: clamp_count(value.like_count),
            comments: clamp_count(value.comment_count),
            saves: clamp_count(value.collect_count),
            is_liked: value.liked,
            is_saved: value.collected,
            created_at: value.created_at,
            location: value.location,
        }
    }
}

impl From<PageDto> for FeedPage {
    fn from(value: PageDto) -> Self {
        Self {
            items: value.data.into_iter().map(Post::from).collect(),
            page: value.meta.current_page.max(1),
            total: value.meta.total_elements.max(0) as u64,
            total_pages: value.meta.total_pages,
        }
    }
}

impl From<AuthResponseDto> for AuthResponse {
    fn from(value: AuthResponseDto) -> Self {
        Self {
            access_token: value.access_token,
            user: Author::from(value.user),
        }
    }
}

fn positive_dimension(value: Option<i64>) -> Option<u32> {
    value
        .and_then(|value| u32::try_from(value).ok())
        .filter(|value| *value > 0)
}

fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
