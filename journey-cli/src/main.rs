use std::fs;
use std::io;
use std::path::Path;
use std::process;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use journey_client::{FeedClient, FeedClientError, Post, TopicDraft};
use journey_feed::{
    FeedError, FeedParams, FeedQuery, FeedSnapshot, Mutations, QueryCache, ScrollStorage,
    ScrollTracker,
};

const TOKEN_FILE: &str = ".journey_token";
const SCROLL_FILE: &str = ".journey_scroll.json";
const DEFAULT_SERVER: &str = "http://127.0.0.1:8080";

#[derive(Debug, Parser)]
#[command(name = "journey-cli", version, about = "CLI клиент ленты journey")]
struct Cli {
    /// Адрес сервера API (или переменная окружения JOURNEY_SERVER).
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Вход пользователя.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Профиль текущего пользователя (требует токен).
    Me,
    /// Лента топиков.
    Feed {
        #[arg(long, default_value_t = 10)]
        size: u32,
        /// Серверная сортировка, например `latest`.
        #[arg(long)]
        sort: Option<String>,
        /// Фильтр по тегу.
        #[arg(long)]
        tag: Option<String>,
        /// Сколько страниц догрузить.
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Отсортировать показ по популярности (кэш не меняется).
        #[arg(long)]
        trending: bool,
        /// Продолжить с сохранённой позиции просмотра.
        #[arg(long)]
        resume: bool,
    },
    /// Показ топика по id.
    Show {
        #[arg(long)]
        id: String,
    },
    /// Создание топика (требует токен).
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// Обновление топика (требует токен).
    ///
    /// Если `--content` не указан, используется текущий текст топика.
    Update {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Переключение лайка (требует токен).
    Like {
        #[arg(long)]
        id: String,
    },
    /// Переключение закладки (требует токен).
    Save {
        #[arg(long)]
        id: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(err) = init_logging() {
        eprintln!("Ошибка инициализации логирования: {err}");
        process::exit(1);
    }

    if let Err(err) = run().await {
        eprintln!("Ошибка: {err}");
        process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let default_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let server = resolve_server(cli.server, std::env::var("JOURNEY_SERVER").ok());
    tracing::debug!(%server, "using API server");
    let mut client = FeedClient::new(server);

    if let Some(token) = load_token().context("не удалось прочитать .journey_token")? {
        client.set_token(token);
    }

    match cli.command {
        Command::Login { username, password } => {
            let auth = client
                .login(&username, &password)
                .await
                .map_err(map_client_error)?;
            persist_token(&client).context("не удалось сохранить токен")?;
            println!("Вход выполнен");
            println!("user: {} ({})", auth.user.name, auth.user.id);
        }
        Command::Me => {
            let me = client.me().await.map_err(map_client_error)?;
            println!("id: {}", me.id);
            println!("name: {}", me.name);
            if let Some(avatar) = &me.avatar {
                println!("avatar: {avatar}");
            }
        }
        Command::Feed {
            size,
            sort,
            tag,
            pages,
            trending,
            resume,
        } => {
            let params = FeedParams { size, sort, tag };
            let cache = QueryCache::new(client);
            let query = FeedQuery::new(cache.clone(), params.clone());

            let mut snapshot = query.refresh().await.map_err(map_feed_error)?;
            for _ in 1..pages.max(1) {
                snapshot = query.load_more().await.map_err(map_feed_error)?;
            }

            let items = if trending {
                FeedQuery::<FeedClient>::trending(&snapshot)
            } else {
                snapshot.items.clone()
            };

            // позиция просмотра: y хранит количество уже показанных постов
            let tracker = ScrollTracker::new(ScrollStorage::new(SCROLL_FILE));
            let key = feed_scroll_key(&params);
            let start = if resume {
                tracker
                    .resume(&key)
                    .map(|offset| offset.y as usize)
                    .unwrap_or(0)
                    .min(items.len())
            } else {
                0
            };

            print_feed(&snapshot, &items[start..]);

            tracker.on_scroll(&key, 0.0, items.len() as f64);
            tracker
                .suspend(&key)
                .map_err(|err| anyhow!("не удалось сохранить позицию просмотра: {err}"))?;
        }
        Command::Show { id } => {
            let cache = QueryCache::new(client);
            let post = cache.topic(&id).await.map_err(map_feed_error)?;
            print_post("Топик", &post);
        }
        Command::Create {
            title,
            content,
            tags,
            location,
        } => {
            let draft = TopicDraft {
                title,
                content,
                tags,
                location,
            };
            let cache = QueryCache::new(client);
            let mutations = Mutations::new(cache);
            let post = mutations
                .create_topic(&draft)
                .await
                .map_err(map_feed_error)?;
            print_post("Топик создан", &post);
        }
        Command::Update {
            id,
            title,
            content,
            tags,
        } => {
            let cache = QueryCache::new(client);
            let mutations = Mutations::new(cache.clone());

            // Если пользователь не передал --content, сохраняем текущий текст.
            let content = match content {
                Some(content) => content,
                None => cache.topic(&id).await.map_err(map_feed_error)?.content,
            };

            let draft = TopicDraft {
                title,
                content,
                tags,
                location: None,
            };
            let post = mutations
                .update_topic(&id, &draft)
                .await
                .map_err(map_feed_error)?;
            print_post("Топик обновлён", &post);
        }
        Command::Like { id } => {
            let cache = QueryCache::new(client);
            let mutations = Mutations::new(cache.clone());

            cache.topic(&id).await.map_err(map_feed_error)?;
            let post = mutations.toggle_like(&id).await.map_err(map_feed_error)?;
            let state = if post.is_liked { "поставлен" } else { "снят" };
            println!("Лайк {state}: id={}, likes={}", post.id, post.likes);
        }
        Command::Save { id } => {
            let cache = QueryCache::new(client);
            let mutations = Mutations::new(cache.clone());

            cache.topic(&id).await.map_err(map_feed_error)?;
            let post = mutations.toggle_save(&id).await.map_err(map_feed_error)?;
            let state = if post.is_saved {
                "добавлен в закладки"
            } else {
                "убран из закладок"
            };
            println!("Топик {state}: id={}, saves={}", post.id, post.saves);
        }
    }

    Ok(())
}

fn resolve_server(flag: Option<String>, env: Option<String>) -> String {
    let raw = flag
        .or(env)
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    normalize_server(raw)
}

fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn feed_scroll_key(params: &FeedParams) -> String {
    format!(
        "feed:size={};sort={};tag={}",
        params.size,
        params.sort.as_deref().unwrap_or("-"),
        params.tag.as_deref().unwrap_or("-")
    )
}

fn parse_token_content(raw: &str) -> Option<String> {
    let token = raw.trim().to_string();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn load_token() -> io::Result<Option<String>> {
    if !Path::new(TOKEN_FILE).exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(TOKEN_FILE)?;
    Ok(parse_token_content(&raw))
}

fn persist_token(client: &FeedClient) -> io::Result<()> {
    if let Some(token) = client.get_token() {
        fs::write(TOKEN_FILE, token)?;
    }
    Ok(())
}

fn map_client_error(err: FeedClientError) -> anyhow::Error {
    let message = match err {
        FeedClientError::Unauthorized => {
            "требуется вход: выполните `journey-cli login ...`".to_string()
        }
        FeedClientError::NotFound => "ресурс не найден".to_string(),
        FeedClientError::InvalidRequest(message) => format!("некорректный запрос: {message}"),
        FeedClientError::Validation { field, message } => {
            format!("поле `{field}` не прошло проверку: {message}")
        }
        FeedClientError::Api { code, message } => format!("ошибка сервиса ({code}): {message}"),
        FeedClientError::Http(err) => format!("ошибка HTTP: {err}"),
        FeedClientError::Decode(message) => format!("не удалось разобрать ответ: {message}"),
    };
    anyhow!(message)
}

fn map_feed_error(err: FeedError) -> anyhow::Error {
    match err {
        FeedError::Client(err) => map_client_error(err),
        FeedError::LoginRequired => {
            anyhow!("требуется вход: выполните `journey-cli login ...`")
        }
        FeedError::MissingTopic(id) => anyhow!("топик {id} не найден в кэше"),
        FeedError::Storage(message) => anyhow!("ошибка хранилища: {message}"),
    }
}

fn print_post(title: &str, post: &Post) {
    println!("{title}");
    println!("id: {}", post.id);
    println!("title: {}", post.title);
    println!("content: {}", post.content);
    println!("author: {} ({})", post.author.name, post.author.id);
    if !post.tags.is_empty() {
        println!("tags: {}", post.tags.join(", "));
    }
    if let Some(location) = &post.location {
        println!("location: {location}");
    }
    println!(
        "likes: {}, comments: {}, saves: {}",
        post.likes, post.comments, post.saves
    );
    println!("created_at: {}", post.created_at);
}

fn print_feed(snapshot: &FeedSnapshot, items: &[Post]) {
    println!(
        "Постов показано: {} (страниц загружено: {}, всего: {})",
        items.len(),
        snapshot.last_page,
        snapshot.total
    );
    if let Some(error) = &snapshot.error {
        println!("Предупреждение: последняя загрузка не удалась: {error}");
    }

    for post in items {
        let marks = format!(
            "{}{}",
            if post.is_liked { "♥" } else { " " },
            if post.is_saved { "*" } else { " " }
        );
        println!(
            "- [{}]{} {} (likes={}, comments={})",
            post.id, marks, post.title, post.likes, post.comments
        );
    }

    if snapshot.has_next_page() {
        println!("... есть ещё страницы: добавьте --pages");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_server_keeps_scheme() {
        let s = normalize_server("https://example.com:8080".to_string());
        assert_eq!(s, "https://example.com:8080");
    }

    #[test]
    fn normalize_server_adds_http_scheme() {
        let s = normalize_server("127.0.0.1:8080".to_string());
        assert_eq!(s, "http://127.0.0.1:8080");
    }

    #[test]
    fn resolve_server_prefers_flag_over_env() {
        let s = resolve_server(
            Some("localhost:9999".to_string()),
            Some("example.com".to_string()),
        );
        assert_eq!(s, "http://localhost:9999");
    }

    #[test]
    fn resolve_server_falls_back_to_env_then_default() {
        let s = resolve_server(None, Some("example.com".to_string()));
        assert_eq!(s, "http://example.com");

        let s = resolve_server(None, None);
        assert_eq!(s, DEFAULT_SERVER);
    }

    #[test]
    fn feed_scroll_key_is_stable_for_params() {
        let params = FeedParams {
            size: 10,
            sort: Some("latest".to_string()),
            tag: None,
        };
        assert_eq!(feed_scroll_key(&params), "feed:size=10;sort=latest;tag=-");
    }

    #[test]
    fn parse_token_content_trims_whitespace() {
        let token = parse_token_content("  abc.def.ghi  ");
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn parse_token_content_rejects_blank() {
        let token = parse_token_content("   ");
        assert!(token.is_none());
    }
}
