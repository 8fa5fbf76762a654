use journey_client::{FeedClient, TopicDraft};

#[tokio::test]
#[ignore = "requires running API server and a registered user"]
async fn http_smoke_flow() {
    let base_url =
        std::env::var("JOURNEY_HTTP_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string());
    let username = std::env::var("JOURNEY_USERNAME").unwrap_or_else(|_| "demo".to_string());
    let password = std::env::var("JOURNEY_PASSWORD").unwrap_or_else(|_| "password123".to_string());

    let mut client = FeedClient::new(base_url);

    let auth = client
        .login(&username, &password)
        .await
        .expect("login must succeed");
    assert!(!auth.access_token.is_empty());
    assert!(client.is_authenticated());

    let me = client.me().await.expect("me must succeed");
    assert_eq!(me.id, auth.user.id);

    let draft = TopicDraft {
        title: "smoke title".to_string(),
        content: "smoke content".to_string(),
        tags: vec!["smoke".to_string()],
        location: None,
    };
    let created = client
        .create_topic(&draft)
        .await
        .expect("create_topic must succeed");
    assert_eq!(created.title, "smoke title");
    assert_eq!(created.author.id, me.id);

    let fetched = client
        .get_topic(&created.id)
        .await
        .expect("get_topic must succeed");
    assert_eq!(fetched.id, created.id);

    let listed = client
        .list_topics(1, 20, None, None)
        .await
        .expect("list_topics must succeed");
    assert!(listed.items.iter().any(|post| post.id == created.id));

    let liked = client
        .like_topic(&created.id)
        .await
        .expect("like_topic must succeed");
    assert!(liked.is_liked);
    assert_eq!(liked.likes, fetched.likes + 1);

    let unliked = client
        .unlike_topic(&created.id)
        .await
        .expect("unlike_topic must succeed");
    assert!(!unliked.is_liked);
    assert_eq!(unliked.likes, fetched.likes);

    let saved = client
        .save_topic(&created.id)
        .await
        .expect("save_topic must succeed");
    assert!(saved.is_saved);

    let unsaved = client
        .unsave_topic(&created.id)
        .await
        .expect("unsave_topic must succeed");
    assert!(!unsaved.is_saved);
}
