//! Router tests for the news, structured news and expand routes.
//!
//! Upstream vendors are replaced by a mockito server; the provider base URLs
//! point at it.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use mockito::{Matcher, Server, ServerGuard};
use pt_inference::InferenceConfig;
use pt_web::{create_app, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn app_for(server: &ServerGuard, with_keys: bool) -> Router {
    let key = with_keys.then(|| "test-key".to_string());
    let config = InferenceConfig {
        perplexity_api_key: key.clone(),
        perplexity_base_url: Some(server.url()),
        xai_api_key: key,
        xai_base_url: Some(server.url()),
    };
    create_app(AppState::from_config(&config))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_body(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&read_body(body).await).expect("Should parse JSON")
}

fn completion(content: &str) -> String {
    json!({ "choices": [{ "message": { "content": content } }] }).to_string()
}

#[tokio::test]
async fn test_health() {
    let server = Server::new_async().await;
    let app = app_for(&server, false);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_type_is_rejected() {
    let mut server = Server::new_async().await;
    let upstream = server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .oneshot(post_json(
            "/api/news",
            json!({ "messages": [{"role": "user", "content": "hi"}], "type": "poetry" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().starts_with("Invalid type"));
    upstream.assert_async().await;
}

#[tokio::test]
async fn test_missing_messages_is_rejected() {
    let server = Server::new_async().await;
    let app = app_for(&server, true);

    for body in [json!({ "type": "article" }), json!({ "messages": "hi" })] {
        let response = app.clone().oneshot(post_json("/api/news", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Invalid request: messages array is required");
    }

    let request = Request::builder()
        .method("POST")
        .uri("/api/news")
        .body(Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_api_key_makes_no_upstream_call() {
    let mut server = Server::new_async().await;
    let upstream = server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;
    let app = app_for(&server, false);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/news",
            json!({ "messages": [{"role": "user", "content": "hi"}], "type": "headlines" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("PERPLEXITY_API_KEY"));

    let response = app
        .clone()
        .oneshot(post_json("/api/expand", json!({ "headline": "Rates cut" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post_json(
            "/api/news/structured",
            json!({ "type": "headlines", "section": "Sports", "count": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("XAI_API_KEY"));

    upstream.assert_async().await;
}

#[tokio::test]
async fn test_headlines_are_parsed_and_deduplicated_across_calls() {
    let mut server = Server::new_async().await;
    let _upstream = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::Regex(
            "Generate current news headlines for the Technology section".to_string(),
        ))
        .with_status(200)
        .with_body(completion("Here you go:\n1. Chip stocks surge\n2. New phone launched\n\n3. Chip Stocks Surge!"))
        .expect(2)
        .create_async()
        .await;
    let app = app_for(&server, true);
    let request = json!({
        "messages": [{ "role": "user", "content": "Generate current news headlines for the Technology section" }],
        "type": "headlines",
    });

    let response = app.clone().oneshot(post_json("/api/news", request.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "headlines": ["Chip stocks surge", "New phone launched"] }));

    let response = app.oneshot(post_json("/api/news", request)).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "headlines": [] }));
}

#[tokio::test]
async fn test_keywords_and_article_shapes() {
    let mut server = Server::new_async().await;
    let _keywords = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("comma-separated".to_string()))
        .with_status(200)
        .with_body(completion("inflation, central banks , rates,"))
        .create_async()
        .await;
    let _article = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::Regex("professional journalist".to_string()))
        .with_status(200)
        .with_body(completion("Rates were cut today. Markets rose."))
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/news",
            json!({ "messages": [{"role": "user", "content": "Extract keywords"}], "type": "keywords" }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "keywords": ["inflation", "central banks", "rates"] }));

    let response = app
        .oneshot(post_json(
            "/api/news",
            json!({ "messages": [{"role": "user", "content": "Write it"}] }),
        ))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({ "text": "Rates were cut today. Markets rose." }));
}

#[tokio::test]
async fn test_trending_topics() {
    let mut server = Server::new_async().await;
    let _upstream = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion("1) AI rules\n2. Climate summit\n\nSpace launch"))
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .oneshot(post_json(
            "/api/news",
            json!({ "messages": [{"role": "user", "content": "What is trending?"}], "type": "trending" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        json!({ "topics": ["AI rules", "Climate summit", "Space launch"] })
    );
}

#[tokio::test]
async fn test_article_carries_citations() {
    let mut server = Server::new_async().await;
    let _upstream = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(
            json!({
                "choices": [{ "message": { "content": "Rates were cut today." } }],
                "citations": ["https://news.example/rates", "https://news.example/markets"],
            })
            .to_string(),
        )
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .oneshot(post_json(
            "/api/news",
            json!({ "messages": [{"role": "user", "content": "Write it"}], "type": "article" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        json!({
            "text": "Rates were cut today.",
            "citations": ["https://news.example/rates", "https://news.example/markets"],
        })
    );
}

#[tokio::test]
async fn test_upstream_error_is_surfaced() {
    let mut server = Server::new_async().await;
    let _upstream = server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"Invalid API key"}}"#)
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .oneshot(post_json(
            "/api/news",
            json!({ "messages": [{"role": "user", "content": "hi"}], "type": "trending" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Perplexity API Error: Invalid API key");
}

#[tokio::test]
async fn test_structured_news() {
    let mut server = Server::new_async().await;
    let payload = json!({
        "articles": [{
            "headline": "Team wins title",
            "summary": "A late goal decided it.",
            "timestamp": "2024-06-01T20:00:00Z",
            "section": "Sports"
        }]
    })
    .to_string();
    let _upstream = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({ "model": "grok-beta" })))
        .with_status(200)
        .with_body(completion(&format!("```json\n{}\n```", payload)))
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/news/structured",
            json!({ "type": "headlines", "section": "Sports", "count": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["articles"][0]["headline"], "Team wins title");

    let response = app
        .oneshot(post_json(
            "/api/news/structured",
            json!({ "type": "headlines", "count": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_structured_news_rejects_malformed_model_output() {
    let mut server = Server::new_async().await;
    let _upstream = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion("Sorry, I cannot help with that."))
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .oneshot(post_json("/api/news/structured", json!({ "type": "breaking" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_expand_streams_text() {
    let mut server = Server::new_async().await;
    let sse = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"## Overview\\n\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Rates were cut.\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    let _upstream = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({ "stream": true })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse)
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .clone()
        .oneshot(post_json("/api/expand", json!({ "headline": "Rates cut" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(read_body(response.into_body()).await).unwrap();
    assert_eq!(text, "## Overview\nRates were cut.");

    let response = app
        .oneshot(post_json("/api/expand", json!({ "headline": "  " })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expand_upstream_failure_is_generic() {
    let mut server = Server::new_async().await;
    let _upstream = server
        .mock("POST", "/chat/completions")
        .with_status(500)
        .create_async()
        .await;
    let app = app_for(&server, true);

    let response = app
        .oneshot(post_json("/api/expand", json!({ "headline": "Rates cut" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Failed to expand article");
}
