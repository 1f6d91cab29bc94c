//! HTTP API tests. The server runs in-process on a free port; query
//! expansion is exercised against a stub Ollama server.

use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use household_memory::config::Config;
use household_memory::server::run_server;

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn test_config(tmp: &TempDir, port: u16) -> Config {
    let mut cfg = Config::minimal(tmp.path().join("data/hm.sqlite3"));
    cfg.server.bind = format!("127.0.0.1:{}", port);
    cfg
}

/// Start the API and return its base URL.
async fn start(cfg: Config) -> String {
    let port: u16 = cfg
        .server
        .bind
        .rsplit(':')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap();
    tokio::spawn(async move {
        run_server(&cfg).await.expect("server failed");
    });
    wait_for_server(port).await;
    format!("http://127.0.0.1:{}", port)
}

/// Stub Ollama `/api/generate` that replies with `reply` after `delay`.
async fn start_stub_ollama(reply: &'static str, delay: Duration) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route(
        "/api/generate",
        post(move |Json(_body): Json<Value>| async move {
            tokio::time::sleep(delay).await;
            Json(json!({ "model": "stub", "response": reply, "done": true }))
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_record(client: &reqwest::Client, base: &str, body: Value) -> reqwest::Response {
    client
        .post(format!("{}/records", base))
        .json(&body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_database() {
    let tmp = TempDir::new().unwrap();
    let base = start(test_config(&tmp, find_free_port())).await;

    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db_accessible"], true);
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_records_round_trip() {
    let tmp = TempDir::new().unwrap();
    let base = start(test_config(&tmp, find_free_port())).await;
    let client = reqwest::Client::new();

    let resp = post_record(
        &client,
        &base,
        json!({
            "title": "Boiler service",
            "content": "Boiler serviced on 2025-10-12 by ABC Heating",
            "tags": ["boiler", " "],
            "source_kind": "pdf",
            "source_ref": "invoice-1182.pdf"
        }),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["source_kind"], "document");
    assert_eq!(created["tags"], json!(["boiler"]));

    let resp = client
        .get(format!("{}/records/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let fetched: Value = resp.json().await.unwrap();
    assert_eq!(fetched, created);

    let resp = client
        .get(format!("{}/records/missing", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_add_record_validation() {
    let tmp = TempDir::new().unwrap();
    let base = start(test_config(&tmp, find_free_port())).await;
    let client = reqwest::Client::new();

    let resp = post_record(
        &client,
        &base,
        json!({"title": "Roof", "content": "Gutter", "source_kind": "receipt"}),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("receipt"));

    let resp = post_record(&client, &base, json!({"title": " ", "content": "x"})).await;
    assert_eq!(resp.status(), 400);

    let resp = post_record(&client, &base, json!({"content": "no title"})).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_search_endpoint() {
    let tmp = TempDir::new().unwrap();
    let base = start(test_config(&tmp, find_free_port())).await;
    let client = reqwest::Client::new();

    for (title, content) in [
        ("Roof", "Gutter cleaned and roof tiles checked"),
        ("Roof repair", "Two roof tiles replaced after the storm"),
        ("Garden", "Hedge trimmed"),
    ] {
        let resp = post_record(&client, &base, json!({"title": title, "content": content})).await;
        assert_eq!(resp.status(), 201);
    }

    let url = format!("{}/search?q=roof%20tiles&limit=5", base);
    let first: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    let hits = first["hits"].as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["rank"], 1.0);
    for hit in hits {
        let rank = hit["rank"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&rank));
    }
    let again: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(first, again);

    let limited: Value = client
        .get(format!("{}/search?q=roof&limit=1", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(limited["hits"].as_array().unwrap().len(), 1);

    for bad in ["q=roof&limit=0", "q=roof&limit=21", "q=", "limit=3", "q=roof&limit=x"] {
        let resp = client
            .get(format!("{}/search?{}", base, bad))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400, "expected 400 for {}", bad);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }
}

#[tokio::test]
async fn test_ask_endpoint() {
    let tmp = TempDir::new().unwrap();
    let base = start(test_config(&tmp, find_free_port())).await;
    let client = reqwest::Client::new();

    let ask = |question: &'static str| {
        let client = client.clone();
        let base = base.clone();
        async move {
            client
                .post(format!("{}/ask", base))
                .json(&json!({ "question": question }))
                .send()
                .await
                .unwrap()
        }
    };

    let empty: Value = ask("When was the boiler last serviced?")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(empty["confidence"], "low");
    assert_eq!(empty["citations"].as_array().unwrap().len(), 0);
    assert!(!empty["follow_up_to_store"].as_array().unwrap().is_empty());

    post_record(
        &client,
        &base,
        json!({"title": "Boiler service", "content": "Boiler serviced on 2025-10-12 by ABC Heating"}),
    )
    .await;

    let resp = ask("When was the boiler last serviced?").await;
    assert_eq!(resp.status(), 200);
    let answer: Value = resp.json().await.unwrap();
    assert_eq!(answer["confidence"], "high");
    assert!(answer["answer"].as_str().unwrap().contains("2025-10-12"));
    assert!(answer["citations"][0]["snippet"]
        .as_str()
        .unwrap()
        .contains("2025-10-12"));

    let resp = ask("   ").await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_ask_uses_ollama_expansion() {
    let ollama = start_stub_ollama("1. dishwasher repair\n2. dishwasher pump\n", Duration::ZERO).await;

    let tmp = TempDir::new().unwrap();
    let mut cfg = test_config(&tmp, find_free_port());
    cfg.expansion.provider = "ollama".to_string();
    cfg.expansion.model = Some("stub".to_string());
    cfg.expansion.url = Some(ollama);
    let base = start(cfg).await;
    let client = reqwest::Client::new();

    post_record(
        &client,
        &base,
        json!({"title": "Dishwasher repair", "content": "Technician replaced the dishwasher drain pump"}),
    )
    .await;

    // "fixed" appears in no record, so only the expansions can find it.
    let answer: Value = client
        .post(format!("{}/ask", base))
        .json(&json!({"question": "When was the dishwasher fixed?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_ne!(answer["confidence"], "low");
    assert_eq!(answer["citations"][0]["title"], "Dishwasher repair");
}

#[tokio::test]
async fn test_slow_expansion_does_not_delay_answer() {
    let ollama = start_stub_ollama("boiler maintenance", Duration::from_secs(10)).await;

    let tmp = TempDir::new().unwrap();
    let mut cfg = test_config(&tmp, find_free_port());
    cfg.expansion.provider = "ollama".to_string();
    cfg.expansion.model = Some("stub".to_string());
    cfg.expansion.url = Some(ollama);
    cfg.expansion.timeout_ms = 200;
    let base = start(cfg).await;
    let client = reqwest::Client::new();

    post_record(
        &client,
        &base,
        json!({"title": "Boiler service", "content": "Boiler serviced on 2025-10-12 by ABC Heating"}),
    )
    .await;

    let started = Instant::now();
    let answer: Value = client
        .post(format!("{}/ask", base))
        .json(&json!({"question": "When was the boiler last serviced?"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(answer["confidence"], "high");
}
